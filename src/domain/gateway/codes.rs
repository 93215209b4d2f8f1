//! Gateway response code interpretation.
//!
//! Redsys reports transaction outcomes as four-digit numeric codes. Codes
//! below 100 are authorisations; everything else is a decline or an error.
//! The decline table below covers the codes the storefront has actually seen
//! in production plus the documented common ones; it must never fail on an
//! unknown code, because new codes appear without notice.

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Upper bound (exclusive) of the authorisation code band.
const SUCCESS_BAND_END: u32 = 100;

/// True iff the response code reports a successful charge.
///
/// Unknown or non-numeric codes are failures, never errors: the caller always
/// gets an answer.
pub fn is_payment_successful(response_code: &str) -> bool {
    response_code
        .trim()
        .parse::<u32>()
        .map(|code| code < SUCCESS_BAND_END)
        .unwrap_or(false)
}

static DECLINE_REASONS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("0101", "Card has expired"),
        ("0102", "Card flagged for temporary exception or suspected fraud"),
        ("0106", "PIN attempts exceeded"),
        ("0125", "Card not effective"),
        ("0129", "Incorrect security code (CVV2/CVC2)"),
        ("0180", "Card not part of the service"),
        ("0184", "Cardholder authentication failed"),
        ("0190", "Declined by the issuer without a stated reason"),
        ("0191", "Incorrect expiry date"),
        ("0202", "Card flagged for temporary exception or suspected fraud"),
        ("0904", "Merchant not registered"),
        ("0909", "Payment system error"),
        ("0913", "Duplicate order reference"),
        ("0944", "Incorrect session"),
        ("0950", "Refund operation not allowed"),
        ("9064", "Incorrect number of card digits"),
        ("9078", "Operation type not allowed for this card"),
        ("9093", "Card does not exist"),
        ("9094", "Rejected by international servers"),
        ("9104", "Secure-commerce merchant, cardholder without secure key"),
        ("9218", "Merchant does not allow secure operations on this channel"),
        ("9253", "Card fails the check-digit test"),
        ("9256", "Merchant cannot perform pre-authorisations"),
        ("9257", "Card does not allow pre-authorisation operations"),
        ("9261", "Operation stopped by restriction controls"),
        ("9912", "Issuer unavailable"),
        ("9913", "Error in the merchant's confirmation message"),
        ("9914", "Merchant confirmation declined"),
        ("9915", "Payment cancelled at the user's request"),
        ("9928", "Deferred authorisation voided by the payment system"),
        ("9929", "Deferred authorisation voided by the merchant"),
    ])
});

/// Fallback shown for codes absent from the table.
const GENERIC_DECLINE: &str = "Payment was declined. Please try again.";

/// Human-readable reason for a response code.
///
/// Total function: unknown codes map to a generic message rather than an
/// error, since the text reaches the customer and the decline still has to be
/// recorded.
pub fn describe_response(response_code: &str) -> &'static str {
    DECLINE_REASONS
        .get(response_code.trim())
        .copied()
        .unwrap_or(GENERIC_DECLINE)
}
