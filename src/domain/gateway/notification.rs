//! Inbound gateway notification verification and decoding.
//!
//! After every payment attempt the gateway POSTs a notification carrying the
//! same three fields as the outbound form. The parameter blob is untyped
//! vendor JSON; it never crosses this module's boundary. Callers receive
//! either a fully-typed [`VerifiedPayment`] or a [`VerificationError`].

use base64::engine::general_purpose::{
    STANDARD as BASE64, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD,
};
use base64::Engine;
use serde::Deserialize;

use crate::domain::foundation::Money;

use super::errors::VerificationError;
use super::signing::{constant_time_compare, derive_order_key, sign_parameters};
use super::RedsysGateway;

/// Raw notification as received by the webhook endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct NotificationPayload {
    #[serde(rename = "Ds_SignatureVersion")]
    pub signature_version: String,
    #[serde(rename = "Ds_MerchantParameters")]
    pub merchant_parameters: String,
    #[serde(rename = "Ds_Signature")]
    pub signature: String,
}

/// Vendor layout of the notification parameter block. Internal only.
#[derive(Debug, Deserialize)]
struct NotificationParameters {
    #[serde(rename = "Ds_Amount")]
    amount: String,
    #[serde(rename = "Ds_Order")]
    order: String,
    #[serde(rename = "Ds_Response")]
    response: String,
    #[serde(rename = "Ds_AuthorisationCode", default)]
    authorisation_code: Option<String>,
    #[serde(rename = "Ds_PayMethod", default)]
    pay_method: Option<String>,
}

/// How the customer paid, decoded from the gateway's method tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentMethod {
    CreditCard,
    DebitCard,
    Transfer,
    DirectDebit,
    Bizum,
    /// A method tag this integration does not recognize.
    Other(String),
}

impl PaymentMethod {
    fn from_tag(tag: Option<&str>) -> Self {
        match tag {
            Some("C") => PaymentMethod::CreditCard,
            Some("D") => PaymentMethod::DebitCard,
            Some("T") => PaymentMethod::Transfer,
            Some("R") => PaymentMethod::DirectDebit,
            Some("z") => PaymentMethod::Bizum,
            Some(other) => PaymentMethod::Other(other.to_string()),
            None => PaymentMethod::Other(String::new()),
        }
    }

    /// Human-readable description.
    pub fn describe(&self) -> &str {
        match self {
            PaymentMethod::CreditCard => "Credit card",
            PaymentMethod::DebitCard => "Debit card",
            PaymentMethod::Transfer => "Bank transfer",
            PaymentMethod::DirectDebit => "Direct debit",
            PaymentMethod::Bizum => "Bizum",
            PaymentMethod::Other(_) => "Unknown payment method",
        }
    }
}

/// A notification whose signature checked out, decoded into domain values.
#[derive(Debug, Clone)]
pub struct VerifiedPayment {
    /// Charged amount, converted back from integer cents.
    pub amount: Money,
    /// The gateway's canonical order reference.
    pub order_reference: String,
    /// Raw response code; interpret with
    /// [`is_payment_successful`](super::is_payment_successful) and
    /// [`describe_response`](super::describe_response).
    pub response_code: String,
    /// Authorisation code of a settled charge.
    pub authorization_code: Option<String>,
    pub payment_method: PaymentMethod,
}

impl RedsysGateway {
    /// Verifies a notification's signature and decodes its parameters.
    ///
    /// The expected signature is recomputed over the received parameter
    /// string with the key re-derived from the embedded order reference, then
    /// compared in constant time.
    ///
    /// # Errors
    ///
    /// - [`VerificationError::MalformedPayload`] if the blob or any required
    ///   field cannot be decoded.
    /// - [`VerificationError::InvalidSignature`] if the signatures differ.
    pub fn verify_notification(
        &self,
        payload: &NotificationPayload,
    ) -> Result<VerifiedPayment, VerificationError> {
        let raw = decode_flexible(&payload.merchant_parameters).ok_or_else(|| {
            VerificationError::MalformedPayload("parameter blob is not valid base64".to_string())
        })?;

        let params: NotificationParameters = serde_json::from_slice(&raw)
            .map_err(|e| VerificationError::MalformedPayload(e.to_string()))?;

        let order_key = derive_order_key(self.secret(), &params.order);
        let expected = sign_parameters(&order_key, &payload.merchant_parameters);

        let supplied = decode_flexible(&payload.signature)
            .ok_or(VerificationError::InvalidSignature)?;

        if !constant_time_compare(&expected, &supplied) {
            return Err(VerificationError::InvalidSignature);
        }

        let cents: i64 = params.amount.trim().parse().map_err(|_| {
            VerificationError::MalformedPayload(format!(
                "amount '{}' is not an integer cent value",
                params.amount
            ))
        })?;

        Ok(VerifiedPayment {
            amount: Money::from_cents(cents),
            order_reference: params.order,
            response_code: params.response,
            authorization_code: params.authorisation_code,
            payment_method: PaymentMethod::from_tag(params.pay_method.as_deref()),
        })
    }
}

/// Decodes base64 accepting both alphabets, padded or not: the gateway signs
/// with the standard alphabet but delivers notification signatures URL-safe.
fn decode_flexible(input: &str) -> Option<Vec<u8>> {
    BASE64
        .decode(input)
        .or_else(|_| STANDARD_NO_PAD.decode(input))
        .or_else(|_| URL_SAFE.decode(input))
        .or_else(|_| URL_SAFE_NO_PAD.decode(input))
        .ok()
}

#[cfg(test)]
pub(crate) fn sign_test_notification(
    gateway: &RedsysGateway,
    parameters_json: &serde_json::Value,
) -> NotificationPayload {
    let merchant_parameters =
        BASE64.encode(serde_json::to_string(parameters_json).unwrap().as_bytes());
    let order = parameters_json["Ds_Order"].as_str().unwrap_or_default();
    let key = derive_order_key(gateway.secret(), order);
    let signature = BASE64.encode(sign_parameters(&key, &merchant_parameters));

    NotificationPayload {
        signature_version: super::request::SIGNATURE_VERSION.to_string(),
        merchant_parameters,
        signature,
    }
}
