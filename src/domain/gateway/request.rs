//! Outbound payment request construction.
//!
//! The gateway accepts charges as a browser form POST carrying three fields:
//! a signature version tag, a base64-encoded JSON parameter block, and the
//! block's signature. Building one is a pure function of the order data and
//! the merchant configuration.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::Serialize;

use crate::domain::foundation::{Money, OrderId};

use super::errors::RequestError;
use super::signing::{canonical_order_reference, derive_order_key, sign_parameters};
use super::RedsysGateway;

/// Signature scheme tag sent with every request and expected on every
/// notification.
pub(crate) const SIGNATURE_VERSION: &str = "HMAC_SHA256_V1";

/// ISO 4217 numeric code for EUR.
const CURRENCY_EUR: &str = "978";

/// Standard authorisation transaction.
const TRANSACTION_AUTHORISATION: &str = "0";

/// Spanish checkout language.
const CONSUMER_LANGUAGE_ES: &str = "001";

/// Accept every payment method the terminal supports, including Bizum.
const PAY_METHODS_ALL: &str = "z";

/// A domain payment intent to be translated into gateway wire format.
#[derive(Debug, Clone)]
pub struct PaymentRequest {
    pub order_id: OrderId,
    pub order_number: String,
    pub amount: Money,
    pub payer_email: String,
    pub description: String,
}

/// A signed, ready-to-post gateway form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignedRequest {
    /// Gateway endpoint the form must be POSTed to.
    pub endpoint: String,
    pub signature_version: String,
    /// Base64-encoded JSON parameter block.
    pub merchant_parameters: String,
    /// Base64-encoded HMAC over `merchant_parameters`.
    pub signature: String,
}

/// Wire layout of the merchant parameter block.
#[derive(Debug, Serialize)]
struct MerchantParameters<'a> {
    #[serde(rename = "DS_MERCHANT_AMOUNT")]
    amount: String,
    #[serde(rename = "DS_MERCHANT_ORDER")]
    order: &'a str,
    #[serde(rename = "DS_MERCHANT_MERCHANTCODE")]
    merchant_code: &'a str,
    #[serde(rename = "DS_MERCHANT_CURRENCY")]
    currency: &'a str,
    #[serde(rename = "DS_MERCHANT_TRANSACTIONTYPE")]
    transaction_type: &'a str,
    #[serde(rename = "DS_MERCHANT_TERMINAL")]
    terminal: &'a str,
    #[serde(rename = "DS_MERCHANT_MERCHANTURL")]
    merchant_url: &'a str,
    #[serde(rename = "DS_MERCHANT_URLOK")]
    url_ok: String,
    #[serde(rename = "DS_MERCHANT_URLKO")]
    url_ko: String,
    #[serde(rename = "DS_MERCHANT_CONSUMERLANGUAGE")]
    consumer_language: &'a str,
    #[serde(rename = "DS_MERCHANT_TITULAR")]
    titular: &'a str,
    #[serde(rename = "DS_MERCHANT_PRODUCTDESCRIPTION")]
    product_description: &'a str,
    #[serde(rename = "DS_MERCHANT_PAYMETHODS")]
    pay_methods: &'a str,
}

impl RedsysGateway {
    /// Builds a signed payment form for an order.
    ///
    /// The amount is converted to integer cents (half-cent values round away
    /// from zero) because the gateway works only in integers; the order
    /// number is canonicalized to the gateway's fixed-length numeric
    /// reference, and the mapping is logged for manual reconciliation.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::NegativeAmount`] for negative amounts.
    pub fn build_payment_request(
        &self,
        request: &PaymentRequest,
    ) -> Result<SignedRequest, RequestError> {
        if request.amount.is_negative() {
            return Err(RequestError::NegativeAmount(request.amount.to_string()));
        }

        let order_reference = canonical_order_reference(&request.order_number);
        tracing::info!(
            order_id = %request.order_id,
            order_number = %request.order_number,
            gateway_reference = %order_reference,
            "Canonicalized order number for gateway request"
        );

        let params = MerchantParameters {
            amount: request.amount.as_cents().to_string(),
            order: &order_reference,
            merchant_code: self.merchant_code(),
            currency: CURRENCY_EUR,
            transaction_type: TRANSACTION_AUTHORISATION,
            terminal: self.terminal(),
            merchant_url: self.notification_url(),
            url_ok: format!("{}?orderId={}", self.success_url(), request.order_id),
            url_ko: format!("{}?orderId={}", self.error_url(), request.order_id),
            consumer_language: CONSUMER_LANGUAGE_ES,
            titular: &request.payer_email,
            product_description: &request.description,
            pay_methods: PAY_METHODS_ALL,
        };

        let json = serde_json::to_string(&params)
            .expect("merchant parameter serialization cannot fail");
        let merchant_parameters = BASE64.encode(json.as_bytes());

        let order_key = derive_order_key(self.secret(), &order_reference);
        let signature = BASE64.encode(sign_parameters(&order_key, &merchant_parameters));

        Ok(SignedRequest {
            endpoint: self.endpoint().to_string(),
            signature_version: SIGNATURE_VERSION.to_string(),
            merchant_parameters,
            signature,
        })
    }
}
