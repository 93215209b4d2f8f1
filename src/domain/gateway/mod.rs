//! Card gateway integration: signed payment requests and notification
//! verification.
//!
//! The storefront charges cards through the Redsys acquiring platform. This
//! module is pure and stateless: it translates domain payment intents into
//! the gateway's signed wire format and validates inbound callbacks. It never
//! touches the database; webhook handlers decide what to do with the typed
//! results.

mod codes;
mod errors;
mod notification;
mod request;
mod signing;

pub use codes::{describe_response, is_payment_successful};
pub use errors::{RequestError, VerificationError};
pub use notification::{NotificationPayload, PaymentMethod, VerifiedPayment};
pub use request::{PaymentRequest, SignedRequest};
pub use signing::canonical_order_reference;

use secrecy::{ExposeSecret, SecretString};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

use crate::config::{GatewayConfig, GatewayEnvironment};

/// Redsys gateway adapter.
///
/// Holds the merchant identity and the decoded signing secret. Construction
/// is the only fallible step; request building and notification verification
/// are pure functions of the inputs afterwards.
#[derive(Clone)]
pub struct RedsysGateway {
    merchant_code: String,
    terminal: String,
    secret: Vec<u8>,
    endpoint: String,
    notification_url: String,
    success_url: String,
    error_url: String,
}

impl RedsysGateway {
    /// Builds a gateway adapter from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::InvalidSecret`] if the configured secret is
    /// not valid base64 (Redsys distributes merchant secrets base64-encoded).
    pub fn from_config(config: &GatewayConfig) -> Result<Self, RequestError> {
        let secret = decode_secret(&config.secret_key)?;
        let endpoint = match config.environment {
            GatewayEnvironment::Test => config.test_endpoint.clone(),
            GatewayEnvironment::Production => config.production_endpoint.clone(),
        };

        Ok(Self {
            merchant_code: config.merchant_code.clone(),
            terminal: config.terminal.clone(),
            secret,
            endpoint,
            notification_url: config.notification_url(),
            success_url: config.success_url(),
            error_url: config.error_url(),
        })
    }

    pub(crate) fn merchant_code(&self) -> &str {
        &self.merchant_code
    }

    pub(crate) fn terminal(&self) -> &str {
        &self.terminal
    }

    pub(crate) fn secret(&self) -> &[u8] {
        &self.secret
    }

    pub(crate) fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub(crate) fn notification_url(&self) -> &str {
        &self.notification_url
    }

    pub(crate) fn success_url(&self) -> &str {
        &self.success_url
    }

    pub(crate) fn error_url(&self) -> &str {
        &self.error_url
    }
}

impl std::fmt::Debug for RedsysGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The signing secret is deliberately omitted.
        f.debug_struct("RedsysGateway")
            .field("merchant_code", &self.merchant_code)
            .field("terminal", &self.terminal)
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

fn decode_secret(secret: &SecretString) -> Result<Vec<u8>, RequestError> {
    BASE64
        .decode(secret.expose_secret().as_bytes())
        .map_err(|_| RequestError::InvalidSecret)
}

#[cfg(test)]
pub(crate) fn test_gateway() -> RedsysGateway {
    RedsysGateway {
        merchant_code: "999008881".to_string(),
        terminal: "1".to_string(),
        // The public Redsys integration-test signing key.
        secret: BASE64.decode("sq7HjrUOBfKmC576ILgskD5srU870gJ7").unwrap(),
        endpoint: "https://sis-t.redsys.es:25443/sis/realizarPago".to_string(),
        notification_url: "https://shop.example.com/api/payments/notification".to_string(),
        success_url: "https://shop.example.com/checkout/success".to_string(),
        error_url: "https://shop.example.com/checkout/error".to_string(),
    }
}
