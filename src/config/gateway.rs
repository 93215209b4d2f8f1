//! Card gateway configuration (Redsys)

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::error::ValidationError;
use super::server::Environment;

/// Which Redsys platform to charge against.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum GatewayEnvironment {
    #[default]
    Test,
    Production,
}

/// Card gateway configuration (Redsys)
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Merchant code (FUC) assigned by the acquiring bank
    pub merchant_code: String,

    /// Terminal number
    #[serde(default = "default_terminal")]
    pub terminal: String,

    /// Base64-encoded merchant signing secret
    pub secret_key: SecretString,

    /// Which gateway platform to use
    #[serde(default)]
    pub environment: GatewayEnvironment,

    /// Test platform endpoint
    #[serde(default = "default_test_endpoint")]
    pub test_endpoint: String,

    /// Production platform endpoint
    #[serde(default = "default_production_endpoint")]
    pub production_endpoint: String,

    /// Public base URL of this deployment, used to build callback URLs
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl GatewayConfig {
    /// URL the gateway POSTs payment notifications to.
    pub fn notification_url(&self) -> String {
        format!("{}/api/payments/notification", self.base_url)
    }

    /// URL the customer lands on after a successful payment.
    pub fn success_url(&self) -> String {
        format!("{}/checkout/success", self.base_url)
    }

    /// URL the customer lands on after a failed payment.
    pub fn error_url(&self) -> String {
        format!("{}/checkout/error", self.base_url)
    }

    /// Validate gateway configuration
    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        if self.merchant_code.is_empty() {
            return Err(ValidationError::MissingRequired("GATEWAY_MERCHANT_CODE"));
        }
        if self.secret_key.expose_secret().is_empty() {
            return Err(ValidationError::MissingRequired("GATEWAY_SECRET_KEY"));
        }
        if BASE64.decode(self.secret_key.expose_secret()).is_err() {
            return Err(ValidationError::InvalidGatewaySecret);
        }
        for endpoint in [&self.test_endpoint, &self.production_endpoint] {
            if !endpoint.starts_with("https://") {
                return Err(ValidationError::InvalidGatewayEndpoint);
            }
        }
        if *environment == Environment::Production && !self.base_url.starts_with("https://") {
            return Err(ValidationError::BaseUrlMustBeHttps);
        }
        Ok(())
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            merchant_code: String::new(),
            terminal: default_terminal(),
            secret_key: SecretString::new(String::new()),
            environment: GatewayEnvironment::default(),
            test_endpoint: default_test_endpoint(),
            production_endpoint: default_production_endpoint(),
            base_url: default_base_url(),
        }
    }
}

fn default_terminal() -> String {
    "1".to_string()
}

fn default_test_endpoint() -> String {
    "https://sis-t.redsys.es:25443/sis/realizarPago".to_string()
}

fn default_production_endpoint() -> String {
    "https://sis.redsys.es/sis/realizarPago".to_string()
}

fn default_base_url() -> String {
    "http://localhost:3000".to_string()
}
