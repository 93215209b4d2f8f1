//! Gateway error types.

use thiserror::Error;

/// Errors building an outbound payment request.
#[derive(Debug, Clone, Error)]
pub enum RequestError {
    /// The configured signing secret is not valid base64.
    #[error("Gateway signing secret is not valid base64")]
    InvalidSecret,

    /// Charge amounts must not be negative.
    #[error("Payment amount must not be negative, got {0}")]
    NegativeAmount(String),
}

/// Errors verifying an inbound gateway notification.
///
/// These are the only two failure modes the adapter exposes: the webhook
/// handler must answer the gateway with a specific status whatever happened
/// internally, so everything malformed is folded into `MalformedPayload`
/// rather than surfaced as distinct failures.
#[derive(Debug, Clone, Error)]
pub enum VerificationError {
    /// The recomputed signature does not match the supplied one.
    #[error("Notification signature verification failed")]
    InvalidSignature,

    /// The parameter blob could not be decoded.
    #[error("Malformed notification payload: {0}")]
    MalformedPayload(String),
}
