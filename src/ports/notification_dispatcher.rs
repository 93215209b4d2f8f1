//! Customer notification port.
//!
//! Rendering and transport live behind this contract; the lifecycle core only
//! decides *that* a notification goes out and with which facts. Delivery is
//! best-effort everywhere it is called: the state transition is the source of
//! truth and a failed send never rolls one back.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::foundation::Money;

/// One item line shown in an expiration notice.
#[derive(Debug, Clone, PartialEq)]
pub struct NoticeLine {
    pub name: String,
    pub quantity: u32,
    pub unit_price: Money,
}

/// Facts for the "your reservation expired" notification.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpirationNotice {
    pub recipient: String,
    pub order_number: String,
    pub order_total: Money,
    /// The window the customer missed, for the message copy.
    pub window_minutes: u64,
    pub items: Vec<NoticeLine>,
}

/// Facts for the payment confirmation notification.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentReceipt {
    pub recipient: String,
    pub order_number: String,
    pub amount: Money,
    pub authorization_code: Option<String>,
    pub payment_method: String,
}

/// Errors delivering a notification.
#[derive(Debug, Clone, Error)]
pub enum NotificationError {
    #[error("Notification delivery failed: {0}")]
    Delivery(String),

    #[error("Recipient address is not usable: {0}")]
    InvalidRecipient(String),
}

/// Outbound customer notifications.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    /// Tells the customer their unpaid reservation was cancelled.
    async fn order_expired(&self, notice: &ExpirationNotice) -> Result<(), NotificationError>;

    /// Confirms a settled payment.
    async fn payment_received(&self, receipt: &PaymentReceipt) -> Result<(), NotificationError>;
}
