//! Resend implementation of NotificationDispatcher.
//!
//! Sends transactional emails through the Resend HTTP API. Message rendering
//! is intentionally plain text; the storefront's branded templates live in
//! the marketing stack, and the lifecycle core only guarantees the facts
//! reach the customer.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use crate::config::EmailConfig;
use crate::ports::{
    ExpirationNotice, NotificationDispatcher, NotificationError, PaymentReceipt,
};

const RESEND_ENDPOINT: &str = "https://api.resend.com/emails";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Resend-backed notification dispatcher.
pub struct ResendDispatcher {
    client: Client,
    api_key: String,
    from: String,
}

#[derive(Debug, Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: String,
    text: String,
}

impl ResendDispatcher {
    pub fn new(config: &EmailConfig) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            api_key: config.resend_api_key.clone(),
            from: config.from_header(),
        }
    }

    async fn send(&self, to: &str, subject: String, text: String) -> Result<(), NotificationError> {
        if !to.contains('@') {
            return Err(NotificationError::InvalidRecipient(to.to_string()));
        }

        let request = SendEmailRequest {
            from: &self.from,
            to: [to],
            subject,
            text,
        };

        let response = self
            .client
            .post(RESEND_ENDPOINT)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| NotificationError::Delivery(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(NotificationError::Delivery(format!(
                "Resend returned {}: {}",
                status, body
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl NotificationDispatcher for ResendDispatcher {
    async fn order_expired(&self, notice: &ExpirationNotice) -> Result<(), NotificationError> {
        let subject = format!("Your reservation {} has expired", notice.order_number);
        self.send(&notice.recipient, subject, expiration_body(notice))
            .await?;

        tracing::info!(
            recipient = %notice.recipient,
            order_number = %notice.order_number,
            "Expiration email sent"
        );
        Ok(())
    }

    async fn payment_received(&self, receipt: &PaymentReceipt) -> Result<(), NotificationError> {
        let subject = format!("Payment received for order {}", receipt.order_number);
        self.send(&receipt.recipient, subject, receipt_body(receipt))
            .await?;

        tracing::info!(
            recipient = %receipt.recipient,
            order_number = %receipt.order_number,
            "Payment receipt sent"
        );
        Ok(())
    }
}

fn expiration_body(notice: &ExpirationNotice) -> String {
    let mut body = format!(
        "Your reservation {} was cancelled because payment was not completed \
         within {} minutes.\n\nReserved items have been returned to availability:\n",
        notice.order_number, notice.window_minutes
    );
    for line in &notice.items {
        body.push_str(&format!(
            "  - {} x{} ({} EUR each)\n",
            line.name, line.quantity, line.unit_price
        ));
    }
    body.push_str(&format!(
        "\nOrder total: {} EUR\n\nYou can place a new order at any time.",
        notice.order_total
    ));
    body
}

fn receipt_body(receipt: &PaymentReceipt) -> String {
    let mut body = format!(
        "We received your payment of {} EUR for order {} ({}).\n",
        receipt.amount, receipt.order_number, receipt.payment_method
    );
    if let Some(code) = &receipt.authorization_code {
        body.push_str(&format!("Authorisation code: {}\n", code));
    }
    body.push_str("\nThank you for booking with Encore Rentals.");
    body
}
