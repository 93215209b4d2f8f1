//! CreatePaymentFormHandler - Command handler for building the signed
//! gateway redirect form for an order.

use std::sync::Arc;

use thiserror::Error;

use crate::domain::foundation::{DomainError, OrderId};
use crate::domain::gateway::{PaymentRequest, RedsysGateway, RequestError, SignedRequest};
use crate::ports::OrderLifecycleStore;

/// Command to build a payment form.
#[derive(Debug, Clone)]
pub struct CreatePaymentFormCommand {
    pub order_id: OrderId,
}

/// Errors building a payment form.
#[derive(Debug, Error)]
pub enum PaymentFormError {
    #[error("Order {0} not found")]
    OrderNotFound(OrderId),

    #[error(transparent)]
    Gateway(#[from] RequestError),

    #[error(transparent)]
    Store(#[from] DomainError),
}

/// Handler for building signed payment forms.
pub struct CreatePaymentFormHandler {
    store: Arc<dyn OrderLifecycleStore>,
    gateway: Arc<RedsysGateway>,
}

impl CreatePaymentFormHandler {
    pub fn new(store: Arc<dyn OrderLifecycleStore>, gateway: Arc<RedsysGateway>) -> Self {
        Self { store, gateway }
    }

    /// Loads the order and translates it into a signed gateway form the
    /// customer's browser can POST.
    pub async fn handle(
        &self,
        cmd: CreatePaymentFormCommand,
    ) -> Result<SignedRequest, PaymentFormError> {
        let order = self
            .store
            .find_by_id(&cmd.order_id)
            .await?
            .ok_or(PaymentFormError::OrderNotFound(cmd.order_id))?;

        let request = PaymentRequest {
            order_id: order.id,
            order_number: order.order_number.clone(),
            amount: order.total,
            payer_email: order.customer_email.clone(),
            description: format!("Order {} - Encore Rentals", order.order_number),
        };

        tracing::info!(order_number = %order.order_number, "Building gateway payment form");

        Ok(self.gateway.build_payment_request(&request)?)
    }
}
