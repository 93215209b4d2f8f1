//! ProcessNotificationHandler - Command handler for inbound gateway payment
//! notifications.
//!
//! The webhook endpoint hands the raw vendor fields here. Verification never
//! touches the database; only a signature-checked, fully-decoded payment is
//! allowed to drive order transitions. A successful charge also materializes
//! the installment schedule for eligible orders; this is the one place
//! schedules are ever created.

use std::sync::Arc;

use thiserror::Error;

use crate::domain::foundation::{DomainError, OrderId, Timestamp};
use crate::domain::gateway::{
    describe_response, is_payment_successful, NotificationPayload, RedsysGateway,
    VerificationError,
};
use crate::domain::installments::InstallmentPlanner;
use crate::ports::{
    InstallmentRepository, NotificationDispatcher, OrderLifecycleStore, PaymentReceipt,
};

/// Command carrying one raw gateway notification.
#[derive(Debug, Clone)]
pub struct ProcessNotificationCommand {
    pub payload: NotificationPayload,
}

/// What the notification did to the order.
#[derive(Debug, Clone)]
pub enum NotificationOutcome {
    /// Charge settled; the order is paid (or already was).
    PaymentConfirmed {
        order_id: OrderId,
        order_number: String,
        authorization_code: Option<String>,
    },
    /// Charge declined; the order keeps its reservation with a failed
    /// payment state.
    PaymentDeclined {
        order_id: OrderId,
        order_number: String,
        reason: &'static str,
    },
}

/// Errors processing a notification.
#[derive(Debug, Error)]
pub enum ProcessNotificationError {
    /// Signature or payload verification failed; internal state untouched.
    #[error(transparent)]
    Verification(#[from] VerificationError),

    /// No order matches the gateway reference.
    #[error("No order matches gateway reference {0}")]
    OrderNotFound(String),

    #[error(transparent)]
    Store(#[from] DomainError),
}

/// Handler for gateway payment notifications.
pub struct ProcessNotificationHandler {
    gateway: Arc<RedsysGateway>,
    store: Arc<dyn OrderLifecycleStore>,
    installments: Arc<dyn InstallmentRepository>,
    planner: InstallmentPlanner,
    notifier: Arc<dyn NotificationDispatcher>,
}

impl ProcessNotificationHandler {
    pub fn new(
        gateway: Arc<RedsysGateway>,
        store: Arc<dyn OrderLifecycleStore>,
        installments: Arc<dyn InstallmentRepository>,
        planner: InstallmentPlanner,
        notifier: Arc<dyn NotificationDispatcher>,
    ) -> Self {
        Self {
            gateway,
            store,
            installments,
            planner,
            notifier,
        }
    }

    pub async fn handle(
        &self,
        cmd: ProcessNotificationCommand,
    ) -> Result<NotificationOutcome, ProcessNotificationError> {
        // 1. Verify the signature and decode the vendor blob.
        let verified = self.gateway.verify_notification(&cmd.payload)?;

        // 2. Correlate with an order via the canonical reference.
        let order = self
            .store
            .find_by_gateway_reference(&verified.order_reference)
            .await?
            .ok_or_else(|| {
                ProcessNotificationError::OrderNotFound(verified.order_reference.clone())
            })?;

        let now = Timestamp::now();

        // 3. Apply the outcome the gateway reported.
        if is_payment_successful(&verified.response_code) {
            tracing::info!(
                order_number = %order.order_number,
                amount = %verified.amount,
                method = verified.payment_method.describe(),
                "Gateway confirmed payment"
            );

            let authorization = verified.authorization_code.as_deref().unwrap_or_default();
            self.store.mark_paid(&order, now, authorization).await?;

            self.ensure_installment_schedule(&order, now).await?;

            // Receipt delivery is best-effort; the paid state is the source
            // of truth.
            let receipt = PaymentReceipt {
                recipient: order.customer_email.clone(),
                order_number: order.order_number.clone(),
                amount: verified.amount,
                authorization_code: verified.authorization_code.clone(),
                payment_method: verified.payment_method.describe().to_string(),
            };
            if let Err(error) = self.notifier.payment_received(&receipt).await {
                tracing::warn!(
                    order_number = %order.order_number,
                    %error,
                    "Failed to send payment receipt"
                );
            }

            Ok(NotificationOutcome::PaymentConfirmed {
                order_id: order.id,
                order_number: order.order_number,
                authorization_code: verified.authorization_code,
            })
        } else {
            let reason = describe_response(&verified.response_code);
            tracing::warn!(
                order_number = %order.order_number,
                response_code = %verified.response_code,
                reason,
                "Gateway declined payment"
            );

            self.store.mark_failed(&order, reason).await?;

            Ok(NotificationOutcome::PaymentDeclined {
                order_id: order.id,
                order_number: order.order_number,
                reason,
            })
        }
    }

    /// Creates the installment schedule for eligible orders, exactly once.
    ///
    /// Eligibility is evaluated here, at confirmation time, and never again;
    /// an existing schedule is left untouched whatever the order total is
    /// now.
    async fn ensure_installment_schedule(
        &self,
        order: &crate::domain::order::Order,
        now: Timestamp,
    ) -> Result<(), DomainError> {
        let Some(event_date) = order.event_date else {
            return Ok(());
        };
        if !self.planner.is_eligible(order.total) {
            return Ok(());
        }
        if !self.installments.find_by_order(&order.id).await?.is_empty() {
            return Ok(());
        }

        let schedule = self
            .planner
            .build_schedule(order.id, order.total, event_date, now);
        self.installments.save_schedule(&schedule).await?;

        tracing::info!(
            order_number = %order.order_number,
            tranches = schedule.len(),
            "Installment schedule created"
        );
        Ok(())
    }
}
