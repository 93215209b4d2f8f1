//! Axum router configuration for payment endpoints.

use axum::{routing::post, Router};

use super::handlers::{create_payment_form, handle_notification, PaymentAppState};

/// Create the payment API router.
///
/// # Routes
///
/// ## User Endpoints (require authentication upstream)
/// - `POST /orders/:order_id/form` - Build the signed gateway payment form
///
/// ## Webhook Endpoints (no auth, signature verified)
/// - `POST /notification` - Gateway payment notification
pub fn payment_routes() -> Router<PaymentAppState> {
    Router::new()
        .route("/orders/:order_id/form", post(create_payment_form))
        .route("/notification", post(handle_notification))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::adapters::memory::{InMemoryInstallmentRepository, InMemoryOrderStore};
    use crate::domain::gateway;
    use crate::domain::installments::{InstallmentPlanner, SchedulePolicy};
    use crate::ports::{
        ExpirationNotice, NotificationDispatcher, NotificationError, PaymentReceipt,
    };
    use async_trait::async_trait;

    struct NullDispatcher;

    #[async_trait]
    impl NotificationDispatcher for NullDispatcher {
        async fn order_expired(&self, _: &ExpirationNotice) -> Result<(), NotificationError> {
            Ok(())
        }

        async fn payment_received(&self, _: &PaymentReceipt) -> Result<(), NotificationError> {
            Ok(())
        }
    }

    fn test_state() -> PaymentAppState {
        PaymentAppState {
            store: Arc::new(InMemoryOrderStore::new()),
            installments: Arc::new(InMemoryInstallmentRepository::new()),
            notifier: Arc::new(NullDispatcher),
            gateway: Arc::new(gateway::test_gateway()),
            planner: InstallmentPlanner::new(SchedulePolicy::default()),
        }
    }

    #[test]
    fn payment_routes_creates_router() {
        let router = payment_routes();
        let _: Router<()> = router.with_state(test_state());
    }
}
