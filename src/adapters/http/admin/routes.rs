//! Axum router configuration for admin endpoints.

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{expire_order, get_expiration_stats, run_sweep, AdminAppState};

/// Create the admin API router.
///
/// # Routes (require admin role upstream)
/// - `GET /expiration/stats` - Expiration dashboard aggregate
/// - `POST /expiration/run` - Trigger one sweep synchronously
/// - `POST /orders/:order_id/expire` - Manually expire one order
pub fn admin_routes() -> Router<AdminAppState> {
    Router::new()
        .route("/expiration/stats", get(get_expiration_stats))
        .route("/expiration/run", post(run_sweep))
        .route("/orders/:order_id/expire", post(expire_order))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::adapters::memory::InMemoryOrderStore;
    use crate::application::expiration::{ExpirationScheduler, ExpirationService};
    use crate::config::LifecycleConfig;
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

    fn test_state() -> AdminAppState {
        let service = Arc::new(ExpirationService::new(
            Arc::new(InMemoryOrderStore::new()),
            Arc::new(NullDispatcher),
            30,
        ));
        let scheduler = Arc::new(ExpirationScheduler::new(
            service.clone(),
            &LifecycleConfig::default(),
        ));
        AdminAppState {
            expiration: service,
            scheduler,
        }
    }

    #[test]
    fn admin_routes_creates_router() {
        let router = admin_routes();
        let _: Router<()> = router.with_state(test_state());
    }
}
