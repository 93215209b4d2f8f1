//! Order lifecycle persistence port.
//!
//! The only component permitted to mutate order rows. Every mutation is a
//! single atomic unit: the cancellation transition, its stock release, and
//! its audit note either all land or none do. The webhook path and the
//! expiration sweep both write through this port concurrently, so the store
//! transaction (not the scheduler's overlap flag) is the correctness
//! boundary, and `mark_paid` strictly wins over expiration.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, OrderId, Timestamp};
use crate::domain::order::Order;

/// Parameters for the expiration statistics query.
#[derive(Debug, Clone, Copy)]
pub struct StatsQuery {
    pub now: Timestamp,
    /// The configured expiration window.
    pub window_minutes: u64,
    /// Orders whose window elapses within this horizon count as
    /// "expiring soon".
    pub soon_minutes: u64,
}

/// Read-only aggregate over the current expiration state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExpirationStats {
    /// Orders currently awaiting payment.
    pub pending: u64,
    /// Pending orders whose window elapses within the soon-horizon.
    pub expiring_soon: u64,
    /// Orders auto-expired since the start of today.
    pub expired_today: u64,
}

/// Persistence operations on orders and their stock side effects.
#[async_trait]
pub trait OrderLifecycleStore: Send + Sync {
    /// Loads an order with its items.
    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, DomainError>;

    /// Correlates a gateway callback with an order via the canonical
    /// twelve-digit reference derived from the order number.
    async fn find_by_gateway_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Order>, DomainError>;

    /// Orders eligible for automatic expiration at `cutoff`: awaiting
    /// payment, created before the cutoff, not already cancelled. Read-only.
    async fn find_expirable(&self, cutoff: Timestamp) -> Result<Vec<Order>, DomainError>;

    /// Cancels the order and returns its reserved stock, atomically:
    /// terminal state, per-item stock increments, and an internal audit note
    /// are one transaction.
    ///
    /// Implementations must re-check the lifecycle guards inside the
    /// transaction (a webhook may have settled the payment since the order
    /// was fetched) and fail with `OrderAlreadyPaid` / `OrderAlreadyCancelled`
    /// coded errors without applying anything.
    async fn cancel_and_release_stock(
        &self,
        order: &Order,
        now: Timestamp,
        reason: &str,
    ) -> Result<(), DomainError>;

    /// Records a settled payment. Idempotent: marking an already-paid order
    /// is a no-op, because the gateway redelivers notifications.
    async fn mark_paid(
        &self,
        order: &Order,
        now: Timestamp,
        authorization_code: &str,
    ) -> Result<(), DomainError>;

    /// Records a declined payment with its human-readable reason. Stock is
    /// not released; inventory is only freed by expiration or explicit
    /// cancellation.
    async fn mark_failed(&self, order: &Order, reason: &str) -> Result<(), DomainError>;

    /// Read-only dashboard aggregate.
    async fn expiration_stats(&self, query: StatsQuery) -> Result<ExpirationStats, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_store_is_object_safe() {
        fn _accepts_dyn(_store: &dyn OrderLifecycleStore) {}
    }
}
