//! In-memory implementation of OrderLifecycleStore.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, ErrorCode, OrderId, ProductId, Timestamp};
use crate::domain::gateway::canonical_order_reference;
use crate::domain::order::{Order, OrderError, PaymentApplication};
use crate::ports::{ExpirationStats, OrderLifecycleStore, StatsQuery};

/// Audit note attached to an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredNote {
    pub order_id: OrderId,
    pub content: String,
    pub is_internal: bool,
}

#[derive(Default)]
struct State {
    orders: HashMap<OrderId, Order>,
    stock: HashMap<ProductId, i64>,
    notes: Vec<StoredNote>,
}

/// In-memory order store.
///
/// A single mutex over the whole state makes each mutation atomic, mirroring
/// the transaction boundary of the Postgres implementation.
#[derive(Default)]
pub struct InMemoryOrderStore {
    state: Mutex<State>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an order.
    pub fn insert_order(&self, order: Order) {
        self.lock().orders.insert(order.id, order);
    }

    /// Seeds available stock for a product.
    pub fn set_stock(&self, product_id: ProductId, quantity: i64) {
        self.lock().stock.insert(product_id, quantity);
    }

    /// Current stock of a product.
    pub fn stock_of(&self, product_id: &ProductId) -> i64 {
        self.lock().stock.get(product_id).copied().unwrap_or(0)
    }

    /// Current state of an order.
    pub fn order(&self, id: &OrderId) -> Option<Order> {
        self.lock().orders.get(id).cloned()
    }

    /// Audit notes recorded for an order.
    pub fn notes_for(&self, id: &OrderId) -> Vec<StoredNote> {
        self.lock()
            .notes
            .iter()
            .filter(|n| &n.order_id == id)
            .cloned()
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().expect("order store lock poisoned")
    }
}

#[async_trait]
impl OrderLifecycleStore for InMemoryOrderStore {
    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, DomainError> {
        Ok(self.lock().orders.get(id).cloned())
    }

    async fn find_by_gateway_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Order>, DomainError> {
        let state = self.lock();
        Ok(state
            .orders
            .values()
            .find(|o| canonical_order_reference(&o.order_number) == reference)
            .cloned())
    }

    async fn find_expirable(&self, cutoff: Timestamp) -> Result<Vec<Order>, DomainError> {
        let state = self.lock();
        Ok(state
            .orders
            .values()
            .filter(|o| o.is_expirable(cutoff))
            .cloned()
            .collect())
    }

    async fn cancel_and_release_stock(
        &self,
        order: &Order,
        now: Timestamp,
        reason: &str,
    ) -> Result<(), DomainError> {
        let mut state = self.lock();

        // Re-check the guards against current state: a webhook may have
        // settled the payment since the caller fetched the order.
        let current = state.orders.get_mut(&order.id).ok_or_else(|| {
            DomainError::new(ErrorCode::OrderNotFound, format!("Order {} not found", order.id))
        })?;

        current.expire(now, reason).map_err(|e| match e {
            OrderError::AlreadyPaid(id) => DomainError::new(
                ErrorCode::OrderAlreadyPaid,
                format!("Order {} has been paid and cannot be expired", id),
            ),
            OrderError::AlreadyCancelled(id) => DomainError::new(
                ErrorCode::OrderAlreadyCancelled,
                format!("Order {} is already cancelled", id),
            ),
        })?;

        let items = current.items.clone();
        let order_id = current.id;
        for item in &items {
            *state.stock.entry(item.product_id).or_insert(0) += i64::from(item.quantity);
        }

        state.notes.push(StoredNote {
            order_id,
            content: format!("{} Stock released.", reason),
            is_internal: true,
        });

        Ok(())
    }

    async fn mark_paid(
        &self,
        order: &Order,
        now: Timestamp,
        authorization_code: &str,
    ) -> Result<(), DomainError> {
        let mut state = self.lock();
        let current = state.orders.get_mut(&order.id).ok_or_else(|| {
            DomainError::new(ErrorCode::OrderNotFound, format!("Order {} not found", order.id))
        })?;

        // Duplicate notifications are expected; already paid is a no-op.
        if current.record_payment(now, authorization_code) == PaymentApplication::AlreadyPaid {
            tracing::debug!(order_id = %order.id, "Duplicate payment notification ignored");
        }
        Ok(())
    }

    async fn mark_failed(&self, order: &Order, reason: &str) -> Result<(), DomainError> {
        let mut state = self.lock();
        let current = state.orders.get_mut(&order.id).ok_or_else(|| {
            DomainError::new(ErrorCode::OrderNotFound, format!("Order {} not found", order.id))
        })?;

        // Paid wins: a decline arriving after a settlement changes nothing.
        if current.payment_status.is_paid() {
            return Ok(());
        }

        current.record_failure();
        let order_id = current.id;
        state.notes.push(StoredNote {
            order_id,
            content: format!("Payment error: {}", reason),
            is_internal: true,
        });
        Ok(())
    }

    async fn expiration_stats(&self, query: StatsQuery) -> Result<ExpirationStats, DomainError> {
        let state = self.lock();
        let window = query.window_minutes as i64;
        let soon_window = window.saturating_sub(query.soon_minutes as i64);

        let cutoff = query.now.minus_minutes(window);
        let soon_cutoff = query.now.minus_minutes(soon_window);
        let today = query.now.start_of_day();

        let mut stats = ExpirationStats::default();
        for order in state.orders.values() {
            if order.is_awaiting_payment() && order.cancelled_at.is_none() {
                stats.pending += 1;
                // Old enough to expire within the soon-horizon, but not yet
                // past the full window.
                if !order.created_at.is_before(&cutoff) && order.created_at.is_before(&soon_cutoff)
                {
                    stats.expiring_soon += 1;
                }
            }

            let auto_expired = order
                .cancel_reason
                .as_deref()
                .is_some_and(|r| r.contains("expired automatically"));
            if auto_expired
                && order
                    .cancelled_at
                    .is_some_and(|cancelled| !cancelled.is_before(&today))
            {
                stats.expired_today += 1;
            }
        }

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::Money;
    use crate::domain::order::{OrderItem, OrderStatus, PaymentStatus};
    use rust_decimal_macros::dec;

    fn order_with_item(product_id: ProductId, quantity: u32) -> Order {
        Order::new(
            OrderId::new(),
            "ENC-2025-0200",
            "client@example.com",
            Money::new(dec!(240)),
            Money::ZERO,
            None,
            Timestamp::now().minus_minutes(45),
            vec![OrderItem {
                product_id,
                name: "Wireless microphone".to_string(),
                quantity,
                unit_price: Money::new(dec!(60)),
            }],
        )
    }

    #[tokio::test]
    async fn cancel_releases_stock_and_writes_note() {
        let store = InMemoryOrderStore::new();
        let product_id = ProductId::new();
        store.set_stock(product_id, 6);
        let order = order_with_item(product_id, 4);
        store.insert_order(order.clone());

        store
            .cancel_and_release_stock(&order, Timestamp::now(), "timed out.")
            .await
            .unwrap();

        assert_eq!(store.stock_of(&product_id), 10);
        let stored = store.order(&order.id).unwrap();
        assert_eq!(stored.status, OrderStatus::Cancelled);
        assert!(stored.cancelled_at.is_some());

        let notes = store.notes_for(&order.id);
        assert_eq!(notes.len(), 1);
        assert!(notes[0].is_internal);
        assert!(notes[0].content.contains("Stock released"));
    }

    #[tokio::test]
    async fn cancel_of_paid_order_is_rejected_and_leaves_stock_alone() {
        let store = InMemoryOrderStore::new();
        let product_id = ProductId::new();
        store.set_stock(product_id, 6);
        let order = order_with_item(product_id, 4);
        store.insert_order(order.clone());

        store.mark_paid(&order, Timestamp::now(), "AUTH1").await.unwrap();

        let err = store
            .cancel_and_release_stock(&order, Timestamp::now(), "sweep")
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::OrderAlreadyPaid);
        assert_eq!(store.stock_of(&product_id), 6);
    }

    #[tokio::test]
    async fn mark_paid_twice_is_a_noop() {
        let store = InMemoryOrderStore::new();
        let order = order_with_item(ProductId::new(), 1);
        store.insert_order(order.clone());

        store.mark_paid(&order, Timestamp::now(), "AUTH1").await.unwrap();
        let after_first = store.order(&order.id).unwrap();

        store.mark_paid(&order, Timestamp::now(), "AUTH2").await.unwrap();
        let after_second = store.order(&order.id).unwrap();

        assert_eq!(after_first, after_second);
        assert_eq!(after_second.authorization_code.as_deref(), Some("AUTH1"));
    }

    #[tokio::test]
    async fn mark_failed_after_payment_changes_nothing() {
        let store = InMemoryOrderStore::new();
        let order = order_with_item(ProductId::new(), 1);
        store.insert_order(order.clone());

        store.mark_paid(&order, Timestamp::now(), "AUTH1").await.unwrap();
        store.mark_failed(&order, "late decline").await.unwrap();

        let stored = store.order(&order.id).unwrap();
        assert_eq!(stored.payment_status, PaymentStatus::Paid);
    }

    #[tokio::test]
    async fn gateway_reference_lookup_canonicalizes_order_numbers() {
        let store = InMemoryOrderStore::new();
        let order = order_with_item(ProductId::new(), 1);
        store.insert_order(order.clone());

        let found = store
            .find_by_gateway_reference("000020250200")
            .await
            .unwrap();
        assert_eq!(found.map(|o| o.id), Some(order.id));

        let missing = store
            .find_by_gateway_reference("000000009999")
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn find_expirable_skips_fresh_and_cancelled_orders() {
        let store = InMemoryOrderStore::new();
        let now = Timestamp::now();

        let stale = order_with_item(ProductId::new(), 1);
        store.insert_order(stale.clone());

        let mut fresh = order_with_item(ProductId::new(), 1);
        fresh.id = OrderId::new();
        fresh.created_at = now.minus_minutes(5);
        store.insert_order(fresh);

        let mut cancelled = order_with_item(ProductId::new(), 1);
        cancelled.id = OrderId::new();
        cancelled.expire(now, "gone").unwrap();
        store.insert_order(cancelled);

        let cutoff = now.minus_minutes(30);
        let expirable = store.find_expirable(cutoff).await.unwrap();

        assert_eq!(expirable.len(), 1);
        assert_eq!(expirable[0].id, stale.id);
    }

    #[tokio::test]
    async fn stats_count_pending_and_expiring_soon() {
        let store = InMemoryOrderStore::new();
        let now = Timestamp::now();

        // 25 minutes old with a 30-minute window: expires in 5 minutes.
        let mut soon = order_with_item(ProductId::new(), 1);
        soon.created_at = now.minus_minutes(25);
        store.insert_order(soon);

        // 5 minutes old: pending but not close to expiring.
        let mut young = order_with_item(ProductId::new(), 1);
        young.id = OrderId::new();
        young.created_at = now.minus_minutes(5);
        store.insert_order(young);

        let stats = store
            .expiration_stats(StatsQuery {
                now,
                window_minutes: 30,
                soon_minutes: 10,
            })
            .await
            .unwrap();

        assert_eq!(stats.pending, 2);
        assert_eq!(stats.expiring_soon, 1);
    }
}
