//! Integration tests for the expiration sweep and scheduler.
//!
//! These drive the real ExpirationService and ExpirationScheduler over the
//! in-memory store, which implements the same guard and atomicity semantics
//! as the Postgres adapter.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rust_decimal_macros::dec;

use encore_rentals::adapters::memory::InMemoryOrderStore;
use encore_rentals::application::expiration::{
    ExpirationError, ExpirationScheduler, ExpirationService, SchedulerError,
};
use encore_rentals::config::LifecycleConfig;
use encore_rentals::domain::foundation::{DomainError, Money, OrderId, ProductId, Timestamp};
use encore_rentals::domain::order::{Order, OrderItem, OrderStatus, PaymentStatus};
use encore_rentals::ports::{
    ExpirationNotice, NotificationDispatcher, NotificationError, OrderLifecycleStore,
    PaymentReceipt, StatsQuery,
};

// =============================================================================
// Test Infrastructure
// =============================================================================

/// Dispatcher that records every notice, optionally failing each send.
struct RecordingDispatcher {
    sent: Mutex<Vec<String>>,
    fail: bool,
}

impl RecordingDispatcher {
    fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    fn sent_orders(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationDispatcher for RecordingDispatcher {
    async fn order_expired(&self, notice: &ExpirationNotice) -> Result<(), NotificationError> {
        if self.fail {
            return Err(NotificationError::Delivery("smtp unreachable".to_string()));
        }
        self.sent.lock().unwrap().push(notice.order_number.clone());
        Ok(())
    }

    async fn payment_received(&self, _: &PaymentReceipt) -> Result<(), NotificationError> {
        Ok(())
    }
}

/// Store wrapper that fails cancellation for one chosen order.
struct FailingCancelStore {
    inner: Arc<InMemoryOrderStore>,
    poison: OrderId,
}

#[async_trait]
impl OrderLifecycleStore for FailingCancelStore {
    async fn find_by_id(
        &self,
        id: &OrderId,
    ) -> Result<Option<Order>, DomainError> {
        self.inner.find_by_id(id).await
    }

    async fn find_by_gateway_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Order>, DomainError> {
        self.inner.find_by_gateway_reference(reference).await
    }

    async fn find_expirable(&self, cutoff: Timestamp) -> Result<Vec<Order>, DomainError> {
        self.inner.find_expirable(cutoff).await
    }

    async fn cancel_and_release_stock(
        &self,
        order: &Order,
        now: Timestamp,
        reason: &str,
    ) -> Result<(), DomainError> {
        if order.id == self.poison {
            return Err(DomainError::database("simulated row lock timeout"));
        }
        self.inner.cancel_and_release_stock(order, now, reason).await
    }

    async fn mark_paid(
        &self,
        order: &Order,
        now: Timestamp,
        authorization_code: &str,
    ) -> Result<(), DomainError> {
        self.inner.mark_paid(order, now, authorization_code).await
    }

    async fn mark_failed(&self, order: &Order, reason: &str) -> Result<(), DomainError> {
        self.inner.mark_failed(order, reason).await
    }

    async fn expiration_stats(
        &self,
        query: StatsQuery,
    ) -> Result<encore_rentals::ports::ExpirationStats, DomainError> {
        self.inner.expiration_stats(query).await
    }
}

/// Store whose expirable query blocks until released, to hold a sweep open.
struct BlockingStore {
    release: tokio::sync::Notify,
}

#[async_trait]
impl OrderLifecycleStore for BlockingStore {
    async fn find_by_id(&self, _: &OrderId) -> Result<Option<Order>, DomainError> {
        Ok(None)
    }

    async fn find_by_gateway_reference(&self, _: &str) -> Result<Option<Order>, DomainError> {
        Ok(None)
    }

    async fn find_expirable(&self, _: Timestamp) -> Result<Vec<Order>, DomainError> {
        self.release.notified().await;
        Ok(Vec::new())
    }

    async fn cancel_and_release_stock(
        &self,
        _: &Order,
        _: Timestamp,
        _: &str,
    ) -> Result<(), DomainError> {
        Ok(())
    }

    async fn mark_paid(&self, _: &Order, _: Timestamp, _: &str) -> Result<(), DomainError> {
        Ok(())
    }

    async fn mark_failed(&self, _: &Order, _: &str) -> Result<(), DomainError> {
        Ok(())
    }

    async fn expiration_stats(
        &self,
        _: StatsQuery,
    ) -> Result<encore_rentals::ports::ExpirationStats, DomainError> {
        Ok(Default::default())
    }
}

fn stale_order(product_id: ProductId, minutes_old: i64) -> Order {
    Order::new(
        OrderId::new(),
        format!("ENC-2025-{:04}", next_order_suffix()),
        "client@example.com",
        Money::new(dec!(240)),
        Money::ZERO,
        None,
        Timestamp::now().minus_minutes(minutes_old),
        vec![OrderItem {
            product_id,
            name: "Stage light".to_string(),
            quantity: 3,
            unit_price: Money::new(dec!(80)),
        }],
    )
}

fn next_order_suffix() -> u32 {
    // Distinct order numbers per test order.
    use std::sync::atomic::{AtomicU32, Ordering};
    static NEXT: AtomicU32 = AtomicU32::new(100);
    NEXT.fetch_add(1, Ordering::Relaxed)
}

fn service_over(store: Arc<dyn OrderLifecycleStore>) -> (Arc<ExpirationService>, Arc<RecordingDispatcher>) {
    let dispatcher = Arc::new(RecordingDispatcher::new());
    let service = Arc::new(ExpirationService::new(store, dispatcher.clone(), 30));
    (service, dispatcher)
}

// =============================================================================
// Sweep Behavior
// =============================================================================

#[tokio::test]
async fn sweep_expires_stale_order_and_restores_stock() {
    let store = Arc::new(InMemoryOrderStore::new());
    let product_id = ProductId::new();
    store.set_stock(product_id, 2);

    // Created 31 minutes ago with a 30-minute window.
    let order = stale_order(product_id, 31);
    store.insert_order(order.clone());

    let (service, dispatcher) = service_over(store.clone());
    let outcome = service.check_and_expire(Timestamp::now()).await.unwrap();

    assert_eq!(outcome.total, 1);
    assert_eq!(outcome.expired, vec![order.id]);
    assert!(outcome.failures.is_empty());

    let stored = store.order(&order.id).unwrap();
    assert_eq!(stored.status, OrderStatus::Cancelled);
    assert_eq!(stored.payment_status, PaymentStatus::Cancelled);
    assert!(stored.cancelled_at.is_some());
    assert!(stored
        .cancel_reason
        .as_deref()
        .unwrap()
        .contains("30 minutes"));

    // Stock round-trip: 3 reserved units came back on top of the 2 on hand.
    assert_eq!(store.stock_of(&product_id), 5);

    // Customer was told.
    assert_eq!(dispatcher.sent_orders(), vec![order.order_number]);
}

#[tokio::test]
async fn sweep_leaves_fresh_orders_alone() {
    let store = Arc::new(InMemoryOrderStore::new());
    let order = stale_order(ProductId::new(), 10);
    store.insert_order(order.clone());

    let (service, _) = service_over(store.clone());
    let outcome = service.check_and_expire(Timestamp::now()).await.unwrap();

    assert_eq!(outcome.total, 0);
    assert_eq!(
        store.order(&order.id).unwrap().status,
        OrderStatus::Pending
    );
}

#[tokio::test]
async fn paid_orders_are_invariant_under_expiration() {
    let store = Arc::new(InMemoryOrderStore::new());
    let product_id = ProductId::new();
    store.set_stock(product_id, 0);

    let order = stale_order(product_id, 45);
    store.insert_order(order.clone());
    store
        .mark_paid(&order, Timestamp::now(), "AUTH77")
        .await
        .unwrap();

    let (service, _) = service_over(store.clone());
    let outcome = service.check_and_expire(Timestamp::now()).await.unwrap();

    // The paid order no longer matches the expirable query at all.
    assert_eq!(outcome.total, 0);
    let stored = store.order(&order.id).unwrap();
    assert_eq!(stored.payment_status, PaymentStatus::Paid);
    assert_eq!(stored.status, OrderStatus::Confirmed);
    assert_eq!(store.stock_of(&product_id), 0);
}

#[tokio::test]
async fn one_failing_order_never_aborts_the_batch() {
    let inner = Arc::new(InMemoryOrderStore::new());
    let product_id = ProductId::new();
    inner.set_stock(product_id, 0);

    let poisoned = stale_order(product_id, 40);
    let healthy = stale_order(product_id, 40);
    inner.insert_order(poisoned.clone());
    inner.insert_order(healthy.clone());

    let store = Arc::new(FailingCancelStore {
        inner: inner.clone(),
        poison: poisoned.id,
    });
    let (service, _) = service_over(store);

    let outcome = service.check_and_expire(Timestamp::now()).await.unwrap();

    assert_eq!(outcome.total, 2);
    assert_eq!(outcome.expired, vec![healthy.id]);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].order_id, poisoned.id);
    assert!(outcome.failures[0].error.contains("row lock"));

    // The healthy order's stock was still released.
    assert_eq!(inner.stock_of(&product_id), 3);
    // The poisoned order remains pending for the next sweep.
    assert_eq!(
        inner.order(&poisoned.id).unwrap().status,
        OrderStatus::Pending
    );
}

#[tokio::test]
async fn notification_failure_does_not_roll_back_the_cancellation() {
    let store = Arc::new(InMemoryOrderStore::new());
    let order = stale_order(ProductId::new(), 35);
    store.insert_order(order.clone());

    let dispatcher = Arc::new(RecordingDispatcher::failing());
    let service = ExpirationService::new(store.clone(), dispatcher, 30);

    let outcome = service.check_and_expire(Timestamp::now()).await.unwrap();

    // The failed email is not a sweep failure.
    assert_eq!(outcome.expired, vec![order.id]);
    assert!(outcome.failures.is_empty());
    assert_eq!(
        store.order(&order.id).unwrap().status,
        OrderStatus::Cancelled
    );
}

// =============================================================================
// Manual Expiration Guards
// =============================================================================

#[tokio::test]
async fn manual_expiration_of_unknown_order_fails() {
    let (service, _) = service_over(Arc::new(InMemoryOrderStore::new()));

    let result = service
        .expire_order(&OrderId::new(), None, Timestamp::now())
        .await;
    assert!(matches!(result, Err(ExpirationError::NotFound(_))));
}

#[tokio::test]
async fn manual_expiration_of_cancelled_order_fails() {
    let store = Arc::new(InMemoryOrderStore::new());
    let mut order = stale_order(ProductId::new(), 40);
    order.expire(Timestamp::now(), "already gone").unwrap();
    store.insert_order(order.clone());

    let (service, _) = service_over(store);
    let result = service
        .expire_order(&order.id, None, Timestamp::now())
        .await;
    assert!(matches!(result, Err(ExpirationError::AlreadyCancelled(_))));
}

#[tokio::test]
async fn manual_expiration_of_paid_order_fails() {
    let store = Arc::new(InMemoryOrderStore::new());
    let order = stale_order(ProductId::new(), 40);
    store.insert_order(order.clone());
    store
        .mark_paid(&order, Timestamp::now(), "AUTH1")
        .await
        .unwrap();

    let (service, _) = service_over(store);
    let result = service
        .expire_order(&order.id, None, Timestamp::now())
        .await;
    assert!(matches!(result, Err(ExpirationError::AlreadyPaid(_))));
}

#[tokio::test]
async fn manual_expiration_uses_the_supplied_reason() {
    let store = Arc::new(InMemoryOrderStore::new());
    let order = stale_order(ProductId::new(), 5);
    store.insert_order(order.clone());

    let (service, _) = service_over(store.clone());
    service
        .expire_order(
            &order.id,
            Some("Cancelled by support on customer request.".to_string()),
            Timestamp::now(),
        )
        .await
        .unwrap();

    let stored = store.order(&order.id).unwrap();
    assert_eq!(
        stored.cancel_reason.as_deref(),
        Some("Cancelled by support on customer request.")
    );
}

// =============================================================================
// Stats
// =============================================================================

#[tokio::test]
async fn overview_reports_window_and_counts() {
    let store = Arc::new(InMemoryOrderStore::new());
    store.insert_order(stale_order(ProductId::new(), 25));
    store.insert_order(stale_order(ProductId::new(), 2));

    let (service, _) = service_over(store);
    let overview = service.overview(Timestamp::now()).await.unwrap();

    assert_eq!(overview.window_minutes, 30);
    assert_eq!(overview.pending, 2);
    assert_eq!(overview.expiring_soon, 1);
    assert_eq!(overview.expired_today, 0);
}

#[tokio::test]
async fn expired_orders_show_up_in_todays_count() {
    let store = Arc::new(InMemoryOrderStore::new());
    store.insert_order(stale_order(ProductId::new(), 40));

    let (service, _) = service_over(store);
    service.check_and_expire(Timestamp::now()).await.unwrap();

    let overview = service.overview(Timestamp::now()).await.unwrap();
    assert_eq!(overview.pending, 0);
    assert_eq!(overview.expired_today, 1);
}

// =============================================================================
// Scheduler Overlap Guard
// =============================================================================

#[tokio::test]
async fn concurrent_manual_sweeps_are_rejected() {
    let store = Arc::new(BlockingStore {
        release: tokio::sync::Notify::new(),
    });
    let dispatcher = Arc::new(RecordingDispatcher::new());
    let service = Arc::new(ExpirationService::new(store.clone(), dispatcher, 30));
    let scheduler = Arc::new(ExpirationScheduler::new(
        service,
        &LifecycleConfig::default(),
    ));

    // First sweep parks inside the store query, holding the overlap flag.
    let first = {
        let scheduler = scheduler.clone();
        tokio::spawn(async move { scheduler.run_now().await })
    };
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    assert!(scheduler.status().running);
    let second = scheduler.run_now().await;
    assert!(matches!(second, Err(SchedulerError::AlreadyRunning)));

    // Release the first sweep and verify the flag clears.
    store.release.notify_one();
    let outcome = first.await.unwrap().unwrap();
    assert_eq!(outcome.total, 0);
    assert!(!scheduler.status().running);

    // With the flag clear, a new sweep is accepted again.
    store.release.notify_one();
    assert!(scheduler.run_now().await.is_ok());
}

#[tokio::test]
async fn scheduler_status_tracks_start_and_stop() {
    let store = Arc::new(InMemoryOrderStore::new());
    let dispatcher = Arc::new(RecordingDispatcher::new());
    let service = Arc::new(ExpirationService::new(store, dispatcher, 30));
    let scheduler = Arc::new(ExpirationScheduler::new(
        service,
        &LifecycleConfig::default(),
    ));

    let status = scheduler.status();
    assert!(!status.active);
    assert!(!status.running);
    assert_eq!(status.interval_minutes, 5);

    scheduler.start();
    assert!(scheduler.status().active);

    scheduler.stop();
    assert!(!scheduler.status().active);
}
