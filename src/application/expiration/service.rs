//! Per-sweep expiration business logic.
//!
//! A sweep fetches every order whose payment window has elapsed and applies
//! the cancellation transition one order at a time. Orders are deliberately
//! processed sequentially: one failing order is recorded in the outcome and
//! the batch continues, with no concurrent error aggregation to reason about.

use std::sync::Arc;

use thiserror::Error;

use crate::domain::foundation::{DomainError, OrderId, Timestamp};
use crate::domain::order::Order;
use crate::ports::{
    ExpirationNotice, NoticeLine, NotificationDispatcher, OrderLifecycleStore, StatsQuery,
};

/// Horizon for the "expiring soon" dashboard count.
const SOON_HORIZON_MINUTES: u64 = 10;

/// Outcome of one expiration sweep.
#[derive(Debug, Clone, Default)]
pub struct SweepOutcome {
    /// Orders that matched the expiration query.
    pub total: usize,
    /// Orders successfully cancelled with stock released.
    pub expired: Vec<OrderId>,
    /// Per-order failures; the sweep continued past each one.
    pub failures: Vec<SweepFailure>,
}

/// One order that could not be expired during a sweep.
#[derive(Debug, Clone)]
pub struct SweepFailure {
    pub order_id: OrderId,
    pub error: String,
}

/// Read-only expiration state for dashboards.
#[derive(Debug, Clone, Copy)]
pub struct ExpirationOverview {
    pub window_minutes: u64,
    pub pending: u64,
    pub expiring_soon: u64,
    pub expired_today: u64,
}

/// Errors from manual single-order expiration.
///
/// The guard variants are expected control flow: admin tooling routinely
/// races customer payments, and callers must distinguish "already paid" from
/// "gone" to answer correctly.
#[derive(Debug, Error)]
pub enum ExpirationError {
    #[error("Order {0} not found")]
    NotFound(OrderId),

    #[error("Order {0} is already cancelled")]
    AlreadyCancelled(OrderId),

    #[error("Order {0} has been paid and cannot be expired")]
    AlreadyPaid(OrderId),

    #[error(transparent)]
    Store(#[from] DomainError),
}

/// Expires pending unpaid orders past the configured window.
pub struct ExpirationService {
    store: Arc<dyn OrderLifecycleStore>,
    notifier: Arc<dyn NotificationDispatcher>,
    window_minutes: u64,
}

impl ExpirationService {
    pub fn new(
        store: Arc<dyn OrderLifecycleStore>,
        notifier: Arc<dyn NotificationDispatcher>,
        window_minutes: u64,
    ) -> Self {
        Self {
            store,
            notifier,
            window_minutes,
        }
    }

    /// The configured expiration window in minutes.
    pub fn window_minutes(&self) -> u64 {
        self.window_minutes
    }

    /// Runs one sweep: finds every order whose window elapsed before `now`
    /// and cancels it with stock release.
    ///
    /// A failing order is recorded in the outcome and never aborts the batch.
    /// Customer notification is attempted after each successful cancellation
    /// and is best-effort: the cancellation stands whether or not the email
    /// went out.
    pub async fn check_and_expire(&self, now: Timestamp) -> Result<SweepOutcome, DomainError> {
        let cutoff = now.minus_minutes(self.window_minutes as i64);
        tracing::info!(%cutoff, "Checking for expired orders");

        let expirable = self.store.find_expirable(cutoff).await?;

        let mut outcome = SweepOutcome {
            total: expirable.len(),
            ..SweepOutcome::default()
        };

        if expirable.is_empty() {
            tracing::info!("No orders to expire");
            return Ok(outcome);
        }

        tracing::info!(count = expirable.len(), "Found orders to expire");

        for order in expirable {
            match self.expire_one(&order, now, self.default_reason()).await {
                Ok(()) => {
                    tracing::info!(
                        order_number = %order.order_number,
                        "Order expired and stock released"
                    );
                    outcome.expired.push(order.id);
                }
                Err(error) => {
                    tracing::error!(
                        order_number = %order.order_number,
                        %error,
                        "Failed to expire order"
                    );
                    outcome.failures.push(SweepFailure {
                        order_id: order.id,
                        error: error.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            total = outcome.total,
            expired = outcome.expired.len(),
            failures = outcome.failures.len(),
            "Expiration sweep finished"
        );

        Ok(outcome)
    }

    /// Manually expires a single order.
    ///
    /// Guard conditions are checked before anything is mutated:
    ///
    /// # Errors
    ///
    /// - [`ExpirationError::NotFound`] if the order does not exist.
    /// - [`ExpirationError::AlreadyCancelled`] if it was cancelled before.
    /// - [`ExpirationError::AlreadyPaid`] if a settled payment exists.
    pub async fn expire_order(
        &self,
        order_id: &OrderId,
        reason: Option<String>,
        now: Timestamp,
    ) -> Result<(), ExpirationError> {
        tracing::info!(%order_id, "Manual expiration requested");

        let order = self
            .store
            .find_by_id(order_id)
            .await?
            .ok_or(ExpirationError::NotFound(*order_id))?;

        if order.cancelled_at.is_some() {
            return Err(ExpirationError::AlreadyCancelled(order.id));
        }
        if order.payment_status.is_paid() {
            return Err(ExpirationError::AlreadyPaid(order.id));
        }

        let reason = reason.unwrap_or_else(|| self.default_reason());
        self.expire_one(&order, now, reason).await?;

        tracing::info!(order_number = %order.order_number, "Order expired manually");
        Ok(())
    }

    /// Read-only aggregate for the admin dashboard.
    pub async fn overview(&self, now: Timestamp) -> Result<ExpirationOverview, DomainError> {
        let stats = self
            .store
            .expiration_stats(StatsQuery {
                now,
                window_minutes: self.window_minutes,
                soon_minutes: SOON_HORIZON_MINUTES,
            })
            .await?;

        Ok(ExpirationOverview {
            window_minutes: self.window_minutes,
            pending: stats.pending,
            expiring_soon: stats.expiring_soon,
            expired_today: stats.expired_today,
        })
    }

    /// Cancels one order transactionally, then notifies the customer.
    async fn expire_one(
        &self,
        order: &Order,
        now: Timestamp,
        reason: String,
    ) -> Result<(), DomainError> {
        self.store
            .cancel_and_release_stock(order, now, &reason)
            .await?;

        // The cancellation is authoritative; a failed notification only logs.
        if let Err(error) = self.notifier.order_expired(&self.notice_for(order)).await {
            tracing::warn!(
                order_number = %order.order_number,
                %error,
                "Failed to send expiration notification"
            );
        }

        Ok(())
    }

    fn notice_for(&self, order: &Order) -> ExpirationNotice {
        ExpirationNotice {
            recipient: order.customer_email.clone(),
            order_number: order.order_number.clone(),
            order_total: order.total,
            window_minutes: self.window_minutes,
            items: order
                .items
                .iter()
                .map(|item| NoticeLine {
                    name: item.name.clone(),
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                })
                .collect(),
        }
    }

    fn default_reason(&self) -> String {
        format!(
            "Order expired automatically after {} minutes without payment.",
            self.window_minutes
        )
    }
}

