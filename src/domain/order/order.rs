//! The Order aggregate.
//!
//! Orders are hydrated from persistence and mutated only through the
//! transition methods below; the store persists whatever the aggregate
//! decided. Two invariants are enforced here rather than in SQL so that every
//! store implementation inherits them:
//!
//! - a paid order is never cancelled by the expiration path;
//! - `cancelled_at` is written exactly once, at the terminal transition.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{Money, OrderId, ProductId, Timestamp};

use super::errors::OrderError;
use super::status::{OrderStatus, PaymentStatus};

/// A single line of an order: product reference and reserved quantity.
///
/// Read-only to the payment lifecycle; the quantity is only read back when
/// stock is released on cancellation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Money,
}

/// Outcome of applying a gateway payment to an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentApplication {
    /// The payment was recorded.
    Applied,

    /// The order was already paid; the duplicate notification is a no-op.
    AlreadyPaid,
}

/// An equipment-rental order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    /// Human-readable reference, e.g. `ENC-2025-0134`.
    pub order_number: String,
    pub customer_email: String,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    /// Payment status of the deposit tranche for confirmed split-payment
    /// orders; mirrors `payment_status` for single-payment orders.
    pub upfront_payment_status: PaymentStatus,
    pub total: Money,
    pub transport_cost: Money,
    /// Rental/event date, when known. Drives installment due dates.
    pub event_date: Option<Timestamp>,
    pub created_at: Timestamp,
    pub paid_at: Option<Timestamp>,
    pub cancelled_at: Option<Timestamp>,
    pub cancel_reason: Option<String>,
    /// Gateway authorisation code of the settled charge.
    pub authorization_code: Option<String>,
    pub items: Vec<OrderItem>,
}

impl Order {
    /// Creates a fresh pending order.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: OrderId,
        order_number: impl Into<String>,
        customer_email: impl Into<String>,
        total: Money,
        transport_cost: Money,
        event_date: Option<Timestamp>,
        created_at: Timestamp,
        items: Vec<OrderItem>,
    ) -> Self {
        Self {
            id,
            order_number: order_number.into(),
            customer_email: customer_email.into(),
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            upfront_payment_status: PaymentStatus::Pending,
            total,
            transport_cost,
            event_date,
            created_at,
            paid_at: None,
            cancelled_at: None,
            cancel_reason: None,
            authorization_code: None,
            items,
        }
    }

    /// True when the order still holds stock while waiting for a payment:
    /// pending orders with no payment, or confirmed orders whose deposit is
    /// still outstanding.
    pub fn is_awaiting_payment(&self) -> bool {
        match (self.status, self.payment_status) {
            (OrderStatus::Pending, PaymentStatus::Pending) => true,
            (OrderStatus::Confirmed, PaymentStatus::Pending) => {
                self.upfront_payment_status == PaymentStatus::Pending
            }
            _ => false,
        }
    }

    /// True when the order qualifies for automatic expiration at `cutoff`:
    /// it is awaiting payment, was created before the cutoff, and has not
    /// been cancelled.
    pub fn is_expirable(&self, cutoff: Timestamp) -> bool {
        self.is_awaiting_payment()
            && self.cancelled_at.is_none()
            && self.created_at.is_before(&cutoff)
    }

    /// Applies the terminal cancellation transition.
    ///
    /// # Errors
    ///
    /// - [`OrderError::AlreadyPaid`] if a settled payment exists; paid orders
    ///   are invariant under expiration.
    /// - [`OrderError::AlreadyCancelled`] if the transition already happened;
    ///   `cancelled_at` is set exactly once.
    pub fn expire(&mut self, now: Timestamp, reason: impl Into<String>) -> Result<(), OrderError> {
        if self.payment_status.is_paid() {
            return Err(OrderError::AlreadyPaid(self.id));
        }
        if self.status == OrderStatus::Cancelled || self.cancelled_at.is_some() {
            return Err(OrderError::AlreadyCancelled(self.id));
        }

        self.status = OrderStatus::Cancelled;
        self.payment_status = PaymentStatus::Cancelled;
        self.cancelled_at = Some(now);
        self.cancel_reason = Some(reason.into());
        Ok(())
    }

    /// Records a settled gateway payment.
    ///
    /// Idempotent: duplicate gateway notifications for an already-paid order
    /// return [`PaymentApplication::AlreadyPaid`] and change nothing.
    pub fn record_payment(
        &mut self,
        now: Timestamp,
        authorization_code: impl Into<String>,
    ) -> PaymentApplication {
        if self.payment_status.is_paid() {
            return PaymentApplication::AlreadyPaid;
        }

        self.payment_status = PaymentStatus::Paid;
        self.upfront_payment_status = PaymentStatus::Paid;
        self.status = OrderStatus::Confirmed;
        self.paid_at = Some(now);
        self.authorization_code = Some(authorization_code.into());
        PaymentApplication::Applied
    }

    /// Records a declined gateway payment.
    ///
    /// Does not release stock: inventory is only freed by expiration or
    /// explicit cancellation, so a declined attempt keeps the reservation.
    /// The decline reason is recorded by the store as an audit note.
    pub fn record_failure(&mut self) {
        self.payment_status = PaymentStatus::Failed;
    }
}
