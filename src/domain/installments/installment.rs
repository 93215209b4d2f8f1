//! Installment entity.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{InstallmentId, Money, OrderId, Timestamp};

/// Settlement status of a single tranche.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallmentStatus {
    Pending,
    Paid,
    Overdue,
}

impl InstallmentStatus {
    /// String form used in persistence and API responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            InstallmentStatus::Pending => "pending",
            InstallmentStatus::Paid => "paid",
            InstallmentStatus::Overdue => "overdue",
        }
    }
}

/// One scheduled partial payment of an order total.
///
/// Installments belong to exactly one order and are created once, at
/// confirmation time; the schedule is never regenerated, even if the order
/// total later changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Installment {
    pub id: InstallmentId,
    pub order_id: OrderId,
    /// Position in the schedule, 1-based.
    pub number: u8,
    /// Share of the order total, e.g. `25` for 25%.
    pub percentage: Decimal,
    pub amount: Money,
    pub due_date: Timestamp,
    pub status: InstallmentStatus,
    pub paid_at: Option<Timestamp>,
}

impl Installment {
    /// True while the tranche awaits settlement.
    pub fn is_pending(&self) -> bool {
        self.status == InstallmentStatus::Pending
    }

    /// True when the tranche is pending past its due date.
    pub fn is_overdue_at(&self, now: Timestamp) -> bool {
        self.is_pending() && self.due_date.is_before(&now)
    }

    /// Records settlement of this tranche.
    pub fn mark_paid(&mut self, now: Timestamp) {
        self.status = InstallmentStatus::Paid;
        self.paid_at = Some(now);
    }
}
