//! Installment persistence port.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, InstallmentId, OrderId, Timestamp};
use crate::domain::installments::Installment;

/// Persistence for installment schedules and their settlement tracking.
#[async_trait]
pub trait InstallmentRepository: Send + Sync {
    /// Persists a freshly-built schedule.
    ///
    /// Schedules are created once per order and never regenerated; saving a
    /// second schedule for the same order fails with a `ScheduleExists`
    /// coded error.
    async fn save_schedule(&self, installments: &[Installment]) -> Result<(), DomainError>;

    /// All tranches of an order, ordered by tranche number.
    async fn find_by_order(&self, order_id: &OrderId) -> Result<Vec<Installment>, DomainError>;

    /// Records settlement of one tranche.
    async fn record_payment(
        &self,
        id: &InstallmentId,
        paid_at: Timestamp,
    ) -> Result<(), DomainError>;

    /// Pending tranches falling due within `days` of `now`, across all
    /// orders. Drives the payment reminder job.
    async fn find_due_within(
        &self,
        now: Timestamp,
        days: u32,
    ) -> Result<Vec<Installment>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn installment_repository_is_object_safe() {
        fn _accepts_dyn(_repo: &dyn InstallmentRepository) {}
    }
}
