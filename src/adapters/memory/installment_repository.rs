//! In-memory implementation of InstallmentRepository.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, ErrorCode, InstallmentId, OrderId, Timestamp};
use crate::domain::installments::Installment;
use crate::ports::InstallmentRepository;

/// In-memory installment store keyed by order.
#[derive(Default)]
pub struct InMemoryInstallmentRepository {
    schedules: Mutex<HashMap<OrderId, Vec<Installment>>>,
}

impl InMemoryInstallmentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InstallmentRepository for InMemoryInstallmentRepository {
    async fn save_schedule(&self, installments: &[Installment]) -> Result<(), DomainError> {
        let Some(first) = installments.first() else {
            return Ok(());
        };

        let mut schedules = self.schedules.lock().expect("installment lock poisoned");
        if schedules.get(&first.order_id).is_some_and(|s| !s.is_empty()) {
            return Err(DomainError::new(
                ErrorCode::ScheduleExists,
                format!("Order {} already has an installment schedule", first.order_id),
            ));
        }

        schedules.insert(first.order_id, installments.to_vec());
        Ok(())
    }

    async fn find_by_order(&self, order_id: &OrderId) -> Result<Vec<Installment>, DomainError> {
        let schedules = self.schedules.lock().expect("installment lock poisoned");
        let mut installments = schedules.get(order_id).cloned().unwrap_or_default();
        installments.sort_by_key(|i| i.number);
        Ok(installments)
    }

    async fn record_payment(
        &self,
        id: &InstallmentId,
        paid_at: Timestamp,
    ) -> Result<(), DomainError> {
        let mut schedules = self.schedules.lock().expect("installment lock poisoned");
        let installment = schedules
            .values_mut()
            .flatten()
            .find(|i| &i.id == id)
            .ok_or_else(|| {
                DomainError::new(
                    ErrorCode::InstallmentNotFound,
                    format!("Installment {} not found", id),
                )
            })?;

        installment.mark_paid(paid_at);
        Ok(())
    }

    async fn find_due_within(
        &self,
        now: Timestamp,
        days: u32,
    ) -> Result<Vec<Installment>, DomainError> {
        let horizon = now.add_days(i64::from(days));
        let schedules = self.schedules.lock().expect("installment lock poisoned");

        let mut due: Vec<Installment> = schedules
            .values()
            .flatten()
            .filter(|i| {
                i.is_pending() && !i.due_date.is_before(&now) && !i.due_date.is_after(&horizon)
            })
            .cloned()
            .collect();
        due.sort_by_key(|i| i.due_date);
        Ok(due)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::Money;
    use crate::domain::installments::{InstallmentPlanner, SchedulePolicy};
    use rust_decimal_macros::dec;

    fn schedule_for(order_id: OrderId) -> Vec<Installment> {
        let booked_at = Timestamp::now();
        InstallmentPlanner::new(SchedulePolicy::default()).build_schedule(
            order_id,
            Money::new(dec!(1200)),
            booked_at.add_days(60),
            booked_at,
        )
    }

    #[tokio::test]
    async fn saves_and_reads_back_in_tranche_order() {
        let repo = InMemoryInstallmentRepository::new();
        let order_id = OrderId::new();
        repo.save_schedule(&schedule_for(order_id)).await.unwrap();

        let found = repo.find_by_order(&order_id).await.unwrap();
        assert_eq!(found.len(), 3);
        assert_eq!(found.iter().map(|i| i.number).collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn second_schedule_for_same_order_is_rejected() {
        let repo = InMemoryInstallmentRepository::new();
        let order_id = OrderId::new();
        repo.save_schedule(&schedule_for(order_id)).await.unwrap();

        let err = repo.save_schedule(&schedule_for(order_id)).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ScheduleExists);
    }

    #[tokio::test]
    async fn record_payment_marks_the_tranche() {
        let repo = InMemoryInstallmentRepository::new();
        let order_id = OrderId::new();
        let schedule = schedule_for(order_id);
        let first_id = schedule[0].id;
        repo.save_schedule(&schedule).await.unwrap();

        let paid_at = Timestamp::now();
        repo.record_payment(&first_id, paid_at).await.unwrap();

        let found = repo.find_by_order(&order_id).await.unwrap();
        assert!(!found[0].is_pending());
        assert_eq!(found[0].paid_at, Some(paid_at));
        assert!(found[1].is_pending());
    }

    #[tokio::test]
    async fn unknown_installment_payment_fails() {
        let repo = InMemoryInstallmentRepository::new();
        let err = repo
            .record_payment(&InstallmentId::new(), Timestamp::now())
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InstallmentNotFound);
    }

    #[tokio::test]
    async fn due_within_returns_only_the_near_pending_tranches() {
        let repo = InMemoryInstallmentRepository::new();
        let order_id = OrderId::new();
        let schedule = schedule_for(order_id);
        repo.save_schedule(&schedule).await.unwrap();

        // Second tranche is due 30 days out for a 60-day event; a 35-day
        // horizon catches it but not the final tranche at day 59.
        let due = repo.find_due_within(Timestamp::now(), 35).await.unwrap();
        let numbers: Vec<u8> = due.iter().map(|i| i.number).collect();
        assert_eq!(numbers, vec![1, 2]);
    }
}
