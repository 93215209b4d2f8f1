//! PostgreSQL implementation of InstallmentRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{
    DomainError, ErrorCode, InstallmentId, Money, OrderId, Timestamp,
};
use crate::domain::installments::{Installment, InstallmentStatus};
use crate::ports::InstallmentRepository;

/// PostgreSQL implementation of the InstallmentRepository port.
pub struct PostgresInstallmentRepository {
    pool: PgPool,
}

impl PostgresInstallmentRepository {
    /// Creates a new PostgresInstallmentRepository with the given pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of an installment.
#[derive(Debug, sqlx::FromRow)]
struct InstallmentRow {
    id: Uuid,
    order_id: Uuid,
    installment_number: i16,
    percentage: Decimal,
    amount: Decimal,
    due_date: DateTime<Utc>,
    status: String,
    paid_at: Option<DateTime<Utc>>,
}

impl TryFrom<InstallmentRow> for Installment {
    type Error = DomainError;

    fn try_from(row: InstallmentRow) -> Result<Self, Self::Error> {
        let number = u8::try_from(row.installment_number).map_err(|_| {
            DomainError::database(format!(
                "Invalid installment number: {}",
                row.installment_number
            ))
        })?;

        Ok(Installment {
            id: InstallmentId::from_uuid(row.id),
            order_id: OrderId::from_uuid(row.order_id),
            number,
            percentage: row.percentage,
            amount: Money::new(row.amount),
            due_date: Timestamp::from_datetime(row.due_date),
            status: parse_installment_status(&row.status)?,
            paid_at: row.paid_at.map(Timestamp::from_datetime),
        })
    }
}

fn parse_installment_status(s: &str) -> Result<InstallmentStatus, DomainError> {
    match s.to_lowercase().as_str() {
        "pending" => Ok(InstallmentStatus::Pending),
        "paid" => Ok(InstallmentStatus::Paid),
        "overdue" => Ok(InstallmentStatus::Overdue),
        _ => Err(DomainError::database(format!(
            "Invalid installment status value: {}",
            s
        ))),
    }
}

#[async_trait]
impl InstallmentRepository for PostgresInstallmentRepository {
    async fn save_schedule(&self, installments: &[Installment]) -> Result<(), DomainError> {
        let Some(first) = installments.first() else {
            return Ok(());
        };

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::database(format!("Failed to begin transaction: {}", e)))?;

        let existing: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM payment_installments WHERE order_id = $1",
        )
        .bind(first.order_id.as_uuid())
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| DomainError::database(format!("Failed to check schedule: {}", e)))?;

        if existing > 0 {
            return Err(DomainError::new(
                ErrorCode::ScheduleExists,
                format!("Order {} already has an installment schedule", first.order_id),
            ));
        }

        for installment in installments {
            sqlx::query(
                r#"
                INSERT INTO payment_installments (
                    id, order_id, installment_number, percentage, amount,
                    due_date, status, paid_at
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(installment.id.as_uuid())
            .bind(installment.order_id.as_uuid())
            .bind(i16::from(installment.number))
            .bind(installment.percentage)
            .bind(installment.amount.as_decimal())
            .bind(installment.due_date.as_datetime())
            .bind(installment.status.as_str())
            .bind(installment.paid_at.map(|t| *t.as_datetime()))
            .execute(&mut *tx)
            .await
            .map_err(|e| DomainError::database(format!("Failed to save installment: {}", e)))?;
        }

        tx.commit()
            .await
            .map_err(|e| DomainError::database(format!("Failed to commit schedule: {}", e)))
    }

    async fn find_by_order(&self, order_id: &OrderId) -> Result<Vec<Installment>, DomainError> {
        let rows: Vec<InstallmentRow> = sqlx::query_as(
            r#"
            SELECT id, order_id, installment_number, percentage, amount,
                   due_date, status, paid_at
            FROM payment_installments
            WHERE order_id = $1
            ORDER BY installment_number ASC
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to find installments: {}", e)))?;

        rows.into_iter().map(Installment::try_from).collect()
    }

    async fn record_payment(
        &self,
        id: &InstallmentId,
        paid_at: Timestamp,
    ) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE payment_installments SET
                status = 'paid',
                paid_at = $2
            WHERE id = $1
              AND status <> 'paid'
            "#,
        )
        .bind(id.as_uuid())
        .bind(paid_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to record payment: {}", e)))?;

        if result.rows_affected() == 0 {
            let exists: bool = sqlx::query_scalar(
                "SELECT EXISTS (SELECT 1 FROM payment_installments WHERE id = $1)",
            )
            .bind(id.as_uuid())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DomainError::database(format!("Failed to check installment: {}", e)))?;

            if !exists {
                return Err(DomainError::new(
                    ErrorCode::InstallmentNotFound,
                    format!("Installment {} not found", id),
                ));
            }
            // Already paid; recording again is a no-op.
        }

        Ok(())
    }

    async fn find_due_within(
        &self,
        now: Timestamp,
        days: u32,
    ) -> Result<Vec<Installment>, DomainError> {
        let horizon = now.add_days(i64::from(days));

        let rows: Vec<InstallmentRow> = sqlx::query_as(
            r#"
            SELECT id, order_id, installment_number, percentage, amount,
                   due_date, status, paid_at
            FROM payment_installments
            WHERE status = 'pending'
              AND due_date >= $1
              AND due_date <= $2
            ORDER BY due_date ASC
            "#,
        )
        .bind(now.as_datetime())
        .bind(horizon.as_datetime())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to find due installments: {}", e)))?;

        rows.into_iter().map(Installment::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_installment_status_works_for_all_values() {
        assert_eq!(
            parse_installment_status("pending").unwrap(),
            InstallmentStatus::Pending
        );
        assert_eq!(parse_installment_status("paid").unwrap(), InstallmentStatus::Paid);
        assert_eq!(
            parse_installment_status("overdue").unwrap(),
            InstallmentStatus::Overdue
        );
    }

    #[test]
    fn parse_installment_status_rejects_invalid_values() {
        assert!(parse_installment_status("refunded").is_err());
        assert!(parse_installment_status("").is_err());
    }

    #[test]
    fn roundtrip_status_conversion() {
        for status in [
            InstallmentStatus::Pending,
            InstallmentStatus::Paid,
            InstallmentStatus::Overdue,
        ] {
            assert_eq!(parse_installment_status(status.as_str()).unwrap(), status);
        }
    }
}
