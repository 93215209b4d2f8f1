//! PostgreSQL implementation of OrderLifecycleStore.
//!
//! Every mutation runs in one transaction. The lifecycle guards are repeated
//! in the SQL (`payment_status <> 'paid' AND cancelled_at IS NULL`) so a
//! webhook settling the payment between fetch and cancel loses nothing: the
//! guarded UPDATE simply matches zero rows and the whole transaction is
//! abandoned.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{
    DomainError, ErrorCode, Money, OrderId, ProductId, Timestamp,
};
use crate::domain::order::{Order, OrderItem, OrderStatus, PaymentStatus};
use crate::ports::{ExpirationStats, OrderLifecycleStore, StatsQuery};

/// PostgreSQL implementation of the OrderLifecycleStore port.
///
/// Uses sqlx for type-safe database operations with connection pooling.
pub struct PostgresOrderStore {
    pool: PgPool,
}

impl PostgresOrderStore {
    /// Creates a new PostgresOrderStore with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_items(&self, order_id: Uuid) -> Result<Vec<OrderItem>, DomainError> {
        let rows: Vec<ItemRow> = sqlx::query_as(
            r#"
            SELECT product_id, name, quantity, unit_price
            FROM order_items
            WHERE order_id = $1
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to load order items: {}", e)))?;

        rows.into_iter().map(OrderItem::try_from).collect()
    }

    async fn hydrate(&self, row: OrderRow) -> Result<Order, DomainError> {
        let items = self.load_items(row.id).await?;
        let mut order = Order::try_from(row)?;
        order.items = items;
        Ok(order)
    }
}

/// Database row representation of an order.
#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    order_number: String,
    customer_email: String,
    status: String,
    payment_status: String,
    upfront_payment_status: String,
    total: Decimal,
    transport_cost: Decimal,
    event_date: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    paid_at: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
    cancel_reason: Option<String>,
    authorization_code: Option<String>,
}

/// Database row representation of an order item.
#[derive(Debug, sqlx::FromRow)]
struct ItemRow {
    product_id: Uuid,
    name: String,
    quantity: i32,
    unit_price: Decimal,
}

const ORDER_COLUMNS: &str = "id, order_number, customer_email, status, payment_status, \
     upfront_payment_status, total, transport_cost, event_date, created_at, paid_at, \
     cancelled_at, cancel_reason, authorization_code";

impl TryFrom<OrderRow> for Order {
    type Error = DomainError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        Ok(Order {
            id: OrderId::from_uuid(row.id),
            order_number: row.order_number,
            customer_email: row.customer_email,
            status: parse_order_status(&row.status)?,
            payment_status: parse_payment_status(&row.payment_status)?,
            upfront_payment_status: parse_payment_status(&row.upfront_payment_status)?,
            total: Money::new(row.total),
            transport_cost: Money::new(row.transport_cost),
            event_date: row.event_date.map(Timestamp::from_datetime),
            created_at: Timestamp::from_datetime(row.created_at),
            paid_at: row.paid_at.map(Timestamp::from_datetime),
            cancelled_at: row.cancelled_at.map(Timestamp::from_datetime),
            cancel_reason: row.cancel_reason,
            authorization_code: row.authorization_code,
            items: Vec::new(),
        })
    }
}

impl TryFrom<ItemRow> for OrderItem {
    type Error = DomainError;

    fn try_from(row: ItemRow) -> Result<Self, Self::Error> {
        let quantity = u32::try_from(row.quantity).map_err(|_| {
            DomainError::database(format!("Invalid item quantity: {}", row.quantity))
        })?;

        Ok(OrderItem {
            product_id: ProductId::from_uuid(row.product_id),
            name: row.name,
            quantity,
            unit_price: Money::new(row.unit_price),
        })
    }
}

fn parse_order_status(s: &str) -> Result<OrderStatus, DomainError> {
    match s.to_lowercase().as_str() {
        "pending" => Ok(OrderStatus::Pending),
        "confirmed" => Ok(OrderStatus::Confirmed),
        "cancelled" => Ok(OrderStatus::Cancelled),
        "completed" => Ok(OrderStatus::Completed),
        _ => Err(DomainError::database(format!("Invalid order status value: {}", s))),
    }
}

fn parse_payment_status(s: &str) -> Result<PaymentStatus, DomainError> {
    match s.to_lowercase().as_str() {
        "pending" => Ok(PaymentStatus::Pending),
        "paid" => Ok(PaymentStatus::Paid),
        "failed" => Ok(PaymentStatus::Failed),
        "cancelled" => Ok(PaymentStatus::Cancelled),
        _ => Err(DomainError::database(format!("Invalid payment status value: {}", s))),
    }
}

#[async_trait]
impl OrderLifecycleStore for PostgresOrderStore {
    async fn find_by_id(&self, id: &OrderId) -> Result<Option<Order>, DomainError> {
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            "SELECT {} FROM orders WHERE id = $1",
            ORDER_COLUMNS
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to find order: {}", e)))?;

        match row {
            Some(row) => Ok(Some(self.hydrate(row).await?)),
            None => Ok(None),
        }
    }

    async fn find_by_gateway_reference(
        &self,
        reference: &str,
    ) -> Result<Option<Order>, DomainError> {
        // Canonicalize the stored order number the same way the gateway
        // reference was produced: digits only, last twelve, zero-padded.
        let row: Option<OrderRow> = sqlx::query_as(&format!(
            r#"
            SELECT {}
            FROM orders
            WHERE lpad(right(regexp_replace(order_number, '[^0-9]', '', 'g'), 12), 12, '0') = $1
            "#,
            ORDER_COLUMNS
        ))
        .bind(reference)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            DomainError::database(format!("Failed to find order by gateway reference: {}", e))
        })?;

        match row {
            Some(row) => Ok(Some(self.hydrate(row).await?)),
            None => Ok(None),
        }
    }

    async fn find_expirable(&self, cutoff: Timestamp) -> Result<Vec<Order>, DomainError> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            r#"
            SELECT {}
            FROM orders
            WHERE ((status = 'pending' AND payment_status = 'pending')
                OR (status = 'confirmed' AND payment_status = 'pending'
                    AND upfront_payment_status = 'pending'))
              AND created_at < $1
              AND cancelled_at IS NULL
            ORDER BY created_at ASC
            "#,
            ORDER_COLUMNS
        ))
        .bind(cutoff.as_datetime())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to find expirable orders: {}", e)))?;

        let mut orders = Vec::with_capacity(rows.len());
        for row in rows {
            orders.push(self.hydrate(row).await?);
        }
        Ok(orders)
    }

    async fn cancel_and_release_stock(
        &self,
        order: &Order,
        now: Timestamp,
        reason: &str,
    ) -> Result<(), DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::database(format!("Failed to begin transaction: {}", e)))?;

        // 1. Terminal transition, guarded against races with the webhook
        //    path: paid wins over expiration.
        let result = sqlx::query(
            r#"
            UPDATE orders SET
                status = 'cancelled',
                payment_status = 'cancelled',
                cancelled_at = $2,
                cancel_reason = $3,
                updated_at = $2
            WHERE id = $1
              AND payment_status <> 'paid'
              AND cancelled_at IS NULL
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(now.as_datetime())
        .bind(reason)
        .execute(&mut *tx)
        .await
        .map_err(|e| DomainError::database(format!("Failed to cancel order: {}", e)))?;

        if result.rows_affected() == 0 {
            // Nothing was applied; report why the guard rejected it.
            return Err(self.diagnose_guard_failure(order.id).await);
        }

        // 2. Return reserved stock to availability, item by item.
        for item in &order.items {
            sqlx::query(
                r#"
                UPDATE products SET
                    stock = stock + $2,
                    updated_at = $3
                WHERE id = $1
                "#,
            )
            .bind(item.product_id.as_uuid())
            .bind(item.quantity as i32)
            .bind(now.as_datetime())
            .execute(&mut *tx)
            .await
            .map_err(|e| DomainError::database(format!("Failed to release stock: {}", e)))?;

            tracing::info!(
                product_id = %item.product_id,
                quantity = item.quantity,
                "Released reserved stock"
            );
        }

        // 3. Internal audit note.
        sqlx::query(
            r#"
            INSERT INTO order_notes (id, order_id, content, is_internal)
            VALUES ($1, $2, $3, true)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(order.id.as_uuid())
        .bind(format!("{} Stock released.", reason))
        .execute(&mut *tx)
        .await
        .map_err(|e| DomainError::database(format!("Failed to write audit note: {}", e)))?;

        tx.commit()
            .await
            .map_err(|e| DomainError::database(format!("Failed to commit cancellation: {}", e)))
    }

    async fn mark_paid(
        &self,
        order: &Order,
        now: Timestamp,
        authorization_code: &str,
    ) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE orders SET
                payment_status = 'paid',
                upfront_payment_status = 'paid',
                status = CASE WHEN status = 'pending' THEN 'confirmed' ELSE status END,
                paid_at = $2,
                authorization_code = $3,
                updated_at = $2
            WHERE id = $1
              AND payment_status <> 'paid'
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(now.as_datetime())
        .bind(authorization_code)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to mark order paid: {}", e)))?;

        if result.rows_affected() == 0 {
            // Duplicate gateway notification; the order is already paid.
            tracing::debug!(order_id = %order.id, "Duplicate payment notification ignored");
        }
        Ok(())
    }

    async fn mark_failed(&self, order: &Order, reason: &str) -> Result<(), DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::database(format!("Failed to begin transaction: {}", e)))?;

        // Paid wins: a decline arriving after a settlement changes nothing,
        // and stock stays reserved either way.
        let result = sqlx::query(
            r#"
            UPDATE orders SET
                payment_status = 'failed',
                updated_at = now()
            WHERE id = $1
              AND payment_status <> 'paid'
            "#,
        )
        .bind(order.id.as_uuid())
        .execute(&mut *tx)
        .await
        .map_err(|e| DomainError::database(format!("Failed to mark order failed: {}", e)))?;

        if result.rows_affected() > 0 {
            sqlx::query(
                r#"
                INSERT INTO order_notes (id, order_id, content, is_internal)
                VALUES ($1, $2, $3, true)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(order.id.as_uuid())
            .bind(format!("Payment error: {}", reason))
            .execute(&mut *tx)
            .await
            .map_err(|e| DomainError::database(format!("Failed to write audit note: {}", e)))?;
        }

        tx.commit()
            .await
            .map_err(|e| DomainError::database(format!("Failed to commit failure record: {}", e)))
    }

    async fn expiration_stats(&self, query: StatsQuery) -> Result<ExpirationStats, DomainError> {
        let window = query.window_minutes as i64;
        let soon_window = window.saturating_sub(query.soon_minutes as i64);

        let cutoff = query.now.minus_minutes(window);
        let soon_cutoff = query.now.minus_minutes(soon_window);

        let pending: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM orders
            WHERE ((status = 'pending' AND payment_status = 'pending')
                OR (status = 'confirmed' AND payment_status = 'pending'
                    AND upfront_payment_status = 'pending'))
              AND cancelled_at IS NULL
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to count pending orders: {}", e)))?;

        let expiring_soon: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM orders
            WHERE ((status = 'pending' AND payment_status = 'pending')
                OR (status = 'confirmed' AND payment_status = 'pending'
                    AND upfront_payment_status = 'pending'))
              AND cancelled_at IS NULL
              AND created_at >= $1
              AND created_at < $2
            "#,
        )
        .bind(cutoff.as_datetime())
        .bind(soon_cutoff.as_datetime())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            DomainError::database(format!("Failed to count expiring orders: {}", e))
        })?;

        let expired_today: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM orders
            WHERE status = 'cancelled'
              AND cancel_reason ILIKE '%expired automatically%'
              AND cancelled_at >= date_trunc('day', $1::timestamptz)
            "#,
        )
        .bind(query.now.as_datetime())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            DomainError::database(format!("Failed to count expired orders: {}", e))
        })?;

        Ok(ExpirationStats {
            pending: pending as u64,
            expiring_soon: expiring_soon as u64,
            expired_today: expired_today as u64,
        })
    }
}

impl PostgresOrderStore {
    /// Explains a guarded-UPDATE miss as a typed error.
    async fn diagnose_guard_failure(&self, order_id: OrderId) -> DomainError {
        let row: Result<Option<(String, Option<DateTime<Utc>>)>, sqlx::Error> =
            sqlx::query_as("SELECT payment_status, cancelled_at FROM orders WHERE id = $1")
                .bind(order_id.as_uuid())
                .fetch_optional(&self.pool)
                .await;

        match row {
            Ok(None) => DomainError::new(
                ErrorCode::OrderNotFound,
                format!("Order {} not found", order_id),
            ),
            Ok(Some((payment_status, _))) if payment_status == "paid" => DomainError::new(
                ErrorCode::OrderAlreadyPaid,
                format!("Order {} has been paid and cannot be expired", order_id),
            ),
            Ok(Some((_, Some(_)))) => DomainError::new(
                ErrorCode::OrderAlreadyCancelled,
                format!("Order {} is already cancelled", order_id),
            ),
            Ok(Some(_)) => DomainError::database(format!(
                "Cancellation of order {} matched no rows for an unknown reason",
                order_id
            )),
            Err(e) => DomainError::database(format!("Failed to diagnose cancellation: {}", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_order_status_works_for_all_values() {
        assert_eq!(parse_order_status("pending").unwrap(), OrderStatus::Pending);
        assert_eq!(parse_order_status("confirmed").unwrap(), OrderStatus::Confirmed);
        assert_eq!(parse_order_status("cancelled").unwrap(), OrderStatus::Cancelled);
        assert_eq!(parse_order_status("completed").unwrap(), OrderStatus::Completed);
        assert_eq!(parse_order_status("PENDING").unwrap(), OrderStatus::Pending);
    }

    #[test]
    fn parse_order_status_rejects_invalid_values() {
        assert!(parse_order_status("invalid").is_err());
        assert!(parse_order_status("").is_err());
    }

    #[test]
    fn parse_payment_status_works_for_all_values() {
        assert_eq!(parse_payment_status("pending").unwrap(), PaymentStatus::Pending);
        assert_eq!(parse_payment_status("paid").unwrap(), PaymentStatus::Paid);
        assert_eq!(parse_payment_status("failed").unwrap(), PaymentStatus::Failed);
        assert_eq!(parse_payment_status("cancelled").unwrap(), PaymentStatus::Cancelled);
    }

    #[test]
    fn parse_payment_status_rejects_invalid_values() {
        assert!(parse_payment_status("refunded").is_err());
    }

    #[test]
    fn roundtrip_status_conversion() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Confirmed,
            OrderStatus::Cancelled,
            OrderStatus::Completed,
        ] {
            assert_eq!(parse_order_status(status.as_str()).unwrap(), status);
        }
        for status in [
            PaymentStatus::Pending,
            PaymentStatus::Paid,
            PaymentStatus::Failed,
            PaymentStatus::Cancelled,
        ] {
            assert_eq!(parse_payment_status(status.as_str()).unwrap(), status);
        }
    }

    #[test]
    fn item_row_rejects_negative_quantity() {
        let row = ItemRow {
            product_id: Uuid::new_v4(),
            name: "PA speaker".to_string(),
            quantity: -1,
            unit_price: Decimal::new(17500, 2),
        };
        assert!(OrderItem::try_from(row).is_err());
    }
}
