//! Order and payment status enums.

use serde::{Deserialize, Serialize};

/// Fulfilment status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Created, awaiting confirmation or payment.
    Pending,

    /// Confirmed by the customer; deposit may still be outstanding.
    Confirmed,

    /// Terminal: cancelled by expiration, the customer, or an admin.
    Cancelled,

    /// Terminal: rental completed and equipment returned.
    Completed,
}

impl OrderStatus {
    /// String form used in persistence and API responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Completed => "completed",
        }
    }

    /// True for states that accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Cancelled | OrderStatus::Completed)
    }
}

/// Payment status of an order or a single tranche.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// No settled payment yet.
    Pending,

    /// Gateway confirmed the charge.
    Paid,

    /// Gateway declined the charge.
    Failed,

    /// Payment attempt abandoned; order was cancelled.
    Cancelled,
}

impl PaymentStatus {
    /// String form used in persistence and API responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Cancelled => "cancelled",
        }
    }

    /// True once the gateway has settled the charge.
    pub fn is_paid(&self) -> bool {
        matches!(self, PaymentStatus::Paid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_states() {
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(OrderStatus::Completed.is_terminal());
        assert!(!OrderStatus::Pending.is_terminal());
        assert!(!OrderStatus::Confirmed.is_terminal());
    }

    #[test]
    fn paid_check() {
        assert!(PaymentStatus::Paid.is_paid());
        assert!(!PaymentStatus::Pending.is_paid());
        assert!(!PaymentStatus::Failed.is_paid());
    }

    #[test]
    fn string_forms_are_snake_case() {
        assert_eq!(OrderStatus::Confirmed.as_str(), "confirmed");
        assert_eq!(PaymentStatus::Cancelled.as_str(), "cancelled");
    }
}
