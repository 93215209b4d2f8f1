//! Guard errors for order lifecycle transitions.

use thiserror::Error;

use crate::domain::foundation::OrderId;

/// Errors raised by order state transitions.
///
/// Guard conditions are expected control flow for callers (duplicate gateway
/// notifications, admin actions against already-settled orders), so they are
/// typed variants rather than panics or generic failures.
#[derive(Debug, Clone, Error)]
pub enum OrderError {
    /// The order is already in the terminal cancelled state.
    #[error("Order {0} is already cancelled")]
    AlreadyCancelled(OrderId),

    /// The order has a settled payment and must never be cancelled by the
    /// expiration path.
    #[error("Order {0} has been paid and cannot be expired")]
    AlreadyPaid(OrderId),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_order() {
        let id = OrderId::new();
        let err = OrderError::AlreadyPaid(id);
        assert!(err.to_string().contains(&id.to_string()));
    }
}
