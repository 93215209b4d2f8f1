//! Shared value objects and error types for the domain layer.

mod errors;
mod ids;
mod money;
mod timestamp;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{InstallmentId, OrderId, ProductId};
pub use money::Money;
pub use timestamp::Timestamp;
