//! PostgreSQL adapter implementations.

mod installment_repository;
mod order_store;

pub use installment_repository::PostgresInstallmentRepository;
pub use order_store::PostgresOrderStore;
