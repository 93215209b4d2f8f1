//! Ports: async trait contracts between the application core and adapters.

mod installment_repository;
mod notification_dispatcher;
mod order_store;

pub use installment_repository::InstallmentRepository;
pub use notification_dispatcher::{
    ExpirationNotice, NoticeLine, NotificationDispatcher, NotificationError, PaymentReceipt,
};
pub use order_store::{ExpirationStats, OrderLifecycleStore, StatsQuery};
