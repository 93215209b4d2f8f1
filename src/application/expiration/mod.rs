//! Automatic expiration of stale unpaid orders.

mod scheduler;
mod service;

pub use scheduler::{ExpirationScheduler, SchedulerError, SchedulerStatus};
pub use service::{
    ExpirationError, ExpirationOverview, ExpirationService, SweepFailure, SweepOutcome,
};
