//! Application layer: command handlers and long-lived services.

pub mod expiration;
pub mod payment;
