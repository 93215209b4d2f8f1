//! Email notification adapter.

mod resend;

pub use resend::ResendDispatcher;
