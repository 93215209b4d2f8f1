//! Payment commands: building gateway forms and processing callbacks.

mod create_payment_form;
mod process_notification;

pub use create_payment_form::{
    CreatePaymentFormCommand, CreatePaymentFormHandler, PaymentFormError,
};
pub use process_notification::{
    NotificationOutcome, ProcessNotificationCommand, ProcessNotificationError,
    ProcessNotificationHandler,
};
