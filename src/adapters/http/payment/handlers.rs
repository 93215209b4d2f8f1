//! HTTP handlers for payment endpoints.
//!
//! The webhook handler's response contract is fixed by the gateway: HTTP 200
//! with body `"OK"` acknowledges the notification, including notifications
//! reporting a declined payment, as long as they parsed and were recorded.
//! Anything else makes the gateway redeliver, so only verification failures
//! and internal errors return non-OK statuses.

use std::sync::Arc;

use axum::extract::{Form, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use uuid::Uuid;

use crate::application::payment::{
    CreatePaymentFormCommand, CreatePaymentFormHandler, NotificationOutcome,
    PaymentFormError, ProcessNotificationCommand, ProcessNotificationError,
    ProcessNotificationHandler,
};
use crate::domain::foundation::OrderId;
use crate::domain::gateway::{NotificationPayload, RedsysGateway};
use crate::domain::installments::InstallmentPlanner;
use crate::ports::{InstallmentRepository, NotificationDispatcher, OrderLifecycleStore};

use super::super::ErrorResponse;
use super::dto::PaymentFormResponse;

/// Shared state for payment endpoints.
#[derive(Clone)]
pub struct PaymentAppState {
    pub store: Arc<dyn OrderLifecycleStore>,
    pub installments: Arc<dyn InstallmentRepository>,
    pub notifier: Arc<dyn NotificationDispatcher>,
    pub gateway: Arc<RedsysGateway>,
    pub planner: InstallmentPlanner,
}

impl PaymentAppState {
    /// Create handlers on demand from the shared state.
    pub fn payment_form_handler(&self) -> CreatePaymentFormHandler {
        CreatePaymentFormHandler::new(self.store.clone(), self.gateway.clone())
    }

    pub fn notification_handler(&self) -> ProcessNotificationHandler {
        ProcessNotificationHandler::new(
            self.gateway.clone(),
            self.store.clone(),
            self.installments.clone(),
            self.planner.clone(),
            self.notifier.clone(),
        )
    }
}

/// POST /api/payments/orders/:order_id/form - Build the signed gateway form
pub async fn create_payment_form(
    State(state): State<PaymentAppState>,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, PaymentApiError> {
    let handler = state.payment_form_handler();
    let cmd = CreatePaymentFormCommand {
        order_id: OrderId::from_uuid(order_id),
    };

    let signed = handler.handle(cmd).await?;

    Ok(Json(PaymentFormResponse::from(signed)))
}

/// POST /api/payments/notification - Gateway payment notification webhook
pub async fn handle_notification(
    State(state): State<PaymentAppState>,
    Form(payload): Form<NotificationPayload>,
) -> Response {
    let handler = state.notification_handler();
    let cmd = ProcessNotificationCommand { payload };

    match handler.handle(cmd).await {
        Ok(NotificationOutcome::PaymentConfirmed { order_number, .. }) => {
            tracing::info!(%order_number, "Payment notification processed: confirmed");
            (StatusCode::OK, "OK").into_response()
        }
        // A correctly-parsed decline is still an acknowledged notification.
        Ok(NotificationOutcome::PaymentDeclined { order_number, reason, .. }) => {
            tracing::info!(%order_number, reason, "Payment notification processed: declined");
            (StatusCode::OK, "OK").into_response()
        }
        Err(ProcessNotificationError::Verification(error)) => {
            tracing::error!(%error, "Rejected gateway notification");
            (StatusCode::BAD_REQUEST, "Notification verification failed").into_response()
        }
        Err(ProcessNotificationError::OrderNotFound(reference)) => {
            tracing::error!(%reference, "Gateway notification for unknown order");
            (StatusCode::NOT_FOUND, "Order not found").into_response()
        }
        Err(ProcessNotificationError::Store(error)) => {
            tracing::error!(%error, "Failed to process gateway notification");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
        }
    }
}

/// API error type that converts payment errors to HTTP responses.
pub struct PaymentApiError(PaymentFormError);

impl From<PaymentFormError> for PaymentApiError {
    fn from(err: PaymentFormError) -> Self {
        Self(err)
    }
}

impl IntoResponse for PaymentApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self.0 {
            PaymentFormError::OrderNotFound(_) => (StatusCode::NOT_FOUND, "ORDER_NOT_FOUND"),
            PaymentFormError::Gateway(_) => (StatusCode::BAD_REQUEST, "GATEWAY_REQUEST_INVALID"),
            PaymentFormError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let body = ErrorResponse::new(code, self.0.to_string());
        (status, Json(body)).into_response()
    }
}
