//! HTTP handlers for admin endpoints.
//!
//! These map 1:1 onto the expiration operations; authorization sits in
//! upstream middleware and is out of scope here.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use uuid::Uuid;

use crate::application::expiration::{
    ExpirationError, ExpirationScheduler, ExpirationService, SchedulerError,
};
use crate::domain::foundation::{ErrorCode, OrderId, Timestamp};

use super::super::ErrorResponse;
use super::dto::{ExpirationStatsResponse, ExpireOrderRequest, SweepResponse};

/// Shared state for admin endpoints.
#[derive(Clone)]
pub struct AdminAppState {
    pub expiration: Arc<ExpirationService>,
    pub scheduler: Arc<ExpirationScheduler>,
}

/// GET /api/admin/expiration/stats - Expiration dashboard aggregate
pub async fn get_expiration_stats(
    State(state): State<AdminAppState>,
) -> Result<impl IntoResponse, AdminApiError> {
    let overview = state.expiration.overview(Timestamp::now()).await?;
    let status = state.scheduler.status();

    Ok(Json(ExpirationStatsResponse::from_parts(overview, status)))
}

/// POST /api/admin/expiration/run - Trigger one sweep synchronously
pub async fn run_sweep(
    State(state): State<AdminAppState>,
) -> Result<impl IntoResponse, AdminApiError> {
    let outcome = state.scheduler.run_now().await?;
    Ok(Json(SweepResponse::from(outcome)))
}

/// POST /api/admin/orders/:order_id/expire - Manually expire one order
pub async fn expire_order(
    State(state): State<AdminAppState>,
    Path(order_id): Path<Uuid>,
    Json(request): Json<ExpireOrderRequest>,
) -> Result<impl IntoResponse, AdminApiError> {
    state
        .expiration
        .expire_order(
            &OrderId::from_uuid(order_id),
            request.reason,
            Timestamp::now(),
        )
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// API error type that converts expiration errors to HTTP responses.
pub enum AdminApiError {
    Expiration(ExpirationError),
    Scheduler(SchedulerError),
}

impl From<ExpirationError> for AdminApiError {
    fn from(err: ExpirationError) -> Self {
        Self::Expiration(err)
    }
}

impl From<SchedulerError> for AdminApiError {
    fn from(err: SchedulerError) -> Self {
        Self::Scheduler(err)
    }
}

impl From<crate::domain::foundation::DomainError> for AdminApiError {
    fn from(err: crate::domain::foundation::DomainError) -> Self {
        Self::Expiration(ExpirationError::Store(err))
    }
}

impl IntoResponse for AdminApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AdminApiError::Expiration(err) => {
                let (status, code) = match err {
                    ExpirationError::NotFound(_) => (StatusCode::NOT_FOUND, "ORDER_NOT_FOUND"),
                    ExpirationError::AlreadyCancelled(_) => {
                        (StatusCode::CONFLICT, "ORDER_ALREADY_CANCELLED")
                    }
                    ExpirationError::AlreadyPaid(_) => {
                        (StatusCode::CONFLICT, "ORDER_ALREADY_PAID")
                    }
                    // A webhook can settle the payment between the service's
                    // pre-check and the store transaction; the store guard
                    // then reports the same conflicts by error code.
                    ExpirationError::Store(inner) => match inner.code {
                        ErrorCode::OrderAlreadyPaid => {
                            (StatusCode::CONFLICT, "ORDER_ALREADY_PAID")
                        }
                        ErrorCode::OrderAlreadyCancelled => {
                            (StatusCode::CONFLICT, "ORDER_ALREADY_CANCELLED")
                        }
                        ErrorCode::OrderNotFound => (StatusCode::NOT_FOUND, "ORDER_NOT_FOUND"),
                        _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
                    },
                };
                (status, code, err.to_string())
            }
            AdminApiError::Scheduler(err) => {
                let (status, code) = match err {
                    SchedulerError::AlreadyRunning => (StatusCode::CONFLICT, "SWEEP_IN_PROGRESS"),
                    SchedulerError::Sweep(_) => {
                        (StatusCode::INTERNAL_SERVER_ERROR, "SWEEP_FAILED")
                    }
                };
                (status, code, err.to_string())
            }
        };

        let body = ErrorResponse::new(code, message);
        (status, Json(body)).into_response()
    }
}
