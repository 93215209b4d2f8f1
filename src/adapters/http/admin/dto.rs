//! Request/response DTOs for admin endpoints.

use serde::{Deserialize, Serialize};

use crate::application::expiration::{ExpirationOverview, SweepOutcome};

/// Response for `GET /api/admin/expiration/stats`.
#[derive(Debug, Clone, Serialize)]
pub struct ExpirationStatsResponse {
    pub expiration_minutes: u64,
    pub sweep_interval_minutes: u64,
    pub scheduler_active: bool,
    pub sweep_running: bool,
    pub current_pending_orders: u64,
    pub expiring_soon: u64,
    pub expired_today: u64,
}

impl ExpirationStatsResponse {
    pub fn from_parts(
        overview: ExpirationOverview,
        status: crate::application::expiration::SchedulerStatus,
    ) -> Self {
        Self {
            expiration_minutes: overview.window_minutes,
            sweep_interval_minutes: status.interval_minutes,
            scheduler_active: status.active,
            sweep_running: status.running,
            current_pending_orders: overview.pending,
            expiring_soon: overview.expiring_soon,
            expired_today: overview.expired_today,
        }
    }
}

/// Response for `POST /api/admin/expiration/run`.
#[derive(Debug, Clone, Serialize)]
pub struct SweepResponse {
    pub total: usize,
    pub expired: Vec<String>,
    pub errors: Vec<SweepErrorEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SweepErrorEntry {
    pub order_id: String,
    pub error: String,
}

impl From<SweepOutcome> for SweepResponse {
    fn from(outcome: SweepOutcome) -> Self {
        Self {
            total: outcome.total,
            expired: outcome.expired.iter().map(ToString::to_string).collect(),
            errors: outcome
                .failures
                .into_iter()
                .map(|f| SweepErrorEntry {
                    order_id: f.order_id.to_string(),
                    error: f.error,
                })
                .collect(),
        }
    }
}

/// Request body for `POST /api/admin/orders/:id/expire`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExpireOrderRequest {
    pub reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::OrderId;

    #[test]
    fn sweep_response_flattens_the_outcome() {
        let id = OrderId::new();
        let outcome = SweepOutcome {
            total: 2,
            expired: vec![id],
            failures: vec![crate::application::expiration::SweepFailure {
                order_id: OrderId::new(),
                error: "stock row locked".to_string(),
            }],
        };

        let response = SweepResponse::from(outcome);
        assert_eq!(response.total, 2);
        assert_eq!(response.expired, vec![id.to_string()]);
        assert_eq!(response.errors.len(), 1);
    }
}
