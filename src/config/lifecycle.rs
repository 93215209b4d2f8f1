//! Order lifecycle configuration: expiration window and sweep cadence

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Order lifecycle configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LifecycleConfig {
    /// Minutes a pending unpaid order keeps its reservation before automatic
    /// cancellation
    #[serde(default = "default_expiration_minutes")]
    pub expiration_minutes: u64,

    /// Minutes between expiration sweeps
    #[serde(default = "default_sweep_interval_minutes")]
    pub sweep_interval_minutes: u64,

    /// Run one sweep shortly after startup
    #[serde(default)]
    pub run_on_start: bool,
}

impl LifecycleConfig {
    /// Get the expiration window as Duration
    pub fn expiration_window(&self) -> Duration {
        Duration::from_secs(self.expiration_minutes * 60)
    }

    /// Get the sweep interval as Duration
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_minutes * 60)
    }

    /// Validate lifecycle configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.expiration_minutes == 0 {
            return Err(ValidationError::InvalidExpirationWindow(
                "expiration window must be at least one minute",
            ));
        }
        if self.sweep_interval_minutes == 0 {
            return Err(ValidationError::InvalidSweepInterval(
                "sweep interval must be at least one minute",
            ));
        }
        if self.sweep_interval_minutes > self.expiration_minutes {
            return Err(ValidationError::InvalidSweepInterval(
                "sweeping less often than the expiration window leaves orders stuck",
            ));
        }
        Ok(())
    }
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            expiration_minutes: default_expiration_minutes(),
            sweep_interval_minutes: default_sweep_interval_minutes(),
            run_on_start: false,
        }
    }
}

fn default_expiration_minutes() -> u64 {
    30
}

fn default_sweep_interval_minutes() -> u64 {
    5
}
