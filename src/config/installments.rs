//! Installment policy configuration

use rust_decimal::Decimal;
use serde::Deserialize;

use super::error::ValidationError;
use crate::domain::foundation::Money;
use crate::domain::installments::SchedulePolicy;

/// Installment policy configuration
#[derive(Debug, Clone, Deserialize)]
pub struct InstallmentsConfig {
    /// Order totals strictly above this (EUR) qualify for split payment
    #[serde(default = "default_threshold")]
    pub threshold: Decimal,

    /// Percentage split across the three tranches
    #[serde(default = "default_percentages")]
    pub percentages: Vec<Decimal>,

    /// Days before the event the second tranche falls due
    #[serde(default = "default_second_due_days")]
    pub second_due_days_before_event: i64,

    /// Days before the event the final tranche falls due
    #[serde(default = "default_final_due_days")]
    pub final_due_days_before_event: i64,
}

impl InstallmentsConfig {
    /// Build the domain policy from this configuration.
    pub fn policy(&self) -> SchedulePolicy {
        SchedulePolicy {
            eligibility_threshold: Money::new(self.threshold),
            percentages: self.percentages.clone(),
            second_due_days_before_event: self.second_due_days_before_event,
            final_due_days_before_event: self.final_due_days_before_event,
        }
    }

    /// Validate installment configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.policy()
            .validate()
            .map_err(|e| ValidationError::InvalidInstallmentPolicy(e.to_string()))?;

        if self.threshold.is_sign_negative() {
            return Err(ValidationError::InvalidInstallmentPolicy(
                "eligibility threshold must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for InstallmentsConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            percentages: default_percentages(),
            second_due_days_before_event: default_second_due_days(),
            final_due_days_before_event: default_final_due_days(),
        }
    }
}

fn default_threshold() -> Decimal {
    Decimal::new(500, 0)
}

fn default_percentages() -> Vec<Decimal> {
    vec![
        Decimal::new(25, 0),
        Decimal::new(50, 0),
        Decimal::new(25, 0),
    ]
}

fn default_second_due_days() -> i64 {
    30
}

fn default_final_due_days() -> i64 {
    1
}
