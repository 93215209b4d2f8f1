//! Installment eligibility and schedule construction.

use rust_decimal::Decimal;

use crate::domain::foundation::{InstallmentId, Money, OrderId, Timestamp, ValidationError};

use super::installment::{Installment, InstallmentStatus};

/// Business policy for split payments.
///
/// The percentage split and the due-date offsets are business rules that
/// change without code changes, so they arrive from configuration. The
/// defaults mirror the storefront's standing policy: 25/50/25, second tranche
/// a month before the event, final tranche the day before.
#[derive(Debug, Clone)]
pub struct SchedulePolicy {
    /// Order totals strictly above this qualify for split payment.
    pub eligibility_threshold: Money,
    /// Share of the total per tranche; must sum to 100.
    pub percentages: Vec<Decimal>,
    /// Days before the event the second tranche falls due.
    pub second_due_days_before_event: i64,
    /// Days before the event the final tranche falls due.
    pub final_due_days_before_event: i64,
}

impl SchedulePolicy {
    /// Validates internal consistency of the policy.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` when the split has the wrong shape: not
    /// exactly three tranches, percentages not summing to 100, or due-date
    /// offsets out of order.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.percentages.len() != 3 {
            return Err(ValidationError::invalid_format(
                "installments.percentages",
                format!("expected exactly 3 tranches, got {}", self.percentages.len()),
            ));
        }

        let sum: Decimal = self.percentages.iter().sum();
        if sum != Decimal::new(100, 0) {
            return Err(ValidationError::invalid_format(
                "installments.percentages",
                format!("tranche percentages must sum to 100, got {}", sum),
            ));
        }

        if self.percentages.iter().any(|p| p.is_sign_negative() || p.is_zero()) {
            return Err(ValidationError::invalid_format(
                "installments.percentages",
                "every tranche percentage must be positive",
            ));
        }

        if self.second_due_days_before_event < self.final_due_days_before_event {
            return Err(ValidationError::invalid_format(
                "installments.due_offsets",
                "second tranche must fall due before the final tranche",
            ));
        }

        Ok(())
    }
}

impl Default for SchedulePolicy {
    fn default() -> Self {
        Self {
            eligibility_threshold: Money::from_cents(50_000),
            percentages: vec![
                Decimal::new(25, 0),
                Decimal::new(50, 0),
                Decimal::new(25, 0),
            ],
            second_due_days_before_event: 30,
            final_due_days_before_event: 1,
        }
    }
}

/// Decides split-payment eligibility and materializes schedules.
#[derive(Debug, Clone)]
pub struct InstallmentPlanner {
    policy: SchedulePolicy,
}

impl InstallmentPlanner {
    pub fn new(policy: SchedulePolicy) -> Self {
        Self { policy }
    }

    /// True iff the order total qualifies for split payment.
    ///
    /// Evaluated once, at confirmation time. The schedule is immutable once
    /// generated: later total adjustments never re-trigger eligibility.
    pub fn is_eligible(&self, total: Money) -> bool {
        total > self.policy.eligibility_threshold
    }

    /// Produces the three-tranche schedule for an order.
    ///
    /// Amounts follow the policy percentages with the rounding remainder
    /// absorbed by the final tranche, so the amounts always sum exactly to
    /// `total`. The first tranche falls due at booking; the remaining due
    /// dates sit at the policy offsets before `event_date`, clamped to the
    /// booking time for short-notice bookings. Due dates are non-decreasing
    /// and never after the event.
    pub fn build_schedule(
        &self,
        order_id: OrderId,
        total: Money,
        event_date: Timestamp,
        booked_at: Timestamp,
    ) -> Vec<Installment> {
        let first = total.percentage(self.policy.percentages[0]);
        let second = total.percentage(self.policy.percentages[1]);
        let last = total - first - second;

        let second_due = clamp_due(
            event_date.minus_days(self.policy.second_due_days_before_event),
            booked_at,
            event_date,
        );
        let final_due = clamp_due(
            event_date.minus_days(self.policy.final_due_days_before_event),
            second_due,
            event_date,
        );

        let tranches = [
            (first, self.policy.percentages[0], booked_at),
            (second, self.policy.percentages[1], second_due),
            (last, self.policy.percentages[2], final_due),
        ];

        tranches
            .into_iter()
            .enumerate()
            .map(|(i, (amount, percentage, due_date))| Installment {
                id: InstallmentId::new(),
                order_id,
                number: (i + 1) as u8,
                percentage,
                amount,
                due_date,
                status: InstallmentStatus::Pending,
                paid_at: None,
            })
            .collect()
    }
}

/// Clamps a computed due date into `[not_before, event_date]`.
fn clamp_due(due: Timestamp, not_before: Timestamp, event_date: Timestamp) -> Timestamp {
    let floored = if due.is_before(&not_before) { not_before } else { due };
    if floored.is_after(&event_date) {
        event_date
    } else {
        floored
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn planner() -> InstallmentPlanner {
        InstallmentPlanner::new(SchedulePolicy::default())
    }

    // ══════════════════════════════════════════════════════════════
    // Eligibility Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn exactly_500_is_not_eligible() {
        assert!(!planner().is_eligible(Money::new(dec!(500))));
    }

    #[test]
    fn just_above_500_is_eligible() {
        assert!(planner().is_eligible(Money::new(dec!(500.01))));
    }

    #[test]
    fn small_totals_are_not_eligible() {
        assert!(!planner().is_eligible(Money::new(dec!(120))));
        assert!(!planner().is_eligible(Money::ZERO));
    }

    // ══════════════════════════════════════════════════════════════
    // Schedule Construction Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn sixty_day_booking_splits_1200_into_300_600_300() {
        let booked_at = Timestamp::now();
        let event_date = booked_at.add_days(60);

        let schedule =
            planner().build_schedule(OrderId::new(), Money::new(dec!(1200)), event_date, booked_at);

        assert_eq!(schedule.len(), 3);
        assert_eq!(schedule[0].amount.as_decimal(), dec!(300.00));
        assert_eq!(schedule[1].amount.as_decimal(), dec!(600.00));
        assert_eq!(schedule[2].amount.as_decimal(), dec!(300.00));

        // Due dates strictly increase and never pass the event date.
        assert!(schedule[0].due_date.is_before(&schedule[1].due_date));
        assert!(schedule[1].due_date.is_before(&schedule[2].due_date));
        assert!(!schedule[2].due_date.is_after(&event_date));

        assert_eq!(schedule[0].due_date, booked_at);
        assert_eq!(schedule[1].due_date, event_date.minus_days(30));
        assert_eq!(schedule[2].due_date, event_date.minus_days(1));
    }

    #[test]
    fn rounding_remainder_lands_in_the_final_tranche() {
        let booked_at = Timestamp::now();
        let schedule = planner().build_schedule(
            OrderId::new(),
            Money::new(dec!(100.01)),
            booked_at.add_days(90),
            booked_at,
        );

        assert_eq!(schedule[0].amount.as_decimal(), dec!(25.00));
        assert_eq!(schedule[1].amount.as_decimal(), dec!(50.01));
        assert_eq!(schedule[2].amount.as_decimal(), dec!(25.00));

        let sum = schedule[0].amount + schedule[1].amount + schedule[2].amount;
        assert_eq!(sum.as_decimal(), dec!(100.01));
    }

    #[test]
    fn short_notice_booking_clamps_all_tranches_to_booking_time() {
        let booked_at = Timestamp::now();
        let event_date = booked_at.add_days(2);

        let schedule =
            planner().build_schedule(OrderId::new(), Money::new(dec!(800)), event_date, booked_at);

        // Second tranche would fall 30 days before a 2-day-out event; it is
        // due at booking instead.
        assert_eq!(schedule[0].due_date, booked_at);
        assert_eq!(schedule[1].due_date, booked_at);
        // Final tranche still fits the day before the event.
        assert_eq!(schedule[2].due_date, event_date.minus_days(1));
    }

    #[test]
    fn same_day_event_makes_everything_due_at_booking() {
        let booked_at = Timestamp::now();
        let schedule =
            planner().build_schedule(OrderId::new(), Money::new(dec!(800)), booked_at, booked_at);

        for tranche in &schedule {
            assert_eq!(tranche.due_date, booked_at);
        }
    }

    #[test]
    fn tranche_numbers_are_sequential() {
        let booked_at = Timestamp::now();
        let schedule = planner().build_schedule(
            OrderId::new(),
            Money::new(dec!(900)),
            booked_at.add_days(45),
            booked_at,
        );

        let numbers: Vec<u8> = schedule.iter().map(|i| i.number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    // ══════════════════════════════════════════════════════════════
    // Policy Validation Tests
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn default_policy_is_valid() {
        assert!(SchedulePolicy::default().validate().is_ok());
    }

    #[test]
    fn percentages_must_sum_to_100() {
        let policy = SchedulePolicy {
            percentages: vec![dec!(30), dec!(30), dec!(30)],
            ..SchedulePolicy::default()
        };
        assert!(policy.validate().is_err());
    }

    #[test]
    fn exactly_three_tranches_required() {
        let policy = SchedulePolicy {
            percentages: vec![dec!(50), dec!(50)],
            ..SchedulePolicy::default()
        };
        assert!(policy.validate().is_err());
    }

    #[test]
    fn due_offsets_must_be_ordered() {
        let policy = SchedulePolicy {
            second_due_days_before_event: 1,
            final_due_days_before_event: 30,
            ..SchedulePolicy::default()
        };
        assert!(policy.validate().is_err());
    }

    proptest! {
        /// Reconciliation law: for any total, the three tranche amounts sum
        /// exactly to the order total.
        #[test]
        fn schedule_always_reconciles_to_the_total(cents in 1i64..10_000_000) {
            let total = Money::from_cents(cents);
            let booked_at = Timestamp::now();
            let schedule = planner().build_schedule(
                OrderId::new(),
                total,
                booked_at.add_days(60),
                booked_at,
            );

            let sum = schedule
                .iter()
                .fold(Money::ZERO, |acc, tranche| acc + tranche.amount);
            prop_assert_eq!(sum, total);

            // Due dates never decrease.
            prop_assert!(!schedule[1].due_date.is_before(&schedule[0].due_date));
            prop_assert!(!schedule[2].due_date.is_before(&schedule[1].due_date));
        }
    }
}
