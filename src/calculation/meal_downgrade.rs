//! Meal downgrade substitution.
//!
//! A large warm meal that the approval does not cover may be billed as a
//! small meal as long as the small-meal ceiling has room for all of it
//! together with the small meals actually delivered. If it does not fit, the
//! uncovered large meals stay private and the small meals keep their baseline
//! split.

use rust_decimal::Decimal;

use crate::config::MealDowngradeRule;
use crate::models::AuditStep;

use super::split::{QuantitySplit, SplitTable, SubstitutionOutcome};

/// Rule identifier recorded in the audit trail and diagnostics.
pub const MEAL_DOWNGRADE_RULE_ID: &str = "meal_downgrade";

/// Applies the meal downgrade to the current splits.
///
/// Returns `None` when neither meal code was delivered.
///
/// # Example
///
/// ```
/// use care_billing::calculation::{aggregate_delivery, apply_meal_downgrade, baseline_split, normalize_quotas, STANDARD_WEEKLY_FACTOR};
/// use care_billing::config::SubstitutionRules;
/// use care_billing::models::{Approval, ApprovalLine, Delivery, DeliveryLine, ServiceCode};
/// use rust_decimal::Decimal;
///
/// let lk14 = ServiceCode::parse("LK14").unwrap();
/// let lk15 = ServiceCode::parse("LK15").unwrap();
/// let approval = Approval::new(vec![ApprovalLine::monthly(lk15.clone(), Decimal::from(20))]);
/// let delivery = Delivery::new(vec![
///     DeliveryLine::new(lk14.clone(), Decimal::from(5)),
///     DeliveryLine::new(lk15.clone(), Decimal::from(10)),
/// ]);
///
/// let ceilings = normalize_quotas(&approval, STANDARD_WEEKLY_FACTOR, 1).ceilings;
/// let table = baseline_split(&ceilings, &aggregate_delivery(&delivery));
/// let rule = SubstitutionRules::default().meal_downgrade.unwrap();
///
/// let outcome = apply_meal_downgrade(&table, &rule, 2).unwrap();
/// assert_eq!(outcome.overrides[1].1.insurer, Decimal::from(15));
/// ```
pub fn apply_meal_downgrade(
    table: &SplitTable,
    rule: &MealDowngradeRule,
    step_number: u32,
) -> Option<SubstitutionOutcome> {
    let large = &rule.large_meal;
    let small = &rule.small_meal;

    let delivered_large = table.delivered(large);
    let delivered_small = table.delivered(small);
    if delivered_large.is_zero() && delivered_small.is_zero() {
        return None;
    }

    let large_split = table.current(large);
    let small_ceiling = table.ceiling(small);
    let uncovered_large = large_split.private;
    let fits = uncovered_large + delivered_small <= small_ceiling;

    let (large_result, small_result) = if fits {
        (
            QuantitySplit {
                insurer: large_split.insurer,
                private: Decimal::ZERO,
            },
            QuantitySplit {
                insurer: delivered_small + uncovered_large,
                private: Decimal::ZERO,
            },
        )
    } else {
        (
            large_split,
            QuantitySplit::within_ceiling(delivered_small, small_ceiling),
        )
    };

    let reasoning = if fits {
        format!(
            "{} uncovered {} + {} delivered {} fit within {} ceiling {}; {} billed as {}",
            uncovered_large, large, delivered_small, small, small, small_ceiling, large, small
        )
    } else {
        format!(
            "{} uncovered {} + {} delivered {} exceed {} ceiling {}; uncovered {} stays private",
            uncovered_large, large, delivered_small, small, small, small_ceiling, large
        )
    };

    let audit_step = AuditStep {
        step_number,
        rule_id: MEAL_DOWNGRADE_RULE_ID.to_string(),
        rule_name: "Meal Downgrade".to_string(),
        service_code: Some(large.clone()),
        input: serde_json::json!({
            "large_meal": large.to_string(),
            "small_meal": small.to_string(),
            "delivered_large": delivered_large.to_string(),
            "covered_large": large_split.insurer.to_string(),
            "delivered_small": delivered_small.to_string(),
            "small_ceiling": small_ceiling.to_string()
        }),
        output: serde_json::json!({
            "downgraded": fits,
            "large_insurer": large_result.insurer.to_string(),
            "large_private": large_result.private.to_string(),
            "small_insurer": small_result.insurer.to_string(),
            "small_private": small_result.private.to_string()
        }),
        reasoning,
    };

    Some(SubstitutionOutcome {
        rule_id: MEAL_DOWNGRADE_RULE_ID.to_string(),
        overrides: vec![(large.clone(), large_result), (small.clone(), small_result)],
        audit_step,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculation::{
        STANDARD_WEEKLY_FACTOR, aggregate_delivery, baseline_split, normalize_quotas,
    };
    use crate::config::SubstitutionRules;
    use crate::models::{Approval, ApprovalLine, Delivery, DeliveryLine, ServiceCode};
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn code(s: &str) -> ServiceCode {
        ServiceCode::parse(s).unwrap()
    }

    fn rule() -> MealDowngradeRule {
        SubstitutionRules::default().meal_downgrade.unwrap()
    }

    fn run(approved: &[(&str, &str)], delivered: &[(&str, &str)]) -> Option<SplitTable> {
        let approval = Approval::new(
            approved
                .iter()
                .map(|(c, q)| ApprovalLine::monthly(code(c), dec(q)))
                .collect(),
        );
        let delivery = Delivery::new(
            delivered
                .iter()
                .map(|(c, q)| DeliveryLine::new(code(c), dec(q)))
                .collect(),
        );
        let ceilings = normalize_quotas(&approval, STANDARD_WEEKLY_FACTOR, 1).ceilings;
        let mut table = baseline_split(&ceilings, &aggregate_delivery(&delivery));
        let outcome = apply_meal_downgrade(&table, &rule(), 2)?;
        table.apply(&outcome);
        Some(table)
    }

    #[test]
    fn test_large_meals_fit_into_small_meal_ceiling() {
        let table = run(&[("LK15", "20")], &[("LK14", "5"), ("LK15", "10")]).unwrap();

        assert_eq!(table.current(&code("LK14")).total(), Decimal::ZERO);
        assert_eq!(table.current(&code("LK15")).insurer, dec("15"));
        assert_eq!(table.current(&code("LK15")).private, Decimal::ZERO);
        assert_eq!(
            table.get(&code("LK15")).unwrap().rule.as_deref(),
            Some(MEAL_DOWNGRADE_RULE_ID)
        );
    }

    #[test]
    fn test_large_meals_overflow_small_meal_ceiling() {
        let table = run(&[("LK15", "10")], &[("LK14", "5"), ("LK15", "10")]).unwrap();

        assert_eq!(table.current(&code("LK14")).insurer, Decimal::ZERO);
        assert_eq!(table.current(&code("LK14")).private, dec("5"));
        assert_eq!(table.current(&code("LK15")).insurer, dec("10"));
        assert_eq!(table.current(&code("LK15")).private, Decimal::ZERO);
    }

    #[test]
    fn test_exact_fit_is_downgraded() {
        let table = run(&[("LK15", "15")], &[("LK14", "5"), ("LK15", "10")]).unwrap();
        assert_eq!(table.current(&code("LK15")).insurer, dec("15"));
    }

    #[test]
    fn test_small_meals_over_ceiling_without_large_meals() {
        let table = run(&[("LK15", "8")], &[("LK15", "10")]).unwrap();

        assert_eq!(table.current(&code("LK15")).insurer, dec("8"));
        assert_eq!(table.current(&code("LK15")).private, dec("2"));
        assert!(table.get(&code("LK14")).is_none());
    }

    #[test]
    fn test_own_ceiling_of_large_meal_applies_first() {
        // 3 of 5 large meals covered by their own ceiling; 2 downgraded.
        let table = run(
            &[("LK14", "3"), ("LK15", "20")],
            &[("LK14", "5"), ("LK15", "10")],
        )
        .unwrap();

        assert_eq!(table.current(&code("LK14")).insurer, dec("3"));
        assert_eq!(table.current(&code("LK14")).private, Decimal::ZERO);
        assert_eq!(table.current(&code("LK15")).insurer, dec("12"));
    }

    #[test]
    fn test_no_small_meal_ceiling_keeps_large_meals_private() {
        let table = run(&[], &[("LK14", "4")]).unwrap();
        assert_eq!(table.current(&code("LK14")).private, dec("4"));
        assert!(table.get(&code("LK15")).is_none());
    }

    #[test]
    fn test_inactive_without_meal_deliveries() {
        assert!(run(&[("LK15", "20")], &[("LK02", "3")]).is_none());
    }

    #[test]
    fn test_audit_step_records_decision() {
        let approval = Approval::new(vec![ApprovalLine::monthly(code("LK15"), dec("20"))]);
        let delivery = Delivery::new(vec![DeliveryLine::new(code("LK14"), dec("5"))]);
        let ceilings = normalize_quotas(&approval, STANDARD_WEEKLY_FACTOR, 1).ceilings;
        let table = baseline_split(&ceilings, &aggregate_delivery(&delivery));

        let outcome = apply_meal_downgrade(&table, &rule(), 4).unwrap();
        assert_eq!(outcome.audit_step.step_number, 4);
        assert_eq!(outcome.audit_step.rule_id, "meal_downgrade");
        assert_eq!(outcome.audit_step.output["downgraded"], true);
        assert_eq!(outcome.audit_step.output["small_insurer"], "5");
    }
}
