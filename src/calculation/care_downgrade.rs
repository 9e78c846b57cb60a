//! Care-intensity downgrade substitution.
//!
//! A lower-tier body care service may be billed against the unused ceiling of
//! the higher-tier service it stands in for. The higher tier is billed first;
//! whatever remains of its ceiling absorbs lower-tier quantity that the lower
//! code's own ceiling did not cover.

use rust_decimal::Decimal;

use crate::config::CareDowngradeRule;
use crate::models::AuditStep;

use super::split::{QuantitySplit, SplitTable, SubstitutionOutcome};

/// Rule identifier for a care downgrade from `higher` to `lower`.
pub fn care_downgrade_rule_id(rule: &CareDowngradeRule) -> String {
    format!("care_downgrade_{}_{}", rule.higher, rule.lower).to_lowercase()
}

/// Applies one care downgrade to the current splits.
///
/// Returns `None` when the higher tier has no ceiling; the lower code then
/// keeps its split.
pub fn apply_care_downgrade(
    table: &SplitTable,
    rule: &CareDowngradeRule,
    step_number: u32,
) -> Option<SubstitutionOutcome> {
    let higher = &rule.higher;
    let lower = &rule.lower;

    let higher_ceiling = table.ceiling(higher);
    if higher_ceiling.is_zero() {
        return None;
    }

    let higher_split = table.current(higher);
    let lower_split = table.current(lower);
    let remaining = (higher_ceiling - higher_split.insurer).max(Decimal::ZERO);
    let borrowed = lower_split.private.min(remaining);

    let lower_result = QuantitySplit {
        insurer: lower_split.insurer + borrowed,
        private: lower_split.private - borrowed,
    };

    let rule_id = care_downgrade_rule_id(rule);
    let audit_step = AuditStep {
        step_number,
        rule_id: rule_id.clone(),
        rule_name: format!("Care Downgrade {} to {}", higher, lower),
        service_code: Some(lower.clone()),
        input: serde_json::json!({
            "higher": higher.to_string(),
            "lower": lower.to_string(),
            "higher_ceiling": higher_ceiling.to_string(),
            "higher_insurer": higher_split.insurer.to_string(),
            "lower_insurer": lower_split.insurer.to_string(),
            "lower_uncovered": lower_split.private.to_string()
        }),
        output: serde_json::json!({
            "borrowed": borrowed.to_string(),
            "lower_insurer": lower_result.insurer.to_string(),
            "lower_private": lower_result.private.to_string()
        }),
        reasoning: format!(
            "{} of {} ceiling {} unused; {} uncovered {} billed to the insurer against it",
            remaining, higher, higher_ceiling, borrowed, lower
        ),
    };

    Some(SubstitutionOutcome {
        rule_id,
        overrides: vec![(higher.clone(), higher_split), (lower.clone(), lower_result)],
        audit_step,
    })
}
