//! Baseline split of delivered quantities.
//!
//! For every code that was approved or delivered, the insurer covers the
//! delivered quantity up to the monthly ceiling and the client pays the rest.
//! Substitution rules may later override the split of the codes they govern.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{AuditStep, ServiceCode};

use super::delivered::DeliveredQuantities;
use super::quota::MonthlyCeiling;

/// Quantities billed to the insurer and to the client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantitySplit {
    /// Quantity billed to the insurer.
    pub insurer: Decimal,
    /// Quantity billed privately.
    pub private: Decimal,
}

impl QuantitySplit {
    /// Covers `delivered` up to `ceiling`; the rest is private.
    pub fn within_ceiling(delivered: Decimal, ceiling: Decimal) -> Self {
        let insurer = delivered.min(ceiling).max(Decimal::ZERO);
        Self {
            insurer,
            private: (delivered - insurer).max(Decimal::ZERO),
        }
    }

    /// Total quantity billed on both invoices.
    pub fn total(&self) -> Decimal {
        self.insurer + self.private
    }
}

/// Split state of one service code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeSplit {
    /// Monthly ceiling.
    pub ceiling: Decimal,
    /// Delivered quantity.
    pub delivered: Decimal,
    /// Split before substitution rules.
    pub baseline: QuantitySplit,
    /// Split after the rules applied so far.
    pub current: QuantitySplit,
    /// The rule that last overrode the baseline.
    pub rule: Option<String>,
}

impl CodeSplit {
    fn new(ceiling: Decimal, delivered: Decimal) -> Self {
        let baseline = QuantitySplit::within_ceiling(delivered, ceiling);
        Self {
            ceiling,
            delivered,
            baseline,
            current: baseline,
            rule: None,
        }
    }
}

/// The outcome of one substitution rule.
#[derive(Debug, Clone)]
pub struct SubstitutionOutcome {
    /// Identifier of the rule.
    pub rule_id: String,
    /// New splits for the codes the rule governs.
    pub overrides: Vec<(ServiceCode, QuantitySplit)>,
    /// The audit step recording the decision.
    pub audit_step: AuditStep,
}

/// Split state of every approved or delivered code, in code order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SplitTable {
    codes: BTreeMap<ServiceCode, CodeSplit>,
}

impl SplitTable {
    /// Returns the split state of `code`.
    pub fn get(&self, code: &ServiceCode) -> Option<&CodeSplit> {
        self.codes.get(code)
    }

    /// Ceiling of `code`, zero if unknown.
    pub fn ceiling(&self, code: &ServiceCode) -> Decimal {
        self.get(code).map_or(Decimal::ZERO, |c| c.ceiling)
    }

    /// Delivered quantity of `code`, zero if unknown.
    pub fn delivered(&self, code: &ServiceCode) -> Decimal {
        self.get(code).map_or(Decimal::ZERO, |c| c.delivered)
    }

    /// Current split of `code`, zero if unknown.
    pub fn current(&self, code: &ServiceCode) -> QuantitySplit {
        self.get(code).map(|c| c.current).unwrap_or_default()
    }

    /// Iterates over all codes in code order.
    pub fn iter(&self) -> impl Iterator<Item = (&ServiceCode, &CodeSplit)> {
        self.codes.iter()
    }

    /// Number of codes.
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    /// Returns true if no code was approved or delivered.
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Applies the overrides of a substitution rule.
    ///
    /// A code that was neither approved nor delivered only gets an entry if
    /// the rule bills something for it.
    pub fn apply(&mut self, outcome: &SubstitutionOutcome) {
        for (code, split) in &outcome.overrides {
            if !self.codes.contains_key(code) && split.total().is_zero() {
                continue;
            }
            let entry = self
                .codes
                .entry(code.clone())
                .or_insert_with(|| CodeSplit::new(Decimal::ZERO, Decimal::ZERO));
            entry.current = *split;
            entry.rule = Some(outcome.rule_id.clone());
        }
    }
}

/// Computes the baseline split for every approved or delivered code.
pub fn baseline_split(ceilings: &MonthlyCeiling, delivered: &DeliveredQuantities) -> SplitTable {
    let mut codes = BTreeMap::new();

    for code in ceilings.codes().chain(delivered.quantities.keys()) {
        if codes.contains_key(code) {
            continue;
        }
        codes.insert(
            code.clone(),
            CodeSplit::new(ceilings.get(code), delivered.get(code)),
        );
    }

    SplitTable { codes }
}

/// Records the baseline split in the audit trail.
pub fn baseline_audit_step(table: &SplitTable, step_number: u32) -> AuditStep {
    let splits: serde_json::Map<String, serde_json::Value> = table
        .iter()
        .map(|(code, split)| {
            (
                code.to_string(),
                serde_json::json!({
                    "ceiling": split.ceiling.to_string(),
                    "delivered": split.delivered.to_string(),
                    "insurer": split.baseline.insurer.to_string(),
                    "private": split.baseline.private.to_string()
                }),
            )
        })
        .collect();

    let over_quota = table
        .iter()
        .filter(|(_, split)| split.baseline.private > Decimal::ZERO)
        .count();

    AuditStep {
        step_number,
        rule_id: "baseline_split".to_string(),
        rule_name: "Baseline Insurer/Private Split".to_string(),
        service_code: None,
        input: serde_json::json!({ "codes": table.len() }),
        output: serde_json::json!({ "splits": splits }),
        reasoning: format!(
            "Each delivered quantity billed to the insurer up to its monthly ceiling; {} of {} codes exceed their ceiling",
            over_quota,
            table.len()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculation::{aggregate_delivery, normalize_quotas, STANDARD_WEEKLY_FACTOR};
    use crate::models::{Approval, ApprovalLine, Delivery, DeliveryLine};
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn code(s: &str) -> ServiceCode {
        ServiceCode::parse(s).unwrap()
    }

    fn table(approved: &[(&str, &str)], delivered: &[(&str, &str)]) -> SplitTable {
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
        baseline_split(&ceilings, &aggregate_delivery(&delivery))
    }

    #[test]
    fn test_within_ceiling() {
        let split = QuantitySplit::within_ceiling(dec("12"), dec("10"));
        assert_eq!(split.insurer, dec("10"));
        assert_eq!(split.private, dec("2"));
    }

    #[test]
    fn test_below_ceiling_is_fully_covered() {
        let split = QuantitySplit::within_ceiling(dec("4"), dec("10"));
        assert_eq!(split.insurer, dec("4"));
        assert_eq!(split.private, Decimal::ZERO);
    }

    #[test]
    fn test_baseline_covers_union_of_codes() {
        let table = table(&[("LK02", "20"), ("LK05", "8")], &[("LK02", "25"), ("LK13", "4")]);

        assert_eq!(table.len(), 3);
        assert_eq!(table.current(&code("LK02")).insurer, dec("20"));
        assert_eq!(table.current(&code("LK02")).private, dec("5"));
        assert_eq!(table.current(&code("LK05")).total(), Decimal::ZERO);
        assert_eq!(table.current(&code("LK13")).insurer, Decimal::ZERO);
        assert_eq!(table.current(&code("LK13")).private, dec("4"));
    }

    #[test]
    fn test_apply_overrides_current_split() {
        let mut table = table(&[("LK15", "20")], &[("LK15", "10")]);
        let outcome = SubstitutionOutcome {
            rule_id: "test_rule".to_string(),
            overrides: vec![(
                code("LK15"),
                QuantitySplit {
                    insurer: dec("15"),
                    private: Decimal::ZERO,
                },
            )],
            audit_step: baseline_audit_step(&SplitTable::default(), 1),
        };

        table.apply(&outcome);
        let lk15 = table.get(&code("LK15")).unwrap();
        assert_eq!(lk15.current.insurer, dec("15"));
        assert_eq!(lk15.baseline.insurer, dec("10"));
        assert_eq!(lk15.rule.as_deref(), Some("test_rule"));
    }

    #[test]
    fn test_apply_skips_empty_override_for_unknown_code() {
        let mut table = table(&[], &[]);
        let outcome = SubstitutionOutcome {
            rule_id: "test_rule".to_string(),
            overrides: vec![(code("LK14"), QuantitySplit::default())],
            audit_step: baseline_audit_step(&SplitTable::default(), 1),
        };

        table.apply(&outcome);
        assert!(table.is_empty());
    }

    #[test]
    fn test_baseline_audit_step_counts_over_quota_codes() {
        let table = table(&[("LK02", "20")], &[("LK02", "25"), ("LK13", "4")]);
        let step = baseline_audit_step(&table, 3);

        assert_eq!(step.step_number, 3);
        assert!(step.reasoning.contains("2 of 2 codes"));
        assert_eq!(step.output["splits"]["LK02"]["private"], "5");
    }
}
