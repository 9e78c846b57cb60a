//! Reconciliation result models.
//!
//! This module contains the [`ReconciliationResult`] type and its associated
//! structures: the billable lines of both invoices, their totals, and the
//! diagnostics that serve as the audit trail of a reconciliation run.
//!
//! A result contains no timestamps or generated identifiers, so identical
//! inputs always serialize to identical bytes.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{ServiceCode, TargetMonth};

/// One billable line on either invoice.
///
/// # Example
///
/// ```
/// use care_billing::models::{BillableLine, ServiceCode};
/// use rust_decimal::Decimal;
/// use std::str::FromStr;
///
/// let line = BillableLine {
///     code: ServiceCode::parse("LK02").unwrap(),
///     quantity: Decimal::from(10),
///     unit_price: Decimal::from_str("9.61").unwrap(),
///     line_total: Decimal::from_str("96.10").unwrap(),
///     is_levy: false,
/// };
/// assert!(!line.is_levy);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillableLine {
    /// The service code billed, or the code a levy line is charged against.
    pub code: ServiceCode,
    /// Billed quantity, always greater than zero.
    pub quantity: Decimal,
    /// Price per unit.
    pub unit_price: Decimal,
    /// `quantity * unit_price`, rounded to cents.
    pub line_total: Decimal,
    /// True for training levy ("AUB") lines.
    pub is_levy: bool,
}

/// Totals of one invoice. Every field is rounded to cents when computed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    /// Sum of all line totals, service and levy lines alike.
    pub subtotal: Decimal,
    /// Sum of the levy line totals (already contained in `subtotal`).
    pub levy_surcharge: Decimal,
    /// Investment cost surcharge ("ZINV") on the subtotal.
    pub investment_surcharge: Decimal,
    /// `subtotal + investment_surcharge`.
    pub gross_total: Decimal,
    /// Amount covered by the insurer budget. Always zero on the private invoice.
    pub insurer_deduction: Decimal,
    /// Amount actually invoiced.
    pub payable: Decimal,
}

impl Totals {
    /// Totals of an empty invoice.
    pub fn zero() -> Self {
        let zero = Decimal::new(0, 2);
        Self {
            subtotal: zero,
            levy_surcharge: zero,
            investment_surcharge: zero,
            gross_total: zero,
            insurer_deduction: zero,
            payable: zero,
        }
    }
}

/// Per-code intermediate values kept for audit and debugging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeDiagnostics {
    /// Monthly ceiling derived from the approval.
    pub ceiling: Decimal,
    /// Delivered quantity after summing duplicate lines.
    pub delivered: Decimal,
    /// Insurer quantity of the baseline split.
    pub baseline_insurer: Decimal,
    /// Private quantity of the baseline split.
    pub baseline_private: Decimal,
    /// Final insurer quantity after substitution rules.
    pub insurer: Decimal,
    /// Final private quantity after substitution rules.
    pub private: Decimal,
    /// Unit price used for this code.
    pub unit_price: Decimal,
    /// Levy price used for this code.
    pub levy_price: Decimal,
    /// Identifier of the substitution rule that overrode the baseline, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,
}

/// A single step in the audit trail recording a reconciliation decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditStep {
    /// The sequential step number.
    pub step_number: u32,
    /// The unique identifier of the rule that was applied.
    pub rule_id: String,
    /// The human-readable name of the rule.
    pub rule_name: String,
    /// The service code the step is about, if it concerns a single code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_code: Option<ServiceCode>,
    /// The input data for this step.
    pub input: serde_json::Value,
    /// The output data from this step.
    pub output: serde_json::Value,
    /// Human-readable explanation of the decision.
    pub reasoning: String,
}

/// How urgently a warning needs attention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningSeverity {
    /// Informational.
    Low,
    /// Worth checking before the invoice is sent.
    Medium,
    /// Very likely produces a wrong invoice line.
    High,
}

/// A warning generated during reconciliation.
///
/// Warnings never abort a run; they flag lines that were billed with
/// fallback values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditWarning {
    /// A code identifying the type of warning.
    pub code: String,
    /// A human-readable description of the warning.
    pub message: String,
    /// The severity level.
    pub severity: WarningSeverity,
    /// The service code concerned, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_code: Option<ServiceCode>,
}

/// Everything needed to explain how a result came about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    /// The month the reconciliation was run for.
    pub target_month: TargetMonth,
    /// Weeks-per-month factor applied to weekly approvals.
    pub weekly_factor: Decimal,
    /// Intermediate values per service code.
    pub codes: BTreeMap<ServiceCode, CodeDiagnostics>,
    /// The sequence of reconciliation steps.
    pub steps: Vec<AuditStep>,
    /// Warnings raised while reconciling.
    pub warnings: Vec<AuditWarning>,
}

/// The complete result of a reconciliation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationResult {
    /// Lines billed to the insurer / welfare office.
    pub insurer_lines: Vec<BillableLine>,
    /// Lines billed privately to the client.
    pub private_lines: Vec<BillableLine>,
    /// Totals of the insurer invoice.
    pub insurer_totals: Totals,
    /// Totals of the private invoice.
    pub private_totals: Totals,
    /// Audit trail of the run.
    pub diagnostics: Diagnostics,
}

impl ReconciliationResult {
    /// Final insurer quantity for `code` (zero if the code never appeared).
    pub fn insurer_quantity(&self, code: &ServiceCode) -> Decimal {
        self.diagnostics
            .codes
            .get(code)
            .map_or(Decimal::ZERO, |c| c.insurer)
    }

    /// Final private quantity for `code` (zero if the code never appeared).
    pub fn private_quantity(&self, code: &ServiceCode) -> Decimal {
        self.diagnostics
            .codes
            .get(code)
            .map_or(Decimal::ZERO, |c| c.private)
    }

    /// Delivered quantity for `code` (zero if the code was not delivered).
    pub fn delivered_quantity(&self, code: &ServiceCode) -> Decimal {
        self.diagnostics
            .codes
            .get(code)
            .map_or(Decimal::ZERO, |c| c.delivered)
    }

    /// Returns the warnings raised for `code`.
    pub fn warnings_for<'a, 'c>(
        &'a self,
        code: &'c ServiceCode,
    ) -> impl Iterator<Item = &'a AuditWarning> + use<'a, 'c> {
        self.diagnostics
            .warnings
            .iter()
            .filter(move |w| w.service_code.as_ref() == Some(code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn code(s: &str) -> ServiceCode {
        ServiceCode::parse(s).unwrap()
    }

    fn sample_diagnostics() -> Diagnostics {
        let mut codes = BTreeMap::new();
        codes.insert(
            code("LK02"),
            CodeDiagnostics {
                ceiling: dec("20"),
                delivered: dec("25"),
                baseline_insurer: dec("20"),
                baseline_private: dec("5"),
                insurer: dec("20"),
                private: dec("5"),
                unit_price: dec("9.61"),
                levy_price: dec("0.21"),
                rule: None,
            },
        );

        Diagnostics {
            target_month: TargetMonth::new(2026, 3).unwrap(),
            weekly_factor: dec("5"),
            codes,
            steps: vec![],
            warnings: vec![AuditWarning {
                code: "UNKNOWN_SERVICE_CODE".to_string(),
                message: "LK99 has no tariff".to_string(),
                severity: WarningSeverity::High,
                service_code: Some(code("LK99")),
            }],
        }
    }

    fn sample_result() -> ReconciliationResult {
        ReconciliationResult {
            insurer_lines: vec![],
            private_lines: vec![],
            insurer_totals: Totals::zero(),
            private_totals: Totals::zero(),
            diagnostics: sample_diagnostics(),
        }
    }

    #[test]
    fn test_quantity_accessors_read_diagnostics() {
        let result = sample_result();
        assert_eq!(result.insurer_quantity(&code("LK02")), dec("20"));
        assert_eq!(result.private_quantity(&code("LK02")), dec("5"));
        assert_eq!(result.delivered_quantity(&code("LK02")), dec("25"));
    }

    #[test]
    fn test_quantity_accessors_default_to_zero() {
        let result = sample_result();
        assert_eq!(result.insurer_quantity(&code("LK14")), Decimal::ZERO);
        assert_eq!(result.private_quantity(&code("LK14")), Decimal::ZERO);
    }

    #[test]
    fn test_warnings_for_filters_by_code() {
        let result = sample_result();
        assert_eq!(result.warnings_for(&code("LK99")).count(), 1);
        assert_eq!(result.warnings_for(&code("LK02")).count(), 0);
    }

    #[test]
    fn test_warnings_for_outlive_the_code_argument() {
        let result = sample_result();
        let warnings: Vec<&AuditWarning> = result.warnings_for(&code("LK99")).collect();
        assert_eq!(warnings[0].code, "UNKNOWN_SERVICE_CODE");
    }

    #[test]
    fn test_zero_totals_have_two_decimals() {
        let totals = Totals::zero();
        assert_eq!(totals.payable.to_string(), "0.00");
    }

    #[test]
    fn test_billable_line_serialization() {
        let line = BillableLine {
            code: code("lk02"),
            quantity: dec("10"),
            unit_price: dec("9.61"),
            line_total: dec("96.10"),
            is_levy: false,
        };

        let json = serde_json::to_string(&line).unwrap();
        assert!(json.contains("\"code\":\"LK02\""));
        assert!(json.contains("\"line_total\":\"96.10\""));
        assert!(json.contains("\"is_levy\":false"));
    }

    #[test]
    fn test_diagnostics_serialize_codes_in_order() {
        let mut diagnostics = sample_diagnostics();
        let lk02 = diagnostics.codes[&code("LK02")].clone();
        diagnostics.codes.insert(code("LK01"), lk02);

        let json = serde_json::to_string(&diagnostics).unwrap();
        let lk01 = json.find("\"LK01\"").unwrap();
        let lk02 = json.find("\"LK02\"").unwrap();
        assert!(lk01 < lk02);
        assert!(json.contains("\"target_month\":\"2026-03\""));
    }

    #[test]
    fn test_warning_severity_serialization() {
        assert_eq!(
            serde_json::to_string(&WarningSeverity::Medium).unwrap(),
            "\"medium\""
        );
    }

    #[test]
    fn test_result_roundtrips_through_json() {
        let result = sample_result();
        let json = serde_json::to_string(&result).unwrap();
        let parsed: ReconciliationResult = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, result);
    }
}
