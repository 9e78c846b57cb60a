//! Quota normalization.
//!
//! Converts the lines of an approval into one whole-number monthly ceiling
//! per service code.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use tracing::debug;

use crate::models::{Approval, ApprovalUnit, AuditStep, AuditWarning, ServiceCode, WarningSeverity};

use super::delivered::MAX_LINE_QUANTITY;

/// Monthly ceiling per service code.
///
/// Values are whole numbers and never negative: an approval cannot yield a
/// fractional visit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonthlyCeiling {
    ceilings: BTreeMap<ServiceCode, Decimal>,
}

impl MonthlyCeiling {
    /// Ceiling for `code`, zero if the code was not approved.
    pub fn get(&self, code: &ServiceCode) -> Decimal {
        self.ceilings.get(code).copied().unwrap_or(Decimal::ZERO)
    }

    /// Iterates over the approved codes in code order.
    pub fn codes(&self) -> impl Iterator<Item = &ServiceCode> {
        self.ceilings.keys()
    }

    /// Iterates over codes and ceilings in code order.
    pub fn iter(&self) -> impl Iterator<Item = (&ServiceCode, Decimal)> {
        self.ceilings.iter().map(|(code, ceiling)| (code, *ceiling))
    }

    /// Returns true if nothing was approved.
    pub fn is_empty(&self) -> bool {
        self.ceilings.is_empty()
    }
}

/// The result of quota normalization, including the ceilings and audit step.
#[derive(Debug, Clone)]
pub struct QuotaResult {
    /// The monthly ceiling per code.
    pub ceilings: MonthlyCeiling,
    /// Approval lines that were dropped because their quantity is out of range.
    pub warnings: Vec<AuditWarning>,
    /// The audit step recording the conversion.
    pub audit_step: AuditStep,
}

/// Monthly contribution of a single approved quantity.
///
/// Monthly quantities are floored; weekly quantities are multiplied by the
/// calendar factor first. Returns `None` for quantities above
/// [`MAX_LINE_QUANTITY`] or when the product overflows.
pub fn monthly_contribution(
    quantity: Decimal,
    unit: ApprovalUnit,
    weekly_factor: Decimal,
) -> Option<Decimal> {
    if quantity > MAX_LINE_QUANTITY {
        return None;
    }
    match unit {
        ApprovalUnit::Monthly => Some(quantity.floor()),
        ApprovalUnit::Weekly => quantity.checked_mul(weekly_factor).map(|q| q.floor()),
    }
}

fn out_of_range(quantity: Decimal, code: &ServiceCode) -> AuditWarning {
    AuditWarning {
        code: "QUANTITY_OUT_OF_RANGE".to_string(),
        message: format!("Approved quantity {} for {} ignored", quantity, code),
        severity: WarningSeverity::High,
        service_code: Some(code.clone()),
    }
}

/// Converts an approval into monthly ceilings.
///
/// Lines with a quantity of zero or less are ignored. Out-of-range lines are
/// ignored with a warning. Lines sharing a code are summed after each line
/// has been floored on its own.
///
/// # Example
///
/// ```
/// use care_billing::calculation::normalize_quotas;
/// use care_billing::models::{Approval, ApprovalLine, ServiceCode};
/// use rust_decimal::Decimal;
/// use std::str::FromStr;
///
/// let lk02 = ServiceCode::parse("LK02").unwrap();
/// let approval = Approval::new(vec![
///     ApprovalLine::weekly(lk02.clone(), Decimal::from(3)),
///     ApprovalLine::monthly(lk02.clone(), Decimal::from(2)),
/// ]);
///
/// let result = normalize_quotas(&approval, Decimal::from_str("4.33").unwrap(), 1);
/// // floor(3 * 4.33) + 2 = 12 + 2
/// assert_eq!(result.ceilings.get(&lk02), Decimal::from(14));
/// ```
pub fn normalize_quotas(approval: &Approval, weekly_factor: Decimal, step_number: u32) -> QuotaResult {
    let mut ceilings: BTreeMap<ServiceCode, Decimal> = BTreeMap::new();
    let mut warnings = Vec::new();
    let mut ignored = 0usize;

    for line in &approval.lines {
        if line.quantity <= Decimal::ZERO {
            ignored += 1;
            continue;
        }

        let ceiling = ceilings.get(&line.code).copied().unwrap_or(Decimal::ZERO);
        match monthly_contribution(line.quantity, line.unit, weekly_factor)
            .and_then(|contribution| ceiling.checked_add(contribution))
        {
            Some(sum) => {
                ceilings.insert(line.code.clone(), sum);
            }
            None => warnings.push(out_of_range(line.quantity, &line.code)),
        }
    }

    debug!(
        approved_codes = ceilings.len(),
        ignored_lines = ignored,
        out_of_range_lines = warnings.len(),
        weekly_factor = %weekly_factor,
        "Normalized approval quotas"
    );

    let output: serde_json::Map<String, serde_json::Value> = ceilings
        .iter()
        .map(|(code, ceiling)| (code.to_string(), serde_json::json!(ceiling.to_string())))
        .collect();

    let audit_step = AuditStep {
        step_number,
        rule_id: "quota_normalization".to_string(),
        rule_name: "Monthly Quota Normalization".to_string(),
        service_code: None,
        input: serde_json::json!({
            "approval_lines": approval.lines.len(),
            "weekly_factor": weekly_factor.to_string()
        }),
        output: serde_json::json!({ "ceilings": output }),
        reasoning: format!(
            "{} approval lines converted to {} monthly ceilings ({} non-positive lines ignored)",
            approval.lines.len(),
            ceilings.len(),
            ignored
        ),
    };

    QuotaResult {
        ceilings: MonthlyCeiling { ceilings },
        warnings,
        audit_step,
    }
}
