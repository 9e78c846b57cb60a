//! Calendar rule for weekly approvals.
//!
//! Weekly approvals are granted assuming roughly 4.33 weeks per month. In a
//! month where some weekday occurs five times, a visit booked for that weekday
//! happens five times, so the monthly ceiling is computed with a factor of 5
//! instead. Otherwise legitimately delivered visits would be rejected as
//! over quota.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;

use crate::error::{EngineError, EngineResult};
use crate::models::{Approval, AuditStep, TargetMonth};

/// Weeks per month assumed by weekly approvals.
pub const STANDARD_WEEKLY_FACTOR: Decimal = Decimal::from_parts(433, 0, 0, false, 2);

/// Weeks per month used when a weekday occurs five times.
pub const ELEVATED_WEEKLY_FACTOR: Decimal = Decimal::from_parts(5, 0, 0, false, 0);

/// The result of the calendar rule, including the factor and audit step.
#[derive(Debug, Clone)]
pub struct WeeklyFactorResult {
    /// The weeks-per-month factor for the month.
    pub factor: Decimal,
    /// The audit step recording this decision.
    pub audit_step: AuditStep,
}

/// Counts how often each weekday occurs in `month`, Monday first.
pub fn weekday_counts(month: TargetMonth) -> [u32; 7] {
    let mut counts = [0u32; 7];
    for day in month.days() {
        counts[day.weekday().num_days_from_monday() as usize] += 1;
    }
    counts
}

/// Returns the weeks-per-month factor for `month`.
///
/// # Example
///
/// ```
/// use care_billing::calculation::{weekly_factor, ELEVATED_WEEKLY_FACTOR, STANDARD_WEEKLY_FACTOR};
/// use care_billing::models::TargetMonth;
///
/// // February 2026 has exactly four of every weekday.
/// assert_eq!(weekly_factor(TargetMonth::new(2026, 2).unwrap()), STANDARD_WEEKLY_FACTOR);
/// // March 2026 has five Sundays, Mondays and Tuesdays.
/// assert_eq!(weekly_factor(TargetMonth::new(2026, 3).unwrap()), ELEVATED_WEEKLY_FACTOR);
/// ```
pub fn weekly_factor(month: TargetMonth) -> Decimal {
    if weekday_counts(month).iter().any(|&count| count >= 5) {
        ELEVATED_WEEKLY_FACTOR
    } else {
        STANDARD_WEEKLY_FACTOR
    }
}

/// Applies the calendar rule and records it in the audit trail.
pub fn determine_weekly_factor(month: TargetMonth, step_number: u32) -> WeeklyFactorResult {
    let counts = weekday_counts(month);
    let factor = weekly_factor(month);
    let weekdays_five_times: Vec<&str> = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"]
        .iter()
        .zip(counts.iter())
        .filter(|(_, count)| **count >= 5)
        .map(|(name, _)| *name)
        .collect();

    let reasoning = if weekdays_five_times.is_empty() {
        format!(
            "No weekday occurs five times in {}; weekly approvals use factor {}",
            month, factor
        )
    } else {
        format!(
            "{} occur five times in {}; weekly approvals use factor {}",
            weekdays_five_times.join(", "),
            month,
            factor
        )
    };

    let audit_step = AuditStep {
        step_number,
        rule_id: "calendar_weekly_factor".to_string(),
        rule_name: "Weekly Approval Factor".to_string(),
        service_code: None,
        input: serde_json::json!({
            "target_month": month.to_string(),
            "days_in_month": counts.iter().sum::<u32>()
        }),
        output: serde_json::json!({
            "weekly_factor": factor.to_string(),
            "weekdays_occurring_five_times": weekdays_five_times
        }),
        reasoning,
    };

    WeeklyFactorResult { factor, audit_step }
}

/// Picks the month a reconciliation runs for.
///
/// An explicit month wins; otherwise the month of the approval's reference
/// date is used. There is no wall-clock fallback: without either, the run is
/// refused with [`EngineError::MissingTargetMonth`].
pub fn resolve_target_month(
    explicit: Option<TargetMonth>,
    approval: &Approval,
) -> EngineResult<TargetMonth> {
    explicit
        .or_else(|| approval.reference_date.map(TargetMonth::containing))
        .ok_or(EngineError::MissingTargetMonth)
}

/// Parses a reference date as printed on approval documents.
///
/// Accepts `YYYY-MM-DD`, `DD.MM.YYYY` and `DD/MM/YYYY`; returns `None` for
/// anything else so the caller can decide how to proceed.
pub fn parse_reference_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    ["%Y-%m-%d", "%d.%m.%Y", "%d/%m/%Y"]
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(trimmed, format).ok())
}
