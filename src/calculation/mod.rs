//! Calculation logic for the Care Billing engine.
//!
//! This module contains the reconciliation pipeline: the calendar rule for
//! weekly approvals, quota normalization, delivery aggregation, the baseline
//! insurer/private split, the meal and care-intensity substitution rules,
//! pricing with training levy lines, and invoice totals with the insurer
//! budget deduction.

mod billing;
mod calendar;
mod care_downgrade;
mod delivered;
mod meal_downgrade;
mod quota;
mod reconcile;
mod rounding;
mod split;
mod totals;

pub use billing::{BillingResult, CodePrices, PriceSources, build_lines};
pub use calendar::{
    ELEVATED_WEEKLY_FACTOR, STANDARD_WEEKLY_FACTOR, WeeklyFactorResult, determine_weekly_factor,
    parse_reference_date, resolve_target_month, weekday_counts, weekly_factor,
};
pub use care_downgrade::{apply_care_downgrade, care_downgrade_rule_id};
pub use delivered::{DeliveredQuantities, MAX_LINE_QUANTITY, MAX_UNIT_PRICE, aggregate_delivery};
pub use meal_downgrade::{MEAL_DOWNGRADE_RULE_ID, apply_meal_downgrade};
pub use quota::{MonthlyCeiling, QuotaResult, monthly_contribution, normalize_quotas};
pub use reconcile::{ReconcileConfig, reconcile};
pub use rounding::{MONEY_SCALE, line_total, round_money};
pub use split::{
    CodeSplit, QuantitySplit, SplitTable, SubstitutionOutcome, baseline_audit_step,
    baseline_split,
};
pub use totals::{DEFAULT_INVESTMENT_RATE, InvoiceTotalsResult, calculate_totals, line_set_totals};
