//! Reconciliation orchestration.
//!
//! Runs the whole pipeline for one billing month: calendar rule, quota
//! normalization, delivery aggregation, baseline split, substitution rules,
//! billable lines and invoice totals. Each stage records an audit step.

use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::config::{LevyTable, SubstitutionRules, TariffTable};
use crate::error::{EngineError, EngineResult};
use crate::models::{
    Approval, AuditStep, CodeDiagnostics, Delivery, Diagnostics, ReconciliationResult,
    ServiceCode, TargetMonth,
};

use super::billing::{PriceSources, build_lines};
use super::calendar::{determine_weekly_factor, resolve_target_month};
use super::care_downgrade::apply_care_downgrade;
use super::delivered::aggregate_delivery;
use super::meal_downgrade::apply_meal_downgrade;
use super::quota::normalize_quotas;
use super::split::{SplitTable, SubstitutionOutcome, baseline_audit_step, baseline_split};
use super::totals::{DEFAULT_INVESTMENT_RATE, calculate_totals};

/// Everything besides the approval and delivery that a run depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileConfig {
    /// Unit prices by code.
    pub tariff: TariffTable,
    /// Levy prices by code.
    pub levy: LevyTable,
    /// Investment surcharge rate; [`DEFAULT_INVESTMENT_RATE`] when `None`.
    pub investment_rate: Option<Decimal>,
    /// Fixed monthly insurer contribution.
    pub insurer_budget: Decimal,
    /// Billing month; the approval's reference date decides when `None`.
    pub target_month: Option<TargetMonth>,
    /// Cross-code substitution rules.
    pub rules: SubstitutionRules,
    /// Codes of the service catalogue; unpriced catalogued codes are not unknown.
    pub catalogue: BTreeSet<ServiceCode>,
}

impl ReconcileConfig {
    /// Creates a configuration with the default rate and substitution rules.
    pub fn new(tariff: TariffTable, levy: LevyTable, insurer_budget: Decimal) -> Self {
        Self {
            tariff,
            levy,
            investment_rate: None,
            insurer_budget,
            target_month: None,
            rules: SubstitutionRules::default(),
            catalogue: BTreeSet::new(),
        }
    }

    /// Sets the billing month.
    pub fn with_target_month(mut self, month: TargetMonth) -> Self {
        self.target_month = Some(month);
        self
    }

    /// Sets the investment surcharge rate.
    pub fn with_investment_rate(mut self, rate: Decimal) -> Self {
        self.investment_rate = Some(rate);
        self
    }

    /// Replaces the substitution rules.
    pub fn with_rules(mut self, rules: SubstitutionRules) -> Self {
        self.rules = rules;
        self
    }

    /// Sets the service catalogue.
    pub fn with_catalogue(mut self, catalogue: impl IntoIterator<Item = ServiceCode>) -> Self {
        self.catalogue = catalogue.into_iter().collect();
        self
    }

    /// The investment surcharge rate in effect.
    pub fn effective_investment_rate(&self) -> Decimal {
        self.investment_rate.unwrap_or(DEFAULT_INVESTMENT_RATE)
    }

    /// Refuses configurations that would produce invalid pricing.
    pub fn validate(&self) -> EngineResult<()> {
        if self.tariff.is_empty() {
            return Err(EngineError::invalid_config("tariff", "tariff table is empty"));
        }
        self.tariff.validate("tariff")?;
        self.levy.validate("levy")?;

        let rate = self.effective_investment_rate();
        if rate < Decimal::ZERO {
            return Err(EngineError::invalid_config(
                "investment_rate",
                format!("must not be negative, got {}", rate),
            ));
        }
        if rate > Decimal::ONE {
            return Err(EngineError::invalid_config(
                "investment_rate",
                format!("must not exceed 1, got {}", rate),
            ));
        }
        if self.insurer_budget < Decimal::ZERO {
            return Err(EngineError::invalid_config(
                "insurer_budget",
                format!("must not be negative, got {}", self.insurer_budget),
            ));
        }

        self.rules.validate()
    }
}

/// Applies the configured substitution rules in order: meal downgrade first,
/// then each care downgrade. Returns the audit steps of the rules that fired.
fn apply_substitutions(
    table: &mut SplitTable,
    rules: &SubstitutionRules,
    first_step: u32,
) -> Vec<AuditStep> {
    let mut steps = Vec::new();

    if let Some(meal) = &rules.meal_downgrade {
        let step_number = first_step + steps.len() as u32;
        if let Some(outcome) = apply_meal_downgrade(table, meal, step_number) {
            steps.push(record_outcome(table, outcome));
        }
    }

    for care in &rules.care_downgrades {
        let step_number = first_step + steps.len() as u32;
        if let Some(outcome) = apply_care_downgrade(table, care, step_number) {
            steps.push(record_outcome(table, outcome));
        }
    }

    steps
}

fn record_outcome(table: &mut SplitTable, outcome: SubstitutionOutcome) -> AuditStep {
    debug!(rule_id = %outcome.rule_id, "Applied substitution rule");
    table.apply(&outcome);
    outcome.audit_step
}

/// Reconciles an approval against a delivery for one billing month.
///
/// Per-line problems (unknown codes, negative quantities, bad overrides) are
/// reported as warnings in the diagnostics. Only an invalid configuration or a
/// missing billing month is an error.
///
/// # Example
///
/// ```
/// use care_billing::calculation::{reconcile, ReconcileConfig};
/// use care_billing::config::TariffTable;
/// use care_billing::models::{Approval, ApprovalLine, Delivery, DeliveryLine, ServiceCode, TargetMonth};
/// use rust_decimal::Decimal;
/// use std::str::FromStr;
///
/// let lk02 = ServiceCode::parse("LK02").unwrap();
/// let tariff: TariffTable = [(lk02.clone(), Decimal::from_str("9.61").unwrap())].into_iter().collect();
/// let config = ReconcileConfig::new(tariff, Default::default(), Decimal::ZERO)
///     .with_target_month(TargetMonth::new(2026, 2).unwrap());
///
/// let approval = Approval::new(vec![ApprovalLine::weekly(lk02.clone(), Decimal::from(3))]);
/// let delivery = Delivery::new(vec![DeliveryLine::new(lk02.clone(), Decimal::from(14))]);
///
/// let result = reconcile(&approval, &delivery, &config).unwrap();
/// // February 2026: floor(3 * 4.33) = 12
/// assert_eq!(result.insurer_quantity(&lk02), Decimal::from(12));
/// assert_eq!(result.private_quantity(&lk02), Decimal::from(2));
/// ```
pub fn reconcile(
    approval: &Approval,
    delivery: &Delivery,
    config: &ReconcileConfig,
) -> EngineResult<ReconciliationResult> {
    config.validate()?;
    let month = resolve_target_month(config.target_month, approval)?;
    let investment_rate = config.effective_investment_rate();

    info!(
        target_month = %month,
        approval_lines = approval.lines.len(),
        delivery_lines = delivery.lines.len(),
        "Starting reconciliation"
    );

    let mut steps = Vec::new();
    let mut next_step = 1u32;

    let factor = determine_weekly_factor(month, next_step);
    steps.push(factor.audit_step);
    next_step += 1;

    let quotas = normalize_quotas(approval, factor.factor, next_step);
    steps.push(quotas.audit_step);
    next_step += 1;

    let delivered = aggregate_delivery(delivery);
    let quota_warnings = quotas.warnings;
    let mut table = baseline_split(&quotas.ceilings, &delivered);
    steps.push(baseline_audit_step(&table, next_step));
    next_step += 1;

    let substitution_steps = apply_substitutions(&mut table, &config.rules, next_step);
    next_step += substitution_steps.len() as u32;
    steps.extend(substitution_steps);

    let billing = build_lines(
        &table,
        PriceSources {
            tariff: &config.tariff,
            levy: &config.levy,
            delivered: &delivered,
            approval,
            catalogue: &config.catalogue,
        },
        next_step,
    )?;
    steps.push(billing.audit_step);
    next_step += 1;

    let totals = calculate_totals(
        &billing.insurer_lines,
        &billing.private_lines,
        investment_rate,
        config.insurer_budget,
        next_step,
    );
    steps.push(totals.audit_step);

    let codes: BTreeMap<_, _> = table
        .iter()
        .map(|(code, split)| {
            let price = billing.prices.get(code).copied().unwrap_or_default();
            let diagnostics = CodeDiagnostics {
                ceiling: split.ceiling,
                delivered: split.delivered,
                baseline_insurer: split.baseline.insurer,
                baseline_private: split.baseline.private,
                insurer: split.current.insurer,
                private: split.current.private,
                unit_price: price.unit_price,
                levy_price: price.levy_price,
                rule: split.rule.clone(),
            };
            (code.clone(), diagnostics)
        })
        .collect();

    let mut warnings = quota_warnings;
    warnings.extend(delivered.warnings);
    warnings.extend(billing.warnings);

    if !warnings.is_empty() {
        warn!(
            target_month = %month,
            warning_count = warnings.len(),
            "Reconciliation produced warnings"
        );
    }

    info!(
        target_month = %month,
        insurer_payable = %totals.insurer.payable,
        private_payable = %totals.private.payable,
        "Reconciliation complete"
    );

    Ok(ReconciliationResult {
        insurer_lines: billing.insurer_lines,
        private_lines: billing.private_lines,
        insurer_totals: totals.insurer,
        private_totals: totals.private,
        diagnostics: Diagnostics {
            target_month: month,
            weekly_factor: factor.factor,
            codes,
            steps,
            warnings,
        },
    })
}
