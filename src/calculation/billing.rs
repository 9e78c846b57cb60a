//! Pricing and billable line generation.
//!
//! Turns the final quantity split into the service and levy ("AUB") lines of
//! both invoices. Prices come from delivery-line overrides first and the
//! tariff tables second; a code without any price is billed at zero and
//! flagged.

use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;

use crate::config::{LevyTable, TariffTable};
use crate::error::EngineResult;
use crate::models::{
    Approval, AuditStep, AuditWarning, BillableLine, ServiceCode, WarningSeverity,
};

use super::delivered::DeliveredQuantities;
use super::rounding::line_total;
use super::split::SplitTable;

/// Prices applied to one service code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CodePrices {
    /// Price per service unit.
    pub unit_price: Decimal,
    /// Levy price per service unit; zero means no levy line.
    pub levy_price: Decimal,
}

/// The result of billing, including both line sets and the audit step.
#[derive(Debug, Clone)]
pub struct BillingResult {
    /// Insurer lines: service lines in code order, then levy lines in code order.
    pub insurer_lines: Vec<BillableLine>,
    /// Private lines in the same order.
    pub private_lines: Vec<BillableLine>,
    /// Prices used per code.
    pub prices: BTreeMap<ServiceCode, CodePrices>,
    /// Pricing problems.
    pub warnings: Vec<AuditWarning>,
    /// The audit step recording this stage.
    pub audit_step: AuditStep,
}

/// Tariff tables and overrides used to price a run.
#[derive(Debug, Clone, Copy)]
pub struct PriceSources<'a> {
    /// Unit prices by code.
    pub tariff: &'a TariffTable,
    /// Levy prices by code.
    pub levy: &'a LevyTable,
    /// Delivery-line overrides.
    pub delivered: &'a DeliveredQuantities,
    /// The approval, used to tell unknown codes from missing tariffs.
    pub approval: &'a Approval,
    /// Codes of the service catalogue; a catalogued code is never unknown.
    pub catalogue: &'a BTreeSet<ServiceCode>,
}

impl PriceSources<'_> {
    /// Resolves the prices for `code`.
    pub fn resolve(&self, code: &ServiceCode) -> CodePrices {
        let unit_price = self
            .delivered
            .unit_prices
            .get(code)
            .copied()
            .or_else(|| self.tariff.get(code))
            .unwrap_or(Decimal::ZERO);
        let levy_price = self
            .delivered
            .levy_prices
            .get(code)
            .copied()
            .or_else(|| self.levy.get(code))
            .unwrap_or(Decimal::ZERO);

        CodePrices {
            unit_price,
            levy_price,
        }
    }

    /// Warns when `code` has to be billed without a unit price.
    fn missing_price_warning(&self, code: &ServiceCode) -> Option<AuditWarning> {
        if self.delivered.unit_prices.contains_key(code) || self.tariff.contains(code) {
            return None;
        }

        let known = self.levy.contains(code)
            || self.approval.mentions(code)
            || self.catalogue.contains(code);
        if known {
            Some(AuditWarning {
                code: "MISSING_TARIFF".to_string(),
                message: format!("{} has no tariff price; billed at 0.00", code),
                severity: WarningSeverity::Medium,
                service_code: Some(code.clone()),
            })
        } else {
            Some(AuditWarning {
                code: "UNKNOWN_SERVICE_CODE".to_string(),
                message: format!(
                    "{} is neither approved, catalogued nor in the tariff; billed at 0.00",
                    code
                ),
                severity: WarningSeverity::High,
                service_code: Some(code.clone()),
            })
        }
    }
}

fn service_line(
    code: &ServiceCode,
    quantity: Decimal,
    unit_price: Decimal,
) -> EngineResult<BillableLine> {
    Ok(BillableLine {
        code: code.clone(),
        quantity,
        unit_price,
        line_total: line_total(quantity, unit_price)?,
        is_levy: false,
    })
}

fn levy_line(
    code: &ServiceCode,
    quantity: Decimal,
    levy_price: Decimal,
) -> EngineResult<BillableLine> {
    Ok(BillableLine {
        is_levy: true,
        ..service_line(code, quantity, levy_price)?
    })
}

/// Builds both invoices' lines from the final split.
///
/// A code with a positive quantity on an invoice gets one service line there
/// and, if its levy price is positive, one levy line of the same quantity.
/// Fails only if a line total overflows.
pub fn build_lines(
    table: &SplitTable,
    sources: PriceSources<'_>,
    step_number: u32,
) -> EngineResult<BillingResult> {
    let mut insurer_services = Vec::new();
    let mut insurer_levies = Vec::new();
    let mut private_services = Vec::new();
    let mut private_levies = Vec::new();
    let mut prices = BTreeMap::new();
    let mut warnings = Vec::new();

    for (code, split) in table.iter() {
        let price = sources.resolve(code);
        prices.insert(code.clone(), price);

        let billed = split.current.total() > Decimal::ZERO || split.delivered > Decimal::ZERO;
        if billed {
            warnings.extend(sources.missing_price_warning(code));
        }

        let has_levy = price.levy_price > Decimal::ZERO;
        if split.current.insurer > Decimal::ZERO {
            insurer_services.push(service_line(code, split.current.insurer, price.unit_price)?);
            if has_levy {
                insurer_levies.push(levy_line(code, split.current.insurer, price.levy_price)?);
            }
        }
        if split.current.private > Decimal::ZERO {
            private_services.push(service_line(code, split.current.private, price.unit_price)?);
            if has_levy {
                private_levies.push(levy_line(code, split.current.private, price.levy_price)?);
            }
        }
    }

    let audit_step = AuditStep {
        step_number,
        rule_id: "billable_lines".to_string(),
        rule_name: "Billable Line Generation".to_string(),
        service_code: None,
        input: serde_json::json!({
            "codes": table.len(),
            "price_overrides": sources.delivered.unit_prices.len(),
            "levy_overrides": sources.delivered.levy_prices.len()
        }),
        output: serde_json::json!({
            "insurer_service_lines": insurer_services.len(),
            "insurer_levy_lines": insurer_levies.len(),
            "private_service_lines": private_services.len(),
            "private_levy_lines": private_levies.len(),
            "unpriced_codes": warnings.len()
        }),
        reasoning: format!(
            "{} insurer and {} private lines priced; {} codes billed without a tariff price",
            insurer_services.len() + insurer_levies.len(),
            private_services.len() + private_levies.len(),
            warnings.len()
        ),
    };

    insurer_services.extend(insurer_levies);
    private_services.extend(private_levies);

    Ok(BillingResult {
        insurer_lines: insurer_services,
        private_lines: private_services,
        prices,
        warnings,
        audit_step,
    })
}
