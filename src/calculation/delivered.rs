//! Aggregation of delivered quantities.
//!
//! Sums delivery lines per service code and collects per-code price
//! overrides. Bad rows are coerced and reported, never rejected, so that a
//! single OCR misread cannot block a whole invoice.

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::models::{AuditWarning, Delivery, ServiceCode, WarningSeverity};

/// Largest quantity accepted on a single approval or delivery line.
pub const MAX_LINE_QUANTITY: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);

/// Largest unit or levy price accepted from a tariff or a delivery override.
pub const MAX_UNIT_PRICE: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);

/// Delivered quantities and price overrides per service code.
#[derive(Debug, Clone, Default)]
pub struct DeliveredQuantities {
    /// Summed delivered quantity per code.
    pub quantities: BTreeMap<ServiceCode, Decimal>,
    /// Unit price overrides per code (first valid override wins).
    pub unit_prices: BTreeMap<ServiceCode, Decimal>,
    /// Levy price overrides per code (first valid override wins).
    pub levy_prices: BTreeMap<ServiceCode, Decimal>,
    /// Problems found while aggregating.
    pub warnings: Vec<AuditWarning>,
}

impl DeliveredQuantities {
    /// Delivered quantity for `code`, zero if not delivered.
    pub fn get(&self, code: &ServiceCode) -> Decimal {
        self.quantities.get(code).copied().unwrap_or(Decimal::ZERO)
    }
}

fn warning(code: &str, message: String, severity: WarningSeverity, service: &ServiceCode) -> AuditWarning {
    AuditWarning {
        code: code.to_string(),
        message,
        severity,
        service_code: Some(service.clone()),
    }
}

fn out_of_range(quantity: Decimal, code: &ServiceCode) -> AuditWarning {
    warning(
        "QUANTITY_OUT_OF_RANGE",
        format!("Delivered quantity {} for {} coerced to 0", quantity, code),
        WarningSeverity::High,
        code,
    )
}

/// Records a price override, keeping the first valid one per code.
fn record_override(
    overrides: &mut BTreeMap<ServiceCode, Decimal>,
    warnings: &mut Vec<AuditWarning>,
    code: &ServiceCode,
    price: Option<Decimal>,
    kind: &str,
) {
    let Some(price) = price else {
        return;
    };

    if price < Decimal::ZERO {
        warnings.push(warning(
            "NEGATIVE_PRICE_IGNORED",
            format!("Negative {} {} for {} ignored; tariff price used", kind, price, code),
            WarningSeverity::Medium,
            code,
        ));
        return;
    }

    if price > MAX_UNIT_PRICE {
        warnings.push(warning(
            "PRICE_OUT_OF_RANGE",
            format!(
                "{} {} for {} exceeds {}; tariff price used",
                kind, price, code, MAX_UNIT_PRICE
            ),
            WarningSeverity::Medium,
            code,
        ));
        return;
    }

    match overrides.get(code) {
        Some(existing) if *existing != price => warnings.push(warning(
            "CONFLICTING_PRICE_OVERRIDE",
            format!(
                "{} has conflicting {} overrides {} and {}; using {}",
                code, kind, existing, price, existing
            ),
            WarningSeverity::Low,
            code,
        )),
        Some(_) => {}
        None => {
            overrides.insert(code.clone(), price);
        }
    }
}

/// Sums a delivery per service code.
///
/// Negative quantities and quantities above [`MAX_LINE_QUANTITY`] are coerced
/// to zero with a warning. Negative or out-of-range price overrides are
/// dropped with a warning.
pub fn aggregate_delivery(delivery: &Delivery) -> DeliveredQuantities {
    let mut aggregated = DeliveredQuantities::default();

    for line in &delivery.lines {
        let quantity = if line.quantity < Decimal::ZERO {
            aggregated.warnings.push(warning(
                "NEGATIVE_QUANTITY_COERCED",
                format!(
                    "Delivered quantity {} for {} coerced to 0",
                    line.quantity, line.code
                ),
                WarningSeverity::Medium,
                &line.code,
            ));
            Decimal::ZERO
        } else if line.quantity > MAX_LINE_QUANTITY {
            aggregated.warnings.push(out_of_range(line.quantity, &line.code));
            Decimal::ZERO
        } else {
            line.quantity
        };

        let total = aggregated
            .quantities
            .entry(line.code.clone())
            .or_insert(Decimal::ZERO);
        match total.checked_add(quantity) {
            Some(sum) => *total = sum,
            None => aggregated.warnings.push(out_of_range(quantity, &line.code)),
        }

        record_override(
            &mut aggregated.unit_prices,
            &mut aggregated.warnings,
            &line.code,
            line.unit_price,
            "unit price",
        );
        record_override(
            &mut aggregated.levy_prices,
            &mut aggregated.warnings,
            &line.code,
            line.levy_price,
            "levy price",
        );
    }

    aggregated
}
