//! Delivery models.
//!
//! A delivery is what was actually performed in the billing month, as stated
//! on the original (pre-correction) invoice.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::ServiceCode;

/// One row of a delivery record.
///
/// `unit_price` and `levy_price` override the tariff tables for this code
/// when present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryLine {
    /// The delivered service code.
    pub code: ServiceCode,
    /// Number of units delivered.
    pub quantity: Decimal,
    /// Optional unit price overriding the tariff.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<Decimal>,
    /// Optional training levy per unit overriding the levy table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub levy_price: Option<Decimal>,
}

impl DeliveryLine {
    /// Creates a line priced from the tariff tables.
    pub fn new(code: ServiceCode, quantity: Decimal) -> Self {
        Self {
            code,
            quantity,
            unit_price: None,
            levy_price: None,
        }
    }

    /// Sets a unit price override.
    pub fn with_unit_price(mut self, unit_price: Decimal) -> Self {
        self.unit_price = Some(unit_price);
        self
    }

    /// Sets a levy price override.
    pub fn with_levy_price(mut self, levy_price: Decimal) -> Self {
        self.levy_price = Some(levy_price);
        self
    }
}

/// A complete delivery record as produced by the ingestion layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delivery {
    /// The delivered lines. Several lines may share a code.
    #[serde(default)]
    pub lines: Vec<DeliveryLine>,
}

impl Delivery {
    /// Creates a delivery from its lines.
    pub fn new(lines: Vec<DeliveryLine>) -> Self {
        Self { lines }
    }
}
