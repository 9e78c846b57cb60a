//! Approval models.
//!
//! An approval ("Bewilligung") states how many units of each service code the
//! insurer or welfare office covers, either per week or per month.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::ServiceCode;

/// The period an approved quantity refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalUnit {
    /// N units per week; converted with the calendar factor of the target month.
    #[serde(alias = "woechentlich", alias = "week")]
    Weekly,
    /// N units per month.
    #[serde(alias = "monatlich", alias = "month")]
    Monthly,
}

/// One row of an approval document.
///
/// # Example
///
/// ```
/// use care_billing::models::{ApprovalLine, ApprovalUnit, ServiceCode};
/// use rust_decimal::Decimal;
///
/// let line = ApprovalLine::weekly(ServiceCode::parse("LK02").unwrap(), Decimal::from(7));
/// assert_eq!(line.unit, ApprovalUnit::Weekly);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalLine {
    /// The approved service code.
    pub code: ServiceCode,
    /// The approved quantity per `unit`.
    pub quantity: Decimal,
    /// Whether `quantity` is per week or per month.
    pub unit: ApprovalUnit,
}

impl ApprovalLine {
    /// Creates a line approving `quantity` units per week.
    pub fn weekly(code: ServiceCode, quantity: Decimal) -> Self {
        Self {
            code,
            quantity,
            unit: ApprovalUnit::Weekly,
        }
    }

    /// Creates a line approving `quantity` units per month.
    pub fn monthly(code: ServiceCode, quantity: Decimal) -> Self {
        Self {
            code,
            quantity,
            unit: ApprovalUnit::Monthly,
        }
    }
}

/// A complete approval as produced by the ingestion layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approval {
    /// The approved lines. Several lines may share a code.
    #[serde(default)]
    pub lines: Vec<ApprovalLine>,
    /// Date used to pick the billing month when no explicit month is given.
    #[serde(default)]
    pub reference_date: Option<NaiveDate>,
}

impl Approval {
    /// Creates an approval without a reference date.
    pub fn new(lines: Vec<ApprovalLine>) -> Self {
        Self {
            lines,
            reference_date: None,
        }
    }

    /// Returns a copy of this approval with the given reference date.
    pub fn with_reference_date(mut self, date: NaiveDate) -> Self {
        self.reference_date = Some(date);
        self
    }

    /// Returns true if any line mentions `code`.
    pub fn mentions(&self, code: &ServiceCode) -> bool {
        self.lines.iter().any(|line| &line.code == code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_deserialize_approval() {
        let json = r#"{
            "lines": [
                { "code": "lk02", "quantity": "7", "unit": "weekly" },
                { "code": "LK14", "quantity": 20, "unit": "monthly" }
            ],
            "reference_date": "2026-03-01"
        }"#;

        let approval: Approval = serde_json::from_str(json).unwrap();
        assert_eq!(approval.lines.len(), 2);
        assert_eq!(approval.lines[0].code.as_str(), "LK02");
        assert_eq!(approval.lines[0].quantity, dec("7"));
        assert_eq!(approval.lines[1].unit, ApprovalUnit::Monthly);
        assert_eq!(
            approval.reference_date,
            Some(NaiveDate::from_ymd_opt(2026, 3, 1).unwrap())
        );
    }

    #[test]
    fn test_unit_accepts_german_aliases() {
        let unit: ApprovalUnit = serde_json::from_str("\"woechentlich\"").unwrap();
        assert_eq!(unit, ApprovalUnit::Weekly);
        let unit: ApprovalUnit = serde_json::from_str("\"monatlich\"").unwrap();
        assert_eq!(unit, ApprovalUnit::Monthly);
    }

    #[test]
    fn test_reference_date_is_optional() {
        let approval: Approval = serde_json::from_str(r#"{ "lines": [] }"#).unwrap();
        assert!(approval.reference_date.is_none());
    }

    #[test]
    fn test_mentions_uses_canonical_code() {
        let approval = Approval::new(vec![ApprovalLine::monthly(
            ServiceCode::parse("lk15").unwrap(),
            dec("10"),
        )]);
        assert!(approval.mentions(&ServiceCode::parse("LK15").unwrap()));
        assert!(!approval.mentions(&ServiceCode::parse("LK14").unwrap()));
    }
}
