//! Request types for the Care Billing API.
//!
//! This module defines the JSON request structure for the `/reconcile` endpoint.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{Approval, Delivery, TargetMonth};

/// Request body for the `/reconcile` endpoint.
///
/// The insurer budget is given either directly or as a care level that is
/// looked up in the configured care-level budgets. An explicit budget wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileRequest {
    /// The approval as extracted from the insurer's document.
    pub approval: Approval,
    /// The services actually delivered.
    pub delivery: Delivery,
    /// The billing month (`YYYY-MM`, `MM/YYYY` or `MM.YYYY`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_month: Option<TargetMonth>,
    /// Approval reference date as printed on the document, used when the
    /// approval carries no parsed date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_date: Option<String>,
    /// Fixed monthly insurer contribution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insurer_budget: Option<Decimal>,
    /// Care level (Pflegegrad) whose statutory budget applies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub care_level: Option<u8>,
    /// Overrides the configured investment surcharge rate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub investment_rate: Option<Decimal>,
}
