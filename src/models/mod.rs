//! Core data models for the Care Billing engine.
//!
//! This module contains the inputs of a reconciliation ([`Approval`],
//! [`Delivery`]), the canonical [`ServiceCode`] and [`TargetMonth`] keys, and
//! the [`ReconciliationResult`] output.

mod approval;
mod delivery;
mod reconciliation_result;
mod service_code;
mod target_month;

pub use approval::{Approval, ApprovalLine, ApprovalUnit};
pub use delivery::{Delivery, DeliveryLine};
pub use reconciliation_result::{
    AuditStep, AuditWarning, BillableLine, CodeDiagnostics, Diagnostics, ReconciliationResult,
    Totals, WarningSeverity,
};
pub use service_code::ServiceCode;
pub use target_month::TargetMonth;
