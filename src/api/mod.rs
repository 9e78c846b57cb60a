//! HTTP API module for the Care Billing engine.
//!
//! This module provides the REST endpoint that reconciles an approval
//! against a delivery using the tariff configuration loaded at startup.

mod handlers;
mod request;
mod response;
mod state;

pub use handlers::create_router;
pub use request::ReconcileRequest;
pub use response::{ApiError, ApiErrorResponse, ReconcileResponse};
pub use state::AppState;
