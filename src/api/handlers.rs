//! HTTP request handlers for the Care Billing API.
//!
//! This module contains the handler functions for all API endpoints.

use std::time::Instant;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::IntoResponse,
    routing::post,
};
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::calculation::{parse_reference_date, reconcile, resolve_target_month};
use crate::config::ConfigLoader;

use super::request::ReconcileRequest;
use super::response::{ApiError, ApiErrorResponse, ReconcileResponse};
use super::state::AppState;

/// Creates the API router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/reconcile", post(reconcile_handler))
        .with_state(state)
}

fn json_error(error: ApiErrorResponse) -> axum::response::Response {
    (
        error.status,
        [(header::CONTENT_TYPE, "application/json")],
        Json(error.error),
    )
        .into_response()
}

/// Handler for POST /reconcile endpoint.
///
/// Accepts an approval and a delivery and returns both invoices.
async fn reconcile_handler(
    State(state): State<AppState>,
    payload: Result<Json<ReconcileRequest>, JsonRejection>,
) -> impl IntoResponse {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, "Processing reconciliation request");

    let request = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => {
            let error = match rejection {
                JsonRejection::JsonDataError(err) => {
                    let body_text = err.body_text();
                    warn!(
                        correlation_id = %correlation_id,
                        error = %body_text,
                        "JSON data error"
                    );
                    if body_text.contains("missing field") {
                        ApiError::validation_error(body_text)
                    } else {
                        ApiError::malformed_json(body_text)
                    }
                }
                JsonRejection::JsonSyntaxError(err) => {
                    warn!(
                        correlation_id = %correlation_id,
                        error = %err,
                        "JSON syntax error"
                    );
                    ApiError::malformed_json(format!("Invalid JSON syntax: {}", err))
                }
                JsonRejection::MissingJsonContentType(_) => {
                    ApiError::new("MISSING_CONTENT_TYPE", "Content-Type must be application/json")
                }
                _ => ApiError::malformed_json("Failed to parse request body"),
            };
            return json_error(ApiErrorResponse::bad_request(error));
        }
    };

    match perform_reconciliation(request, state.config()) {
        Ok(response) => {
            info!(
                correlation_id = %correlation_id,
                reconciliation_id = %response.reconciliation_id,
                target_month = %response.result.diagnostics.target_month,
                insurer_payable = %response.result.insurer_totals.payable,
                private_payable = %response.result.private_totals.payable,
                warnings = response.result.diagnostics.warnings.len(),
                duration_us = response.duration_us,
                "Reconciliation completed successfully"
            );
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "application/json")],
                Json(response),
            )
                .into_response()
        }
        Err(error) => {
            warn!(
                correlation_id = %correlation_id,
                status = %error.status,
                code = %error.error.code,
                error = %error.error.message,
                "Reconciliation failed"
            );
            json_error(error)
        }
    }
}

/// Resolves month, budget and tariff for a request and runs the engine.
fn perform_reconciliation(
    request: ReconcileRequest,
    config: &ConfigLoader,
) -> Result<ReconcileResponse, ApiErrorResponse> {
    let start_time = Instant::now();
    let mut approval = request.approval;

    if approval.reference_date.is_none() {
        if let Some(raw) = &request.reference_date {
            let date = parse_reference_date(raw).ok_or_else(|| {
                ApiErrorResponse::bad_request(ApiError::with_details(
                    "INVALID_REFERENCE_DATE",
                    format!("Unrecognised reference date '{}'", raw),
                    "Expected YYYY-MM-DD, DD.MM.YYYY or DD/MM/YYYY",
                ))
            })?;
            approval.reference_date = Some(date);
        }
    }

    let month = resolve_target_month(request.target_month, &approval)?;

    let insurer_budget = match (request.insurer_budget, request.care_level) {
        (Some(budget), _) => budget,
        (None, Some(care_level)) => config.insurer_budget(care_level, month.first_day())?,
        (None, None) => {
            return Err(ApiErrorResponse::bad_request(ApiError::validation_error(
                "Either insurer_budget or care_level is required",
            )));
        }
    };

    let engine_config = config.reconcile_config(month, insurer_budget, request.investment_rate)?;
    let result = reconcile(&approval, &request.delivery, &engine_config)?;

    Ok(ReconcileResponse {
        reconciliation_id: Uuid::new_v4(),
        timestamp: Utc::now(),
        engine_version: env!("CARGO_PKG_VERSION").to_string(),
        tariff_version: config.metadata().version.clone(),
        duration_us: start_time.elapsed().as_micros() as u64,
        result,
    })
}
