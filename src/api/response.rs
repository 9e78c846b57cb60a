//! Response types for the Care Billing API.
//!
//! This module defines the success envelope, the error response structures
//! and the mapping from engine errors to HTTP status codes.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::EngineError;
use crate::models::ReconciliationResult;

/// Success response of the `/reconcile` endpoint.
///
/// The identifier, timestamp and duration live here rather than in the
/// result, so the result itself stays reproducible.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileResponse {
    /// Unique identifier of this run.
    pub reconciliation_id: Uuid,
    /// When the run was performed.
    pub timestamp: DateTime<Utc>,
    /// Version of the engine that produced the result.
    pub engine_version: String,
    /// Version of the tariff configuration used.
    pub tariff_version: String,
    /// Wall time of the run in microseconds.
    pub duration_us: u64,
    /// The reconciliation result.
    pub result: ReconciliationResult,
}

/// API error response structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Optional details about the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    /// Creates a new API error with details.
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: Some(details.into()),
        }
    }

    /// Creates a validation error response.
    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    /// Creates a malformed JSON error response.
    pub fn malformed_json(message: impl Into<String>) -> Self {
        Self::new("MALFORMED_JSON", message)
    }
}

/// API error with HTTP status code.
#[derive(Debug)]
pub struct ApiErrorResponse {
    /// The HTTP status code.
    pub status: StatusCode,
    /// The error body.
    pub error: ApiError,
}

impl ApiErrorResponse {
    /// A 400 response with the given body.
    pub fn bad_request(error: ApiError) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error,
        }
    }
}

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.error)).into_response()
    }
}

impl From<EngineError> for ApiErrorResponse {
    fn from(error: EngineError) -> Self {
        let message = error.to_string();
        match error {
            EngineError::ConfigNotFound { .. } | EngineError::ConfigParseError { .. } => {
                ApiErrorResponse {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    error: ApiError::with_details("CONFIG_ERROR", "Configuration error", message),
                }
            }
            EngineError::InvalidConfig { field, .. } => ApiErrorResponse {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                error: ApiError::with_details(
                    "INVALID_CONFIG",
                    message,
                    format!("The engine refused to price with the configured '{}'", field),
                ),
            },
            EngineError::TariffNotFound { date } => ApiErrorResponse {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                error: ApiError::with_details(
                    "TARIFF_NOT_FOUND",
                    message,
                    format!("No rates file is effective on or before {}", date),
                ),
            },
            EngineError::CareLevelNotFound { .. } => ApiErrorResponse::bad_request(
                ApiError::with_details(
                    "CARE_LEVEL_NOT_FOUND",
                    message,
                    "Supply insurer_budget or a care level with a configured budget",
                ),
            ),
            EngineError::MissingTargetMonth => {
                ApiErrorResponse::bad_request(ApiError::new("MISSING_TARGET_MONTH", message))
            }
            EngineError::InvalidTargetMonth { .. } => {
                ApiErrorResponse::bad_request(ApiError::new("INVALID_TARGET_MONTH", message))
            }
            EngineError::InvalidServiceCode { .. } => {
                ApiErrorResponse::bad_request(ApiError::new("INVALID_SERVICE_CODE", message))
            }
            EngineError::CalculationError { message } => ApiErrorResponse {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                error: ApiError::with_details("CALCULATION_ERROR", "Calculation failed", message),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_api_error_serialization() {
        let error = ApiError::new("TEST_ERROR", "Test message");
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("\"code\":\"TEST_ERROR\""));
        assert!(json.contains("\"message\":\"Test message\""));
        assert!(!json.contains("details"));
    }

    #[test]
    fn test_api_error_with_details_serialization() {
        let error = ApiError::with_details("TEST_ERROR", "Test message", "Some details");
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("\"details\":\"Some details\""));
    }

    #[test]
    fn test_missing_target_month_maps_to_bad_request() {
        let api_error: ApiErrorResponse = EngineError::MissingTargetMonth.into();
        assert_eq!(api_error.status, StatusCode::BAD_REQUEST);
        assert_eq!(api_error.error.code, "MISSING_TARGET_MONTH");
    }

    #[test]
    fn test_invalid_config_maps_to_server_error() {
        let api_error: ApiErrorResponse =
            EngineError::invalid_config("investment_rate", "must not be negative").into();
        assert_eq!(api_error.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(api_error.error.code, "INVALID_CONFIG");
    }

    #[test]
    fn test_care_level_not_found_maps_to_bad_request() {
        let api_error: ApiErrorResponse = EngineError::CareLevelNotFound {
            care_level: 1,
            date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
        }
        .into();
        assert_eq!(api_error.status, StatusCode::BAD_REQUEST);
        assert_eq!(api_error.error.code, "CARE_LEVEL_NOT_FOUND");
    }

    #[test]
    fn test_configuration_errors_are_server_errors() {
        let errors = [
            EngineError::ConfigNotFound {
                path: "rules.yaml".to_string(),
            },
            EngineError::TariffNotFound {
                date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            },
        ];
        for error in errors {
            assert!(error.is_configuration_error());
            let api_error: ApiErrorResponse = error.into();
            assert_eq!(api_error.status, StatusCode::INTERNAL_SERVER_ERROR);
        }
    }
}
