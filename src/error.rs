//! Error types for the Care Billing engine.
//!
//! This module provides strongly-typed errors using the `thiserror` crate.
//! Only conditions that make an invoice untrustworthy are errors; problems
//! with individual delivery lines are reported as warnings in the
//! reconciliation diagnostics instead.

use chrono::NaiveDate;
use thiserror::Error;

/// The main error type for the Care Billing engine.
///
/// # Example
///
/// ```
/// use care_billing::error::EngineError;
///
/// let error = EngineError::ConfigNotFound {
///     path: "/missing/tariff.yaml".to_string(),
/// };
/// assert_eq!(error.to_string(), "Configuration file not found: /missing/tariff.yaml");
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    /// Configuration file was not found at the specified path.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Configuration file could not be parsed.
    #[error("Failed to parse configuration file '{path}': {message}")]
    ConfigParseError {
        /// The path to the file that failed to parse.
        path: String,
        /// A description of the parse error.
        message: String,
    },

    /// The configuration handed to the engine would produce invalid pricing.
    #[error("Invalid configuration '{field}': {message}")]
    InvalidConfig {
        /// The configuration field that was rejected.
        field: String,
        /// A description of what made it invalid.
        message: String,
    },

    /// No tariff table is effective for the requested date.
    #[error("No tariff effective on {date}")]
    TariffNotFound {
        /// The date for which a tariff was requested.
        date: NaiveDate,
    },

    /// The care level has no configured insurer budget.
    #[error("No insurer budget configured for care level {care_level} on {date}")]
    CareLevelNotFound {
        /// The requested care level.
        care_level: u8,
        /// The date for which the budget was requested.
        date: NaiveDate,
    },

    /// Neither an explicit target month nor an approval reference date was given.
    #[error("Target month missing: supply target_month or an approval reference_date")]
    MissingTargetMonth,

    /// A target month string could not be parsed.
    #[error("Invalid target month '{value}': {message}")]
    InvalidTargetMonth {
        /// The rejected input.
        value: String,
        /// A description of the parse failure.
        message: String,
    },

    /// A service code was empty or contained no usable characters.
    #[error("Invalid service code '{code}'")]
    InvalidServiceCode {
        /// The rejected raw code.
        code: String,
    },

    /// A general calculation error occurred.
    #[error("Calculation error: {message}")]
    CalculationError {
        /// A description of the calculation error.
        message: String,
    },
}

impl EngineError {
    /// Shorthand for an [`EngineError::InvalidConfig`].
    pub fn invalid_config(field: impl Into<String>, message: impl Into<String>) -> Self {
        EngineError::InvalidConfig {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Returns true for errors caused by engine configuration rather than request data.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            EngineError::ConfigNotFound { .. }
                | EngineError::ConfigParseError { .. }
                | EngineError::InvalidConfig { .. }
                | EngineError::TariffNotFound { .. }
        )
    }
}

/// A type alias for Results that return EngineError.
pub type EngineResult<T> = Result<T, EngineError>;
