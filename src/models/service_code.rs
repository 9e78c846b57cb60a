//! Service code identifiers.
//!
//! Service codes ("Leistungskomplexe" such as `LK04` or `LK11a`) arrive from
//! OCR output and manual entry in every imaginable spelling. [`ServiceCode`]
//! is the single canonical form used for all lookups and comparisons.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// A normalized, case-insensitive service code.
///
/// The canonical form has surrounding and internal whitespace removed and is
/// ASCII uppercase. A `ServiceCode` can only be obtained through
/// [`ServiceCode::parse`] (or deserialization, which calls it), so every value
/// in the engine is already canonical.
///
/// # Example
///
/// ```
/// use care_billing::models::ServiceCode;
///
/// let code = ServiceCode::parse(" lk 11a ").unwrap();
/// assert_eq!(code.as_str(), "LK11A");
/// assert_eq!(code, ServiceCode::parse("LK11A").unwrap());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ServiceCode(String);

impl ServiceCode {
    /// Normalizes a raw code into its canonical form.
    ///
    /// Returns [`EngineError::InvalidServiceCode`] when nothing but whitespace
    /// is left.
    pub fn parse(raw: &str) -> EngineResult<Self> {
        let canonical = canonicalize(raw);
        if canonical.is_empty() {
            return Err(EngineError::InvalidServiceCode {
                code: raw.to_string(),
            });
        }

        Ok(Self(canonical))
    }

    /// Builds a code from a non-empty literal.
    pub(crate) fn from_static(raw: &'static str) -> Self {
        Self(canonicalize(raw))
    }

    /// Returns the canonical string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn canonicalize(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

impl fmt::Display for ServiceCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ServiceCode {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ServiceCode {
    type Error = EngineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ServiceCode> for String {
    fn from(code: ServiceCode) -> Self {
        code.0
    }
}
