//! The billing month a reconciliation is run for.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// A calendar month, identified by its first day.
///
/// Accepts `YYYY-MM`, `MM/YYYY` and `MM.YYYY` when parsed from a string and
/// always serializes as `YYYY-MM`.
///
/// # Example
///
/// ```
/// use care_billing::models::TargetMonth;
///
/// let month: TargetMonth = "03.2026".parse().unwrap();
/// assert_eq!(month.year(), 2026);
/// assert_eq!(month.month(), 3);
/// assert_eq!(month.to_string(), "2026-03");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TargetMonth {
    first_day: NaiveDate,
}

impl TargetMonth {
    /// Creates a target month, validating the month number.
    pub fn new(year: i32, month: u32) -> EngineResult<Self> {
        NaiveDate::from_ymd_opt(year, month, 1)
            .map(|first_day| Self { first_day })
            .ok_or_else(|| EngineError::InvalidTargetMonth {
                value: format!("{:04}-{:02}", year, month),
                message: "month out of range".to_string(),
            })
    }

    /// Returns the month containing `date`.
    pub fn containing(date: NaiveDate) -> Self {
        Self {
            first_day: date - Days::new(u64::from(date.day0())),
        }
    }

    /// The calendar year.
    pub fn year(&self) -> i32 {
        self.first_day.year()
    }

    /// The month number, 1 to 12.
    pub fn month(&self) -> u32 {
        self.first_day.month()
    }

    /// The first day of the month.
    pub fn first_day(&self) -> NaiveDate {
        self.first_day
    }

    /// Iterates over every day of the month.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let month = self.month();
        self.first_day
            .iter_days()
            .take_while(move |day| day.month() == month)
    }
}

impl fmt::Display for TargetMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year(), self.month())
    }
}

impl FromStr for TargetMonth {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |message: &str| EngineError::InvalidTargetMonth {
            value: s.to_string(),
            message: message.to_string(),
        };

        let parts: Vec<&str> = s.trim().split(['-', '/', '.']).collect();
        let [first, second] = parts.as_slice() else {
            return Err(invalid("expected YYYY-MM, MM/YYYY or MM.YYYY"));
        };

        let (year, month) = if first.len() == 4 {
            (first, second)
        } else {
            (second, first)
        };

        let year: i32 = year.parse().map_err(|_| invalid("year is not a number"))?;
        let month: u32 = month
            .parse()
            .map_err(|_| invalid("month is not a number"))?;

        Self::new(year, month).map_err(|_| invalid("month out of range"))
    }
}

impl TryFrom<String> for TargetMonth {
    type Error = EngineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TargetMonth> for String {
    fn from(month: TargetMonth) -> Self {
        month.to_string()
    }
}
