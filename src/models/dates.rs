use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub const MIN_YEAR: u16 = 1900;
pub const MAX_YEAR: u16 = 2026;

/// A calendar date in `YYYY-MM-DD` form.
///
/// Validation is deliberately loose: the year must fall in
/// [`MIN_YEAR`]..=[`MAX_YEAR`], the month in 1..=12 and the day in 1..=31,
/// but the day is not checked against the length of the month. `2023-02-31`
/// is therefore a valid `Date` even though no such day exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Date {
    year: u16,
    month: u8,
    day: u8,
}

impl Date {
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::InvalidDate(s.to_string());
        let bytes = s.as_bytes();
        if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
            return Err(invalid());
        }

        let year: u16 = digits(&s[0..4]).ok_or_else(invalid)?;
        let month: u8 = digits(&s[5..7]).ok_or_else(invalid)?;
        let day: u8 = digits(&s[8..10]).ok_or_else(invalid)?;

        if !(MIN_YEAR..=MAX_YEAR).contains(&year)
            || !(1..=12).contains(&month)
            || !(1..=31).contains(&day)
        {
            return Err(invalid());
        }

        Ok(Self { year, month, day })
    }

    /// Parses either a plain date or a timestamp, keeping only the date.
    ///
    /// Accepted timestamps are `YYYY-MM-DD HH:MM:SS`,
    /// `YYYY-MM-DDTHH:MM:SS[.fff]` and RFC 3339. The time part is checked on
    /// its own, so the date part follows the same loose rule as [`Date::parse`].
    pub fn parse_date_or_timestamp(s: &str) -> Result<Self, ValidationError> {
        if s.len() <= 10 {
            return Self::parse(s);
        }
        let invalid = || ValidationError::InvalidDate(s.to_string());
        if !s.is_char_boundary(10) {
            return Err(invalid());
        }

        let (date, time) = s.split_at(10);
        // Any real date works here; only the time part is under test.
        let anchored = format!("2000-01-01{time}");
        let valid_time = DateTime::parse_from_rfc3339(&anchored).is_ok()
            || NaiveDateTime::parse_from_str(&anchored, "%Y-%m-%d %H:%M:%S").is_ok()
            || NaiveDateTime::parse_from_str(&anchored, "%Y-%m-%dT%H:%M:%S%.f").is_ok();
        if !valid_time {
            return Err(invalid());
        }

        Self::parse(date).map_err(|_| invalid())
    }

    pub fn year(&self) -> u16 {
        self.year
    }

    pub fn month(&self) -> u8 {
        self.month
    }

    pub fn day(&self) -> u8 {
        self.day
    }

    /// The matching chrono date, or `None` for a day the month does not have.
    pub fn to_naive(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year.into(), self.month.into(), self.day.into())
    }
}

fn digits<T: FromStr>(s: &str) -> Option<T> {
    if s.bytes().all(|b| b.is_ascii_digit()) {
        s.parse().ok()
    } else {
        None
    }
}

impl fmt::Display for Date {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

impl FromStr for Date {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Date {
    type Error = ValidationError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<Date> for String {
    fn from(date: Date) -> Self {
        date.to_string()
    }
}

/// Checks the `DDD-DDD-DDDD` phone number format.
pub fn is_valid_phone_number(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() == 12
        && bytes.iter().enumerate().all(|(i, b)| match i {
            3 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        })
}

/// Returns the input unchanged, or a [`ValidationError::Blank`] for an empty
/// or whitespace-only string.
pub(crate) fn require_text(field: &'static str, value: &str) -> Result<String, ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::Blank { field })
    } else {
        Ok(value.to_string())
    }
}
