//! Fourteen-digit memento timestamps (`YYYYMMDDhhmmss`).

use std::fmt;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Length of every memento timestamp.
pub const TIMESTAMP_LEN: usize = 14;

const FORMAT: &str = "%Y%m%d%H%M%S";

/// A memento timestamp. Always exactly 14 ASCII digits.
///
/// Ordering is lexical, which for fixed-width digit strings is the same as
/// numeric ordering.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Timestamp(String);

/// Error returned for strings that are not 14-digit timestamps.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid memento timestamp '{0}': expected 14 digits (YYYYMMDDhhmmss)")]
pub struct InvalidTimestamp(pub String);

impl Timestamp {
    /// Parse a string that must be exactly 14 digits.
    pub fn parse(s: &str) -> Result<Self, InvalidTimestamp> {
        if s.len() == TIMESTAMP_LEN && s.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(s.to_string()))
        } else {
            Err(InvalidTimestamp(s.to_string()))
        }
    }

    /// Build a timestamp from user-supplied date parts.
    ///
    /// Month and day are zero-padded to two digits and the result is padded
    /// with zeros on the right to 14 digits, so `(2020, "3", "")` becomes
    /// `20200301000000`. Empty month/day default to `01`.
    pub fn from_date_parts(year: i32, month: &str, day: &str) -> Result<Self, InvalidTimestamp> {
        let month = if month.trim().is_empty() { "01" } else { month.trim() };
        let day = if day.trim().is_empty() { "01" } else { day.trim() };
        let mut s = format!("{:04}{:0>2}{:0>2}", year, month, day);
        if !(0..=9999).contains(&year) || month.len() > 2 || day.len() > 2 {
            return Err(InvalidTimestamp(s));
        }
        while s.len() < TIMESTAMP_LEN {
            s.push('0');
        }
        Self::parse(&s)
    }

    /// Format a UTC instant as a timestamp.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt.format(FORMAT).to_string())
    }

    /// Parse an HTTP date such as a `Memento-Datetime` header
    /// (`Wed, 01 Jan 2020 12:00:00 GMT`).
    pub fn from_http_date(value: &str) -> Option<Self> {
        DateTime::parse_from_rfc2822(value.trim())
            .ok()
            .map(|dt| Self::from_datetime(dt.with_timezone(&Utc)))
    }

    /// The instant used to probe a timegate for one year: midday UTC on 1 January.
    pub fn probe_for_year(year: i32) -> Option<DateTime<Utc>> {
        Utc.with_ymd_and_hms(year, 1, 1, 12, 0, 0).single()
    }

    /// Numeric value, used for distance comparisons.
    pub fn as_u64(&self) -> u64 {
        // Fourteen digits always fit in a u64.
        self.0.parse().unwrap_or_default()
    }

    /// The `YYYY-MM-DD` part for display.
    pub fn display_date(&self) -> String {
        NaiveDate::parse_from_str(&self.0[..8], "%Y%m%d")
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|_| format!("{}-{}-{}", &self.0[..4], &self.0[4..6], &self.0[6..8]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Timestamp {
    type Error = InvalidTimestamp;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Timestamp> for String {
    fn from(ts: Timestamp) -> Self {
        ts.0
    }
}
