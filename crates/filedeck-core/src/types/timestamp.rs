//! Record timestamp type.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, InvalidInputError};

/// Format used by the backend for `created` / `updated` fields.
const BACKEND_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3fZ";

/// A UTC timestamp as carried in record `created` / `updated` fields.
///
/// Parses both the backend form (`2024-06-01 12:34:56.789Z`) and RFC 3339,
/// and always serializes in the backend form.
///
/// # Example
///
/// ```
/// use filedeck_core::Timestamp;
///
/// let a = Timestamp::parse("2024-06-01 12:34:56.789Z").unwrap();
/// let b = Timestamp::parse("2024-06-01T12:34:56.789Z").unwrap();
/// assert_eq!(a, b);
/// assert_eq!(a.to_string(), "2024-06-01 12:34:56.789Z");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// The current time, truncated to milliseconds.
    pub fn now() -> Self {
        let now = Utc::now();
        let millis = now.timestamp_millis();
        Self(DateTime::from_timestamp_millis(millis).unwrap_or(now))
    }

    /// Parse a timestamp in backend or RFC 3339 form.
    pub fn parse(s: &str) -> Result<Self, Error> {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, BACKEND_FORMAT) {
            return Ok(Self(naive.and_utc()));
        }

        if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%SZ") {
            return Ok(Self(naive.and_utc()));
        }

        DateTime::parse_from_rfc3339(s)
            .map(|dt| Self(dt.with_timezone(&Utc)))
            .map_err(|e| {
                InvalidInputError::Timestamp {
                    value: s.to_string(),
                    reason: e.to_string(),
                }
                .into()
            })
    }

    /// Returns the inner date-time.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// RFC 3339 rendering with millisecond precision.
    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(BACKEND_FORMAT))
    }
}

impl FromStr for Timestamp {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Timestamp {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Timestamp::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_backend_format() {
        let ts = Timestamp::parse("2024-06-01 12:34:56.789Z").unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-06-01T12:34:56.789Z");
    }

    #[test]
    fn parses_backend_format_without_millis() {
        let ts = Timestamp::parse("2024-06-01 12:34:56Z").unwrap();
        assert_eq!(ts.to_string(), "2024-06-01 12:34:56.000Z");
    }

    #[test]
    fn parses_rfc3339_with_offset() {
        let ts = Timestamp::parse("2024-06-01T14:34:56+02:00").unwrap();
        assert_eq!(ts.to_string(), "2024-06-01 12:34:56.000Z");
    }

    #[test]
    fn rejects_garbage() {
        assert!(Timestamp::parse("yesterday").is_err());
    }

    #[test]
    fn orders_chronologically() {
        let a = Timestamp::parse("2024-06-01 12:00:00.000Z").unwrap();
        let b = Timestamp::parse("2024-06-01 12:00:00.001Z").unwrap();
        assert!(a < b);
    }
}
