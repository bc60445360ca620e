use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::{LokimapError, Result};

/// Nanosecond epoch value for cursor math. Saturates at the chrono range
/// limit (year 2262) instead of panicking.
pub fn to_nanos(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_nanos_opt().unwrap_or(i64::MAX)
}

pub fn from_nanos(ns: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_nanos(ns)
}

pub fn parse_duration_str(input: &str) -> Result<Duration> {
    humantime::parse_duration(input)
        .map_err(|e| LokimapError::Parse(format!("invalid duration {input}: {e}")))
}
