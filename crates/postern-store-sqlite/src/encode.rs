//! Encoding helpers between domain types and SQLite column values.
//!
//! Timestamps that participate in SQL comparisons (passcode and rate-limit
//! expiries) are stored as integer unix seconds so the conditional
//! statements can compare them; record creation times are RFC 3339 strings.

use chrono::{DateTime, Utc};

use crate::{Error, Result};

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339()
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_epoch(dt: DateTime<Utc>) -> i64 {
  dt.timestamp()
}

pub fn decode_epoch(seconds: i64) -> Result<DateTime<Utc>> {
  DateTime::from_timestamp(seconds, 0).ok_or(Error::Timestamp(seconds))
}
