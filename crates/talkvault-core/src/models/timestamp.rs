//! Lenient timestamp parsing.
//!
//! The backend serializes `datetime.utcnow()` values, which come out without
//! a UTC offset (`2024-05-01T09:30:00.123456`). Timestamps with an offset are
//! accepted too and normalized to UTC.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};

/// Parse an ISO-8601 timestamp with or without an offset.
pub fn parse(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
        .map(|naive| naive.and_utc())
}

/// Serde adapter for `Option<DateTime<Utc>>` fields.
/// Unparseable values become `None` rather than failing the whole payload.
pub fn deserialize_option<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse))
}
