//! Lenient deserializers for backend payloads
//!
//! The backend serializes money as JSON floats and timestamps as naive ISO
//! strings (sometimes with an offset). These helpers accept both shapes so
//! a record read back from the persisted cache parses the same way as one
//! fresh off the wire.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::de::Error;
use serde::{Deserialize, Deserializer};
use serde_json::Value as JsonValue;

/// Deserialize amount that can be number or string
pub fn deserialize_amount<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let value: JsonValue = Deserialize::deserialize(deserializer)?;
    match value {
        JsonValue::Number(n) => parse_decimal(&n.to_string()).map_err(D::Error::custom),
        JsonValue::String(s) => parse_decimal(&s).map_err(D::Error::custom),
        _ => Err(D::Error::custom("expected number or string for amount")),
    }
}

/// Deserialize optional amount that can be number, string or null
pub fn deserialize_optional_amount<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<JsonValue> = Option::deserialize(deserializer)?;
    match value {
        Some(JsonValue::Number(n)) => parse_decimal(&n.to_string())
            .map(Some)
            .map_err(D::Error::custom),
        Some(JsonValue::String(s)) => parse_decimal(&s).map(Some).map_err(D::Error::custom),
        Some(JsonValue::Null) | None => Ok(None),
        _ => Err(D::Error::custom("expected number or string for amount")),
    }
}

/// Deserialize a timestamp in any of the formats the backend emits
pub fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).ok_or_else(|| D::Error::custom(format!("invalid timestamp: {}", raw)))
}

/// Deserialize an optional timestamp
pub fn deserialize_optional_timestamp<'de, D>(
    deserializer: D,
) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw {
        Some(s) if !s.trim().is_empty() => parse_timestamp(&s)
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("invalid timestamp: {}", s))),
        _ => Ok(None),
    }
}

fn parse_decimal(s: &str) -> Result<Decimal, String> {
    // Floats such as 1e-7 come through serde_json in exponent form
    s.parse::<Decimal>()
        .or_else(|_| Decimal::from_scientific(s))
        .map_err(|e| format!("invalid decimal: {}", e))
}

/// Parse RFC 3339 (converted to UTC), naive ISO datetimes, or bare dates
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}
