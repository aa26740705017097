//! Serde helpers that turn loosely-typed feed values into typed fields.
//!
//! Both feeds send numbers as either JSON numbers or formatted strings
//! (`"$1,234,000"`, `"2,150"`), lists as comma-joined strings, and `null`
//! wherever a value is unknown. These helpers absorb that at the ingestion
//! boundary so the rest of the engine only ever sees `Option<f64>`,
//! `Vec<String>` and friends.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};

use crate::pipeline::processing::numeric::parse_currency;

#[derive(Deserialize)]
#[serde(untagged)]
enum RawScalar {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    Other(serde_json::Value),
}

/// Number, numeric string, or null into `Option<f64>`. Non-finite and
/// unparsable values become `None`.
pub fn opt_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = match Option::<RawScalar>::deserialize(deserializer)? {
        Some(RawScalar::Int(n)) => Some(n as f64),
        Some(RawScalar::Float(n)) => Some(n),
        Some(RawScalar::Str(s)) => parse_currency(&s),
        _ => None,
    };
    Ok(value.filter(|n| n.is_finite()))
}

/// Integer id that may arrive as a number or a numeric string.
pub fn opt_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<RawScalar>::deserialize(deserializer)? {
        Some(RawScalar::Int(n)) => Some(n),
        Some(RawScalar::Float(n)) if n.is_finite() && n.fract() == 0.0 => Some(n as i64),
        Some(RawScalar::Str(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Free text that may arrive as a number (MLS ids do); blank strings become `None`.
pub fn opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = match Option::<RawScalar>::deserialize(deserializer)? {
        Some(RawScalar::Str(s)) => Some(s),
        Some(RawScalar::Int(n)) => Some(n.to_string()),
        Some(RawScalar::Float(n)) => Some(n.to_string()),
        _ => None,
    };
    Ok(value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty()))
}

/// Booleans sent as `true`, `"Y"`, `"yes"`, `1` and so on.
pub fn opt_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<RawScalar>::deserialize(deserializer)? {
        Some(RawScalar::Bool(b)) => Some(b),
        Some(RawScalar::Int(n)) => Some(n != 0),
        Some(RawScalar::Str(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "y" | "1" => Some(true),
            "false" | "no" | "n" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    })
}

/// A list given either as a JSON array or as one comma-joined string.
/// Entries are trimmed and blanks dropped.
pub fn string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawList {
        Joined(String),
        Items(Vec<Option<String>>),
        Other(serde_json::Value),
    }

    let items: Vec<String> = match Option::<RawList>::deserialize(deserializer)? {
        Some(RawList::Joined(s)) => s.split(',').map(str::to_string).collect(),
        Some(RawList::Items(items)) => items.into_iter().flatten().collect(),
        _ => Vec::new(),
    };
    Ok(items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect())
}

/// Treats an explicit `null` like a missing field.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Calendar date from an ISO date, an RFC 3339 timestamp, or `MM/DD/YYYY`.
pub fn opt_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(opt_string(deserializer)?.and_then(|s| parse_date(&s)))
}

/// UTC timestamp from RFC 3339, a naive `YYYY-MM-DDTHH:MM:SS`, or a bare date.
pub fn opt_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(opt_string(deserializer)?.and_then(|s| parse_timestamp(&s)))
}

pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%m/%d/%Y"))
        .ok()
        .or_else(|| parse_timestamp(s).map(|ts| ts.date_naive()))
}

pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
