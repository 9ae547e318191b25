//! Tolerant normalization of loosely-shaped upstream JSON into canonical types.
//!
//! Upstream field names drift between deployments, so extraction is
//! table-driven: each canonical field has an ordered list of accepted aliases,
//! and the helpers here walk those lists over raw [`serde_json::Value`]s.
//! Everything in this module is pure; callers decide what to log or cache.

pub mod historical;
pub mod stations;

pub use historical::normalize_historical;
pub use stations::normalize_stations;

use serde_json::{Map, Value};

/// First alias whose value is a non-empty string.
pub(crate) fn first_nonempty_str<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|key| {
        obj.get(*key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    })
}

/// First alias whose value is a string, empty or not.
pub(crate) fn first_str<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter().find_map(|key| obj.get(*key).and_then(Value::as_str))
}

/// First alias that is present and not JSON `null`. The value itself is
/// returned uncoerced so the caller decides how strictly to interpret it.
pub(crate) fn first_defined<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .find_map(|key| obj.get(*key).filter(|value| !value.is_null()))
}

/// Coerces a JSON number or numeric string to a finite `f64`.
///
/// Strings are trimmed and parsed; anything non-finite, non-numeric, boolean
/// or null yields `None`.
pub(crate) fn coerce_f64(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|f| f.is_finite())
}

/// Strict variant: accepts only a JSON number that is finite.
pub(crate) fn finite_num(value: Option<&Value>) -> Option<f64> {
    value.and_then(Value::as_f64).filter(|f| f.is_finite())
}
