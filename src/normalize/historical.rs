//! Historical-observation normalization: raw upstream JSON to a
//! [`HistoricalPayload`] with per-record tolerance.

use crate::normalize::finite_num;
use crate::types::historical::{HistoricalPayload, HistoricalRecord};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::{Map, Value};

const CONTAINER_KEYS: &[&str] = &["data", "points", "observations", "records"];

const NO_DATA: &str = "Upstream returned no data for this station.";
const NOT_AN_OBJECT: &str = "Dropped a corrupted record (not an object).";
const BAD_TIMESTAMP: &str = "Dropped a corrupted record (bad timestamp).";

/// Normalizes an upstream historical-weather document for one station.
///
/// Accepts a bare JSON array or the first array found under a known container
/// key (`data`, `points`, `observations`, `records`, in that order). Records
/// are mapped independently and in order: a malformed record is dropped with
/// exactly one warning instead of failing the batch, and an empty or missing
/// sequence produces an empty payload with a single "no data" warning.
///
/// Numeric fields pass through only when they are finite JSON numbers;
/// everything else becomes `None`. Wind speed resolution order: `wind_speed`,
/// then `wind`, then the magnitude of a finite `wind_x`/`wind_y` pair.
pub fn normalize_historical(raw: &Value) -> HistoricalPayload {
    let mut warnings = Vec::new();

    let items = historical_items(raw);
    let items = match items {
        Some(items) if !items.is_empty() => items,
        _ => {
            warnings.push(NO_DATA.to_string());
            return HistoricalPayload {
                data: Vec::new(),
                warnings,
            };
        }
    };

    let mut data = Vec::with_capacity(items.len());
    for item in items {
        let Some(obj) = item.as_object() else {
            warnings.push(NOT_AN_OBJECT.to_string());
            continue;
        };
        let timestamp = obj
            .get("timestamp")
            .and_then(Value::as_str)
            .filter(|raw| parses_as_datetime(raw));
        let Some(timestamp) = timestamp else {
            warnings.push(BAD_TIMESTAMP.to_string());
            continue;
        };

        data.push(HistoricalRecord {
            timestamp: timestamp.to_string(),
            temperature: finite_num(obj.get("temperature")),
            wind_speed: wind_speed(obj),
            wind_gust: finite_num(obj.get("wind_gust")),
            pressure: finite_num(obj.get("pressure")),
            precip: finite_num(obj.get("precip")),
        });
    }

    HistoricalPayload { data, warnings }
}

fn historical_items(raw: &Value) -> Option<&Vec<Value>> {
    if let Some(items) = raw.as_array() {
        return Some(items);
    }
    CONTAINER_KEYS
        .iter()
        .find_map(|key| raw.get(*key).and_then(Value::as_array))
}

fn wind_speed(obj: &Map<String, Value>) -> Option<f64> {
    if let Some(speed) = finite_num(obj.get("wind_speed")) {
        return Some(speed);
    }
    if let Some(speed) = finite_num(obj.get("wind")) {
        return Some(speed);
    }
    match (finite_num(obj.get("wind_x")), finite_num(obj.get("wind_y"))) {
        (Some(x), Some(y)) => Some(x.hypot(y)),
        _ => None,
    }
}

/// Accepts the timestamp shapes seen from upstream: RFC 3339, a normal
/// date-time with either a space or `T` separator (seconds optional), or a
/// bare date.
fn parses_as_datetime(raw: &str) -> bool {
    if DateTime::parse_from_rfc3339(raw).is_ok() {
        return true;
    }
    const FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
    ];
    if FORMATS
        .iter()
        .any(|format| NaiveDateTime::parse_from_str(raw, format).is_ok())
    {
        return true;
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn maps_clean_records_without_warnings() {
        let raw = json!([
            {"timestamp": "2025-08-30 21:51", "temperature": 18.2, "wind_speed": 4.1,
             "wind_gust": 7.0, "pressure": 1013.4, "precip": 0.0},
            {"timestamp": "2025-08-30 22:51", "temperature": 17.9, "wind_speed": 3.6,
             "wind_gust": null, "pressure": 1013.0, "precip": 0.2}
        ]);
        let payload = normalize_historical(&raw);
        assert!(payload.warnings.is_empty());
        assert_eq!(payload.data.len(), 2);
        assert_eq!(payload.data[0].temperature, Some(18.2));
        assert_eq!(payload.data[1].wind_gust, None);
    }

    #[test]
    fn unwraps_each_known_container_key() {
        let record = json!({"timestamp": "2025-08-30T21:51:00Z", "temperature": 20.0});
        for key in ["data", "points", "observations", "records"] {
            let raw = json!({ key: [record] });
            let payload = normalize_historical(&raw);
            assert_eq!(payload.data.len(), 1, "container key {key} should unwrap");
            assert!(payload.warnings.is_empty());
        }
    }

    #[test]
    fn container_keys_are_probed_in_order() {
        let raw = json!({
            "records": [{"timestamp": "2025-01-01 00:00", "temperature": 1.0}],
            "points": [
                {"timestamp": "2025-01-01 00:00", "temperature": 2.0},
                {"timestamp": "2025-01-01 01:00", "temperature": 3.0}
            ]
        });
        let payload = normalize_historical(&raw);
        assert_eq!(payload.data.len(), 2, "points precedes records in the probe order");
    }

    #[test]
    fn empty_or_missing_sequence_warns_once() {
        for raw in [json!([]), json!({"data": []}), json!({}), json!(42), json!(null)] {
            let payload = normalize_historical(&raw);
            assert!(payload.data.is_empty());
            assert_eq!(payload.warnings, vec![NO_DATA.to_string()], "shape: {raw}");
        }
    }

    #[test]
    fn non_object_records_warn_and_are_dropped() {
        let raw = json!([
            {"timestamp": "2025-08-30 21:51", "temperature": 18.0},
            "garbage",
            17,
            {"timestamp": "2025-08-30 22:51", "temperature": 17.5}
        ]);
        let payload = normalize_historical(&raw);
        assert_eq!(payload.data.len(), 2);
        assert_eq!(payload.warnings, vec![NOT_AN_OBJECT.to_string(); 2]);
    }

    #[test]
    fn bad_timestamps_warn_and_are_dropped() {
        let raw = json!([
            {"timestamp": "yesterday-ish", "temperature": 18.0},
            {"temperature": 18.0},
            {"timestamp": 1725055860, "temperature": 18.0},
            {"timestamp": "2025-08-30 21:51", "temperature": 18.0}
        ]);
        let payload = normalize_historical(&raw);
        assert_eq!(payload.data.len(), 1);
        assert_eq!(payload.warnings, vec![BAD_TIMESTAMP.to_string(); 3]);
    }

    #[test]
    fn accepted_timestamp_shapes() {
        for ts in [
            "2025-08-30T21:51:00Z",
            "2025-08-30T21:51:00+02:00",
            "2025-08-30 21:51",
            "2025-08-30 21:51:33",
            "2025-08-30 21:51:33.250",
            "2025-08-30",
        ] {
            assert!(parses_as_datetime(ts), "{ts} should be accepted");
        }
        for ts in ["", "21:51", "30/08/2025", "2025-13-01", "soon"] {
            assert!(!parses_as_datetime(ts), "{ts} should be rejected");
        }
    }

    #[test]
    fn non_finite_and_non_numeric_values_become_none() {
        let raw = json!([
            {"timestamp": "2025-08-30 21:51", "temperature": "18.2",
             "pressure": true, "precip": [1.0], "wind_gust": {"v": 2.0}}
        ]);
        let record = &normalize_historical(&raw).data[0];
        assert_eq!(record.temperature, None, "numeric strings do not coerce here");
        assert_eq!(record.pressure, None);
        assert_eq!(record.precip, None);
        assert_eq!(record.wind_gust, None);
    }

    #[test]
    fn wind_speed_resolution_order() {
        let raw = json!([
            {"timestamp": "2025-08-30 21:51", "wind_speed": 5.0, "wind": 9.0},
            {"timestamp": "2025-08-30 21:51", "wind": 9.0, "wind_x": 3.0, "wind_y": 4.0},
            {"timestamp": "2025-08-30 21:51", "wind_x": 3.0, "wind_y": 4.0},
            {"timestamp": "2025-08-30 21:51", "wind_speed": null, "wind": 6.5},
            {"timestamp": "2025-08-30 21:51", "wind_x": 3.0},
            {"timestamp": "2025-08-30 21:51"}
        ]);
        let payload = normalize_historical(&raw);
        let speeds: Vec<Option<f64>> = payload.data.iter().map(|r| r.wind_speed).collect();
        assert_eq!(speeds, [Some(5.0), Some(9.0), Some(5.0), Some(6.5), None, None]);
    }

    #[test]
    fn normalizing_twice_is_identical() {
        let raw = json!({"observations": [
            {"timestamp": "2025-08-30 21:51", "temperature": 18.2, "wind": 4.1},
            {"timestamp": "not-a-date", "temperature": 99.0},
            {"timestamp": "2025-08-30 22:51", "wind_x": 3.0, "wind_y": 4.0,
             "pressure": "high", "precip": 0.2},
            "garbage"
        ]});
        let first = normalize_historical(&raw);
        let second = normalize_historical(&raw);
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn record_order_is_preserved() {
        let raw = json!([
            {"timestamp": "2025-08-30 23:00", "temperature": 3.0},
            {"timestamp": "2025-08-30 21:00", "temperature": 1.0},
            {"timestamp": "2025-08-30 22:00", "temperature": 2.0}
        ]);
        let temps: Vec<Option<f64>> = normalize_historical(&raw)
            .data
            .iter()
            .map(|r| r.temperature)
            .collect();
        assert_eq!(temps, [Some(3.0), Some(1.0), Some(2.0)]);
    }
}
