//! Roster normalization: raw upstream JSON to canonical [`Station`]s.

use crate::normalize::{coerce_f64, first_defined, first_nonempty_str, first_str};
use crate::types::station::Station;
use serde_json::Value;

/// Aliases for an ICAO-style identifier, tried before the generic code group.
const ICAO_KEYS: &[&str] = &["station", "station_id", "icao"];
/// Generic short-code aliases, used when no ICAO-style field is present.
const CODE_KEYS: &[&str] = &["id", "code"];
const LAT_KEYS: &[&str] = &["latitude", "lat"];
const LON_KEYS: &[&str] = &["longitude", "lon", "lng"];
const NAME_KEYS: &[&str] = &["name", "station_name", "description"];
const CONTAINER_KEYS: &[&str] = &["data", "stations"];

/// Normalizes an upstream roster document into canonical stations.
///
/// Accepts a bare JSON array or the first array found under a known container
/// key (`data`, then `stations`). Each element is mapped independently;
/// elements without a usable identifier or with missing, non-finite or
/// out-of-range coordinates are dropped. The output order follows the input.
///
/// Identity resolution prefers a 4-letter ICAO-style field. When only a
/// 3-character generic code plus a `state` string are present, a US ICAO id is
/// synthesized by prefixing `K`. The final id is always upper-cased.
pub fn normalize_stations(raw: &Value) -> Vec<Station> {
    let Some(items) = station_items(raw) else {
        return Vec::new();
    };
    items.iter().filter_map(station_from_value).collect()
}

/// Locates the roster array inside the upstream document, if any.
pub(crate) fn station_items(raw: &Value) -> Option<&Vec<Value>> {
    if let Some(items) = raw.as_array() {
        return Some(items);
    }
    CONTAINER_KEYS
        .iter()
        .find_map(|key| raw.get(*key).and_then(Value::as_array))
}

fn station_from_value(item: &Value) -> Option<Station> {
    let obj = item.as_object()?;

    let icao = first_nonempty_str(obj, ICAO_KEYS);
    let code = first_nonempty_str(obj, CODE_KEYS);
    let state = obj.get("state").and_then(Value::as_str);

    let id = match (icao, code) {
        (Some(icao), _) => icao.to_uppercase(),
        // A bare 3-letter US code alongside a state becomes "K" + code.
        (None, Some(code)) if code.chars().count() == 3 && state.is_some() => {
            format!("K{}", code.to_uppercase())
        }
        (None, Some(code)) => code.to_uppercase(),
        (None, None) => return None,
    };

    let latitude = first_defined(obj, LAT_KEYS).and_then(coerce_f64)?;
    let longitude = first_defined(obj, LON_KEYS).and_then(coerce_f64)?;
    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        return None;
    }

    Some(Station {
        id,
        name: first_str(obj, NAME_KEYS).map(str::to_owned),
        city: obj.get("city").and_then(Value::as_str).map(str::to_owned),
        state: state.map(str::to_owned),
        latitude,
        longitude,
        elevation: obj.get("elevation").and_then(Value::as_f64).filter(|e| e.is_finite()),
    })
}
