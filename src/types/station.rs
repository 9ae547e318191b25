//! Defines the canonical representation of a surface weather station as produced
//! by roster normalization.

use serde::{Deserialize, Serialize};

/// A single weather station with validated identity and coordinates.
///
/// Instances are only ever produced by [`crate::normalize_stations`], which
/// guarantees that `id` is non-empty and upper-cased and that both coordinates
/// are finite and within range (latitude in `[-90, 90]`, longitude in
/// `[-180, 180]`). Upstream records that cannot satisfy these guarantees are
/// dropped rather than represented with sentinel values.
///
/// A station is immutable once built; a roster refresh replaces the whole
/// collection instead of patching individual entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Station {
    /// Upper-cased station identifier, usually an ICAO-style code (e.g. "KSFO").
    pub id: String,
    /// Human-readable station name, if the upstream record carried one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// City the station is associated with, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    /// State or region code, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    /// Latitude in decimal degrees (positive for North, negative for South).
    pub latitude: f64,
    /// Longitude in decimal degrees (positive for East, negative for West).
    pub longitude: f64,
    /// Elevation above sea level, if the upstream record carried a finite number.
    pub elevation: Option<f64>,
}
