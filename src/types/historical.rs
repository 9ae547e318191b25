//! Canonical historical observation records and the payload wrapper that
//! carries them together with any data-quality warnings.

use serde::{Deserialize, Serialize};

/// One historical observation for a station.
///
/// Every numeric field holds either a finite value or `None`; NaN, infinities
/// and non-numeric upstream junk are mapped to `None` during normalization.
/// `wind_speed` may have been derived from a `wind_x`/`wind_y` vector pair when
/// the upstream record carried no scalar speed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalRecord {
    /// Observation time as received from upstream. Guaranteed to parse as a
    /// calendar date-time; the raw text is preserved rather than reformatted.
    pub timestamp: String,
    pub temperature: Option<f64>,
    pub wind_speed: Option<f64>,
    pub wind_gust: Option<f64>,
    pub pressure: Option<f64>,
    pub precip: Option<f64>,
}

/// Normalized historical data for one station.
///
/// `data` preserves upstream order and is never deduplicated. `warnings`
/// accumulates one human-readable message per dropped record (plus a single
/// "no data" message when the upstream response was empty); a clean response
/// yields an empty list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoricalPayload {
    pub data: Vec<HistoricalRecord>,
    pub warnings: Vec<String>,
}
