//! Geographic bounding box used for viewport queries.

use serde::{Deserialize, Serialize};

/// A geographic bounding box in decimal degrees.
///
/// Follows the usual map-viewport convention of `[west, south, east, north]`.
/// Longitudes outside `[-180, 180]` are accepted and normalized by the query
/// layer, so a viewport that has been panned across the antimeridian (e.g.
/// `west: 170.0, east: -170.0`) works without caller-side fixups.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bbox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl Bbox {
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }
}

impl From<[f64; 4]> for Bbox {
    /// Converts from the `[west, south, east, north]` array form common in
    /// map libraries.
    fn from(bounds: [f64; 4]) -> Self {
        Self::new(bounds[0], bounds[1], bounds[2], bounds[3])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_form_maps_west_south_east_north() {
        let bbox = Bbox::from([-125.0, 24.0, -66.0, 49.0]);
        assert_eq!(bbox, Bbox::new(-125.0, 24.0, -66.0, 49.0));
        assert_eq!(bbox.west, -125.0);
        assert_eq!(bbox.north, 49.0);
    }
}
