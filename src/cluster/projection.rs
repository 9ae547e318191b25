//! Spherical-mercator projection onto the unit square.
//!
//! Clustering happens in projected world coordinates where one unit spans the
//! whole map; pixel radii convert to world radii by dividing by the tile
//! extent times `2^zoom`.

use std::f64::consts::PI;

/// Longitude in degrees to world x in `[0, 1]`.
pub(crate) fn lng_x(lng: f64) -> f64 {
    lng / 360.0 + 0.5
}

/// Latitude in degrees to world y in `[0, 1]`, clamped at the poles.
pub(crate) fn lat_y(lat: f64) -> f64 {
    let sin = (lat * PI / 180.0).sin();
    let y = 0.5 - 0.25 * ((1.0 + sin) / (1.0 - sin)).ln() / PI;
    y.clamp(0.0, 1.0)
}

/// World x back to longitude in degrees.
pub(crate) fn x_lng(x: f64) -> f64 {
    (x - 0.5) * 360.0
}

/// World y back to latitude in degrees.
pub(crate) fn y_lat(y: f64) -> f64 {
    let y2 = (180.0 - y * 360.0) * PI / 180.0;
    360.0 * y2.exp().atan() / PI - 90.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_maps_to_center_of_world() {
        assert_eq!(lng_x(0.0), 0.5);
        assert!((lat_y(0.0) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn round_trips_within_tolerance() {
        for &(lat, lng) in &[(40.64, -73.78), (-33.95, 151.18), (64.13, -21.94), (0.0, 0.0)] {
            assert!((y_lat(lat_y(lat)) - lat).abs() < 1e-9, "lat {lat}");
            assert!((x_lng(lng_x(lng)) - lng).abs() < 1e-9, "lng {lng}");
        }
    }

    #[test]
    fn poles_clamp_to_world_edges() {
        assert_eq!(lat_y(90.0), 0.0);
        assert_eq!(lat_y(-90.0), 1.0);
        let near_pole = lat_y(85.05);
        assert!(near_pole > 0.0 && near_pole < 0.5);
    }

    #[test]
    fn longitude_spans_the_unit_interval() {
        assert_eq!(lng_x(-180.0), 0.0);
        assert_eq!(lng_x(180.0), 1.0);
    }
}
