use geo_types::Point;
use serde::{Deserialize, Serialize};

/// A single reported geographic position with its report time in
/// milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoFix {
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp_ms: i64,
}

impl GeoFix {
    pub fn new(latitude: f64, longitude: f64, timestamp_ms: i64) -> Self {
        Self {
            latitude,
            longitude,
            timestamp_ms,
        }
    }

    /// True when both coordinates are finite and inside the valid
    /// latitude/longitude ranges. Fixes failing this are dropped upstream.
    pub fn has_valid_coordinates(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    pub fn position(&self) -> Point<f64> {
        Point::new(self.longitude, self.latitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_boundary_coordinates() {
        assert!(GeoFix::new(90.0, 180.0, 0).has_valid_coordinates());
        assert!(GeoFix::new(-90.0, -180.0, 0).has_valid_coordinates());
        assert!(GeoFix::new(0.0, 0.0, 0).has_valid_coordinates());
    }

    #[test]
    fn rejects_out_of_range_coordinates() {
        assert!(!GeoFix::new(90.1, 0.0, 0).has_valid_coordinates());
        assert!(!GeoFix::new(-91.0, 0.0, 0).has_valid_coordinates());
        assert!(!GeoFix::new(0.0, 180.5, 0).has_valid_coordinates());
        assert!(!GeoFix::new(0.0, -181.0, 0).has_valid_coordinates());
    }

    #[test]
    fn rejects_non_finite_coordinates() {
        assert!(!GeoFix::new(f64::NAN, 0.0, 0).has_valid_coordinates());
        assert!(!GeoFix::new(0.0, f64::INFINITY, 0).has_valid_coordinates());
        assert!(!GeoFix::new(f64::NEG_INFINITY, 0.0, 0).has_valid_coordinates());
    }

    #[test]
    fn position_maps_lon_to_x_and_lat_to_y() {
        let fix = GeoFix::new(55.68, 12.57, 0);
        let point = fix.position();
        assert_eq!(point.x(), 12.57);
        assert_eq!(point.y(), 55.68);
    }
}
