use geo_types::Point;

/// Spherical Earth radius used by the haversine formula, in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance in meters between two points given as
/// (longitude, latitude) degrees.
///
/// The haversine term is clamped to [0, 1] before the inverse step since
/// rounding can push it slightly outside the domain for near-identical or
/// near-antipodal points.
pub fn haversine_m(a: Point<f64>, b: Point<f64>) -> f64 {
    let lat1 = a.y().to_radians();
    let lat2 = b.y().to_radians();
    let delta_lat = (b.y() - a.y()).to_radians();
    let delta_lon = (b.x() - a.x()).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
    let h = h.clamp(0.0, 1.0);

    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_M * c
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo_fix::GeoFix;

    fn point(lat: f64, lon: f64) -> Point<f64> {
        GeoFix::new(lat, lon, 0).position()
    }

    #[test]
    fn zero_for_identical_points() {
        let p = point(55.6761, 12.5683);
        assert_eq!(haversine_m(p, p), 0.0);
    }

    #[test]
    fn one_degree_of_longitude_at_equator() {
        // Pins down both the formula and the 6,371,000 m radius.
        let d = haversine_m(point(0.0, 0.0), point(0.0, 1.0));
        assert!((d - 111_195.0).abs() < 1.0, "got {d}");
    }

    #[test]
    fn symmetric() {
        let a = point(55.6761, 12.5683);
        let b = point(40.7128, -74.0060);
        assert_eq!(haversine_m(a, b), haversine_m(b, a));
    }

    #[test]
    fn triangle_inequality_holds_approximately() {
        let a = point(0.0, 0.0);
        let b = point(10.0, 20.0);
        let c = point(-5.0, 40.0);
        let direct = haversine_m(a, c);
        let via_b = haversine_m(a, b) + haversine_m(b, c);
        assert!(direct <= via_b + 1e-6);
    }

    #[test]
    fn antipodal_points_stay_finite() {
        let d = haversine_m(point(0.0, 0.0), point(0.0, 180.0));
        assert!(d.is_finite());
        assert!((d - std::f64::consts::PI * EARTH_RADIUS_M).abs() < 1.0);
    }

    #[test]
    fn tiny_delta_stays_non_negative() {
        let a = point(55.676100000, 12.568300000);
        let b = point(55.676100001, 12.568300001);
        let d = haversine_m(a, b);
        assert!(d.is_finite());
        assert!(d >= 0.0);
    }
}
