use serde::{Deserialize, Serialize};

use crate::geo_fix::GeoFix;

/// A persisted route coordinate. Timestamps are not part of the stored
/// layout, only the coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl From<&GeoFix> for PathPoint {
    fn from(fix: &GeoFix) -> Self {
        Self {
            latitude: fix.latitude,
            longitude: fix.longitude,
        }
    }
}

/// A finalized, saved tracking attempt. Immutable once created.
///
/// Field names on the wire are pinned for compatibility with previously
/// stored collections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    #[serde(rename = "id")]
    pub session_id: i64,
    pub path: Vec<PathPoint>,
    #[serde(rename = "distanceKm")]
    pub distance_km: f64,
    #[serde(rename = "durationSec")]
    pub duration_sec: f64,
}

impl Session {
    /// Builds the immutable record from a completed route. Callers are
    /// responsible for only passing routes with at least two fixes.
    pub fn from_route(
        session_id: i64,
        route: &[GeoFix],
        total_distance_m: f64,
        elapsed_ms: i64,
    ) -> Self {
        Self {
            session_id,
            path: route.iter().map(PathPoint::from).collect(),
            distance_km: round_to(total_distance_m / 1000.0, 2),
            duration_sec: round_to(elapsed_ms as f64 / 1000.0, 1),
        }
    }
}

fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}
