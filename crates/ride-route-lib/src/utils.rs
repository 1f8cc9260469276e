//! Utility functions for coordinate conversions and geographic distances

use geo::Point;
use serde::{Deserialize, Serialize};

/// Web Mercator bounds in meters (EPSG:3857)
pub const EARTH_MERCATOR_MAX: f64 = 20037508.34;
pub const EARTH_MERCATOR_MIN: f64 = -20037508.34;
pub const EARTH_SIZE_METERS: f64 = EARTH_MERCATOR_MAX - EARTH_MERCATOR_MIN;

/// Maximum latitude that can be represented in Web Mercator
pub const MAX_LATITUDE: f64 = 85.05112878;

/// Mean Earth radius in meters, used by the haversine distance
pub const EARTH_RADIUS_M: f64 = 6371000.0;

// Meters per degree of longitude, meters per radian of northing, and their inverses
const LON_TO_X_FACTOR: f64 = EARTH_MERCATOR_MAX / 180.0;
const Y_FACTOR: f64 = EARTH_MERCATOR_MAX / std::f64::consts::PI;
const X_TO_LON_FACTOR: f64 = 180.0 / EARTH_MERCATOR_MAX;
const Y_TO_LAT_FACTOR: f64 = std::f64::consts::PI / EARTH_MERCATOR_MAX;

/// A WGS84 position in degrees
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    #[inline]
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Great-circle distance to `other` in meters
    #[inline]
    pub fn distance_to(&self, other: LatLon) -> f64 {
        haversine_distance(*self, other)
    }

    /// Project to Web Mercator meters
    #[inline]
    pub fn to_mercator(&self) -> Point<f64> {
        wgs84_to_mercator(self.lat, self.lon)
    }
}

/// WGS84 degrees to Web Mercator meters (x easting, y northing). Latitudes beyond
/// the Mercator limit are clamped.
#[inline(always)]
pub fn wgs84_to_mercator(lat: f64, lon: f64) -> Point<f64> {
    let lat = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE);

    let x = lon * LON_TO_X_FACTOR;

    let lat_rad = lat.to_radians();
    let y = (lat_rad.tan() + (1.0 / lat_rad.cos())).ln() * Y_FACTOR;

    Point::new(x, y)
}

/// Inverse of [`wgs84_to_mercator`]
#[inline(always)]
pub fn mercator_to_wgs84(x: f64, y: f64) -> LatLon {
    let lon = x * X_TO_LON_FACTOR;
    let lat =
        (std::f64::consts::PI / 2.0 - 2.0 * ((-y * Y_TO_LAT_FACTOR).exp()).atan()).to_degrees();
    LatLon::new(lat, lon)
}

/// Haversine distance between two positions in meters
#[inline]
pub fn haversine_distance(p1: LatLon, p2: LatLon) -> f64 {
    let lat1 = p1.lat.to_radians();
    let lat2 = p2.lat.to_radians();
    let delta_lat = (p2.lat - p1.lat).to_radians();
    let delta_lon = (p2.lon - p1.lon).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

/// Whether `value` lies in the latitude range [-90, 90]
#[inline(always)]
pub fn is_latitude(value: f64) -> bool {
    (-90.0..=90.0).contains(&value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wgs84_to_mercator_origin() {
        let point = wgs84_to_mercator(0.0, 0.0);
        assert!((point.x() - 0.0).abs() < 0.01);
        assert!((point.y() - 0.0).abs() < 0.01);
    }

    #[test]
    fn test_wgs84_to_mercator_bounds() {
        let west = wgs84_to_mercator(0.0, -180.0);
        assert!((west.x() - EARTH_MERCATOR_MIN).abs() < 1.0);

        let east = wgs84_to_mercator(0.0, 180.0);
        assert!((east.x() - EARTH_MERCATOR_MAX).abs() < 1.0);
    }

    #[test]
    fn test_mercator_to_wgs84_roundtrip() {
        let seoul = LatLon::new(37.5665, 126.9780);
        let mercator = seoul.to_mercator();
        let back = mercator_to_wgs84(mercator.x(), mercator.y());

        assert!((seoul.lat - back.lat).abs() < 0.0001);
        assert!((seoul.lon - back.lon).abs() < 0.0001);
    }

    #[test]
    fn test_haversine_known_distance() {
        // One hundredth of a degree of latitude is roughly 1.11 km
        let a = LatLon::new(37.50, 127.00);
        let b = LatLon::new(37.51, 127.00);
        let d = a.distance_to(b);
        assert!((d - 1111.9).abs() < 5.0, "got {d}");
        assert_eq!(a.distance_to(a), 0.0);
    }

    #[test]
    fn test_is_latitude() {
        assert!(is_latitude(37.5));
        assert!(is_latitude(-90.0));
        assert!(!is_latitude(127.0));
        assert!(!is_latitude(-90.5));
    }
}
