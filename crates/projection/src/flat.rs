//! Flat-earth projection.
//!
//! Positions are expressed as (x, y) km east and north of an origin,
//! derived from the great-circle range and bearing to that origin.

use std::f64::consts::PI;

/// Mean earth radius used by flat-earth grids (km).
pub const EARTH_RADIUS_KM: f64 = 6371.204;

const DEG_TO_RAD: f64 = PI / 180.0;
const RAD_TO_DEG: f64 = 180.0 / PI;

/// Great-circle range (km) and bearing (degrees clockwise from north)
/// from the first point to the second.
pub fn range_bearing(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> (f64, f64) {
    let phi1 = lat1 * DEG_TO_RAD;
    let phi2 = lat2 * DEG_TO_RAD;
    let dphi = phi2 - phi1;
    let dlon = (lon2 - lon1) * DEG_TO_RAD;

    // haversine
    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlon / 2.0).sin().powi(2);
    let a = a.clamp(0.0, 1.0);
    let arc = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    let range = arc * EARTH_RADIUS_KM;

    if range == 0.0 {
        return (0.0, 0.0);
    }

    let y = dlon.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * dlon.cos();
    let bearing = y.atan2(x) * RAD_TO_DEG;
    (range, bearing.rem_euclid(360.0))
}

/// Point reached from (lat, lon) after travelling `range` km along
/// `bearing` degrees.
pub fn destination(lat: f64, lon: f64, range: f64, bearing: f64) -> (f64, f64) {
    let phi1 = lat * DEG_TO_RAD;
    let lambda1 = lon * DEG_TO_RAD;
    let theta = bearing * DEG_TO_RAD;
    let arc = range / EARTH_RADIUS_KM;

    let sin_phi2 = phi1.sin() * arc.cos() + phi1.cos() * arc.sin() * theta.cos();
    let phi2 = sin_phi2.clamp(-1.0, 1.0).asin();
    let lambda2 = lambda1
        + (theta.sin() * arc.sin() * phi1.cos()).atan2(arc.cos() - phi1.sin() * sin_phi2);

    let mut lon2 = lambda2 * RAD_TO_DEG;
    while lon2 > 180.0 {
        lon2 -= 360.0;
    }
    while lon2 < -180.0 {
        lon2 += 360.0;
    }
    (phi2 * RAD_TO_DEG, lon2)
}

/// Flat-earth projection centred on an origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlatEarth {
    /// Origin latitude (degrees)
    pub origin_lat: f64,
    /// Origin longitude (degrees)
    pub origin_lon: f64,
}

impl FlatEarth {
    pub fn new(origin_lat: f64, origin_lon: f64) -> Self {
        Self {
            origin_lat,
            origin_lon,
        }
    }

    /// Convert a lat/lon position into (x, y) km from the origin.
    pub fn latlon_to_xy(&self, lat: f64, lon: f64) -> (f64, f64) {
        let (range, bearing) = range_bearing(self.origin_lat, self.origin_lon, lat, lon);
        let theta = bearing * DEG_TO_RAD;
        (range * theta.sin(), range * theta.cos())
    }

    /// Convert (x, y) km from the origin into a lat/lon position.
    pub fn xy_to_latlon(&self, x: f64, y: f64) -> (f64, f64) {
        let range = (x * x + y * y).sqrt();
        if range == 0.0 {
            return (self.origin_lat, self.origin_lon);
        }
        let bearing = x.atan2(y) * RAD_TO_DEG;
        destination(self.origin_lat, self.origin_lon, range, bearing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::assert_approx_eq;

    #[test]
    fn test_one_degree_north() {
        let (range, bearing) = range_bearing(40.0, -105.0, 41.0, -105.0);
        assert_approx_eq!(range, EARTH_RADIUS_KM * DEG_TO_RAD, 1e-6);
        assert_approx_eq!(bearing, 0.0, 1e-9);
    }

    #[test]
    fn test_due_east_bearing() {
        let (_, bearing) = range_bearing(0.0, 10.0, 0.0, 11.0);
        assert_approx_eq!(bearing, 90.0, 1e-9);
        let (_, bearing) = range_bearing(0.0, 10.0, 0.0, 9.0);
        assert_approx_eq!(bearing, 270.0, 1e-9);
    }

    #[test]
    fn test_same_point_is_zero() {
        assert_eq!(range_bearing(40.0, -105.0, 40.0, -105.0), (0.0, 0.0));
        let flat = FlatEarth::new(40.0, -105.0);
        assert_eq!(flat.latlon_to_xy(40.0, -105.0), (0.0, 0.0));
    }

    #[test]
    fn test_short_range_is_accurate() {
        let (range, bearing) = range_bearing(40.0, -105.0, 40.001, -105.0);
        assert_approx_eq!(range, EARTH_RADIUS_KM * 0.001 * DEG_TO_RAD, 1e-9);
        assert_approx_eq!(bearing, 0.0, 1e-6);

        let flat = FlatEarth::new(40.0, -105.0);
        let (x, y) = flat.latlon_to_xy(40.0, -105.0 + 1e-7);
        assert!(x > 0.0 && x < 1e-4, "x = {}", x);
        assert_approx_eq!(y, 0.0, 1e-9);
    }

    #[test]
    fn test_xy_roundtrip() {
        let flat = FlatEarth::new(39.8, -104.9);
        for &(x, y) in &[(10.0, 0.0), (0.0, -25.0), (-150.0, 80.0), (3.5, 3.5)] {
            let (lat, lon) = flat.xy_to_latlon(x, y);
            let (x2, y2) = flat.latlon_to_xy(lat, lon);
            assert_approx_eq!(x2, x, 1e-6);
            assert_approx_eq!(y2, y, 1e-6);
        }
    }

    #[test]
    fn test_destination_wraps_longitude() {
        let (lat, lon) = destination(0.0, 179.5, EARTH_RADIUS_KM * DEG_TO_RAD, 90.0);
        assert_approx_eq!(lat, 0.0, 1e-9);
        assert_approx_eq!(lon, -179.5, 1e-9);
    }
}
