use serde::{Deserialize, Serialize};

/// Mean Earth radius used for great-circle distances.
pub const MEAN_EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Geographic coordinate in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Haversine great-circle distance to `other`, in meters.
    pub fn haversine_m(&self, other: &GeoPoint) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let d_lat = lat2 - lat1;
        let d_lon = (other.longitude - self.longitude).to_radians();
        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
        // rounding can push `a` past 1 for near-antipodal points
        2.0 * MEAN_EARTH_RADIUS_M * a.sqrt().min(1.0).asin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn one_degree_along_equator() {
        let origin = GeoPoint::new(0.0, 0.0);
        let east = GeoPoint::new(0.0, 1.0);
        let expected = 2.0 * PI * MEAN_EARTH_RADIUS_M / 360.0;
        assert!((origin.haversine_m(&east) - expected).abs() < 1e-6);
    }

    #[test]
    fn distance_is_symmetric_and_zero_on_self() {
        let tonga = GeoPoint::new(-20.546, -175.390);
        let sydney = GeoPoint::new(-33.8688, 151.2093);
        assert_eq!(tonga.haversine_m(&tonga), 0.0);
        assert!((tonga.haversine_m(&sydney) - sydney.haversine_m(&tonga)).abs() < 1e-6);
    }

    #[test]
    fn pole_to_equator_is_quarter_circumference() {
        let pole = GeoPoint::new(90.0, 0.0);
        let equator = GeoPoint::new(0.0, 42.0);
        let expected = PI / 2.0 * MEAN_EARTH_RADIUS_M;
        assert!((pole.haversine_m(&equator) - expected).abs() < 1e-6);
    }

    #[test]
    fn antipodal_points_stay_finite() {
        let half_circumference = PI * MEAN_EARTH_RADIUS_M;
        for step in 0..180 {
            let lat = -89.5 + step as f64;
            let lon = -179.0 + 2.0 * step as f64;
            let here = GeoPoint::new(lat, lon);
            let there = GeoPoint::new(-lat, lon - 180.0);
            let distance = here.haversine_m(&there);
            assert!(distance.is_finite(), "NaN for latitude {}", lat);
            assert!((distance - half_circumference).abs() < 10.0);
        }
    }
}
