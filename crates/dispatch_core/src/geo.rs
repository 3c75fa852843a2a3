//! Geographic primitives: coordinates, path segments, and random placement
//! around the map center.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Quantization used when coordinates take part in cache keys (~0.1 m).
const KEY_SCALE: f64 = 1e6;

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Convert to an h3o coordinate; `None` when the values are not finite.
    pub fn to_lat_lng(self) -> Option<h3o::LatLng> {
        h3o::LatLng::new(self.lat, self.lng).ok()
    }

    /// Great-circle distance in kilometres.
    pub fn distance_km(self, other: Coordinate) -> f64 {
        let (lat1, lon1) = (self.lat.to_radians(), self.lng.to_radians());
        let (lat2, lon2) = (other.lat.to_radians(), other.lng.to_radians());
        let dlat = lat2 - lat1;
        let dlon = lon2 - lon1;
        let sin_dlat = (dlat * 0.5).sin();
        let sin_dlon = (dlon * 0.5).sin();
        let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlon * sin_dlon;
        let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
        EARTH_RADIUS_KM * c
    }

    /// Linear interpolation in lat/lng space; `t = 0` is `self`, `t = 1` is `other`.
    pub fn lerp(self, other: Coordinate, t: f64) -> Coordinate {
        Coordinate::new(
            self.lat + (other.lat - self.lat) * t,
            self.lng + (other.lng - self.lng) * t,
        )
    }

    pub(crate) fn quantized(self) -> (i64, i64) {
        (
            (self.lat * KEY_SCALE).round() as i64,
            (self.lng * KEY_SCALE).round() as i64,
        )
    }
}

impl From<h3o::LatLng> for Coordinate {
    fn from(value: h3o::LatLng) -> Self {
        Coordinate::new(value.lat(), value.lng())
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lng)
    }
}

/// One straight piece of a coarse route.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathSegment {
    pub start: Coordinate,
    pub end: Coordinate,
}

impl PathSegment {
    pub const fn new(start: Coordinate, end: Coordinate) -> Self {
        Self { start, end }
    }

    pub fn length_km(&self) -> f64 {
        self.start.distance_km(self.end)
    }
}

/// Uniform point in the square of side `range_deg` centred on `center`.
pub fn random_location_around<R: Rng + ?Sized>(
    rng: &mut R,
    center: Coordinate,
    range_deg: f64,
) -> Coordinate {
    Coordinate::new(
        center.lat + (rng.gen::<f64>() - 0.5) * range_deg,
        center.lng + (rng.gen::<f64>() - 0.5) * range_deg,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn distance_is_zero_for_identical_points() {
        let p = Coordinate::new(51.1079, 17.0385);
        assert_eq!(p.distance_km(p), 0.0);
    }

    #[test]
    fn distance_matches_one_degree_of_latitude() {
        let a = Coordinate::new(0.0, 0.0);
        let b = Coordinate::new(1.0, 0.0);
        let d = a.distance_km(b);
        assert!((d - 111.19).abs() < 0.1, "unexpected distance {d}");
    }

    #[test]
    fn lerp_hits_endpoints_and_midpoint() {
        let a = Coordinate::new(10.0, 20.0);
        let b = Coordinate::new(12.0, 16.0);
        assert_eq!(a.lerp(b, 0.0), a);
        assert_eq!(a.lerp(b, 1.0), b);
        assert_eq!(a.lerp(b, 0.5), Coordinate::new(11.0, 18.0));
    }

    #[test]
    fn random_locations_stay_within_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let center = Coordinate::new(51.1079, 17.0385);
        for _ in 0..1_000 {
            let p = random_location_around(&mut rng, center, 0.08);
            assert!((p.lat - center.lat).abs() <= 0.04);
            assert!((p.lng - center.lng).abs() <= 0.04);
        }
    }

    #[test]
    fn invalid_coordinates_do_not_convert() {
        assert!(Coordinate::new(f64::NAN, 0.0).to_lat_lng().is_none());
        assert!(Coordinate::new(51.0, 17.0).to_lat_lng().is_some());
    }
}
