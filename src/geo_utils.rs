//! # Geographic Utilities
//!
//! Core geographic computations shared by clustering, ranking and viewport planning.
//!
//! ## Overview
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`distance_km`] | Great-circle distance between two coordinates |
//! | [`compute_bounds`] | Bounding box of a set of coordinates |
//! | [`compute_center`] | Arithmetic-mean center of a set of coordinates |
//!
//! ## Example
//!
//! ```rust
//! use partner_map::{LatLng, geo_utils};
//!
//! let seoul = LatLng::new(37.5665, 126.9780);
//! let busan = LatLng::new(35.1796, 129.0756);
//!
//! let km = geo_utils::distance_km(&seoul, &busan);
//! assert!((km - 325.0).abs() < 5.0);
//!
//! let center = geo_utils::compute_center(&[seoul, busan]);
//! assert!((center.lat - 36.373).abs() < 0.01);
//! ```
//!
//! ## Algorithm Notes
//!
//! ### Haversine Formula
//!
//! Distances use the haversine formula on a sphere of radius 6371 km. Cluster
//! radii and ranking distances are both expressed with this radius, so the two
//! stay consistent with each other.
//!
//! Reference: [Haversine formula (Wikipedia)](https://en.wikipedia.org/wiki/Haversine_formula)
//!
//! ### Centers
//!
//! [`compute_center`] averages latitudes and longitudes. It is not a geodesic
//! midpoint, and it is not meaningful across the antimeridian.

use crate::{Bounds, LatLng};

/// Mean Earth radius used by every distance in this crate.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

// =============================================================================
// Distance Functions
// =============================================================================

/// Calculate the great-circle distance between two coordinates in kilometers.
///
/// Callers guarantee valid coordinates; in debug builds invalid input panics.
///
/// # Example
///
/// ```rust
/// use partner_map::{LatLng, geo_utils};
///
/// let a = LatLng::new(37.5665, 126.9780);
/// assert_eq!(geo_utils::distance_km(&a, &a), 0.0);
/// ```
#[inline]
pub fn distance_km(a: &LatLng, b: &LatLng) -> f64 {
    debug_assert!(a.is_valid(), "invalid coordinate {:?}", a);
    debug_assert!(b.is_valid(), "invalid coordinate {:?}", b);

    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    // Rounding can push h just past 1 for antipodal pairs
    let h = h.clamp(0.0, 1.0);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_KM * c
}

// =============================================================================
// Bounding Box Functions
// =============================================================================

/// Compute the bounding box of a set of coordinates.
///
/// Returns `None` for empty input.
///
/// # Example
///
/// ```rust
/// use partner_map::{LatLng, geo_utils};
///
/// let bounds = geo_utils::compute_bounds(&[
///     LatLng::new(37.50, 126.90),
///     LatLng::new(37.60, 127.00),
/// ]).unwrap();
/// assert_eq!(bounds.min_lat, 37.50);
/// assert_eq!(bounds.max_lng, 127.00);
/// ```
pub fn compute_bounds(points: &[LatLng]) -> Option<Bounds> {
    Bounds::from_points(points)
}

// =============================================================================
// Center/Centroid Functions
// =============================================================================

/// Compute the arithmetic-mean center of a set of coordinates.
///
/// Returns (0, 0) for empty input.
pub fn compute_center(points: &[LatLng]) -> LatLng {
    if points.is_empty() {
        return LatLng::new(0.0, 0.0);
    }

    let sum_lat: f64 = points.iter().map(|p| p.lat).sum();
    let sum_lng: f64 = points.iter().map(|p| p.lng).sum();
    let n = points.len() as f64;

    LatLng::new(sum_lat / n, sum_lng / n)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    #[test]
    fn test_distance_same_point() {
        let p = LatLng::new(37.5665, 126.9780);
        assert_eq!(distance_km(&p, &p), 0.0);
    }

    #[test]
    fn test_distance_known_value() {
        // London to Paris is approximately 344 km
        let london = LatLng::new(51.5074, -0.1278);
        let paris = LatLng::new(48.8566, 2.3522);
        assert!(approx_eq(distance_km(&london, &paris), 343.5, 5.0));
    }

    #[test]
    fn test_distance_is_symmetric() {
        let a = LatLng::new(37.5665, 126.9780);
        let b = LatLng::new(33.4996, 126.5312);
        assert!(approx_eq(distance_km(&a, &b), distance_km(&b, &a), 1e-9));
    }

    #[test]
    fn test_one_degree_of_latitude() {
        // 2 * pi * 6371 / 360
        let d = distance_km(&LatLng::new(0.0, 0.0), &LatLng::new(1.0, 0.0));
        assert!(approx_eq(d, 111.195, 0.01));
    }

    #[test]
    fn test_antipodal_distance_is_finite() {
        let half_circumference = std::f64::consts::PI * EARTH_RADIUS_KM;

        let d = distance_km(&LatLng::new(0.0, 0.0), &LatLng::new(0.0, 180.0));
        assert!(approx_eq(d, half_circumference, 1e-6));

        let d = distance_km(&LatLng::new(-74.4, -125.2), &LatLng::new(74.4, 54.8));
        assert!(d.is_finite());
        assert!(approx_eq(d, half_circumference, 1e-3));
    }

    #[test]
    fn test_distance_finite_across_antipode_sweep() {
        for lat_step in -17..=17 {
            for lng_step in -36..36 {
                let lat = f64::from(lat_step) * 5.0 + 0.1;
                let lng = f64::from(lng_step) * 5.0 + 0.2;
                let a = LatLng::new(lat, lng);
                let b = LatLng::new(-lat, lng + 180.0 - if lng > 0.0 { 360.0 } else { 0.0 });
                let d = distance_km(&a, &b);
                assert!(d.is_finite() && d >= 0.0, "{:?} -> {:?} gave {}", a, b, d);
            }
        }
    }

    #[test]
    fn test_compute_bounds_empty() {
        assert!(compute_bounds(&[]).is_none());
    }

    #[test]
    fn test_compute_center() {
        let center = compute_center(&[LatLng::new(37.50, 127.10), LatLng::new(37.52, 127.12)]);
        assert!(approx_eq(center.lat, 37.51, 1e-9));
        assert!(approx_eq(center.lng, 127.11, 1e-9));
    }

    #[test]
    fn test_compute_center_empty() {
        let center = compute_center(&[]);
        assert_eq!(center.lat, 0.0);
        assert_eq!(center.lng, 0.0);
    }
}
