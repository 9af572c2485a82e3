//! Distance ranking from a reference point.
//!
//! The origin may be a geolocation fix or a point the user clicked on the map;
//! the ranker does not care which. It is stateless: clearing the reference
//! point simply means using the filtered order again.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::geo_utils::distance_km;
use crate::{LatLng, Location};

/// A location annotated with its distance from the reference point.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RankedLocation {
    pub location: Location,
    /// Haversine distance from the origin in kilometers
    pub distance_km: f64,
}

impl RankedLocation {
    pub fn into_location(self) -> Location {
        self.location
    }
}

/// Copy `locations`, annotate each with its distance from `origin`, and sort ascending.
///
/// The sort is stable: equidistant locations keep their relative input order.
///
/// # Example
/// ```
/// use partner_map::{LatLng, Location, rank_by_distance};
///
/// let city_hall = LatLng::new(37.5665, 126.9780);
/// let locations = vec![
///     Location::new("far", "Busan", LatLng::new(35.1796, 129.0756)),
///     Location::new("near", "Jongno", LatLng::new(37.5730, 126.9794)),
/// ];
///
/// let ranked = rank_by_distance(&locations, city_hall);
/// assert_eq!(ranked[0].location.id().as_str(), "near");
/// assert!(ranked[0].distance_km < 1.0);
/// ```
pub fn rank_by_distance(locations: &[Location], origin: LatLng) -> Vec<RankedLocation> {
    let mut ranked = annotate(locations, origin);
    ranked.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
    ranked
}

#[cfg(not(feature = "parallel"))]
fn annotate(locations: &[Location], origin: LatLng) -> Vec<RankedLocation> {
    locations
        .iter()
        .map(|location| RankedLocation {
            distance_km: distance_km(&origin, &location.coordinate()),
            location: location.clone(),
        })
        .collect()
}

#[cfg(feature = "parallel")]
fn annotate(locations: &[Location], origin: LatLng) -> Vec<RankedLocation> {
    use rayon::prelude::*;

    locations
        .par_iter()
        .map(|location| RankedLocation {
            distance_km: distance_km(&origin, &location.coordinate()),
            location: location.clone(),
        })
        .collect()
}
