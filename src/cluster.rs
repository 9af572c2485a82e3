//! # Marker Clustering
//!
//! Groups nearby locations into clusters for a given zoom level.
//!
//! ## Algorithm
//! 1. Cluster radius is `2^(base_zoom - zoom) * base_radius_km`, so it halves with
//!    every zoom step in (`2^(12 - zoom) * 0.3` km with the default config)
//! 2. Walk the locations in input order. Each unclaimed location seeds a new cluster
//! 3. The seed absorbs every later unclaimed location within the radius **of the
//!    seed** (inclusive). Distances to other members are never considered
//! 4. Every cluster is returned, singletons included
//!
//! Grouping is seed-relative, not a transitive closure: with A–B and B–C within the
//! radius but A–C beyond it, input order A, B, C yields `{A, B}, {C}` while B, A, C
//! yields `{B, A, C}`. Earlier locations become seeds preferentially.

use crate::geo_utils::{compute_center, distance_km};
use crate::{Bounds, LatLng, Location, LocationId, MapConfig};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A non-empty group of locations deemed close at one zoom level.
///
/// Members keep input order; the first member is the seed.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Cluster {
    members: Vec<Location>,
}

impl Cluster {
    pub(crate) fn from_members(members: Vec<Location>) -> Self {
        debug_assert!(!members.is_empty(), "clusters are never empty");
        Self { members }
    }

    pub fn members(&self) -> &[Location] {
        &self.members
    }

    pub fn into_members(self) -> Vec<Location> {
        self.members
    }

    /// The location that opened this cluster.
    pub fn seed(&self) -> &Location {
        &self.members[0]
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Always false; kept for the `len`/`is_empty` pairing.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// A size-1 cluster is drawn as an ordinary marker.
    pub fn is_single(&self) -> bool {
        self.members.len() == 1
    }

    pub fn ids(&self) -> Vec<LocationId> {
        self.members.iter().map(|m| m.id().clone()).collect()
    }

    /// Arithmetic mean of member coordinates.
    pub fn centroid(&self) -> LatLng {
        compute_center(&self.coordinates())
    }

    /// Bounds enclosing every member (what the map fits to when the cluster is clicked).
    pub fn bounds(&self) -> Bounds {
        let coords = self.coordinates();
        Bounds::from_points(&coords).unwrap_or_else(|| {
            let c = self.seed().coordinate();
            Bounds::new(c.lat, c.lat, c.lng, c.lng)
        })
    }

    fn coordinates(&self) -> Vec<LatLng> {
        self.members.iter().map(Location::coordinate).collect()
    }
}

/// Cluster radius in kilometers at a zoom level.
///
/// ```
/// use partner_map::{MapConfig, cluster_radius_km};
///
/// let config = MapConfig::default();
/// assert!((cluster_radius_km(12, &config) - 0.3).abs() < 1e-12);
/// assert!((cluster_radius_km(5, &config) - 38.4).abs() < 1e-9);
/// ```
pub fn cluster_radius_km(zoom: u8, config: &MapConfig) -> f64 {
    let exponent = i32::from(config.base_zoom) - i32::from(zoom);
    2f64.powi(exponent) * config.base_radius_km
}

/// Cluster locations at a zoom level with the default radius schedule.
///
/// # Example
/// ```
/// use partner_map::{LatLng, Location, cluster};
///
/// let locations = vec![
///     Location::new("a", "A", LatLng::new(0.0, 0.0)),
///     Location::new("b", "B", LatLng::new(0.0, 0.001)),
///     Location::new("c", "C", LatLng::new(50.0, 50.0)),
/// ];
///
/// let clusters = cluster(&locations, 5);
/// assert_eq!(clusters.len(), 2);
/// assert_eq!(clusters[0].len(), 2);
/// assert!(clusters[1].is_single());
/// ```
pub fn cluster(locations: &[Location], zoom: u8) -> Vec<Cluster> {
    cluster_with_config(locations, zoom, &MapConfig::default())
}

/// Cluster locations at a zoom level with a custom radius schedule.
pub fn cluster_with_config(locations: &[Location], zoom: u8, config: &MapConfig) -> Vec<Cluster> {
    let radius_km = cluster_radius_km(zoom, config);
    let coords: Vec<LatLng> = locations.iter().map(Location::coordinate).collect();

    group_by_seed(&coords, radius_km)
        .into_iter()
        .map(|group| Cluster::from_members(group.into_iter().map(|i| locations[i].clone()).collect()))
        .collect()
}

/// Seed-relative grouping over coordinates. Returns index groups in seed order,
/// members in input order.
pub(crate) fn group_by_seed(points: &[LatLng], radius_km: f64) -> Vec<Vec<usize>> {
    let mut claimed = vec![false; points.len()];
    let mut groups = Vec::new();

    for seed in 0..points.len() {
        if claimed[seed] {
            continue;
        }
        claimed[seed] = true;
        let mut group = vec![seed];

        // Everything before the seed is already claimed
        for other in (seed + 1)..points.len() {
            if claimed[other] {
                continue;
            }
            if distance_km(&points[seed], &points[other]) <= radius_km {
                claimed[other] = true;
                group.push(other);
            }
        }

        groups.push(group);
    }

    groups
}
