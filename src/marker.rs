//! Draw descriptors handed to the map renderer.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Bounds, Cluster, LatLng, Location, LocationId, MapConfig};

/// Partner kind that marks an association member.
pub const ASSOCIATION_KIND: &str = "협회";
/// Partner kind that marks an influencer.
pub const INFLUENCER_KIND: &str = "인플루언서";

/// Marker styling derived from a location's partner kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MarkerStyle {
    Standard,
    Association,
    Influencer,
}

impl MarkerStyle {
    /// Association wins over influencer when a location carries both kinds.
    ///
    /// ```
    /// use partner_map::{LatLng, Location, MarkerStyle};
    ///
    /// let loc = Location::new("1", "A", LatLng::new(37.0, 127.0))
    ///     .with_partner_kinds(["인플루언서", "협회"]);
    /// assert_eq!(MarkerStyle::for_location(&loc), MarkerStyle::Association);
    /// ```
    pub fn for_location(location: &Location) -> Self {
        let kinds = location.partner_kinds();
        if kinds.contains(ASSOCIATION_KIND) {
            MarkerStyle::Association
        } else if kinds.contains(INFLUENCER_KIND) {
            MarkerStyle::Influencer
        } else {
            MarkerStyle::Standard
        }
    }

    /// Outline/text colour as a CSS hex string.
    pub fn color(&self) -> &'static str {
        match self {
            MarkerStyle::Standard => "#7D9675",
            MarkerStyle::Association => "#5A7FA8",
            MarkerStyle::Influencer => "#C9A961",
        }
    }
}

/// Everything a renderer needs to draw one standalone marker.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LocationMarker {
    pub id: LocationId,
    /// Tooltip / label text
    pub name: String,
    pub position: LatLng,
    pub style: MarkerStyle,
}

impl LocationMarker {
    pub fn from_location(location: &Location) -> Self {
        Self {
            id: location.id().clone(),
            name: location.name().to_string(),
            position: location.coordinate(),
            style: MarkerStyle::for_location(location),
        }
    }
}

/// An aggregate marker for a cluster of two or more locations.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ClusterMarker {
    /// Arithmetic mean of member coordinates
    pub position: LatLng,
    /// Label shown on the marker
    pub count: usize,
    pub member_ids: Vec<LocationId>,
    /// Area to fit the map to when the marker is clicked
    pub member_bounds: Bounds,
    /// Marker diameter in pixels
    pub size_px: u32,
}

impl ClusterMarker {
    pub fn from_cluster(cluster: &Cluster, config: &MapConfig) -> Self {
        let count = cluster.len();
        Self {
            position: cluster.centroid(),
            count,
            member_ids: cluster.ids(),
            member_bounds: cluster.bounds(),
            size_px: cluster_marker_size(count, config),
        }
    }
}

/// Diameter grows linearly with member count up to a cap.
///
/// ```
/// use partner_map::{MapConfig, marker::cluster_marker_size};
///
/// let config = MapConfig::default();
/// assert_eq!(cluster_marker_size(2, &config), 46);
/// assert_eq!(cluster_marker_size(10, &config), 70);
/// assert_eq!(cluster_marker_size(250, &config), 70);
/// ```
pub fn cluster_marker_size(count: usize, config: &MapConfig) -> u32 {
    let capped = u32::try_from(count)
        .unwrap_or(u32::MAX)
        .min(config.cluster_marker_max_count);
    config.cluster_marker_base_px + capped * config.cluster_marker_step_px
}
