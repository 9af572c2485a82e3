//! # Partner Map
//!
//! Marker clustering, viewport culling, filtering and distance ranking for
//! partner-location maps.
//!
//! This library provides:
//! - Zoom-dependent marker clustering with seed-based single-link grouping
//! - Viewport visibility planning (standalone markers, cluster markers, hidden)
//! - Location filtering by category, region, association, partner kind, text and favorites
//! - Distance ranking from a reference point (GPS fix or clicked map point)
//! - A reducer-style map state that turns events into marker effects
//!
//! ## Features
//!
//! - **`parallel`** - Compute ranking distances with rayon
//! - **`serde`** - Serde derives, favorites persistence and raw record JSON parsing
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use partner_map::{
//!     Bounds, LatLng, Location, MapConfig, RenderGroup, Viewport, compute_render_plan,
//! };
//!
//! let locations = vec![
//!     Location::new("a", "Studio A", LatLng::new(37.5665, 126.9780)),
//!     Location::new("b", "Studio B", LatLng::new(37.5670, 126.9785)),
//!     Location::new("c", "Studio C", LatLng::new(35.1796, 129.0756)),
//! ];
//!
//! let viewport = Viewport::new(
//!     Bounds::new(33.0, 39.0, 124.0, 132.0),
//!     7,
//! );
//!
//! let plan = compute_render_plan(&locations, &viewport, &MapConfig::default());
//! for group in &plan {
//!     match group {
//!         RenderGroup::Single(location) => println!("marker: {}", location.name()),
//!         RenderGroup::Cluster(cluster) => println!("cluster of {}", cluster.len()),
//!     }
//! }
//! assert_eq!(plan.len(), 2); // Seoul pair clustered, Busan alone
//! ```

use std::collections::BTreeSet;
use std::fmt;

use geo::{Coord, Intersects, Rect};
use rstar::AABB;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub mod geo_utils;

pub mod error;
pub use error::MapError;

pub mod region;
pub use region::RegionTable;

pub mod favorites;
pub use favorites::Favorites;

pub mod filter;
pub use filter::{filter_locations, FilterCriteria, FilterFacets, LocationFilter, Selection};

pub mod cluster;
pub use cluster::{cluster, cluster_radius_km, Cluster};

pub mod ranking;
pub use ranking::{rank_by_distance, RankedLocation};

pub mod marker;
pub use marker::{ClusterMarker, LocationMarker, MarkerStyle};

pub mod visibility;
pub use visibility::{compute_render_plan, MarkerIndex, RenderDiff, RenderGroup, VisibilityController};

pub mod state;
pub use state::{Effect, MapEvent, MapViewState, OriginSource, ReferencePoint};

pub mod controller;
pub use controller::{apply_effects, MapController, MarkerRenderer};

pub mod deep_link;
pub use deep_link::DeepLink;

pub mod record;
pub use record::{normalize_records, ListValue, LocationRecord, ScalarValue};

#[cfg(feature = "serde")]
pub use record::parse_records_json;

// ============================================================================
// Core Types
// ============================================================================

/// A WGS84 coordinate in degrees.
///
/// # Example
/// ```
/// use partner_map::LatLng;
/// let seoul = LatLng::new(37.5665, 126.9780);
/// assert!(seoul.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    /// Create a new coordinate.
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Check if the coordinate is finite and within lat/lng range.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && self.lat >= -90.0
            && self.lat <= 90.0
            && self.lng >= -180.0
            && self.lng <= 180.0
    }

    /// A (0, 0) coordinate is how the data source spells "not geocoded".
    pub fn is_zero(&self) -> bool {
        self.lat == 0.0 && self.lng == 0.0
    }

    /// Convert to a geo coordinate (x = longitude, y = latitude).
    pub fn to_coord(self) -> Coord<f64> {
        Coord { x: self.lng, y: self.lat }
    }
}

/// A closed lat/lng rectangle.
///
/// No anti-meridian handling: `min_lng` is expected to be west of `max_lng`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl Bounds {
    /// Create bounds from explicit edges.
    pub fn new(min_lat: f64, max_lat: f64, min_lng: f64, max_lng: f64) -> Self {
        Self { min_lat, max_lat, min_lng, max_lng }
    }

    /// Create bounds from the south-west and north-east corners.
    pub fn from_corners(south_west: LatLng, north_east: LatLng) -> Self {
        Self::new(south_west.lat, north_east.lat, south_west.lng, north_east.lng)
    }

    /// Create bounds enclosing all coordinates.
    pub fn from_points(points: &[LatLng]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        let mut min_lat = f64::MAX;
        let mut max_lat = f64::MIN;
        let mut min_lng = f64::MAX;
        let mut max_lng = f64::MIN;

        for p in points {
            min_lat = min_lat.min(p.lat);
            max_lat = max_lat.max(p.lat);
            min_lng = min_lng.min(p.lng);
            max_lng = max_lng.max(p.lng);
        }

        Some(Self { min_lat, max_lat, min_lng, max_lng })
    }

    /// Get the center point of the bounds.
    pub fn center(&self) -> LatLng {
        LatLng::new(
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lng + self.max_lng) / 2.0,
        )
    }

    /// Closed containment test: points on an edge or corner are inside.
    ///
    /// ```
    /// use partner_map::{Bounds, LatLng};
    /// let bounds = Bounds::new(37.0, 38.0, 126.0, 127.0);
    /// assert!(bounds.contains(&LatLng::new(38.0, 127.0)));
    /// assert!(!bounds.contains(&LatLng::new(38.0001, 127.0)));
    /// ```
    pub fn contains(&self, point: &LatLng) -> bool {
        self.to_rect().intersects(&point.to_coord())
    }

    /// The bounds as a geo rectangle.
    pub fn to_rect(&self) -> Rect<f64> {
        Rect::new(
            Coord { x: self.min_lng, y: self.min_lat },
            Coord { x: self.max_lng, y: self.max_lat },
        )
    }

    /// The bounds as an R-tree envelope in `[lng, lat]` order.
    pub fn envelope(&self) -> AABB<[f64; 2]> {
        AABB::from_corners([self.min_lng, self.min_lat], [self.max_lng, self.max_lat])
    }
}

/// A map viewport: visible bounds plus integer zoom level.
///
/// Supplied by the map renderer on every idle event.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Viewport {
    pub bounds: Bounds,
    pub zoom: u8,
}

impl Viewport {
    pub fn new(bounds: Bounds, zoom: u8) -> Self {
        Self { bounds, zoom }
    }
}

/// Stable, opaque location identifier.
///
/// The data source hands out string or integer ids; both normalise to the same string form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct LocationId(String);

impl LocationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LocationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LocationId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for LocationId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<u64> for LocationId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl From<i64> for LocationId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

/// A partner site shown on the map.
///
/// Locations are immutable once built: the engine filters, clusters and ranks
/// copies and never edits one in place. The region is derived from the address
/// through a [`RegionTable`] and is not stored.
///
/// # Example
/// ```
/// use partner_map::{LatLng, Location, RegionTable};
///
/// let studio = Location::new(17u64, "Fresco Studio", LatLng::new(37.5665, 126.9780))
///     .with_address("서울 중구 세종대로 110")
///     .with_categories(["압화", "도자기"])
///     .with_partner_kinds(["협회"]);
///
/// assert_eq!(studio.id().as_str(), "17");
/// assert_eq!(studio.region(&RegionTable::default()), "서울");
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(from = "LocationFields"))]
pub struct Location {
    id: LocationId,
    name: String,
    coordinate: LatLng,
    categories: Vec<String>,
    address: String,
    associations: Vec<String>,
    partner_kinds: BTreeSet<String>,
    /// Lower-cased name and address, kept in sync by the constructor and `with_address`
    #[cfg_attr(feature = "serde", serde(skip))]
    search_text: String,
}

/// Serialized form of [`Location`]; the search text is rebuilt on load.
#[cfg(feature = "serde")]
#[derive(Deserialize)]
struct LocationFields {
    id: LocationId,
    name: String,
    coordinate: LatLng,
    #[serde(default)]
    categories: Vec<String>,
    #[serde(default)]
    address: String,
    #[serde(default)]
    associations: Vec<String>,
    #[serde(default)]
    partner_kinds: BTreeSet<String>,
}

#[cfg(feature = "serde")]
impl From<LocationFields> for Location {
    fn from(fields: LocationFields) -> Self {
        let mut location = Location::new(fields.id, fields.name, fields.coordinate)
            .with_address(fields.address);
        location.categories = fields.categories;
        location.associations = fields.associations;
        location.partner_kinds = fields.partner_kinds;
        location
    }
}

impl Location {
    /// Create a location with no address, categories or tags.
    pub fn new(id: impl Into<LocationId>, name: impl Into<String>, coordinate: LatLng) -> Self {
        let name = name.into();
        Self {
            id: id.into(),
            search_text: build_search_text(&name, ""),
            name,
            coordinate,
            categories: Vec::new(),
            address: String::new(),
            associations: Vec::new(),
            partner_kinds: BTreeSet::new(),
        }
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self.search_text = build_search_text(&self.name, &self.address);
        self
    }

    /// Set the ordered category tags. Blank tags are dropped.
    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = clean_tags(categories);
        self
    }

    /// Set the association names. Blank names are dropped.
    pub fn with_associations<I, S>(mut self, associations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.associations = clean_tags(associations);
        self
    }

    /// Set the partner role tags. Duplicates collapse.
    pub fn with_partner_kinds<I, S>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.partner_kinds = clean_tags(kinds).into_iter().collect();
        self
    }

    pub fn id(&self) -> &LocationId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn coordinate(&self) -> LatLng {
        self.coordinate
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn associations(&self) -> &[String] {
        &self.associations
    }

    pub fn partner_kinds(&self) -> &BTreeSet<String> {
        &self.partner_kinds
    }

    /// Region derived from the address.
    pub fn region<'t>(&self, table: &'t RegionTable) -> &'t str {
        table.region_of(&self.address)
    }

    /// Name and address joined, lower-cased, for substring search.
    pub fn search_text(&self) -> &str {
        &self.search_text
    }
}

fn build_search_text(name: &str, address: &str) -> String {
    format!("{}\n{}", name, address).to_lowercase()
}

fn clean_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    tags.into_iter()
        .map(|t| t.into().trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Configuration for clustering, viewport planning and map effects.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MapConfig {
    /// Zoom level at or below which in-bounds markers are clustered.
    /// Default: 10
    pub cluster_zoom_threshold: u8,

    /// Zoom level at which the cluster radius equals `base_radius_km`.
    /// Each zoom step away doubles or halves the radius. Default: 12
    pub base_zoom: u8,

    /// Cluster radius at `base_zoom`, in kilometers.
    /// Default: 0.3 (so zoom 10 clusters within 1.2km)
    pub base_radius_km: f64,

    /// Map center before any data is shown. Default: Seoul City Hall
    pub default_center: LatLng,

    /// Map zoom before any data is shown. Default: 11
    pub default_zoom: u8,

    /// Zoom to jump to after a geolocation fix. Default: 13
    pub nearby_zoom: u8,

    /// Zoom to jump to when a single location is opened from a link. Default: 15
    pub focus_zoom: u8,

    /// Cluster marker diameter for a cluster of zero members, in pixels. Default: 40
    pub cluster_marker_base_px: u32,

    /// Extra diameter per member, in pixels. Default: 3
    pub cluster_marker_step_px: u32,

    /// Member count after which the cluster marker stops growing. Default: 10
    pub cluster_marker_max_count: u32,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            cluster_zoom_threshold: 10,
            base_zoom: 12,
            base_radius_km: 0.3,
            default_center: LatLng::new(37.5665, 126.9780),
            default_zoom: 11,
            nearby_zoom: 13,
            focus_zoom: 15,
            cluster_marker_base_px: 40,
            cluster_marker_step_px: 3,
            cluster_marker_max_count: 10,
        }
    }
}

impl MapConfig {
    /// Check the configuration for values the engine cannot work with.
    ///
    /// ```
    /// use partner_map::MapConfig;
    /// assert!(MapConfig::default().validate().is_ok());
    ///
    /// let broken = MapConfig { base_radius_km: -1.0, ..MapConfig::default() };
    /// assert!(broken.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<(), MapError> {
        if !self.base_radius_km.is_finite() || self.base_radius_km <= 0.0 {
            return Err(MapError::InvalidConfig {
                field: "base_radius_km",
                reason: format!("must be a positive number, got {}", self.base_radius_km),
            });
        }
        if !self.default_center.is_valid() {
            return Err(MapError::InvalidConfig {
                field: "default_center",
                reason: format!(
                    "({}, {}) is not a valid coordinate",
                    self.default_center.lat, self.default_center.lng
                ),
            });
        }
        if self.cluster_marker_max_count == 0 {
            return Err(MapError::InvalidConfig {
                field: "cluster_marker_max_count",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    #[test]
    fn test_lat_lng_validation() {
        assert!(LatLng::new(37.5665, 126.9780).is_valid());
        assert!(!LatLng::new(91.0, 0.0).is_valid());
        assert!(!LatLng::new(0.0, 181.0).is_valid());
        assert!(!LatLng::new(f64::NAN, 0.0).is_valid());
        assert!(LatLng::new(0.0, 0.0).is_zero());
    }

    #[test]
    fn test_bounds_from_points() {
        let bounds = Bounds::from_points(&[
            LatLng::new(37.50, 126.90),
            LatLng::new(37.60, 127.00),
            LatLng::new(37.55, 126.95),
        ])
        .unwrap();
        assert_eq!(bounds.min_lat, 37.50);
        assert_eq!(bounds.max_lat, 37.60);
        assert_eq!(bounds.min_lng, 126.90);
        assert_eq!(bounds.max_lng, 127.00);
        assert!(Bounds::from_points(&[]).is_none());
    }

    #[test]
    fn test_bounds_contains_is_closed() {
        let bounds = Bounds::new(37.0, 38.0, 126.0, 127.0);
        assert!(bounds.contains(&LatLng::new(37.0, 126.0)));
        assert!(bounds.contains(&LatLng::new(38.0, 127.0)));
        assert!(bounds.contains(&LatLng::new(37.5, 126.5)));
        assert!(!bounds.contains(&LatLng::new(36.999, 126.5)));
        assert!(!bounds.contains(&LatLng::new(37.5, 127.001)));
    }

    #[test]
    fn test_bounds_center() {
        let center = Bounds::new(37.0, 38.0, 126.0, 128.0).center();
        assert!(approx_eq(center.lat, 37.5, 1e-9));
        assert!(approx_eq(center.lng, 127.0, 1e-9));
    }

    #[test]
    fn test_location_ids_normalise() {
        assert_eq!(LocationId::from(42u64), LocationId::from("42"));
        assert_eq!(LocationId::from(-3i64).as_str(), "-3");
    }

    #[test]
    fn test_location_tags_are_cleaned() {
        let loc = Location::new("1", "A", LatLng::new(37.0, 127.0))
            .with_categories([" 도자기 ", "", "목공"])
            .with_partner_kinds(["협회", "협회", " "]);
        assert_eq!(loc.categories(), ["도자기".to_string(), "목공".to_string()]);
        assert_eq!(loc.partner_kinds().len(), 1);
    }

    #[test]
    fn test_search_text_is_lowercase() {
        let loc = Location::new("1", "Fresco Studio", LatLng::new(37.0, 127.0))
            .with_address("Seoul Jung-gu");
        let text = loc.search_text();
        assert!(text.contains("fresco studio"));
        assert!(text.contains("seoul jung-gu"));
    }

    #[test]
    fn test_search_text_follows_address() {
        let loc = Location::new("1", "Fresco Studio", LatLng::new(37.0, 127.0));
        assert_eq!(loc.search_text(), "fresco studio\n");

        let loc = loc.with_address("Busan").with_address("Daegu");
        assert_eq!(loc.search_text(), "fresco studio\ndaegu");
        assert_eq!(loc, Location::new("1", "Fresco Studio", LatLng::new(37.0, 127.0)).with_address("Daegu"));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_search_text_rebuilt_after_deserialize() {
        let loc = Location::new("1", "Fresco Studio", LatLng::new(37.0, 127.0))
            .with_address("Seoul")
            .with_categories(["도자기"]);
        let json = serde_json::to_string(&loc).unwrap();
        assert!(!json.contains("search_text"));

        let back: Location = serde_json::from_str(&json).unwrap();
        assert_eq!(back, loc);
        assert_eq!(back.search_text(), "fresco studio\nseoul");
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = MapConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.cluster_zoom_threshold, 10);
        assert!(approx_eq(config.base_radius_km, 0.3, 1e-12));
    }

    #[test]
    fn test_config_rejects_bad_center() {
        let config = MapConfig {
            default_center: LatLng::new(120.0, 0.0),
            ..MapConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(MapError::InvalidConfig { field: "default_center", .. })
        ));
    }
}
