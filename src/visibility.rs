//! # Viewport Visibility
//!
//! Decides, for every marker, whether it is drawn standalone, folded into a
//! cluster marker, or hidden.
//!
//! ## Planning
//! 1. Select markers inside the viewport bounds (closed rectangle, R-tree lookup)
//! 2. At or below the cluster zoom threshold, cluster the in-bounds markers and
//!    emit one group per cluster (size-1 clusters become [`RenderGroup::Single`])
//! 3. Above the threshold, emit one [`RenderGroup::Single`] per in-bounds marker
//!
//! Markers outside the bounds get no group and are therefore hidden.
//!
//! ## Diffing
//! [`VisibilityController`] remembers what is on screen and turns each new plan
//! into a [`RenderDiff`]. A marker that stays visible and unchanged is not
//! touched. One whose position, name or style changed is hidden and drawn again.
//! Replanning with unchanged inputs produces an empty diff. Without viewport bounds (map not
//! ready yet) the controller does nothing and keeps its previous state.

use std::collections::BTreeMap;

use log::debug;
use rstar::{RTree, RTreeObject, AABB};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::cluster::cluster_with_config;
use crate::{Cluster, ClusterMarker, Location, LocationId, LocationMarker, MapConfig, Viewport};

/// One unit handed to the map renderer.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RenderGroup {
    /// Draw the location's own marker.
    Single(Location),
    /// Draw one aggregate marker for two or more locations.
    Cluster(Cluster),
}

impl RenderGroup {
    fn from_cluster(cluster: Cluster) -> Self {
        if cluster.is_single() {
            match <[Location; 1]>::try_from(cluster.into_members()) {
                Ok([single]) => RenderGroup::Single(single),
                Err(members) => RenderGroup::Cluster(Cluster::from_members(members)),
            }
        } else {
            RenderGroup::Cluster(cluster)
        }
    }

    /// Number of locations represented.
    pub fn len(&self) -> usize {
        match self {
            RenderGroup::Single(_) => 1,
            RenderGroup::Cluster(cluster) => cluster.len(),
        }
    }

    /// Always false; a group represents at least one location.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn is_single(&self) -> bool {
        matches!(self, RenderGroup::Single(_))
    }

    pub fn ids(&self) -> Vec<LocationId> {
        match self {
            RenderGroup::Single(location) => vec![location.id().clone()],
            RenderGroup::Cluster(cluster) => cluster.ids(),
        }
    }
}

// =============================================================================
// R-tree Indexed Marker for Viewport Queries
// =============================================================================

/// A marker position with its index into the marker slice.
#[derive(Debug, Clone, Copy)]
struct IndexedMarker {
    idx: usize,
    lat: f64,
    lng: f64,
}

impl RTreeObject for IndexedMarker {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.lng, self.lat])
    }
}

/// Spatial index over a marker slice, rebuilt whenever the marker set changes.
#[derive(Debug, Clone, Default)]
pub struct MarkerIndex {
    tree: RTree<IndexedMarker>,
}

impl MarkerIndex {
    pub fn new(markers: &[Location]) -> Self {
        let indexed: Vec<IndexedMarker> = markers
            .iter()
            .enumerate()
            .map(|(idx, m)| {
                let c = m.coordinate();
                debug_assert!(c.is_valid(), "invalid coordinate for {}", m.id());
                IndexedMarker { idx, lat: c.lat, lng: c.lng }
            })
            .collect();
        Self { tree: RTree::bulk_load(indexed) }
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Indices of markers inside `viewport` (edges inclusive), in marker order.
    pub fn in_bounds(&self, viewport: &Viewport) -> Vec<usize> {
        let mut indices: Vec<usize> = self
            .tree
            .locate_in_envelope(&viewport.bounds.envelope())
            .map(|m| m.idx)
            .collect();
        // Clustering depends on input order
        indices.sort_unstable();
        indices
    }
}

/// Plan what to draw for `markers` in `viewport`.
///
/// # Example
/// ```
/// use partner_map::{Bounds, LatLng, Location, MapConfig, Viewport, compute_render_plan};
///
/// let markers = vec![
///     Location::new("a", "A", LatLng::new(37.5665, 126.9780)),
///     Location::new("b", "B", LatLng::new(37.5670, 126.9785)),
/// ];
/// let bounds = Bounds::new(37.0, 38.0, 126.0, 128.0);
///
/// let clustered = compute_render_plan(&markers, &Viewport::new(bounds, 9), &MapConfig::default());
/// assert_eq!(clustered.len(), 1);
///
/// let detailed = compute_render_plan(&markers, &Viewport::new(bounds, 15), &MapConfig::default());
/// assert!(detailed.iter().all(|g| g.is_single()));
/// assert_eq!(detailed.len(), 2);
/// ```
pub fn compute_render_plan(markers: &[Location], viewport: &Viewport, config: &MapConfig) -> Vec<RenderGroup> {
    plan_with_index(markers, &MarkerIndex::new(markers), viewport, config)
}

/// Plan against a prebuilt index. `index` must have been built from `markers`.
pub fn plan_with_index(
    markers: &[Location],
    index: &MarkerIndex,
    viewport: &Viewport,
    config: &MapConfig,
) -> Vec<RenderGroup> {
    debug_assert_eq!(index.len(), markers.len(), "stale marker index");

    let visible: Vec<Location> = index
        .in_bounds(viewport)
        .into_iter()
        .filter_map(|i| markers.get(i).cloned())
        .collect();

    if viewport.zoom <= config.cluster_zoom_threshold {
        cluster_with_config(&visible, viewport.zoom, config)
            .into_iter()
            .map(RenderGroup::from_cluster)
            .collect()
    } else {
        visible.into_iter().map(RenderGroup::Single).collect()
    }
}

/// Changes needed to move the screen from the previous plan to the current one.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RenderDiff {
    /// Standalone markers to hide, ascending by id
    pub hide: Vec<LocationId>,
    /// Standalone markers to draw, in plan order. Applied after `hide`.
    pub show: Vec<LocationMarker>,
    /// New full set of cluster markers, or `None` when unchanged
    pub clusters: Option<Vec<ClusterMarker>>,
}

impl RenderDiff {
    pub fn is_empty(&self) -> bool {
        self.hide.is_empty() && self.show.is_empty() && self.clusters.is_none()
    }
}

/// Remembers what is on screen and diffs each new plan against it.
#[derive(Debug, Clone, Default)]
pub struct VisibilityController {
    config: MapConfig,
    plan: Vec<RenderGroup>,
    visible: BTreeMap<LocationId, LocationMarker>,
    cluster_markers: Vec<ClusterMarker>,
}

impl VisibilityController {
    pub fn new(config: MapConfig) -> Self {
        Self { config, ..Self::default() }
    }

    /// The plan currently on screen.
    pub fn plan(&self) -> &[RenderGroup] {
        &self.plan
    }

    /// Standalone markers currently shown.
    pub fn visible(&self) -> &BTreeMap<LocationId, LocationMarker> {
        &self.visible
    }

    /// Cluster markers currently shown.
    pub fn cluster_markers(&self) -> &[ClusterMarker] {
        &self.cluster_markers
    }

    /// Recompute for the current markers and viewport.
    ///
    /// Returns `None` when `viewport` is `None`; nothing changes in that case.
    pub fn update(
        &mut self,
        markers: &[Location],
        index: &MarkerIndex,
        viewport: Option<&Viewport>,
    ) -> Option<RenderDiff> {
        let Some(viewport) = viewport else {
            debug!("[PartnerMap] Viewport not ready, keeping previous render state");
            return None;
        };

        let plan = plan_with_index(markers, index, viewport, &self.config);

        let mut next_visible = BTreeMap::new();
        let mut show = Vec::new();
        let mut next_clusters = Vec::new();
        for group in &plan {
            match group {
                RenderGroup::Single(location) => {
                    let marker = LocationMarker::from_location(location);
                    if self.visible.get(&marker.id) != Some(&marker) {
                        show.push(marker.clone());
                    }
                    next_visible.insert(marker.id.clone(), marker);
                }
                RenderGroup::Cluster(cluster) => {
                    next_clusters.push(ClusterMarker::from_cluster(cluster, &self.config));
                }
            }
        }

        // Gone, or drawn with stale data
        let hide: Vec<LocationId> = self
            .visible
            .iter()
            .filter(|(id, marker)| next_visible.get(*id) != Some(*marker))
            .map(|(id, _)| id.clone())
            .collect();
        let clusters = (next_clusters != self.cluster_markers).then(|| next_clusters.clone());

        debug!(
            "[PartnerMap] Plan at zoom {}: {} groups ({} shown, {} hidden, clusters {})",
            viewport.zoom,
            plan.len(),
            show.len(),
            hide.len(),
            if clusters.is_some() { "replaced" } else { "unchanged" }
        );

        self.plan = plan;
        self.visible = next_visible;
        self.cluster_markers = next_clusters;

        Some(RenderDiff { hide, show, clusters })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Bounds, LatLng};

    fn loc(id: &str, lat: f64, lng: f64) -> Location {
        Location::new(id, id, LatLng::new(lat, lng))
    }

    fn seoul_markers() -> Vec<Location> {
        vec![
            loc("city-hall", 37.5665, 126.9780),
            loc("jongno", 37.5700, 126.9820),
            loc("gangnam", 37.4979, 127.0276),
            loc("busan", 35.1796, 129.0756),
        ]
    }

    fn korea() -> Bounds {
        Bounds::new(33.0, 39.0, 124.0, 132.0)
    }

    fn seoul() -> Bounds {
        Bounds::new(37.4, 37.7, 126.8, 127.2)
    }

    fn ids(ids: &[LocationId]) -> Vec<&str> {
        ids.iter().map(LocationId::as_str).collect()
    }

    fn shown(markers: &[LocationMarker]) -> Vec<&str> {
        markers.iter().map(|m| m.id.as_str()).collect()
    }

    #[test]
    fn test_empty_markers_give_empty_plan() {
        for zoom in [3u8, 10, 16] {
            let plan = compute_render_plan(&[], &Viewport::new(korea(), zoom), &MapConfig::default());
            assert!(plan.is_empty());
        }
    }

    #[test]
    fn test_viewport_excluding_everything() {
        let pacific = Bounds::new(-10.0, 10.0, -170.0, -150.0);
        let plan = compute_render_plan(&seoul_markers(), &Viewport::new(pacific, 8), &MapConfig::default());
        assert!(plan.is_empty());
    }

    #[test]
    fn test_corner_marker_is_included() {
        let bounds = Bounds::new(37.0, 38.0, 126.0, 127.0);
        let markers = vec![loc("sw", 37.0, 126.0), loc("ne", 38.0, 127.0), loc("out", 38.0, 127.0001)];
        let plan = compute_render_plan(&markers, &Viewport::new(bounds, 16), &MapConfig::default());
        let drawn: Vec<LocationId> = plan.iter().flat_map(RenderGroup::ids).collect();
        assert_eq!(ids(&drawn), ["sw", "ne"]);
    }

    #[test]
    fn test_clusters_at_or_below_threshold() {
        // zoom 10: 1.2km radius; city hall and jongno are ~530m apart
        let plan = compute_render_plan(&seoul_markers(), &Viewport::new(korea(), 10), &MapConfig::default());
        assert_eq!(plan.len(), 3);
        assert!(matches!(&plan[0], RenderGroup::Cluster(c) if c.len() == 2));
        assert!(plan[1].is_single());
        assert!(plan[2].is_single());
    }

    #[test]
    fn test_only_singles_above_threshold() {
        let plan = compute_render_plan(&seoul_markers(), &Viewport::new(korea(), 11), &MapConfig::default());
        assert_eq!(plan.len(), 4);
        assert!(plan.iter().all(RenderGroup::is_single));
    }

    #[test]
    fn test_threshold_is_configurable() {
        let config = MapConfig { cluster_zoom_threshold: 5, ..MapConfig::default() };
        let plan = compute_render_plan(&seoul_markers(), &Viewport::new(korea(), 8), &config);
        assert!(plan.iter().all(RenderGroup::is_single));
    }

    #[test]
    fn test_only_in_bounds_markers_are_clustered() {
        let plan = compute_render_plan(&seoul_markers(), &Viewport::new(seoul(), 6), &MapConfig::default());
        // zoom 6 radius is 19.2km: the three Seoul markers fold together, busan is out of view
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].len(), 3);
    }

    #[test]
    fn test_plan_keeps_marker_order() {
        let mut markers = seoul_markers();
        markers.reverse();
        let plan = compute_render_plan(&markers, &Viewport::new(korea(), 14), &MapConfig::default());
        let drawn: Vec<LocationId> = plan.iter().flat_map(RenderGroup::ids).collect();
        assert_eq!(ids(&drawn), ["busan", "gangnam", "jongno", "city-hall"]);
    }

    #[test]
    fn test_controller_noop_without_viewport() {
        let markers = seoul_markers();
        let index = MarkerIndex::new(&markers);
        let mut controller = VisibilityController::new(MapConfig::default());

        let viewport = Viewport::new(korea(), 14);
        controller.update(&markers, &index, Some(&viewport)).unwrap();
        let before = controller.plan().to_vec();

        assert!(controller.update(&markers, &index, None).is_none());
        assert_eq!(controller.plan(), before.as_slice());
        assert_eq!(controller.visible().len(), 4);
    }

    #[test]
    fn test_controller_is_idempotent() {
        let markers = seoul_markers();
        let index = MarkerIndex::new(&markers);
        let mut controller = VisibilityController::new(MapConfig::default());
        let viewport = Viewport::new(korea(), 9);

        let first = controller.update(&markers, &index, Some(&viewport)).unwrap();
        assert!(!first.is_empty());
        let first_plan = controller.plan().to_vec();

        let second = controller.update(&markers, &index, Some(&viewport)).unwrap();
        assert!(second.is_empty());
        assert_eq!(controller.plan(), first_plan.as_slice());
    }

    #[test]
    fn test_controller_diff_on_pan_and_zoom() {
        let markers = seoul_markers();
        let index = MarkerIndex::new(&markers);
        let mut controller = VisibilityController::new(MapConfig::default());

        // Detailed view of Seoul: three standalone markers
        let diff = controller
            .update(&markers, &index, Some(&Viewport::new(seoul(), 14)))
            .unwrap();
        assert_eq!(shown(&diff.show), ["city-hall", "jongno", "gangnam"]);
        assert!(diff.hide.is_empty());
        assert!(diff.clusters.is_none());

        // Pan to all of Korea at the same zoom: only busan appears, nothing re-shown
        let diff = controller
            .update(&markers, &index, Some(&Viewport::new(korea(), 14)))
            .unwrap();
        assert_eq!(shown(&diff.show), ["busan"]);
        assert!(diff.hide.is_empty());

        // Zoom out: the Seoul pair folds into a cluster marker
        let diff = controller
            .update(&markers, &index, Some(&Viewport::new(korea(), 10)))
            .unwrap();
        assert!(diff.show.is_empty());
        assert_eq!(ids(&diff.hide), ["city-hall", "jongno"]);
        let clusters = diff.clusters.unwrap();
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].count, 2);
        assert_eq!(controller.cluster_markers().len(), 1);

        // Zoom back in: cluster markers cleared, pair shown again
        let diff = controller
            .update(&markers, &index, Some(&Viewport::new(korea(), 14)))
            .unwrap();
        assert_eq!(shown(&diff.show), ["city-hall", "jongno"]);
        assert_eq!(diff.clusters, Some(vec![]));
    }

    #[test]
    fn test_controller_redraws_changed_marker() {
        let markers = seoul_markers();
        let mut controller = VisibilityController::new(MapConfig::default());
        let viewport = Viewport::new(korea(), 14);
        controller
            .update(&markers, &MarkerIndex::new(&markers), Some(&viewport))
            .unwrap();

        // Same id, new position and a partner kind that changes the style
        let mut moved = markers.clone();
        moved[2] = Location::new("gangnam", "gangnam", LatLng::new(37.5172, 127.0473))
            .with_partner_kinds(["협회"]);
        let diff = controller
            .update(&moved, &MarkerIndex::new(&moved), Some(&viewport))
            .unwrap();

        assert_eq!(ids(&diff.hide), ["gangnam"]);
        assert_eq!(shown(&diff.show), ["gangnam"]);
        assert_eq!(diff.show[0].position, LatLng::new(37.5172, 127.0473));
        assert_eq!(diff.show[0].style, crate::MarkerStyle::Association);
        assert!(diff.clusters.is_none());
        assert_eq!(controller.visible()[&LocationId::from("gangnam")], diff.show[0]);
    }

    #[test]
    fn test_render_group_from_single_cluster() {
        let clusters = crate::cluster(&[loc("solo", 37.0, 127.0)], 8);
        let group = RenderGroup::from_cluster(clusters.into_iter().next().unwrap());
        assert!(group.is_single());
        assert_eq!(group.len(), 1);
    }
}
