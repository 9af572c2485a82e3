//! # Map View State
//!
//! A value object holding everything the map screen shows, updated by a reducer:
//! `(state, event) -> (state', effects)`.
//!
//! The state owns the full location set, the filter criteria, favorites and the
//! optional reference point. From those it derives the marker list (filtered, and
//! ranked by distance while a reference point is set), an R-tree over the markers,
//! and the visibility state of the last render.
//!
//! Effects are emitted in a fixed order:
//! 1. bookkeeping (`FavoriteChanged`, `ListChanged`, `ShowDetail`)
//! 2. marker updates (`HideMarkers`, `ShowMarkers`, `ReplaceClusterMarkers`)
//! 3. at most one camera move (`FitBounds`, `CenterOn` or `PanTo`)
//!
//! Camera moves come last because the map answers them with a new idle viewport.

use log::{debug, info, warn};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::filter::LocationFilter;
use crate::visibility::{MarkerIndex, RenderGroup, VisibilityController};
use crate::{
    rank_by_distance, Bounds, ClusterMarker, Favorites, FilterCriteria, FilterFacets, LatLng,
    Location, LocationId, LocationMarker, MapConfig, RankedLocation, RegionTable, Viewport,
};

/// Where a reference point came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum OriginSource {
    /// Device position fix. The map recenters on it.
    Geolocation,
    /// A point the user clicked. The map stays put.
    MapClick,
}

/// The origin the list is ranked against.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ReferencePoint {
    pub origin: LatLng,
    pub source: OriginSource,
}

/// Inputs to the reducer.
#[derive(Debug, Clone, PartialEq)]
pub enum MapEvent {
    /// The data collaborator delivered the full location set.
    LocationsLoaded(Vec<Location>),
    /// The user changed any filter control.
    FiltersChanged(FilterCriteria),
    FavoriteToggled(LocationId),
    /// The map stopped moving. `bounds` is `None` while the map is not ready.
    Idle { bounds: Option<Bounds>, zoom: u8 },
    ReferencePointSet { origin: LatLng, source: OriginSource },
    ReferencePointCleared,
    /// Open a location and zoom to it, as a `?partner=<id>` link does.
    LocationFocused(LocationId),
    /// The user clicked a standalone marker: open it and pan without zooming.
    MarkerClicked(LocationId),
    /// The user clicked a cluster marker; carries its `member_bounds`.
    ClusterClicked(Bounds),
}

/// Outputs of the reducer, applied by a [`MarkerRenderer`](crate::MarkerRenderer).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Effect {
    FavoriteChanged { id: LocationId, is_favorite: bool },
    /// The marker list changed; `count` entries are now listed.
    ListChanged { count: usize },
    /// Open the detail view for a location.
    ShowDetail(LocationId),
    HideMarkers(Vec<LocationId>),
    /// Draw these standalone markers. Applied after `HideMarkers`.
    ShowMarkers(Vec<LocationMarker>),
    /// Remove every cluster marker and draw these instead.
    ReplaceClusterMarkers(Vec<ClusterMarker>),
    FitBounds(Bounds),
    CenterOn { coordinate: LatLng, zoom: u8 },
    /// Move the center and keep the zoom.
    PanTo(LatLng),
}

impl Effect {
    fn is_camera(&self) -> bool {
        matches!(self, Effect::FitBounds(_) | Effect::CenterOn { .. } | Effect::PanTo(_))
    }
}

/// What one event did to the state.
#[derive(Debug, Default)]
struct Step {
    replan: bool,
    camera: Option<Effect>,
}

/// Everything the map screen shows.
///
/// # Example
/// ```
/// use partner_map::{Bounds, Effect, LatLng, Location, MapEvent, MapViewState};
///
/// let state = MapViewState::default();
/// let (state, effects) = state.reduce(MapEvent::LocationsLoaded(vec![
///     Location::new("1", "Studio", LatLng::new(37.5665, 126.9780)),
/// ]));
/// assert_eq!(effects[0], Effect::ListChanged { count: 1 });
///
/// let (state, effects) = state.reduce(MapEvent::Idle {
///     bounds: Some(Bounds::new(37.0, 38.0, 126.0, 128.0)),
///     zoom: 14,
/// });
/// assert!(matches!(&effects[..], [Effect::ShowMarkers(m)] if m[0].id.as_str() == "1"));
/// assert_eq!(state.render_plan().len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct MapViewState {
    config: MapConfig,
    regions: RegionTable,
    locations: Vec<Location>,
    criteria: FilterCriteria,
    favorites: Favorites,
    reference: Option<ReferencePoint>,
    // Derived
    markers: Vec<Location>,
    ranked: Vec<RankedLocation>,
    index: MarkerIndex,
    viewport: Option<Viewport>,
    visibility: VisibilityController,
}

impl Default for MapViewState {
    fn default() -> Self {
        Self::new(MapConfig::default())
    }
}

impl MapViewState {
    pub fn new(config: MapConfig) -> Self {
        Self {
            visibility: VisibilityController::new(config.clone()),
            config,
            regions: RegionTable::default(),
            locations: Vec::new(),
            criteria: FilterCriteria::default(),
            favorites: Favorites::default(),
            reference: None,
            markers: Vec::new(),
            ranked: Vec::new(),
            index: MarkerIndex::default(),
            viewport: None,
        }
    }

    pub fn with_regions(mut self, regions: RegionTable) -> Self {
        self.regions = regions;
        self.refresh_markers();
        self
    }

    /// Start from a persisted favorites set.
    pub fn with_favorites(mut self, favorites: Favorites) -> Self {
        self.favorites = favorites;
        self.refresh_markers();
        self
    }

    /// Start from criteria restored from a query string.
    pub fn with_criteria(mut self, criteria: FilterCriteria) -> Self {
        self.criteria = criteria;
        self.refresh_markers();
        self
    }

    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    pub fn regions(&self) -> &RegionTable {
        &self.regions
    }

    /// The full, unfiltered location set.
    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn favorites(&self) -> &Favorites {
        &self.favorites
    }

    pub fn reference_point(&self) -> Option<&ReferencePoint> {
        self.reference.as_ref()
    }

    /// Filtered locations in list order (by distance while a reference point is set).
    pub fn markers(&self) -> &[Location] {
        &self.markers
    }

    /// Distance-annotated list, present only while a reference point is set.
    pub fn ranked(&self) -> Option<&[RankedLocation]> {
        self.reference.map(|_| self.ranked.as_slice())
    }

    /// Last viewport reported by the map.
    pub fn viewport(&self) -> Option<&Viewport> {
        self.viewport.as_ref()
    }

    /// The plan currently on screen.
    pub fn render_plan(&self) -> &[RenderGroup] {
        self.visibility.plan()
    }

    /// Filter control options for the full location set.
    pub fn facets(&self) -> FilterFacets {
        FilterFacets::from_locations(&self.locations, &self.regions)
    }

    /// Apply one event.
    pub fn reduce(self, event: MapEvent) -> (Self, Vec<Effect>) {
        self.reduce_all(std::iter::once(event))
    }

    /// Apply a batch of events with a single render pass at the end.
    ///
    /// Marker effects describe only the net change over the batch and only the
    /// last camera move is kept.
    pub fn reduce_all<I>(mut self, events: I) -> (Self, Vec<Effect>)
    where
        I: IntoIterator<Item = MapEvent>,
    {
        let mut effects = Vec::new();
        let mut replan = false;
        let mut camera = None;

        for event in events {
            let step = self.apply(event, &mut effects);
            replan |= step.replan;
            if step.camera.is_some() {
                camera = step.camera;
            }
        }

        if replan {
            self.replan(&mut effects);
        }
        effects.extend(camera);

        debug_assert!(
            effects.iter().filter(|e| e.is_camera()).count() <= 1,
            "more than one camera effect"
        );
        (self, effects)
    }

    fn apply(&mut self, event: MapEvent, effects: &mut Vec<Effect>) -> Step {
        match event {
            MapEvent::LocationsLoaded(mut locations) => {
                let total = locations.len();
                locations.retain(|l| l.coordinate().is_valid());
                if locations.len() < total {
                    warn!(
                        "[PartnerMap] Dropped {} locations with invalid coordinates",
                        total - locations.len()
                    );
                }
                info!("[PartnerMap] Loaded {} locations", locations.len());

                self.locations = locations;
                self.refresh_markers();
                effects.push(Effect::ListChanged { count: self.markers.len() });
                Step { replan: true, camera: self.fit_markers() }
            }
            MapEvent::FiltersChanged(criteria) => {
                self.criteria = criteria;
                self.refresh_markers();
                effects.push(Effect::ListChanged { count: self.markers.len() });
                Step { replan: true, camera: self.fit_markers() }
            }
            MapEvent::FavoriteToggled(id) => {
                let is_favorite = self.favorites.toggle(id.clone());
                effects.push(Effect::FavoriteChanged { id, is_favorite });

                if !self.criteria.favorites_only {
                    return Step::default();
                }
                self.refresh_markers();
                effects.push(Effect::ListChanged { count: self.markers.len() });
                Step { replan: true, camera: None }
            }
            MapEvent::Idle { bounds, zoom } => match bounds {
                Some(bounds) => {
                    self.viewport = Some(Viewport::new(bounds, zoom));
                    Step { replan: true, camera: None }
                }
                None => {
                    debug!("[PartnerMap] Idle without bounds, ignoring");
                    Step::default()
                }
            },
            MapEvent::ReferencePointSet { origin, source } => {
                if !origin.is_valid() {
                    warn!(
                        "[PartnerMap] Ignoring invalid reference point ({}, {})",
                        origin.lat, origin.lng
                    );
                    return Step::default();
                }

                self.reference = Some(ReferencePoint { origin, source });
                self.refresh_markers();
                effects.push(Effect::ListChanged { count: self.markers.len() });

                let camera = match source {
                    OriginSource::Geolocation => Some(Effect::CenterOn {
                        coordinate: origin,
                        zoom: self.config.nearby_zoom,
                    }),
                    OriginSource::MapClick => None,
                };
                Step { replan: true, camera }
            }
            MapEvent::LocationFocused(id) => match self.coordinate_of(&id) {
                Some(coordinate) => {
                    effects.push(Effect::ShowDetail(id));
                    let zoom = self.config.focus_zoom;
                    Step { replan: false, camera: Some(Effect::CenterOn { coordinate, zoom }) }
                }
                None => {
                    warn!("[PartnerMap] Cannot focus unknown location {}", id);
                    Step::default()
                }
            },
            MapEvent::MarkerClicked(id) => match self.coordinate_of(&id) {
                Some(coordinate) => {
                    effects.push(Effect::ShowDetail(id));
                    Step { replan: false, camera: Some(Effect::PanTo(coordinate)) }
                }
                None => {
                    warn!("[PartnerMap] Click on unknown location {}", id);
                    Step::default()
                }
            },
            MapEvent::ClusterClicked(bounds) => Step {
                replan: false,
                camera: Some(Effect::FitBounds(bounds)),
            },
            MapEvent::ReferencePointCleared => {
                if self.reference.take().is_none() {
                    return Step::default();
                }
                self.refresh_markers();
                effects.push(Effect::ListChanged { count: self.markers.len() });
                Step { replan: true, camera: None }
            }
        }
    }

    /// Recompute the marker list and its index from the owned inputs.
    fn refresh_markers(&mut self) {
        let filtered = LocationFilter::new(&self.criteria)
            .with_favorites(&self.favorites)
            .with_regions(&self.regions)
            .apply(&self.locations);

        match self.reference {
            Some(reference) => {
                self.ranked = rank_by_distance(&filtered, reference.origin);
                self.markers = self.ranked.iter().map(|r| r.location.clone()).collect();
            }
            None => {
                self.ranked.clear();
                self.markers = filtered;
            }
        }

        self.index = MarkerIndex::new(&self.markers);
    }

    /// Looked up in the full set, so filtered-out locations can still be opened.
    fn coordinate_of(&self, id: &LocationId) -> Option<LatLng> {
        self.locations
            .iter()
            .find(|l| l.id() == id)
            .map(Location::coordinate)
    }

    fn fit_markers(&self) -> Option<Effect> {
        let coords: Vec<LatLng> = self.markers.iter().map(Location::coordinate).collect();
        Bounds::from_points(&coords).map(Effect::FitBounds)
    }

    fn replan(&mut self, effects: &mut Vec<Effect>) {
        let Some(diff) = self
            .visibility
            .update(&self.markers, &self.index, self.viewport.as_ref())
        else {
            return;
        };

        if !diff.hide.is_empty() {
            effects.push(Effect::HideMarkers(diff.hide));
        }
        if !diff.show.is_empty() {
            effects.push(Effect::ShowMarkers(diff.show));
        }
        if let Some(clusters) = diff.clusters {
            effects.push(Effect::ReplaceClusterMarkers(clusters));
        }
    }
}
