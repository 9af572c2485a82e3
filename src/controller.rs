//! Adapter between the reducer and an imperative map renderer.
//!
//! [`MapController`] owns the current [`MapViewState`] and a [`MarkerRenderer`].
//! Every dispatched event runs through the reducer and the resulting effects are
//! applied to the renderer in order. Camera moves may report the viewport the map
//! settled on; that viewport is queued as an `Idle` event and handled after the
//! current event, so recomputations never overlap.

use std::collections::VecDeque;

use log::debug;

use crate::{
    Bounds, ClusterMarker, Effect, LatLng, LocationId, LocationMarker, MapEvent, MapViewState,
    Viewport,
};

/// The imperative side of the map.
///
/// Only marker methods are required. Camera methods return the viewport the map
/// ends up showing when the renderer knows it synchronously.
pub trait MarkerRenderer {
    fn show_markers(&mut self, markers: &[LocationMarker]);

    fn hide_markers(&mut self, ids: &[LocationId]);

    /// Remove all cluster markers and draw `markers` instead.
    fn replace_cluster_markers(&mut self, markers: &[ClusterMarker]);

    fn fit_bounds(&mut self, _bounds: &Bounds) -> Option<Viewport> {
        None
    }

    fn center_on(&mut self, _coordinate: LatLng, _zoom: u8) -> Option<Viewport> {
        None
    }

    /// Move the center without changing the zoom.
    fn pan_to(&mut self, _coordinate: LatLng) -> Option<Viewport> {
        None
    }

    fn list_changed(&mut self, _count: usize) {}

    fn show_detail(&mut self, _id: &LocationId) {}

    fn favorite_changed(&mut self, _id: &LocationId, _is_favorite: bool) {}
}

/// Apply effects in order. Returns the last viewport reported by a camera move.
pub fn apply_effects<R: MarkerRenderer + ?Sized>(renderer: &mut R, effects: &[Effect]) -> Option<Viewport> {
    let mut settled = None;
    for effect in effects {
        match effect {
            Effect::FavoriteChanged { id, is_favorite } => renderer.favorite_changed(id, *is_favorite),
            Effect::ListChanged { count } => renderer.list_changed(*count),
            Effect::ShowDetail(id) => renderer.show_detail(id),
            Effect::HideMarkers(ids) => renderer.hide_markers(ids),
            Effect::ShowMarkers(markers) => renderer.show_markers(markers),
            Effect::ReplaceClusterMarkers(markers) => renderer.replace_cluster_markers(markers),
            Effect::FitBounds(bounds) => {
                if let Some(viewport) = renderer.fit_bounds(bounds) {
                    settled = Some(viewport);
                }
            }
            Effect::CenterOn { coordinate, zoom } => {
                if let Some(viewport) = renderer.center_on(*coordinate, *zoom) {
                    settled = Some(viewport);
                }
            }
            Effect::PanTo(coordinate) => {
                if let Some(viewport) = renderer.pan_to(*coordinate) {
                    settled = Some(viewport);
                }
            }
        }
    }
    settled
}

/// Owns the map state and drives a renderer with it.
///
/// # Example
/// ```
/// use partner_map::{
///     Bounds, ClusterMarker, LatLng, Location, LocationId, LocationMarker, MapController,
///     MapEvent, MapViewState, MarkerRenderer,
/// };
///
/// #[derive(Default)]
/// struct Screen {
///     shown: Vec<LocationId>,
/// }
///
/// impl MarkerRenderer for Screen {
///     fn show_markers(&mut self, markers: &[LocationMarker]) {
///         self.shown.extend(markers.iter().map(|m| m.id.clone()));
///     }
///     fn hide_markers(&mut self, ids: &[LocationId]) {
///         self.shown.retain(|id| !ids.contains(id));
///     }
///     fn replace_cluster_markers(&mut self, _markers: &[ClusterMarker]) {}
/// }
///
/// let mut controller = MapController::new(MapViewState::default(), Screen::default());
/// controller.dispatch(MapEvent::LocationsLoaded(vec![
///     Location::new("1", "Studio", LatLng::new(37.5665, 126.9780)),
/// ]));
/// controller.dispatch(MapEvent::Idle {
///     bounds: Some(Bounds::new(37.0, 38.0, 126.0, 128.0)),
///     zoom: 15,
/// });
/// assert_eq!(controller.renderer().shown, vec![LocationId::from("1")]);
/// ```
#[derive(Debug)]
pub struct MapController<R> {
    state: MapViewState,
    renderer: R,
    pending: VecDeque<MapEvent>,
}

impl<R: MarkerRenderer> MapController<R> {
    pub fn new(state: MapViewState, renderer: R) -> Self {
        Self {
            state,
            renderer,
            pending: VecDeque::new(),
        }
    }

    pub fn state(&self) -> &MapViewState {
        &self.state
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn into_parts(self) -> (MapViewState, R) {
        (self.state, self.renderer)
    }

    /// Handle one event, then any follow-up events it caused, in FIFO order.
    pub fn dispatch(&mut self, event: MapEvent) {
        self.pending.push_back(event);
        self.drain();
    }

    /// Queue an event without handling it. Use [`flush`](Self::flush) to handle
    /// everything queued in a single render pass.
    pub fn enqueue(&mut self, event: MapEvent) {
        self.pending.push_back(event);
    }

    /// Handle all queued events as one batch.
    pub fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let batch: Vec<MapEvent> = self.pending.drain(..).collect();
        debug!("[PartnerMap] Flushing {} queued events", batch.len());
        self.step(batch);
        self.drain();
    }

    fn drain(&mut self) {
        while let Some(event) = self.pending.pop_front() {
            self.step(std::iter::once(event));
        }
    }

    fn step<I: IntoIterator<Item = MapEvent>>(&mut self, events: I) {
        let state = std::mem::take(&mut self.state);
        let (state, effects) = state.reduce_all(events);
        self.state = state;

        if let Some(viewport) = apply_effects(&mut self.renderer, &effects) {
            self.pending.push_back(MapEvent::Idle {
                bounds: Some(viewport.bounds),
                zoom: viewport.zoom,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FilterCriteria, Location, OriginSource};

    /// Records every call. Camera moves settle on a fixed viewport at the requested zoom.
    #[derive(Debug, Default)]
    struct RecordingMap {
        calls: Vec<String>,
        shown: Vec<LocationId>,
        clusters: Vec<ClusterMarker>,
        settle: Option<Bounds>,
    }

    impl MarkerRenderer for RecordingMap {
        fn show_markers(&mut self, markers: &[LocationMarker]) {
            self.calls.push(format!("show {}", markers.len()));
            self.shown.extend(markers.iter().map(|m| m.id.clone()));
        }

        fn hide_markers(&mut self, ids: &[LocationId]) {
            self.calls.push(format!("hide {}", ids.len()));
            self.shown.retain(|id| !ids.contains(id));
        }

        fn replace_cluster_markers(&mut self, markers: &[ClusterMarker]) {
            self.calls.push(format!("clusters {}", markers.len()));
            self.clusters = markers.to_vec();
        }

        fn fit_bounds(&mut self, _bounds: &Bounds) -> Option<Viewport> {
            self.calls.push("fit".to_string());
            self.settle.map(|b| Viewport::new(b, 9))
        }

        fn center_on(&mut self, _coordinate: LatLng, zoom: u8) -> Option<Viewport> {
            self.calls.push(format!("center {}", zoom));
            self.settle.map(|b| Viewport::new(b, zoom))
        }

        fn pan_to(&mut self, _coordinate: LatLng) -> Option<Viewport> {
            self.calls.push("pan".to_string());
            self.settle.map(|b| Viewport::new(b, 14))
        }

        fn list_changed(&mut self, count: usize) {
            self.calls.push(format!("list {}", count));
        }

        fn show_detail(&mut self, id: &LocationId) {
            self.calls.push(format!("detail {}", id));
        }
    }

    fn sites() -> Vec<Location> {
        vec![
            Location::new("1", "A", LatLng::new(37.5665, 126.9780)).with_categories(["도자기"]),
            Location::new("2", "B", LatLng::new(37.5700, 126.9820)).with_categories(["목공"]),
            Location::new("3", "C", LatLng::new(35.1796, 129.0756)).with_categories(["도자기"]),
        ]
    }

    fn korea() -> Bounds {
        Bounds::new(33.0, 39.0, 124.0, 132.0)
    }

    #[test]
    fn test_camera_move_feeds_back_as_idle() {
        let renderer = RecordingMap { settle: Some(korea()), ..RecordingMap::default() };
        let mut controller = MapController::new(MapViewState::default(), renderer);

        controller.dispatch(MapEvent::LocationsLoaded(sites()));

        // fit settles at zoom 9: the Seoul pair clusters, Busan is standalone
        let map = controller.renderer();
        assert_eq!(map.calls, ["list 3", "fit", "show 1", "clusters 1"]);
        assert_eq!(map.shown, vec![LocationId::from("3")]);
        assert_eq!(map.clusters[0].count, 2);
        assert_eq!(controller.state().viewport().map(|v| v.zoom), Some(9));
    }

    #[test]
    fn test_geolocation_recenter_replans_at_nearby_zoom() {
        let renderer = RecordingMap { settle: Some(korea()), ..RecordingMap::default() };
        let mut controller = MapController::new(MapViewState::default(), renderer);
        controller.dispatch(MapEvent::LocationsLoaded(sites()));
        controller.renderer_mut().calls.clear();

        controller.dispatch(MapEvent::ReferencePointSet {
            origin: LatLng::new(37.5665, 126.9780),
            source: OriginSource::Geolocation,
        });

        // Zoom 13 is above the threshold: cluster dissolves into two markers
        let map = controller.renderer();
        assert_eq!(map.calls, ["list 3", "center 13", "show 2", "clusters 0"]);
        assert_eq!(map.shown.len(), 3);
    }

    #[test]
    fn test_without_viewport_nothing_is_drawn() {
        let mut controller = MapController::new(MapViewState::default(), RecordingMap::default());
        controller.dispatch(MapEvent::LocationsLoaded(sites()));
        controller.dispatch(MapEvent::Idle { bounds: None, zoom: 12 });

        assert_eq!(controller.renderer().calls, ["list 3", "fit"]);
        assert!(controller.renderer().shown.is_empty());
    }

    #[test]
    fn test_focus_opens_detail_and_replans_at_focus_zoom() {
        let renderer = RecordingMap { settle: Some(korea()), ..RecordingMap::default() };
        let mut controller = MapController::new(MapViewState::default(), renderer);
        controller.dispatch(MapEvent::LocationsLoaded(sites()));
        controller.renderer_mut().calls.clear();

        controller.dispatch(MapEvent::LocationFocused("1".into()));

        let map = controller.renderer();
        assert_eq!(map.calls, ["detail 1", "center 15", "show 2", "clusters 0"]);
        assert_eq!(controller.state().viewport().map(|v| v.zoom), Some(15));
    }

    #[test]
    fn test_marker_click_pans_and_settles() {
        let renderer = RecordingMap { settle: Some(korea()), ..RecordingMap::default() };
        let mut controller = MapController::new(MapViewState::default(), renderer);
        controller.dispatch(MapEvent::LocationsLoaded(sites()));
        controller.renderer_mut().calls.clear();

        controller.dispatch(MapEvent::MarkerClicked("3".into()));

        let map = controller.renderer();
        assert_eq!(map.calls, ["detail 3", "pan", "show 2", "clusters 0"]);
        assert_eq!(map.shown.len(), 3);
    }

    #[test]
    fn test_cluster_click_fits_member_bounds() {
        let renderer = RecordingMap { settle: Some(korea()), ..RecordingMap::default() };
        let mut controller = MapController::new(MapViewState::default(), renderer);
        controller.dispatch(MapEvent::LocationsLoaded(sites()));
        let bounds = controller.renderer().clusters[0].member_bounds;
        controller.renderer_mut().calls.clear();

        controller.dispatch(MapEvent::ClusterClicked(bounds));

        // Settles at zoom 9 again, so the plan is unchanged
        assert_eq!(controller.renderer().calls, ["fit"]);
    }

    #[test]
    fn test_flush_handles_queue_as_one_batch() {
        let mut controller = MapController::new(MapViewState::default(), RecordingMap::default());
        controller.enqueue(MapEvent::LocationsLoaded(sites()));
        controller.enqueue(MapEvent::Idle { bounds: Some(korea()), zoom: 15 });
        controller.enqueue(MapEvent::FiltersChanged(FilterCriteria::default().with_category("도자기")));
        assert!(controller.renderer().calls.is_empty());

        controller.flush();
        let map = controller.renderer();
        assert_eq!(map.calls, ["list 3", "list 2", "show 2", "fit"]);
        assert_eq!(map.shown, vec![LocationId::from("1"), LocationId::from("3")]);

        // Nothing left to do
        controller.flush();
        assert_eq!(controller.renderer().calls.len(), 4);
    }
}
