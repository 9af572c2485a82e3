//! Walk a map through load, zoom, filter and "near me" and print what the
//! renderer is asked to do at each step.
//!
//! Run with: cargo run --example viewport_walkthrough

use partner_map::{
    Bounds, ClusterMarker, DeepLink, FilterCriteria, LatLng, Location, LocationId, LocationMarker,
    MapController, MapEvent, MapViewState, MarkerRenderer, MarkerStyle, OriginSource, Viewport,
};

/// Prints every call and settles camera moves on the whole country.
struct ConsoleMap;

impl MarkerRenderer for ConsoleMap {
    fn show_markers(&mut self, markers: &[LocationMarker]) {
        println!("   show     {} markers", markers.len());
        for m in markers {
            println!(
                "            {} {} at ({:.4}, {:.4}) [{:?}]",
                m.id, m.name, m.position.lat, m.position.lng, m.style
            );
        }
    }

    fn hide_markers(&mut self, ids: &[LocationId]) {
        println!("   hide     {:?}", ids.iter().map(LocationId::as_str).collect::<Vec<_>>());
    }

    fn replace_cluster_markers(&mut self, markers: &[ClusterMarker]) {
        println!("   clusters {} markers", markers.len());
        for m in markers {
            println!(
                "            {} at ({:.4}, {:.4}), {}px",
                m.count, m.position.lat, m.position.lng, m.size_px
            );
        }
    }

    fn fit_bounds(&mut self, bounds: &Bounds) -> Option<Viewport> {
        println!(
            "   fit      ({:.2}, {:.2}) - ({:.2}, {:.2})",
            bounds.min_lat, bounds.min_lng, bounds.max_lat, bounds.max_lng
        );
        Some(Viewport::new(korea(), 7))
    }

    fn center_on(&mut self, coordinate: LatLng, zoom: u8) -> Option<Viewport> {
        println!("   center   ({:.4}, {:.4}) zoom {}", coordinate.lat, coordinate.lng, zoom);
        let half = 0.05;
        Some(Viewport::new(
            Bounds::new(coordinate.lat - half, coordinate.lat + half, coordinate.lng - half, coordinate.lng + half),
            zoom,
        ))
    }

    fn pan_to(&mut self, coordinate: LatLng) -> Option<Viewport> {
        println!("   pan      ({:.4}, {:.4})", coordinate.lat, coordinate.lng);
        None
    }

    fn list_changed(&mut self, count: usize) {
        println!("   list     {} entries", count);
    }

    fn show_detail(&mut self, id: &LocationId) {
        println!("   detail   {}", id);
    }
}

fn korea() -> Bounds {
    Bounds::new(33.0, 39.0, 124.0, 132.0)
}

fn partners() -> Vec<Location> {
    vec![
        Location::new(1u64, "흙과 불 공방", LatLng::new(37.5665, 126.9780))
            .with_address("서울 중구 세종대로 110")
            .with_categories(["도자기"])
            .with_partner_kinds(["협회"]),
        Location::new(2u64, "나무결 목공소", LatLng::new(37.5700, 126.9820))
            .with_address("서울 종로구 종로 1")
            .with_categories(["목공"]),
        Location::new(3u64, "물레 스튜디오", LatLng::new(37.4979, 127.0276))
            .with_address("서울 강남구 강남대로 396")
            .with_categories(["도자기"])
            .with_partner_kinds(["인플루언서"]),
        Location::new(4u64, "바다빛 도예", LatLng::new(35.1796, 129.0756))
            .with_address("부산 해운대구 해운대로 264")
            .with_categories(["도자기"]),
        Location::new(5u64, "한밭 압화", LatLng::new(36.3504, 127.3845))
            .with_address("대전 서구 둔산로 100")
            .with_categories(["압화"]),
    ]
}

fn main() {
    let mut map = MapController::new(MapViewState::default(), ConsoleMap);

    println!("Partner Map Walkthrough\n");

    println!("1. Data loaded (map fits to all partners, settles at zoom 7):");
    map.dispatch(MapEvent::LocationsLoaded(partners()));

    println!("\n2. User zooms to Seoul at zoom 12:");
    map.dispatch(MapEvent::Idle {
        bounds: Some(Bounds::new(37.40, 37.70, 126.80, 127.20)),
        zoom: 12,
    });

    println!("\n3. Category filter \"도자기\":");
    map.dispatch(MapEvent::FiltersChanged(FilterCriteria::default().with_category("도자기")));

    println!("\n4. Geolocation fix near Gangnam:");
    map.dispatch(MapEvent::ReferencePointSet {
        origin: LatLng::new(37.5000, 127.0300),
        source: OriginSource::Geolocation,
    });

    println!("\nNearest partners:");
    if let Some(ranked) = map.state().ranked() {
        for entry in ranked {
            println!(
                "  {:>7.2} km  {} [{:?}]",
                entry.distance_km,
                entry.location.name(),
                MarkerStyle::for_location(&entry.location)
            );
        }
    }

    println!("\n5. Marker click on partner 3:");
    map.dispatch(MapEvent::MarkerClicked(3u64.into()));

    println!("\n6. Opened from a shared link ?partner=5:");
    match DeepLink::from_query_string("?partner=5") {
        Ok(link) => {
            for event in link.events() {
                map.dispatch(event);
            }
        }
        Err(e) => println!("   bad link: {}", e),
    }

    println!("\nShareable filter: ?{}", map.state().criteria().to_query_string());
}
