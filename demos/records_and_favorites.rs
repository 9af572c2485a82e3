//! Normalize a raw partner payload, restore favorites and filter by them.
//!
//! Run with: cargo run --example records_and_favorites --features serde

use partner_map::{
    parse_records_json, FilterCriteria, Favorites, LocationId, LocationFilter, RegionTable,
};

const PAYLOAD: &str = r#"{
  "partners": [
    {"id": 101, "name": "흙과 불 공방", "address": "서울 중구 세종대로 110",
     "lat": "37.5665", "lng": "126.9780", "category": "도자기, 공예",
     "association": "한국공예협회", "partnerType": "협회"},
    {"id": "102", "name": "바다빛 도예", "address": "부산 해운대구 해운대로 264",
     "lat": 35.1796, "lng": 129.0756, "category": "도자기",
     "partnerType": ["인플루언서"]},
    {"id": 103, "name": "좌표 없는 공방", "address": "경기 성남시",
     "lat": "", "lng": "", "category": "목공"},
    {"id": 104, "name": "한밭 압화", "address": "대전 서구 둔산로 100",
     "lat": "36.3504", "lng": "127.3845", "category": "압화"}
  ]
}"#;

fn main() -> Result<(), partner_map::MapError> {
    let locations = parse_records_json(PAYLOAD)?;
    println!("Loaded {} of 4 records\n", locations.len());

    let regions = RegionTable::default();
    for location in &locations {
        println!(
            "  {:>4}  {:<12} {:<4} {:?}",
            location.id().as_str(),
            location.name(),
            location.region(&regions),
            location.categories()
        );
    }

    // Favorites are persisted by the host as a JSON array of ids
    let mut favorites = Favorites::from_json_lossy(r#"["101"]"#);
    favorites.toggle(LocationId::from(104u64));
    println!("\nFavorites: {}", favorites.to_json()?);

    let criteria = FilterCriteria::default().with_favorites_only(true);
    let filtered = LocationFilter::new(&criteria)
        .with_favorites(&favorites)
        .with_regions(&regions)
        .apply(&locations);
    println!("\nFavorites only:");
    for location in &filtered {
        println!("  {}", location.name());
    }

    let shared = FilterCriteria::default().with_region("서울").with_search("공방");
    let query = shared.to_query_string();
    println!("\nShared link query: ?{}", query);
    let restored = FilterCriteria::from_query_string(&query)?;
    assert_eq!(restored, shared);

    Ok(())
}
