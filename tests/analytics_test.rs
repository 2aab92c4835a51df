//! Aggregation tests over an in-memory store

use chrono::{DateTime, FixedOffset, NaiveDate, TimeZone};

use junggo::analytics::{
    Dashboard, ModelSelector, PlatformFilter, QueryCache, QueryFilter, NO_REGION_TEXT,
};
use junggo::db::Database;
use junggo::extract::date::kst;
use junggo::extract::RawPrice;
use junggo::listing::{CanonicalRecord, Platform, RawListing};
use junggo::pipeline::{Normalizer, PipelineConfig};
use junggo::region_map::{RegionMap, UNMAPPED};

fn now() -> DateTime<FixedOffset> {
    kst().with_ymd_and_hms(2025, 11, 9, 12, 0, 0).unwrap()
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn listing(
    platform: Platform,
    id: u32,
    title: &str,
    location: Option<&str>,
    price: f64,
    posted: &str,
) -> RawListing {
    let mut raw = RawListing::new(platform, format!("https://example.com/products/{}", id), title);
    raw.post_id = Some(id.to_string());
    raw.location = location.map(String::from);
    raw.price = Some(RawPrice::Number(price));
    raw.posted = Some(posted.into());
    raw
}

fn seed_records() -> Vec<CanonicalRecord> {
    let config = PipelineConfig::default();
    let normalizer = Normalizer::new(&config, now()).unwrap();
    let items = vec![
        listing(Platform::Bunjang, 1, "아이폰 16 256GB 블랙", Some("서울특별시 노원구 상계동"), 450000.0, "2025-11-05"),
        listing(Platform::Joongna, 2, "아이폰 16 128GB", Some("서울특별시 상계동"), 400000.0, "2025-11-06"),
        listing(Platform::Daangn, 3, "아이폰 16 128GB", Some("경기도 미지동"), 0.0, "2025-11-06"),
        listing(Platform::Bunjang, 4, "아이폰 16 512GB", None, 500000.0, "2025-11-07"),
        listing(Platform::Bunjang, 5, "아이폰 16 256GB", Some("서울특별시 마포구 합정동"), 420000.0, "2025-10-01"),
    ];
    let batch = normalizer.run(items);
    assert_eq!(batch.records.len(), 5);
    batch.records
}

fn seeded_db() -> Database {
    let db = Database::open_in_memory().unwrap();
    db.upsert_records(&seed_records()).unwrap();
    db
}

fn november(platform: PlatformFilter) -> QueryFilter {
    QueryFilter::new(platform, ModelSelector::new(16, false), date(2025, 11, 1), date(2025, 11, 9)).unwrap()
}

fn region_map() -> RegionMap {
    RegionMap::from_pairs([("상계동", "노원구"), ("합정동", "마포구")])
}

#[test]
fn test_dashboard_over_seeded_store() {
    let db = seeded_db();
    let dashboard = Dashboard::build(&db, &region_map(), &november(PlatformFilter::All));

    assert!(dashboard.warnings.is_empty());
    assert_eq!(dashboard.summary.count, 4);
    // the zero price is unknown and stays out of the mean
    assert_eq!(dashboard.summary.avg_price, Some(450_000.0));
    assert_eq!(dashboard.top_district.as_deref(), Some("노원구"));

    let district_total: usize = dashboard.districts.iter().map(|d| d.count).sum();
    assert_eq!(district_total, dashboard.summary.count);
    assert_eq!(dashboard.unmapped_count(), 2);
    assert!(dashboard.districts.iter().any(|d| d.district == "노원구" && d.count == 2));

    let unmapped: Vec<(&str, usize)> =
        dashboard.unmapped.iter().map(|u| (u.dong.as_str(), u.count)).collect();
    assert_eq!(unmapped.len(), 2);
    assert!(unmapped.contains(&("미지동", 1)));
    assert!(unmapped.contains(&(NO_REGION_TEXT, 1)));

    let trend: Vec<(NaiveDate, f64)> = dashboard.trend.iter().map(|p| (p.date, p.avg_price)).collect();
    assert_eq!(
        trend,
        vec![
            (date(2025, 11, 5), 450_000.0),
            (date(2025, 11, 6), 400_000.0),
            (date(2025, 11, 7), 500_000.0),
        ]
    );
}

#[test]
fn test_platform_selector_narrows_all_but_breakdown() {
    let db = seeded_db();
    let filter = november(PlatformFilter::Only(Platform::Bunjang));
    let dashboard = Dashboard::build(&db, &region_map(), &filter);

    assert_eq!(dashboard.summary.count, 2);
    let district_total: usize = dashboard.districts.iter().map(|d| d.count).sum();
    assert_eq!(district_total, 2);

    let platform_total: usize = dashboard.platforms.iter().map(|p| p.count).sum();
    assert_eq!(platform_total, 4);
    assert_eq!(dashboard.platforms[0].platform, "번개장터");
    assert_eq!(dashboard.platforms[0].count, 2);
}

#[test]
fn test_pro_selector_excludes_base_model() {
    let db = seeded_db();
    let filter = QueryFilter::new(
        PlatformFilter::All,
        ModelSelector::new(16, true),
        date(2025, 11, 1),
        date(2025, 11, 9),
    )
    .unwrap();
    let dashboard = Dashboard::build(&db, &region_map(), &filter);
    assert_eq!(dashboard.summary.count, 0);
    assert_eq!(dashboard.summary.avg_price, None);
    assert!(dashboard.districts.is_empty());
    assert!(dashboard.top_district.is_none());
}

#[test]
fn test_empty_region_map_counts_everything_without_district_as_unmapped() {
    let db = seeded_db();
    let dashboard = Dashboard::build(&db, &RegionMap::default(), &november(PlatformFilter::All));
    assert_eq!(dashboard.unmapped_count(), 3);
    assert_eq!(dashboard.top_district.as_deref(), Some("노원구"));
    assert!(dashboard.districts.iter().any(|d| d.district == UNMAPPED && d.count == 3));
}

#[test]
fn test_malformed_region_table_routes_rows_to_sentinel() {
    let path = std::env::temp_dir().join(format!("junggo-map-{}.csv", std::process::id()));
    std::fs::write(&path, "동,시군구\n상계동,노원구\n").unwrap();

    let (map, problem) = RegionMap::load_or_empty(&path);
    std::fs::remove_file(&path).unwrap();
    assert!(map.is_empty());
    assert!(problem.unwrap().contains("dong"));

    let db = seeded_db();
    let dashboard = Dashboard::build(&db, &map, &november(PlatformFilter::All));
    assert_eq!(dashboard.summary.count, 4);
    assert_eq!(dashboard.unmapped_count(), 3);
    assert!(dashboard.districts.iter().any(|d| d.district == UNMAPPED && d.count == 3));
    assert!(dashboard.warnings.is_empty());
}

#[test]
fn test_reversed_range_is_rejected() {
    let result = QueryFilter::new(
        PlatformFilter::All,
        ModelSelector::new(16, false),
        date(2025, 11, 9),
        date(2025, 11, 1),
    );
    assert!(result.is_err());
}

#[test]
fn test_cache_reuses_until_store_changes() {
    let db = seeded_db();
    let map = region_map();
    let filter = november(PlatformFilter::All);
    let mut cache = QueryCache::new();

    assert_eq!(cache.dashboard(&db, &map, &filter).summary.count, 4);
    cache.dashboard(&db, &map, &november(PlatformFilter::Only(Platform::Daangn)));
    assert_eq!(cache.len(), 2);

    let config = PipelineConfig::default();
    let normalizer = Normalizer::new(&config, now()).unwrap();
    let extra = normalizer.run(vec![listing(
        Platform::Joongna,
        6,
        "아이폰 16 256GB",
        Some("서울특별시 노원구 중계동"),
        470000.0,
        "2025-11-08",
    )]);
    db.upsert_records(&extra.records).unwrap();

    assert_eq!(cache.dashboard(&db, &map, &filter).summary.count, 5);
    assert_eq!(cache.len(), 1);
}

#[test]
fn test_upsert_replaces_existing_post() {
    let db = seeded_db();
    let mut records = seed_records();
    records.truncate(1);
    records[0].price = 430_000;
    db.upsert_records(&records).unwrap();

    assert_eq!(db.count_posts().unwrap(), 5);
    let rows = db.list_posts().unwrap();
    let row = rows.iter().find(|r| r.post_id == "1").unwrap();
    assert_eq!(row.price, 430_000);
    assert_eq!(row.sigungu, "노원구");
}
