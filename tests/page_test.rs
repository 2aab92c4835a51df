//! Rendered detail page sources over fixture HTML

use chrono::{DateTime, FixedOffset, TimeZone};

use junggo::extract::date::kst;
use junggo::listing::{Platform, RawListing};
use junggo::page::RenderedPage;
use junggo::pipeline::{Normalizer, Outcome, PipelineConfig};

// ============================================================================
// Fixtures
// ============================================================================

/// No labeled value element; region and date only appear as plain lines
const PLAIN_HTML: &str = r#"
<!DOCTYPE html>
<html>
<head><title>판매글</title></head>
<body>
    <p>직거래지역 : 대구광역시 수성구 범어동</p>
    <p>작성일: 2025.11.02</p>
    <script>var a = "대구광역시";</script>
    <script>var loc = {"full": "대구광역시 수성구 범어동 아파트"};</script>
    <script id="__NEXT_DATA__" type="application/json">{broken</script>
</body>
</html>
"#;

/// Everything lives in the embedded payload
const NEXT_DATA_HTML: &str = r#"
<!DOCTYPE html>
<html>
<head><title>번개장터</title></head>
<body>
    <div id="__next"></div>
    <script id="__NEXT_DATA__" type="application/json">
    {"props": {"pageProps": {"product": {
        "name": "아이폰 16 256GB 블루",
        "price": "510000",
        "createdAt": "2025-11-03T10:00:00Z",
        "options": {"capacity": "256GB"},
        "location": "인천광역시 연수구 송도동"
    }}}}
    </script>
</body>
</html>
"#;

fn now() -> DateTime<FixedOffset> {
    kst().with_ymd_and_hms(2025, 11, 9, 12, 0, 0).unwrap()
}

#[test]
fn test_plain_page_fallbacks() {
    let page = RenderedPage::parse(PLAIN_HTML);

    let region = page.region_value.as_deref().unwrap();
    assert!(region.starts_with("직거래지역"));
    assert!(region.contains("대구광역시 수성구 범어동"));

    assert_eq!(page.labeled_date.as_deref(), Some("2025.11.02"));

    // longest script window wins
    let script = page.script_region.as_deref().unwrap();
    assert!(script.contains("수성구 범어동"));

    // malformed payload is simply absent
    assert!(page.next_data.is_none());
    assert!(page.meta_text.is_empty());
    assert!(!page.text.contains("var loc"));
    assert!(!page.is_empty());
}

#[test]
fn test_empty_document_has_no_sources() {
    assert!(RenderedPage::parse("").is_empty());
    assert!(RenderedPage::parse("<html><body><script>var x = 1;</script></body></html>").is_empty());
}

#[test]
fn test_next_data_payload_feeds_normalizer() {
    let page = RenderedPage::parse(NEXT_DATA_HTML);
    assert!(page.next_data.is_some());

    let mut raw = RawListing::new(Platform::Bunjang, "https://m.bunjang.co.kr/products/9001", "아이폰16 팝니다");
    raw.page = Some(page);

    let config = PipelineConfig::default();
    let normalizer = Normalizer::new(&config, now()).unwrap();
    let record = match normalizer.normalize(&raw).unwrap() {
        Outcome::Accepted(record) => *record,
        Outcome::Rejected(r) => panic!("unexpectedly rejected: {:?}", r),
    };

    assert_eq!(record.post_id, "9001");
    assert_eq!(record.price, 510_000);
    assert_eq!(record.storage.gb(), 256);
    assert_eq!(record.color.map(|c| c.as_str()), Some("블루"));
    assert_eq!(record.posted_date().as_deref(), Some("2025-11-03"));
    assert_eq!(record.region.sigungu.as_deref(), Some("연수구"));
    assert_eq!(record.region.dong.as_deref(), Some("송도동"));
}

#[test]
fn test_plain_page_region_reaches_record() {
    let mut raw = RawListing::new(Platform::Bunjang, "https://m.bunjang.co.kr/products/9002", "아이폰 16 128GB");
    raw.html = Some(PLAIN_HTML.into());

    let config = PipelineConfig::default();
    let normalizer = Normalizer::new(&config, now()).unwrap();
    let record = match normalizer.normalize(&raw).unwrap() {
        Outcome::Accepted(record) => *record,
        Outcome::Rejected(r) => panic!("unexpectedly rejected: {:?}", r),
    };

    assert_eq!(record.region.sido.as_deref(), Some("대구광역시"));
    assert_eq!(record.region.sigungu.as_deref(), Some("수성구"));
    assert_eq!(record.region.dong.as_deref(), Some("범어동"));
    assert_eq!(record.posted_date().as_deref(), Some("2025-11-02"));
}
