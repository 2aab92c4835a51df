//! Administrative region parsing: 시/도 > 시/군/구 > 동/읍/면

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::text::{char_window, clean_text};

/// Top-level divisions (provinces and metropolitan cities)
pub const SIDO: &[&str] = &[
    "서울특별시", "부산광역시", "대구광역시", "인천광역시", "광주광역시", "대전광역시", "울산광역시",
    "세종특별자치시", "경기도", "강원도", "충청북도", "충청남도", "전라북도", "전라남도",
    "경상북도", "경상남도", "제주특별자치도",
];

/// Districts (구) accepted without question when they follow a division
const KNOWN_GU: &str = "
강남구 강동구 강북구 강서구 관악구 광진구 구로구 금천구 노원구 도봉구 동대문구 동작구 마포구 서대문구 서초구 성동구 성북구 송파구 양천구 영등포구 용산구 은평구 종로구 중구 중랑구
해운대구 수영구 동래구 연제구 남구 북구 부산진구 사하구 서구 동구 중구 영도구 사상구 금정구 강서구
수성구 달서구 동구 서구 남구 북구 중구
남동구 연수구 부평구 계양구 서구 미추홀구 동구 중구
서구 북구 동구 남구 광산구
서구 유성구 대덕구 중구 동구
남구 동구 북구 중구
팔달구 권선구 장안구 영통구 분당구 중원구 수정구 일산동구 일산서구 덕양구 동안구 만안구 상록구 단원구
기흥구 수지구 처인구
덕진구 완산구
흥덕구 상당구 청원구 서원구
";

pub(crate) static SIDO_RE: Lazy<Regex> = Lazy::new(|| {
    let alternation = SIDO.iter().map(|s| regex::escape(s)).collect::<Vec<_>>().join("|");
    Regex::new(&alternation).expect("Invalid province regex")
});

static KNOWN_GU_SET: Lazy<HashSet<&'static str>> =
    Lazy::new(|| KNOWN_GU.split_whitespace().collect());

/// Whole Hangul tokens ending in an administrative suffix
static TOKEN_RE: Lazy<fancy_regex::Regex> = Lazy::new(|| {
    fancy_regex::Regex::new(r"(?<![가-힣])[가-힣]{1,7}(?:구|군|시|동|읍|면)(?![가-힣])")
        .expect("Invalid region token regex")
});

static DONG_RE: Lazy<fancy_regex::Regex> = Lazy::new(|| {
    fancy_regex::Regex::new(r"(?<![가-힣])[가-힣]{1,7}(?:동|읍|면)(?![가-힣])")
        .expect("Invalid neighborhood regex")
});

/// Chars of page text kept after a province name when scanning the whole page
const PAGE_WINDOW_CHARS: usize = 80;

/// Three-level administrative location. Missing levels are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Region {
    pub sido: Option<String>,
    pub sigungu: Option<String>,
    pub dong: Option<String>,
}

impl Region {
    pub fn new(sido: &str, sigungu: &str, dong: &str) -> Self {
        let part = |s: &str| {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        };
        Self { sido: part(sido), sigungu: part(sigungu), dong: part(dong) }
    }

    pub fn is_empty(&self) -> bool {
        self.sido.is_none() && self.sigungu.is_none() && self.dong.is_none()
    }

    /// "서울특별시 노원구 상계동" from whichever parts are known
    pub fn display_id(&self) -> String {
        [&self.sido, &self.sigungu, &self.dong]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Raw-text sources for a listing's region, strongest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionSource {
    /// Location field supplied by the marketplace API
    Location,
    /// Region-looking text inside the embedded JSON payload
    Payload,
    /// Rendered value next to the "직거래지역" label
    DomValue,
    /// Province name found inside a `<script>` body
    Script,
    /// Province name found anywhere in page text
    PageText,
}

fn tokens(text: &str) -> Vec<&str> {
    TOKEN_RE
        .find_iter(text)
        .filter_map(|m| m.ok())
        .map(|m| m.as_str())
        .collect()
}

fn last_matching<'a>(tokens: &[&'a str], pred: impl Fn(&str) -> bool) -> Option<&'a str> {
    tokens.iter().rev().find(|t| pred(t)).copied()
}

/// Parse a free-text location.
///
/// Finds the first province name, then looks only at what follows it. The
/// district is the last 구 token from the known list, else the last 구 token
/// of any kind, else the last 시/군 token. The neighborhood is the first
/// 동/읍/면 token. Returns `None` when no province is named.
pub fn parse(text: &str) -> Option<Region> {
    let m = SIDO_RE.find(text)?;
    let sido = m.as_str();
    let tail = &text[m.end()..];
    let tokens = tokens(tail);

    let sigungu = last_matching(&tokens, |t| t.ends_with('구') && KNOWN_GU_SET.contains(t))
        .or_else(|| last_matching(&tokens, |t| t.ends_with('구')))
        .or_else(|| last_matching(&tokens, |t| t.ends_with('시') || t.ends_with('군')))
        .unwrap_or("");

    let dong = DONG_RE
        .find(tail)
        .ok()
        .flatten()
        .map(|m| m.as_str())
        .unwrap_or("");

    Some(Region::new(sido, sigungu, dong))
}

/// Try each source in order; the first one that names a province supplies
/// the whole region. Sources are never merged level by level.
pub fn resolve<'a, I>(sources: I) -> Option<(RegionSource, Region)>
where
    I: IntoIterator<Item = (RegionSource, &'a str)>,
{
    sources
        .into_iter()
        .find_map(|(source, text)| parse(text).map(|region| (source, region)))
}

/// The province mention in page text plus the chars after it
pub fn page_text_window(text: &str) -> Option<String> {
    let m = SIDO_RE.find(text)?;
    Some(clean_text(char_window(text, m.start(), m.end(), 0, PAGE_WINDOW_CHARS)))
}

pub fn is_known_district(name: &str) -> bool {
    KNOWN_GU_SET.contains(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triple(text: &str) -> (String, String, String) {
        let r = parse(text).unwrap_or_default();
        (
            r.sido.unwrap_or_default(),
            r.sigungu.unwrap_or_default(),
            r.dong.unwrap_or_default(),
        )
    }

    #[test]
    fn test_parse_basic() {
        assert_eq!(
            triple("서울특별시 노원구 상계동"),
            ("서울특별시".into(), "노원구".into(), "상계동".into())
        );
    }

    #[test]
    fn test_text_before_province_is_ignored() {
        assert_eq!(
            triple("강남구 직거래 서울특별시 마포구 합정동").1,
            "마포구"
        );
    }

    #[test]
    fn test_known_district_beats_unknown_later_token() {
        // "역삼구" is not a real district; the known one wins even though it is earlier
        assert_eq!(triple("서울특별시 강남구 역삼구").1, "강남구");
    }

    #[test]
    fn test_last_known_district_wins() {
        assert_eq!(triple("서울특별시 강남구 송파구 가락동").1, "송파구");
    }

    #[test]
    fn test_unknown_gu_then_city() {
        assert_eq!(triple("경기도 아무구 무슨동").1, "아무구");
        assert_eq!(
            triple("경기도 성남시 분당구 정자동"),
            ("경기도".into(), "분당구".into(), "정자동".into())
        );
        assert_eq!(
            triple("경기도 가평군 청평면"),
            ("경기도".into(), "가평군".into(), "청평면".into())
        );
        assert_eq!(triple("경기도 화성시 봉담읍").1, "화성시");
    }

    #[test]
    fn test_tokens_are_whole_words() {
        // "상계동역" is not a neighborhood token
        assert_eq!(triple("서울특별시 노원구 상계동역").2, "");
        assert_eq!(triple("서울특별시 노원구 상계동, 중계동").2, "상계동");
    }

    #[test]
    fn test_province_only() {
        assert_eq!(triple("서울특별시"), ("서울특별시".into(), String::new(), String::new()));
        assert!(parse("노원구 상계동").is_none());
        assert!(parse("").is_none());
    }

    #[test]
    fn test_resolve_first_source_wins_whole() {
        let sources = [
            (RegionSource::Location, "지역정보 없음"),
            (RegionSource::Payload, "서울특별시"),
            (RegionSource::DomValue, "서울특별시 노원구 상계동"),
        ];
        let (source, region) = resolve(sources).unwrap();
        assert_eq!(source, RegionSource::Payload);
        // no district borrowed from the later source
        assert_eq!(region, Region::new("서울특별시", "", ""));
    }

    #[test]
    fn test_page_text_window() {
        let text = "판매자 정보 서울특별시 노원구 상계동 거래 희망";
        let window = page_text_window(text).unwrap();
        assert!(window.starts_with("서울특별시 노원구 상계동"));
        assert!(page_text_window("지역 없음").is_none());
    }

    #[test]
    fn test_display_id() {
        assert_eq!(Region::new("서울특별시", "", "상계동").display_id(), "서울특별시 상계동");
        assert!(Region::default().is_empty());
    }
}
