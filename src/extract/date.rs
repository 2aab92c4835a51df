//! Posting-time extraction: epochs, ISO-8601, explicit dates and Korean
//! relative expressions, all resolved into KST.

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

/// Seconds east of UTC for Korea Standard Time
const KST_OFFSET_SECS: i32 = 9 * 3600;

static EPOCH_MS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{11,13}$").expect("Invalid epoch regex"));
static EPOCH_SECS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{10}$").expect("Invalid epoch regex"));

static DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([12][0-9]{3})[./-]([0-9]{1,2})[./-]([0-9]{1,2})").expect("Invalid date regex")
});

static RELATIVE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([0-9]+)\s*(분|시간|일|주|개월|달)\s*전").expect("Invalid relative date regex")
});

/// A date-looking fragment anywhere in page text
static PAGE_DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([0-9]+\s*(?:분|시간|일|주|개월|달)\s*전|오늘|어제|[0-9]{4}[-/.][0-9]{1,2}[-/.][0-9]{1,2})")
        .expect("Invalid page date regex")
});

static KST: Lazy<FixedOffset> =
    Lazy::new(|| FixedOffset::east_opt(KST_OFFSET_SECS).expect("KST offset is in range"));

/// Korea Standard Time (UTC+9)
pub fn kst() -> FixedOffset {
    *KST
}

/// A resolved posting time
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PostedAt {
    pub date: NaiveDate,
    pub instant: DateTime<FixedOffset>,
}

impl PostedAt {
    fn at(instant: DateTime<FixedOffset>) -> Self {
        let instant = instant.with_timezone(&kst());
        Self { date: instant.date_naive(), instant }
    }

    /// "YYYY-MM-DD"
    pub fn date_string(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }

    /// RFC 3339 instant with the +09:00 offset
    pub fn iso_string(&self) -> String {
        self.instant.to_rfc3339()
    }
}

/// Parse a raw posting-time string relative to `now`.
///
/// `now` is fixed once per batch so that "3일 전" resolves the same way for
/// every listing collected together.
pub fn parse(raw: &str, now: DateTime<FixedOffset>) -> Option<PostedAt> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    epoch(s)
        .or_else(|| iso(s))
        .or_else(|| explicit_date(s))
        .or_else(|| relative(s, now))
}

/// Find a date-looking fragment inside longer page text and parse it
pub fn find_in_text(text: &str, now: DateTime<FixedOffset>) -> Option<(String, PostedAt)> {
    PAGE_DATE_RE.find_iter(text).find_map(|m| {
        let raw = m.as_str();
        parse(raw, now).map(|posted| (raw.to_string(), posted))
    })
}

fn epoch(s: &str) -> Option<PostedAt> {
    if EPOCH_MS_RE.is_match(s) {
        let ms: i64 = s.parse().ok()?;
        let instant = Utc.timestamp_millis_opt(ms).single()?;
        return Some(PostedAt::at(instant.fixed_offset()));
    }
    if EPOCH_SECS_RE.is_match(s) {
        let secs: i64 = s.parse().ok()?;
        let instant = Utc.timestamp_opt(secs, 0).single()?;
        return Some(PostedAt::at(instant.fixed_offset()));
    }
    None
}

/// Full ISO-8601 timestamps. A trailing `Z` is UTC; timestamps without an
/// offset are taken as UTC as well.
fn iso(s: &str) -> Option<PostedAt> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(s) {
        return Some(PostedAt::at(instant));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(PostedAt::at(naive.and_utc().fixed_offset()));
        }
    }
    None
}

/// "2025.10.12", "2025-10-12", "2025/10/12" anywhere in the string, taken
/// as local midnight
fn explicit_date(s: &str) -> Option<PostedAt> {
    DATE_RE.captures_iter(s).find_map(|caps| {
        let year: i32 = caps.get(1)?.as_str().parse().ok()?;
        let month: u32 = caps.get(2)?.as_str().parse().ok()?;
        let day: u32 = caps.get(3)?.as_str().parse().ok()?;
        let midnight = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(0, 0, 0)?;
        let instant = kst().from_local_datetime(&midnight).single()?;
        Some(PostedAt::at(instant))
    })
}

fn relative(s: &str, now: DateTime<FixedOffset>) -> Option<PostedAt> {
    if s.contains("방금") || s.contains("지금") || s.contains("오늘") {
        return Some(PostedAt::at(now));
    }
    if s.contains("어제") {
        return Some(PostedAt::at(now - Duration::days(1)));
    }

    let caps = RELATIVE_RE.captures(s)?;
    let amount: i64 = caps.get(1)?.as_str().parse().ok()?;
    let delta = match caps.get(2)?.as_str() {
        "분" => Duration::try_minutes(amount)?,
        "시간" => Duration::try_hours(amount)?,
        "일" => Duration::try_days(amount)?,
        "주" => Duration::try_weeks(amount)?,
        // months are approximated as 30 days
        "개월" | "달" => Duration::try_days(amount.checked_mul(30)?)?,
        _ => return None,
    };
    now.checked_sub_signed(delta).map(PostedAt::at)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339("2025-11-09T12:00:00+09:00").unwrap()
    }

    fn pair(raw: &str) -> (String, String) {
        parse(raw, now())
            .map(|p| (p.date_string(), p.iso_string()))
            .unwrap_or_default()
    }

    #[test]
    fn test_relative_days() {
        assert_eq!(
            pair("3일 전"),
            ("2025-11-06".to_string(), "2025-11-06T12:00:00+09:00".to_string())
        );
    }

    #[test]
    fn test_relative_units() {
        assert_eq!(pair("30분 전").1, "2025-11-09T11:30:00+09:00");
        assert_eq!(pair("13 시간 전").1, "2025-11-08T23:00:00+09:00");
        assert_eq!(pair("2주 전").0, "2025-10-26");
        assert_eq!(pair("1개월 전").0, "2025-10-10");
        assert_eq!(pair("2달 전").0, "2025-09-10");
    }

    #[test]
    fn test_relative_words() {
        assert_eq!(pair("방금 전").1, "2025-11-09T12:00:00+09:00");
        assert_eq!(pair("오늘").0, "2025-11-09");
        assert_eq!(pair("어제").0, "2025-11-08");
    }

    #[test]
    fn test_epochs() {
        // 2025-11-06T03:00:00Z
        assert_eq!(pair("1762398000"), ("2025-11-06".into(), "2025-11-06T12:00:00+09:00".into()));
        assert_eq!(pair("1762398000000").1, "2025-11-06T12:00:00+09:00");
    }

    #[test]
    fn test_iso() {
        assert_eq!(pair("2025-11-05T20:30:00Z").1, "2025-11-06T05:30:00+09:00");
        assert_eq!(pair("2025-11-05T20:30:00Z").0, "2025-11-06");
        assert_eq!(pair("2025-11-05T10:00:00+09:00").1, "2025-11-05T10:00:00+09:00");
        // no offset: UTC
        assert_eq!(pair("2025-11-05T20:30:00").1, "2025-11-06T05:30:00+09:00");
    }

    #[test]
    fn test_explicit_dates() {
        assert_eq!(pair("2025.10.12"), ("2025-10-12".into(), "2025-10-12T00:00:00+09:00".into()));
        assert_eq!(pair("작성일 2025/1/3").0, "2025-01-03");
        assert_eq!(pair("2025-13-40"), (String::new(), String::new()));
    }

    #[test]
    fn test_unrecognized() {
        assert_eq!(pair(""), (String::new(), String::new()));
        assert_eq!(pair("판매중"), (String::new(), String::new()));
    }

    #[test]
    fn test_find_in_text() {
        let (raw, posted) = find_in_text("찜 3 · 조회 40 · 5시간 전 · 서울", now()).unwrap();
        assert_eq!(raw, "5시간 전");
        assert_eq!(posted.iso_string(), "2025-11-09T07:00:00+09:00");
        assert!(find_in_text("아무 날짜 없음", now()).is_none());
    }
}
