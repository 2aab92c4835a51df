//! Market aggregations over stored posts, with district backfill and a
//! memo cache keyed by query filter.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

use crate::db::Database;
use crate::error::{JunggoError, Result};
use crate::listing::Platform;
use crate::region_map::{District, RegionMap, UNMAPPED};

/// Label for unmapped rows that carry no neighborhood text at all
pub const NO_REGION_TEXT: &str = "(지역 정보 없음)";

/// Platform selector: every platform or exactly one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PlatformFilter {
    All,
    Only(Platform),
}

impl PlatformFilter {
    /// "전체"/"all" or a platform name
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s == "전체" || s.eq_ignore_ascii_case("all") {
            return Some(PlatformFilter::All);
        }
        Platform::parse(s).map(PlatformFilter::Only)
    }
}

impl fmt::Display for PlatformFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlatformFilter::All => f.write_str("전체"),
            PlatformFilter::Only(p) => write!(f, "{}", p),
        }
    }
}

/// One of the supported model selections (base or Pro of iPhone 14-16)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ModelSelector {
    pub generation: u8,
    pub pro: bool,
}

impl ModelSelector {
    pub const ALL: [ModelSelector; 6] = [
        ModelSelector { generation: 14, pro: false },
        ModelSelector { generation: 14, pro: true },
        ModelSelector { generation: 15, pro: false },
        ModelSelector { generation: 15, pro: true },
        ModelSelector { generation: 16, pro: false },
        ModelSelector { generation: 16, pro: true },
    ];

    pub const fn new(generation: u8, pro: bool) -> Self {
        Self { generation, pro }
    }

    /// "iPhone 16", "iphone 15 pro"; only the supported selections parse
    pub fn parse(s: &str) -> Option<Self> {
        let normalized = s.split_whitespace().collect::<Vec<_>>().join(" ");
        Self::ALL
            .into_iter()
            .find(|m| m.to_string().eq_ignore_ascii_case(&normalized))
    }
}

impl fmt::Display for ModelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "iPhone {}", self.generation)?;
        if self.pro {
            f.write_str(" Pro")?;
        }
        Ok(())
    }
}

/// Parameters shared by every aggregation in one analysis pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct QueryFilter {
    pub platform: PlatformFilter,
    pub model: ModelSelector,
    /// Inclusive posting-date range
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl QueryFilter {
    pub fn new(platform: PlatformFilter, model: ModelSelector, from: NaiveDate, to: NaiveDate) -> Result<Self> {
        if from > to {
            return Err(JunggoError::QueryError(format!(
                "Date range is reversed: {} > {}",
                from, to
            )));
        }
        Ok(Self { platform, model, from, to })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    pub count: usize,
    /// Mean of known (non-zero) prices
    pub avg_price: Option<f64>,
}

/// Raw district/neighborhood pair of one post; '' when missing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionRow {
    pub sigungu: String,
    pub dong: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DistrictCount {
    pub district: String,
    pub count: usize,
}

/// Neighborhood text the lookup table could not place
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnmappedDong {
    pub dong: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlatformCount {
    pub platform: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub avg_price: f64,
}

fn sorted_counts<K: Ord>(counts: BTreeMap<K, usize>) -> Vec<(K, usize)> {
    let mut rows: Vec<_> = counts.into_iter().collect();
    // stable: equal counts keep key order
    rows.sort_by(|a, b| b.1.cmp(&a.1));
    rows
}

/// Posts per resolved district, most first. Unresolvable rows are counted
/// under the unmapped sentinel, so the counts always sum to `rows.len()`.
pub fn district_counts(rows: &[RegionRow], map: &RegionMap) -> Vec<DistrictCount> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for row in rows {
        let district = map.backfill(Some(&row.sigungu), Some(&row.dong));
        *counts.entry(district.label().to_string()).or_insert(0) += 1;
    }
    sorted_counts(counts)
        .into_iter()
        .map(|(district, count)| DistrictCount { district, count })
        .collect()
}

/// Rows without a district whose neighborhood did not resolve, grouped by
/// the raw neighborhood text
pub fn unmapped_details(rows: &[RegionRow], map: &RegionMap) -> Vec<UnmappedDong> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for row in rows.iter().filter(|r| r.sigungu.trim().is_empty()) {
        if map.backfill(None, Some(&row.dong)) != District::Unmapped {
            continue;
        }
        let dong = row.dong.trim();
        let label = if dong.is_empty() { NO_REGION_TEXT } else { dong };
        *counts.entry(label.to_string()).or_insert(0) += 1;
    }
    sorted_counts(counts)
        .into_iter()
        .map(|(dong, count)| UnmappedDong { dong, count })
        .collect()
}

/// Everything a report shows for one filter
#[derive(Debug, Clone, Default, Serialize)]
pub struct Dashboard {
    pub summary: Summary,
    /// Most frequent real district
    pub top_district: Option<String>,
    pub districts: Vec<DistrictCount>,
    pub unmapped: Vec<UnmappedDong>,
    pub platforms: Vec<PlatformCount>,
    pub trend: Vec<PricePoint>,
    /// Queries that failed and were rendered empty
    pub warnings: Vec<String>,
}

impl Dashboard {
    /// Run every aggregation. A failing query leaves its section empty and
    /// records a warning; the dashboard itself never fails.
    pub fn build(db: &Database, map: &RegionMap, filter: &QueryFilter) -> Self {
        let mut warnings = Vec::new();
        let mut degrade = |what: &str, e: JunggoError| {
            tracing::warn!("{} query failed: {}", what, e);
            warnings.push(format!("{}: {}", what, e));
        };

        let summary = db.summary(filter).unwrap_or_else(|e| {
            degrade("summary", e);
            Summary::default()
        });
        let rows = db.region_rows(filter).unwrap_or_else(|e| {
            degrade("regions", e);
            Vec::new()
        });
        let platforms = db.platform_counts(filter).unwrap_or_else(|e| {
            degrade("platforms", e);
            Vec::new()
        });
        let trend = db.price_trend(filter).unwrap_or_else(|e| {
            degrade("price trend", e);
            Vec::new()
        });

        let districts = district_counts(&rows, map);
        let top_district = districts
            .iter()
            .find(|d| d.district != UNMAPPED)
            .map(|d| d.district.clone());

        Self {
            summary,
            top_district,
            districts,
            unmapped: unmapped_details(&rows, map),
            platforms,
            trend,
            warnings,
        }
    }

    /// Empty dashboard for when the store cannot be opened at all
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self { warnings: vec![reason.into()], ..Self::default() }
    }

    pub fn unmapped_count(&self) -> usize {
        self.districts
            .iter()
            .find(|d| d.district == UNMAPPED)
            .map(|d| d.count)
            .unwrap_or(0)
    }
}

/// Memoized dashboards keyed by the full query filter, for callers that
/// keep one store open across many queries. Everything is dropped once the
/// store's write generation moves on.
#[derive(Debug, Default)]
pub struct QueryCache {
    generation: u64,
    entries: HashMap<QueryFilter, Dashboard>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn dashboard(&mut self, db: &Database, map: &RegionMap, filter: &QueryFilter) -> &Dashboard {
        if self.generation != db.generation() {
            tracing::debug!("Store changed; dropping {} cached dashboards", self.entries.len());
            self.entries.clear();
            self.generation = db.generation();
        }
        self.entries
            .entry(*filter)
            .or_insert_with(|| Dashboard::build(db, map, filter))
    }
}
