//! Neighborhood -> district lookup used to backfill missing districts

use std::collections::HashMap;
use std::path::Path;

use crate::error::{JunggoError, Result};
use crate::text::normalize_key;

/// District label for records whose district cannot be resolved
pub const UNMAPPED: &str = "지역 미기재";

/// Read-only mapping from normalized neighborhood key to district name.
/// Loaded once per analysis session.
#[derive(Debug, Clone, Default)]
pub struct RegionMap {
    entries: HashMap<String, String>,
}

/// Result of resolving one record's district
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum District {
    Named(String),
    Unmapped,
}

impl District {
    pub fn label(&self) -> &str {
        match self {
            District::Named(name) => name,
            District::Unmapped => UNMAPPED,
        }
    }
}

impl RegionMap {
    /// Load a `dong,sigungu` CSV. A missing file yields an empty map and a
    /// warning, so every lookup becomes a miss.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::warn!(
                "Region lookup table not found at {}; districts will not be backfilled",
                path.display()
            );
            return Ok(Self::default());
        }
        let bytes = std::fs::read(path)?;
        let map = Self::from_bytes(&bytes)?;
        tracing::debug!("Loaded {} region lookup entries from {}", map.len(), path.display());
        Ok(map)
    }

    /// Like [`RegionMap::load`], but an unreadable or malformed table also
    /// degrades to an empty map. The second value describes what went wrong.
    pub fn load_or_empty(path: &Path) -> (Self, Option<String>) {
        match Self::load(path) {
            Ok(map) => (map, None),
            Err(e) => {
                tracing::warn!("Ignoring region lookup table {}: {}", path.display(), e);
                (Self::default(), Some(format!("region lookup table {}: {}", path.display(), e)))
            }
        }
    }

    /// Parse CSV bytes: UTF-8 (BOM optional), else CP949/EUC-KR.
    /// Header names are trimmed; `dong` and `sigungu` columns are required.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let text = decode(bytes);
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::Headers)
            .flexible(true)
            .from_reader(text.as_bytes());

        let headers = reader.headers()?.clone();
        let column = |name: &str| {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| JunggoError::RegionMapError(format!("Missing '{}' column", name)))
        };
        let dong_col = column("dong")?;
        let gu_col = column("sigungu")?;

        let mut entries = HashMap::new();
        for row in reader.records() {
            let row = row?;
            let (Some(dong), Some(gu)) = (row.get(dong_col), row.get(gu_col)) else {
                continue;
            };
            let gu = gu.trim();
            if gu.is_empty() {
                continue;
            }
            if let Some(key) = normalize_key(dong) {
                entries.insert(key, gu.to_string());
            }
        }
        Ok(Self { entries })
    }

    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let entries = pairs
            .into_iter()
            .filter_map(|(dong, gu)| normalize_key(dong).map(|k| (k, gu.trim().to_string())))
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// District for a raw neighborhood name
    pub fn lookup(&self, dong: &str) -> Option<&str> {
        normalize_key(dong).and_then(|key| self.entries.get(&key).map(String::as_str))
    }

    /// The record's own district when it has one, else the lookup result,
    /// else the unmapped sentinel
    pub fn backfill(&self, sigungu: Option<&str>, dong: Option<&str>) -> District {
        if let Some(gu) = sigungu.map(str::trim).filter(|g| !g.is_empty()) {
            return District::Named(gu.to_string());
        }
        dong.and_then(|d| self.lookup(d))
            .map(|gu| District::Named(gu.to_string()))
            .unwrap_or(District::Unmapped)
    }
}

fn decode(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => {
            let (text, _, had_errors) = encoding_rs::EUC_KR.decode(bytes);
            if had_errors {
                tracing::warn!("Region lookup table has undecodable bytes; replaced");
            }
            text.into_owned()
        }
    }
}
