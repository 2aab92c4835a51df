//! Storage capacity extraction ("256GB", "1TB", "용량 128", ...)

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static TB_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b([0-9]+(?:\.[0-9]+)?)\s*(?:TB|티비|테라)\b").expect("Invalid TB regex")
});

static GB_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b([0-9]{2,4})\s*(?:GB|G\b|기가|지비|기)\b").expect("Invalid GB regex")
});

static LABELED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?:용량|저장\s*공간|저장용량|메모리)\s*[:\-]?\s*(?:약\s*)?([0-9]{2,4})\s*(GB|G\b|기가|지비|기)?",
    )
    .expect("Invalid labeled storage regex")
});

static LABEL_KEYWORD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)용량|저장\s*공간|저장용량|메모리").expect("Invalid storage keyword regex")
});

static BARE_CAPACITY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(64|128|256|512|1024)\b").expect("Invalid bare capacity regex")
});

/// Capacities a listing may state without a unit, next to a capacity label
const BARE_CAPACITIES: &[u32] = &[64, 128, 256, 512, 1024];

/// A storage capacity. The label and GB value are always filled together:
/// either both known or `("", 0)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Storage {
    label: String,
    gb: u32,
}

impl Storage {
    pub fn unknown() -> Self {
        Self { label: String::new(), gb: 0 }
    }

    /// Canonicalize a GB figure. Anything in [1000, 1200) is a terabyte
    /// phone written in decimal units and becomes "1TB"/1024.
    pub fn from_gb(gb: u32) -> Self {
        match gb {
            0 => Self::unknown(),
            1000..=1199 => Self { label: "1TB".to_string(), gb: 1024 },
            _ => Self { label: format!("{}GB", gb), gb },
        }
    }

    fn from_tb(tb: f64) -> Option<Self> {
        if (0.9..=1.1).contains(&tb) {
            return Some(Self::from_gb(1024));
        }
        let gb = (tb * 1024.0).round();
        if gb < 1.0 || gb > u32::MAX as f64 {
            return None;
        }
        Some(Self::from_gb(gb as u32))
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn gb(&self) -> u32 {
        self.gb
    }

    pub fn is_known(&self) -> bool {
        self.gb > 0
    }
}

impl Default for Storage {
    fn default() -> Self {
        Self::unknown()
    }
}

/// Where a storage candidate came from, weakest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Unlabeled text: page body, meta tags, payload values under unrelated keys
    FreeText,
    /// The listing title
    Title,
    /// Payload values under a capacity/spec-like key
    KeyedField,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageCandidate {
    pub provenance: Provenance,
    pub storage: Storage,
}

impl StorageCandidate {
    pub fn new(provenance: Provenance, storage: Storage) -> Self {
        Self { provenance, storage }
    }
}

fn terabytes(text: &str) -> Option<Storage> {
    let caps = TB_RE.captures(text)?;
    let tb: f64 = caps.get(1)?.as_str().parse().ok()?;
    Storage::from_tb(tb)
}

fn gigabytes(text: &str) -> Option<Storage> {
    let caps = GB_RE.captures(text)?;
    let gb: u32 = caps.get(1)?.as_str().parse().ok()?;
    Some(Storage::from_gb(gb)).filter(Storage::is_known)
}

fn labeled(text: &str) -> Option<Storage> {
    if let Some(caps) = LABELED_RE.captures(text) {
        let gb: Option<u32> = caps.get(1).and_then(|m| m.as_str().parse().ok());
        let has_unit = caps.get(2).is_some();
        if let Some(gb) = gb {
            if has_unit || BARE_CAPACITIES.contains(&gb) {
                let storage = Storage::from_gb(gb);
                if storage.is_known() {
                    return Some(storage);
                }
            }
        }
    }

    if LABEL_KEYWORD_RE.is_match(text) {
        return bare_capacity(text).map(Storage::from_gb);
    }

    None
}

fn bare_capacity(text: &str) -> Option<u32> {
    BARE_CAPACITY_RE
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .filter(|gb| BARE_CAPACITIES.contains(gb))
}

/// Storage stated in a title: terabytes first, then gigabytes with a unit
pub fn from_title(text: &str) -> Option<Storage> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    terabytes(text).or_else(|| gigabytes(text))
}

/// Storage in unlabeled text. Same rules as titles; only the provenance
/// assigned by the caller differs.
pub fn from_free_text(text: &str) -> Option<Storage> {
    from_title(text)
}

/// Storage in a labeled spec field ("용량: 256", "저장공간 약 128기가").
/// Allows a unit-less number from the usual capacity set when a capacity
/// keyword is present.
pub fn from_labeled_text(text: &str) -> Option<Storage> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    terabytes(text).or_else(|| labeled(text))
}

/// Pick one storage value: strongest provenance wins, ties go to the larger
/// capacity (a stray "16" from the model number never beats "128GB").
pub fn reconcile(candidates: &[StorageCandidate]) -> Storage {
    candidates
        .iter()
        .filter(|c| c.storage.is_known())
        .max_by_key(|c| (c.provenance, c.storage.gb()))
        .map(|c| c.storage.clone())
        .unwrap_or_default()
}
