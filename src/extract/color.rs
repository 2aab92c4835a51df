//! Color extraction into a closed vocabulary

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Serialize, Serializer};

/// Every color a record may carry
pub const VOCABULARY: &[&str] = &[
    "화이트", "실버", "스페이스그레이", "그린", "핑크", "블랙", "골드", "로즈",
    "블루", "그래파이트", "그레이", "티타늄", "자색", "자주", "네이비", "데저트",
    "울트라마린", "틸", "퍼플", "옐로우", "레드",
];

/// Synonym patterns, tried in order. Specific marketing names must come
/// before the generic words they contain ("스페이스그레이" before "그레이").
const SYNONYMS: &[(&str, &str)] = &[
    (r"\b스그\b", "스페이스그레이"),
    (r"스페이스\s*그레이|space\s*gr[ae]y", "스페이스그레이"),
    (r"그래파이트|graphite", "스페이스그레이"),
    (r"블랙\s*티타늄|블랙|검정|black", "블랙"),
    (r"데저트\s*티타늄|데저트|desert", "데저트"),
    (r"울트라\s*마린|ultramarine", "울트라마린"),
    (r"\b틸\b|\bteal\b", "틸"),
    (r"화이트|white", "화이트"),
    (r"실버|silver", "실버"),
    (r"그레이|grey|gray", "그레이"),
    (r"골드|gold", "골드"),
    (r"핑크|pink", "핑크"),
    (r"그린|green", "그린"),
    (r"블루|blue", "블루"),
    (r"네이비|navy", "네이비"),
    (r"퍼플|purple", "퍼플"),
    (r"옐로우|yellow", "옐로우"),
    (r"레드|\bred\b", "레드"),
    (r"티타늄", "티타늄"),
];

static SYNONYM_RES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    SYNONYMS
        .iter()
        .map(|(pattern, canonical)| {
            let re = Regex::new(&format!("(?i){}", pattern)).expect("Invalid color synonym pattern");
            (re, *canonical)
        })
        .collect()
});

/// A color from [`VOCABULARY`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color(&'static str);

impl Color {
    /// Look up a canonical color by exact name
    pub fn parse(name: &str) -> Option<Self> {
        VOCABULARY
            .iter()
            .find(|c| **c == name.trim())
            .map(|c| Color(c))
    }

    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.0)
    }
}

/// Extract a canonical color from free text.
///
/// Synonyms first (first match wins), then a literal scan for any
/// vocabulary word. Nothing outside the vocabulary is ever returned.
pub fn from_text(text: &str) -> Option<Color> {
    if text.trim().is_empty() {
        return None;
    }

    for (re, canonical) in SYNONYM_RES.iter() {
        if re.is_match(text) {
            return Color::parse(canonical);
        }
    }

    let lower = text.to_lowercase();
    VOCABULARY
        .iter()
        .find(|c| lower.contains(*c))
        .map(|c| Color(c))
}
