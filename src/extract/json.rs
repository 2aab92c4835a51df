//! Typed traversal over embedded JSON payloads (`__NEXT_DATA__`, API items)

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use super::region::SIDO_RE;
use super::storage::{self, Provenance, StorageCandidate};

/// Key names that suggest a value describes the product's capacity/spec
static STORAGE_KEY_HINT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)capacity|storage|option|spec|attribute|variant|title|name|value|desc|description")
        .expect("Invalid storage key hint regex")
});

/// Receives every scalar leaf of a payload together with the key it sits under
pub trait JsonVisitor {
    fn visit_scalar(&mut self, key: Option<&str>, value: &str);
}

/// Depth-first walk. Array elements inherit the key of their array.
pub fn walk<V: JsonVisitor>(value: &Value, visitor: &mut V) {
    walk_inner(value, None, visitor);
}

fn walk_inner<V: JsonVisitor>(value: &Value, key: Option<&str>, visitor: &mut V) {
    match value {
        Value::Object(map) => {
            for (k, v) in map {
                walk_inner(v, Some(k), visitor);
            }
        }
        Value::Array(items) => {
            for item in items {
                walk_inner(item, key, visitor);
            }
        }
        Value::String(s) => visitor.visit_scalar(key, s),
        Value::Number(n) => visitor.visit_scalar(key, &n.to_string()),
        Value::Bool(_) | Value::Null => {}
    }
}

/// Render a scalar as text; objects and arrays are serialized
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

/// First non-empty value stored under any of `keys` (case-insensitive).
/// An object's own keys are checked before its children are descended.
pub fn find_first<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    match value {
        Value::Object(map) => {
            let direct = map.iter().find(|(k, v)| {
                !is_empty(v) && keys.iter().any(|key| key.eq_ignore_ascii_case(k))
            });
            if let Some((_, v)) = direct {
                return Some(v);
            }
            map.values().find_map(|v| find_first(v, keys))
        }
        Value::Array(items) => items.iter().find_map(|v| find_first(v, keys)),
        _ => None,
    }
}

/// Collects storage candidates, weighting values under capacity-like keys
#[derive(Debug, Default)]
pub struct StorageVisitor {
    pub candidates: Vec<StorageCandidate>,
}

impl JsonVisitor for StorageVisitor {
    fn visit_scalar(&mut self, key: Option<&str>, value: &str) {
        let found = storage::from_labeled_text(value).or_else(|| storage::from_free_text(value));
        if let Some(found) = found {
            let provenance = match key {
                Some(k) if STORAGE_KEY_HINT_RE.is_match(k) => Provenance::KeyedField,
                _ => Provenance::FreeText,
            };
            self.candidates.push(StorageCandidate::new(provenance, found));
        }
    }
}

/// Keeps the longest scalar that names a province/metro
#[derive(Debug, Default)]
pub struct RegionTextVisitor {
    pub best: Option<String>,
}

impl JsonVisitor for RegionTextVisitor {
    fn visit_scalar(&mut self, _key: Option<&str>, value: &str) {
        if !SIDO_RE.is_match(value) {
            return;
        }
        let longer = self
            .best
            .as_ref()
            .map(|best| value.chars().count() > best.chars().count())
            .unwrap_or(true);
        if longer {
            self.best = Some(value.to_string());
        }
    }
}

pub fn storage_candidates(payload: &Value) -> Vec<StorageCandidate> {
    let mut visitor = StorageVisitor::default();
    walk(payload, &mut visitor);
    visitor.candidates
}

pub fn region_text(payload: &Value) -> Option<String> {
    let mut visitor = RegionTextVisitor::default();
    walk(payload, &mut visitor);
    visitor.best
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_find_first_prefers_own_keys() {
        let payload = json!({
            "props": {"product": {"price": 410000}},
            "Price": ""
        });
        // the empty top-level "Price" is skipped
        assert_eq!(find_first(&payload, &["price"]), Some(&json!(410000)));

        let payload = json!({"a": {"createdAt": "x"}, "createdAt": "y"});
        assert_eq!(find_first(&payload, &["createdAt"]), Some(&json!("y")));
    }

    #[test]
    fn test_find_first_through_arrays() {
        let payload = json!({"items": [{"name": null}, {"name": "아이폰 16"}]});
        assert_eq!(find_first(&payload, &["title", "name"]), Some(&json!("아이폰 16")));
        assert_eq!(find_first(&payload, &["missing"]), None);
    }

    #[test]
    fn test_storage_visitor_weights_keys() {
        let payload = json!({
            "product": {
                "capacity": "256GB",
                "comment": "512GB 케이스도 드려요",
                "specs": [{"k": "v"}, "용량 128"]
            }
        });
        let candidates = storage_candidates(&payload);
        assert!(candidates.contains(&StorageCandidate::new(
            Provenance::KeyedField,
            storage::Storage::from_gb(256)
        )));
        assert!(candidates.contains(&StorageCandidate::new(
            Provenance::FreeText,
            storage::Storage::from_gb(512)
        )));
        // array elements inherit "specs"
        assert!(candidates.contains(&StorageCandidate::new(
            Provenance::KeyedField,
            storage::Storage::from_gb(128)
        )));
        assert_eq!(storage::reconcile(&candidates), storage::Storage::from_gb(256));
    }

    #[test]
    fn test_region_visitor_keeps_longest() {
        let payload = json!({
            "seller": {"area": "서울특별시"},
            "product": {"location": "서울특별시 노원구 상계동"},
            "note": "부산"
        });
        assert_eq!(region_text(&payload).as_deref(), Some("서울특별시 노원구 상계동"));
        assert_eq!(region_text(&json!({"x": 1})), None);
    }
}
