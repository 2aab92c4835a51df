//! Price signals in KRW

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::text::to_int;

/// "450,000원" style prices inside page text. Grouping commas are required
/// so that counters like "찜 3원" never read as a price.
static PRICE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([0-9]{1,3}(?:,[0-9]{3})+)\s*원").expect("Invalid price regex")
});

/// Price as a marketplace hands it over: a number or display text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawPrice {
    Number(f64),
    Text(String),
}

impl RawPrice {
    /// Whole won, or 0 when unknown
    pub fn krw(&self) -> u64 {
        match self {
            RawPrice::Number(n) if n.is_finite() && *n > 0.0 => n.round() as u64,
            RawPrice::Number(_) => 0,
            RawPrice::Text(s) => to_int(s),
        }
    }
}

/// Price from a payload value (number or text)
pub fn from_value(value: &Value) -> u64 {
    match value {
        Value::Number(n) => n.as_f64().map(|f| RawPrice::Number(f).krw()).unwrap_or(0),
        Value::String(s) => to_int(s),
        _ => 0,
    }
}

/// First "N,NNN원" price in free text
pub fn from_text(text: &str) -> u64 {
    PRICE_RE
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| to_int(m.as_str()))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_raw_price() {
        assert_eq!(RawPrice::Text("450,000".into()).krw(), 450_000);
        assert_eq!(RawPrice::Text("가격문의".into()).krw(), 0);
        assert_eq!(RawPrice::Number(450000.0).krw(), 450_000);
        assert_eq!(RawPrice::Number(-1.0).krw(), 0);
    }

    #[test]
    fn test_raw_price_deserializes_either_form() {
        let n: RawPrice = serde_json::from_str("450000").unwrap();
        let s: RawPrice = serde_json::from_str("\"450,000원\"").unwrap();
        assert_eq!(n.krw(), s.krw());
    }

    #[test]
    fn test_from_value() {
        assert_eq!(from_value(&json!(410000)), 410_000);
        assert_eq!(from_value(&json!("410000")), 410_000);
        assert_eq!(from_value(&json!(null)), 0);
    }

    #[test]
    fn test_from_text() {
        assert_eq!(from_text("찜 3 판매가 1,250,000 원 배송비 별도"), 1_250_000);
        assert_eq!(from_text("가격 450000원"), 0);
        assert_eq!(from_text(""), 0);
    }
}
