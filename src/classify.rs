//! Target-model classifier and listing policy filters

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::error::{JunggoError, Result};

/// Accessories and other non-phone items sold under phone keywords
const ACCESSORY_KEYWORDS: &[&str] = &[
    "케이스", "case", "casetify", "케이스티파이", "범퍼", "링", "그립톡", "보호필름", "필름",
    "강화유리", "액정보호", "충전기", "케이블", "어댑터", "무선충전", "거치대", "스트랩",
    "팝소켓", "렌즈보호", "카메라필름", "후면필름", "전면필름", "배터리케이스", "스티커",
    "magsafe", "맥세이프", "에어태그", "케이스만", "스트랩세트", "카드수납",
];

/// Higher-tier variants of the same generation
const EXCLUDED_VARIANTS: &[&str] = &[
    r"\bpro\s*max\b", r"\bpromax\b", "프로맥스", "맥스",
    r"\bplus\b", "플러스",
    r"\bmini\b", "미니",
    r"\bpro\b", "프로",
];

/// Buying, wholesale and trade solicitations; not sale listings
const NOT_FOR_SALE: &[&str] = &["매입", "매입합니다", "사요", "삽니다", "상사", "도매", "교환", "교환가능", "교신"];

static ACCESSORY_RE: Lazy<Regex> = Lazy::new(|| literal_alternation(ACCESSORY_KEYWORDS));
static NOT_FOR_SALE_RE: Lazy<Regex> = Lazy::new(|| literal_alternation(NOT_FOR_SALE));

static EXCLUDED_VARIANT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!("(?i){}", EXCLUDED_VARIANTS.join("|"))).expect("Invalid variant regex")
});

static DELIVERY_ONLY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)택배\s*만|직거래\s*불가|직거래\s*X|대면\s*불가").expect("Invalid delivery regex")
});

fn literal_alternation(words: &[&str]) -> Regex {
    let alternation = words.iter().map(|w| regex::escape(w)).collect::<Vec<_>>().join("|");
    Regex::new(&format!("(?i){}", alternation)).expect("Invalid keyword regex")
}

/// Why a candidate listing was dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    /// Does not mention the target model at all
    NotTargetModel,
    /// Mentions the model only as Pro/Pro Max/Plus/mini
    HigherTier,
    /// Case, charger, film and other accessories
    Accessory,
    /// Wanted-to-buy, wholesale or trade posts
    NotForSale,
    /// Known price at or below the configured floor
    BelowMinPrice,
    /// Seller refuses in-person trades
    DeliveryOnly,
    /// No usable region while the no-region policy is on
    NoRegion,
}

impl Rejection {
    pub fn describe(&self) -> &'static str {
        match self {
            Rejection::NotTargetModel => "not the target model",
            Rejection::HigherTier => "higher-tier variant",
            Rejection::Accessory => "accessory",
            Rejection::NotForSale => "not a sale listing",
            Rejection::BelowMinPrice => "below minimum price",
            Rejection::DeliveryOnly => "delivery only",
            Rejection::NoRegion => "no region",
        }
    }
}

/// Decides whether a listing is the base model of one iPhone generation
#[derive(Debug)]
pub struct Classifier {
    generation: u8,
    target: fancy_regex::Regex,
}

impl Classifier {
    /// Build the classifier for "iPhone `generation`" (base tier).
    ///
    /// The model number must not be followed by another digit or by a
    /// higher-tier qualifier; both are negative lookaheads in one pattern.
    /// In "아이폰 16 프로 / 아이폰 16" the pattern finds the bare second
    /// mention, and the variant check still rejects the listing as
    /// [`Rejection::HigherTier`].
    pub fn new(generation: u8) -> Result<Self> {
        let n = generation;
        let pattern = format!(
            r"(?i)아이폰\s*{n}(?![0-9])(?!\s*(?:프로|pro|pro\s*max|promax|플러스|plus|미니))|iphone\s*{n}(?![0-9])(?!\s*(?:pro|pro\s*max|promax|plus|min[iy]?))"
        );
        let target = fancy_regex::Regex::new(&pattern)
            .map_err(|e| JunggoError::ConfigError(format!("Invalid target pattern: {}", e)))?;
        Ok(Self { generation, target })
    }

    pub fn generation(&self) -> u8 {
        self.generation
    }

    /// Canonical model label for accepted listings ("iPhone 16")
    pub fn model_label(&self) -> String {
        format!("iPhone {}", self.generation)
    }

    fn is_target(&self, text: &str) -> bool {
        self.target.is_match(text).unwrap_or(false)
    }

    /// Accept or reject listing text. Every rule must pass; the first
    /// failing rule names the rejection.
    pub fn check(&self, text: &str) -> std::result::Result<(), Rejection> {
        let text = text.to_lowercase();
        if !self.is_target(&text) {
            if EXCLUDED_VARIANT_RE.is_match(&text) {
                return Err(Rejection::HigherTier);
            }
            return Err(Rejection::NotTargetModel);
        }
        if ACCESSORY_RE.is_match(&text) {
            return Err(Rejection::Accessory);
        }
        if EXCLUDED_VARIANT_RE.is_match(&text) {
            return Err(Rejection::HigherTier);
        }
        if NOT_FOR_SALE_RE.is_match(&text) {
            return Err(Rejection::NotForSale);
        }
        Ok(())
    }
}

/// A known price must be above the floor; 0 means unknown and always passes
pub fn passes_price_floor(price: u64, floor: u64) -> bool {
    price == 0 || price > floor
}

/// Seller states delivery only / no in-person trade
pub fn is_delivery_only(text: &str) -> bool {
    DELIVERY_ONLY_RE.is_match(text)
}
