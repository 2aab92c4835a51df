use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::extract::{Color, PostedAt, RawPrice, Region, Storage};
use crate::page::RenderedPage;

/// Marketplaces records can come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Bunjang,
    Joongna,
    Daangn,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::Bunjang, Platform::Joongna, Platform::Daangn];

    /// Display name, also the value stored in the database
    pub fn name(&self) -> &'static str {
        match self {
            Platform::Bunjang => "번개장터",
            Platform::Joongna => "중고나라",
            Platform::Daangn => "당근마켓",
        }
    }

    /// Accepts the display name or the ASCII identifier
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL.into_iter().find(|p| {
            p.name() == s || p.slug().eq_ignore_ascii_case(s)
        })
    }

    fn slug(&self) -> &'static str {
        match self {
            Platform::Bunjang => "bunjang",
            Platform::Joongna => "joongna",
            Platform::Daangn => "daangn",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One scraped candidate before normalization. Every field except the
/// platform and URL may be missing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawListing {
    pub platform: Platform,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_id: Option<String>,
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<RawPrice>,
    /// Location text as the marketplace lists it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Posting time as given: epoch, ISO, date, or "3일 전"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub posted: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Structured item payload (API item, embedded JSON)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<serde_json::Value>,
    /// Raw HTML of the detail page, parsed by the pipeline
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    /// Already-parsed detail page sources
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<RenderedPage>,
}

impl RawListing {
    pub fn new(platform: Platform, url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            platform,
            post_id: None,
            url: url.into(),
            title: title.into(),
            description: None,
            price: None,
            location: None,
            posted: None,
            image_url: None,
            payload: None,
            html: None,
            page: None,
        }
    }

    /// Source-native id, falling back to the product path in the URL
    pub fn resolved_post_id(&self) -> Option<String> {
        self.post_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(String::from)
            .or_else(|| post_id_from_url(&self.url))
    }
}

/// "https://m.bunjang.co.kr/products/123456?ref=x" -> "123456"
pub fn post_id_from_url(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let segments: Vec<&str> = parsed.path_segments()?.collect();
    segments
        .windows(2)
        .find(|pair| pair[0] == "products" && !pair[1].is_empty() && pair[1].bytes().all(|b| b.is_ascii_digit()))
        .map(|pair| pair[1].to_string())
}

/// A fully normalized listing, ready to store and aggregate
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalRecord {
    pub platform: Platform,
    pub post_id: String,
    pub product_model: String,
    /// `product_model [storage] [color]`
    pub title: String,
    pub storage: Storage,
    pub color: Option<Color>,
    /// Whole won; 0 = unknown
    pub price: u64,
    pub region: Region,
    pub posted_at: Option<PostedAt>,
    pub url: String,
    pub image_url: Option<String>,
    pub scraped_at: DateTime<FixedOffset>,
}

impl CanonicalRecord {
    pub fn region_id(&self) -> String {
        self.region.display_id()
    }

    pub fn posted_date(&self) -> Option<String> {
        self.posted_at.as_ref().map(PostedAt::date_string)
    }
}

/// Display title from the resolved fields
pub fn display_title(model: &str, storage: &Storage, color: Option<Color>) -> String {
    let mut parts = vec![model];
    if storage.is_known() {
        parts.push(storage.label());
    }
    if let Some(color) = &color {
        parts.push(color.as_str());
    }
    parts.join(" ")
}
