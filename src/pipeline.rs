//! Listing normalization: classify, extract every field from its ordered
//! sources, reconcile, apply policy, emit canonical records.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use serde_json::Value;

use crate::classify::{self, Classifier, Rejection};
use crate::error::{JunggoError, Result};
use crate::extract::{
    color, date, json, price, region, storage, Color, PostedAt, Provenance, Region, RegionSource,
    Storage, StorageCandidate,
};
use crate::listing::{display_title, CanonicalRecord, RawListing};
use crate::page::RenderedPage;
use crate::text::clean_text;

const PRICE_KEYS: &[&str] = &["price", "finalPrice", "sale_price", "amount", "productPrice", "discountedPrice"];
const TIMESTAMP_KEYS: &[&str] = &["createdAt", "updatedAt"];
const TITLE_KEYS: &[&str] = &["title", "name"];
const OPTIONS_KEYS: &[&str] = &["options", "variants", "attributes", "specs"];

/// Policy knobs for one run. Built once and shared read-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Known prices at or below this are dropped
    pub min_price: u64,
    pub exclude_delivery_only: bool,
    /// Drop records without a province plus a district or neighborhood
    pub exclude_no_region: bool,
    pub target_generation: u8,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_price: 250_000,
            exclude_delivery_only: true,
            exclude_no_region: false,
            target_generation: 16,
        }
    }
}

/// What happened to one raw listing
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Accepted(Box<CanonicalRecord>),
    Rejected(Rejection),
}

/// Counters for one batch
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchStats {
    pub seen: usize,
    pub accepted: usize,
    pub rejected: BTreeMap<Rejection, usize>,
    /// Items that could not be processed at all (no id, broken input)
    pub failed: usize,
}

impl BatchStats {
    pub fn rejected_total(&self) -> usize {
        self.rejected.values().sum()
    }
}

#[derive(Debug, Default)]
pub struct Batch {
    pub records: Vec<CanonicalRecord>,
    pub stats: BatchStats,
}

/// Everything a listing offers, gathered once before field extraction
struct Sources<'a> {
    raw: &'a RawListing,
    title: String,
    page: Option<RenderedPage>,
}

impl<'a> Sources<'a> {
    fn new(raw: &'a RawListing) -> Self {
        let page = raw
            .page
            .clone()
            .or_else(|| raw.html.as_deref().map(RenderedPage::parse));
        Self { raw, title: clean_text(&raw.title), page }
    }

    /// The item's own payload first, then the page's embedded payload
    fn payloads(&self) -> impl Iterator<Item = &Value> {
        self.raw
            .payload
            .iter()
            .chain(self.page.as_ref().and_then(|p| p.next_data.as_ref()))
    }

    fn payload_find(&self, keys: &[&str]) -> Option<&Value> {
        self.payloads().find_map(|p| json::find_first(p, keys))
    }

    fn payload_title(&self) -> Option<String> {
        self.payload_find(TITLE_KEYS)
            .and_then(json::scalar_text)
            .map(|t| clean_text(&t))
    }

    fn options_blob(&self) -> Option<String> {
        self.payload_find(OPTIONS_KEYS).map(|v| v.to_string())
    }

    fn description(&self) -> Option<&str> {
        self.raw.description.as_deref()
    }

    fn meta_text(&self) -> Option<&str> {
        self.page.as_ref().map(|p| p.meta_text.as_str())
    }

    fn page_text(&self) -> Option<&str> {
        self.page.as_ref().map(|p| p.text.as_str())
    }
}

/// Normalizes listings for one batch. `now` is fixed at construction and
/// anchors relative dates and `scraped_at` for every item.
pub struct Normalizer<'a> {
    config: &'a PipelineConfig,
    classifier: Classifier,
    now: DateTime<FixedOffset>,
}

impl<'a> Normalizer<'a> {
    pub fn new(config: &'a PipelineConfig, now: DateTime<FixedOffset>) -> Result<Self> {
        let classifier = Classifier::new(config.target_generation)?;
        Ok(Self { config, classifier, now })
    }

    pub fn now(&self) -> DateTime<FixedOffset> {
        self.now
    }

    /// Title-only classification, for deciding which listings deserve a
    /// detail page fetch
    pub fn screen(&self, raw: &RawListing) -> std::result::Result<(), Rejection> {
        self.classifier.check(&clean_text(&raw.title))
    }

    /// Normalize one listing. Errors mean the item is unusable; rejections
    /// are a normal outcome.
    pub fn normalize(&self, raw: &RawListing) -> Result<Outcome> {
        let post_id = raw.resolved_post_id().ok_or_else(|| {
            JunggoError::ExtractionError(format!("No listing id in {}", raw.url))
        })?;

        let sources = Sources::new(raw);
        if let Err(rejection) = self.classifier.check(&sources.title) {
            tracing::debug!("Rejected {} ({}): {}", post_id, rejection.describe(), sources.title);
            return Ok(Outcome::Rejected(rejection));
        }

        let price = self.price(&sources);
        if !classify::passes_price_floor(price, self.config.min_price) {
            return Ok(Outcome::Rejected(Rejection::BelowMinPrice));
        }

        let posted_at = self.posted_at(&sources);
        let storage = self.storage(&sources);
        let color = self.color(&sources);
        let region = match self.region(&sources) {
            Some((source, region)) => {
                tracing::trace!("Region for {} from {:?}", post_id, source);
                region
            }
            None => Region::default(),
        };

        if self.config.exclude_delivery_only && self.delivery_only(&sources) {
            return Ok(Outcome::Rejected(Rejection::DeliveryOnly));
        }
        let has_region = region.sido.is_some() && (region.sigungu.is_some() || region.dong.is_some());
        if self.config.exclude_no_region && !has_region {
            return Ok(Outcome::Rejected(Rejection::NoRegion));
        }

        let product_model = self.classifier.model_label();
        let record = CanonicalRecord {
            platform: raw.platform,
            post_id,
            title: display_title(&product_model, &storage, color),
            product_model,
            storage,
            color,
            price,
            region,
            posted_at,
            url: raw.url.clone(),
            image_url: raw.image_url.clone().filter(|u| !u.is_empty()),
            scraped_at: self.now,
        };
        Ok(Outcome::Accepted(Box::new(record)))
    }

    /// Normalize a whole batch. One bad item never stops the rest.
    pub fn run<I>(&self, items: I) -> Batch
    where
        I: IntoIterator<Item = RawListing>,
    {
        let mut batch = Batch::default();
        for raw in items {
            batch.stats.seen += 1;
            match self.normalize(&raw) {
                Ok(Outcome::Accepted(record)) => {
                    batch.stats.accepted += 1;
                    batch.records.push(*record);
                }
                Ok(Outcome::Rejected(rejection)) => {
                    *batch.stats.rejected.entry(rejection).or_insert(0) += 1;
                }
                Err(e) => {
                    tracing::warn!("Skipping listing {}: {}", raw.url, e);
                    batch.stats.failed += 1;
                }
            }
        }
        tracing::info!(
            "Normalized {} listings: {} accepted, {} rejected, {} failed",
            batch.stats.seen,
            batch.stats.accepted,
            batch.stats.rejected_total(),
            batch.stats.failed
        );
        batch
    }

    /// List price > payload price keys > "N,NNN원" in page text
    fn price(&self, sources: &Sources) -> u64 {
        let candidates = [
            sources.raw.price.as_ref().map(|p| p.krw()),
            sources.payload_find(PRICE_KEYS).map(price::from_value),
            sources.page_text().map(price::from_text),
        ];
        candidates.into_iter().flatten().find(|&p| p > 0).unwrap_or(0)
    }

    /// Raw field > payload timestamps > labeled page date > any date in page text
    fn posted_at(&self, sources: &Sources) -> Option<PostedAt> {
        let parse = |raw: &str| date::parse(raw, self.now);
        let page = sources.page.as_ref();

        sources
            .raw
            .posted
            .as_deref()
            .and_then(parse)
            .or_else(|| {
                sources
                    .payload_find(TIMESTAMP_KEYS)
                    .and_then(json::scalar_text)
                    .and_then(|t| parse(&t))
            })
            .or_else(|| page.and_then(|p| p.labeled_date.as_deref()).and_then(parse))
            .or_else(|| {
                sources
                    .page_text()
                    .and_then(|t| date::find_in_text(t, self.now))
                    .map(|(_, posted)| posted)
            })
    }

    /// Keyed payload fields > titles > free text, larger capacity on ties.
    /// Meta and page text are consulted only when nothing else names one.
    fn storage(&self, sources: &Sources) -> Storage {
        let mut candidates: Vec<StorageCandidate> = Vec::new();
        let mut push = |provenance, found: Option<Storage>| {
            if let Some(found) = found {
                candidates.push(StorageCandidate::new(provenance, found));
            }
        };

        push(Provenance::Title, storage::from_title(&sources.title));
        push(
            Provenance::Title,
            sources.payload_title().as_deref().and_then(storage::from_title),
        );
        push(
            Provenance::KeyedField,
            sources.options_blob().as_deref().and_then(storage::from_free_text),
        );
        push(
            Provenance::FreeText,
            sources
                .description()
                .and_then(|d| storage::from_labeled_text(d).or_else(|| storage::from_free_text(d))),
        );
        for payload in sources.payloads() {
            candidates.extend(json::storage_candidates(payload));
        }

        let resolved = storage::reconcile(&candidates);
        if resolved.is_known() {
            return resolved;
        }
        [sources.meta_text(), sources.page_text()]
            .into_iter()
            .flatten()
            .find_map(storage::from_free_text)
            .unwrap_or_default()
    }

    /// Title > payload title > options blob > description > meta > page text
    fn color(&self, sources: &Sources) -> Option<Color> {
        let texts = [
            Some(sources.title.clone()),
            sources.payload_title(),
            sources.options_blob(),
            sources.description().map(String::from),
            sources.meta_text().map(String::from),
            sources.page_text().map(String::from),
        ];
        texts.iter().flatten().find_map(|t| color::from_text(t))
    }

    /// First source naming a province supplies the whole region
    fn region(&self, sources: &Sources) -> Option<(RegionSource, Region)> {
        let page = sources.page.as_ref();
        let payload_text = sources.payloads().find_map(json::region_text);
        let page_window = page.and_then(|p| region::page_text_window(&p.text));

        let candidates = [
            (RegionSource::Location, sources.raw.location.as_deref()),
            (RegionSource::Payload, payload_text.as_deref()),
            (RegionSource::DomValue, page.and_then(|p| p.region_value.as_deref())),
            (RegionSource::Script, page.and_then(|p| p.script_region.as_deref())),
            (RegionSource::PageText, page_window.as_deref()),
        ];
        region::resolve(
            candidates
                .into_iter()
                .filter_map(|(source, text)| text.map(|t| (source, t))),
        )
    }

    fn delivery_only(&self, sources: &Sources) -> bool {
        [Some(sources.title.as_str()), sources.description(), sources.page_text()]
            .into_iter()
            .flatten()
            .any(classify::is_delivery_only)
    }
}
