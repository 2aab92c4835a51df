//! Bunjang search API and detail page fetching

use std::time::Duration;

use rand::Rng;
use serde_json::Value;

use crate::config::CrawlConfig;
use crate::error::{JunggoError, Result};
use crate::extract::json::scalar_text;
use crate::extract::RawPrice;
use crate::listing::{Platform, RawListing};

const SEARCH_URL: &str = "https://api.bunjang.co.kr/api/1/find_v2.json";
const PRODUCT_URL: &str = "https://m.bunjang.co.kr/products";

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// HTTP side of a crawl. Owns one agent so connections are pooled.
pub struct Fetcher {
    agent: ureq::Agent,
    crawl: CrawlConfig,
}

impl Fetcher {
    pub fn new(crawl: &CrawlConfig) -> Self {
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(crawl.timeout_secs)))
            .build()
            .into();
        Self { agent, crawl: crawl.clone() }
    }

    /// One page of search results, newest first
    pub fn search_page(&self, page: u32) -> Result<Vec<RawListing>> {
        let mut request = self
            .agent
            .get(SEARCH_URL)
            .query("q", &self.crawl.query)
            .query("order", "date")
            .query("page", page.to_string())
            .query("n", self.crawl.page_size.to_string())
            .query("stat_device", "w")
            .query("req_ref", "search")
            .query("version", "5")
            .header("User-Agent", USER_AGENT)
            .header("Accept", "application/json");
        if let Some(category) = &self.crawl.category_id {
            request = request.query("category_id", category);
        }

        let body: Value = request.call()?.into_body().read_json()?;
        Ok(parse_search_response(&body))
    }

    /// Walk search pages until one comes back empty or a limit is reached.
    /// A failed page ends the walk; what was collected so far is kept.
    pub fn collect(&self) -> Vec<RawListing> {
        let mut listings: Vec<RawListing> = Vec::new();
        for page in 0..self.crawl.max_pages {
            let found = match self.search_page(page) {
                Ok(found) => found,
                Err(e) => {
                    tracing::warn!("Search page {} failed: {}", page, e);
                    break;
                }
            };
            if found.is_empty() {
                tracing::debug!("Search page {} is empty; stopping", page);
                break;
            }
            tracing::info!("Search page {}: {} listings", page, found.len());
            listings.extend(found);
            if listings.len() >= self.crawl.max_items {
                listings.truncate(self.crawl.max_items);
                break;
            }
            self.pause();
        }
        listings
    }

    /// Product page HTML, retried with a jittered pause between attempts
    pub fn detail_page(&self, url: &str) -> Result<String> {
        url::Url::parse(url)?;
        let mut last_error = None;
        for attempt in 0..=self.crawl.retries {
            if attempt > 0 {
                self.pause();
            }
            let result = self
                .agent
                .get(url)
                .header("User-Agent", USER_AGENT)
                .header("Accept-Language", "ko-KR,ko;q=0.9")
                .call()
                .and_then(|response| response.into_body().read_to_string());
            match result {
                Ok(html) => return Ok(html),
                Err(e) => {
                    tracing::debug!("Detail fetch attempt {} for {} failed: {}", attempt + 1, url, e);
                    last_error = Some(e);
                }
            }
        }
        Err(last_error
            .map(JunggoError::from)
            .unwrap_or_else(|| JunggoError::ExtractionError(format!("No attempt made for {}", url))))
    }

    /// Attach detail page HTML to each `wanted` listing. Failures leave the
    /// listing without rendered sources.
    pub fn enrich<F>(&self, listings: &mut [RawListing], wanted: F) -> usize
    where
        F: Fn(&RawListing) -> bool,
    {
        let targets: Vec<usize> = (0..listings.len()).filter(|&i| wanted(&listings[i])).collect();
        let total = targets.len();
        let mut fetched = 0;
        for (n, i) in targets.into_iter().enumerate() {
            let listing = &mut listings[i];
            tracing::debug!("[{}/{}] {}", n + 1, total, listing.url);
            match self.detail_page(&listing.url) {
                Ok(html) => {
                    listing.html = Some(html);
                    fetched += 1;
                }
                Err(e) => tracing::warn!("Detail page {} unavailable: {}", listing.url, e),
            }
            if n + 1 < total {
                self.pause();
            }
        }
        fetched
    }

    /// Random delay inside the configured window
    fn pause(&self) {
        let (min, max) = (self.crawl.delay_min_ms, self.crawl.delay_max_ms);
        if max == 0 {
            return;
        }
        let ms = rand::thread_rng().gen_range(min..=max.max(min));
        std::thread::sleep(Duration::from_millis(ms));
    }
}

/// Listings from a search API response. Items without a `pid` are ads and
/// are skipped.
pub fn parse_search_response(body: &Value) -> Vec<RawListing> {
    let Some(items) = body.get("list").and_then(Value::as_array) else {
        return Vec::new();
    };
    items.iter().filter_map(listing_from_item).collect()
}

fn listing_from_item(item: &Value) -> Option<RawListing> {
    let pid = item.get("pid").and_then(scalar_text).filter(|p| !p.trim().is_empty())?;
    let text = |key: &str| item.get(key).and_then(scalar_text).filter(|s| !s.is_empty());

    let mut listing = RawListing::new(
        Platform::Bunjang,
        format!("{}/{}", PRODUCT_URL, pid),
        text("name").unwrap_or_default(),
    );
    listing.post_id = Some(pid);
    listing.price = text("price").map(RawPrice::Text);
    listing.location = text("location");
    listing.posted = text("update_time");
    listing.image_url = text("product_image");
    listing.payload = Some(item.clone());
    Some(listing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_search_response() {
        let body = json!({
            "list": [
                {"pid": "301", "name": "아이폰 16 256GB 블랙", "price": "450000",
                 "location": "서울특별시 노원구 상계동", "update_time": 1762398000,
                 "product_image": "https://media.bunjang.co.kr/p.jpg"},
                {"name": "광고 상품", "price": "1000"},
                {"pid": 302, "name": "아이폰 16 128GB", "price": "0", "location": ""}
            ]
        });
        let listings = parse_search_response(&body);
        assert_eq!(listings.len(), 2);

        let first = &listings[0];
        assert_eq!(first.post_id.as_deref(), Some("301"));
        assert_eq!(first.url, "https://m.bunjang.co.kr/products/301");
        assert_eq!(first.price.as_ref().map(RawPrice::krw), Some(450_000));
        assert_eq!(first.posted.as_deref(), Some("1762398000"));
        assert!(first.payload.is_some());

        assert_eq!(listings[1].post_id.as_deref(), Some("302"));
        assert_eq!(listings[1].location, None);
    }

    #[test]
    fn test_parse_search_response_without_list() {
        assert!(parse_search_response(&json!({"result": "fail"})).is_empty());
        assert!(parse_search_response(&json!({"list": null})).is_empty());
    }
}
