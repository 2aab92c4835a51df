//! RenderedPage - every raw-text source one listing detail page offers
//!
//! A detail page is parsed once; the pipeline then reads the pieces it
//! needs in its own precedence order. Nothing here interprets the text.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};

use crate::extract::region::SIDO_RE;
use crate::text::{char_window, clean_text, collapse_whitespace};

const REGION_LABEL: &str = "직거래지역";

/// Meta tags that usually repeat the listing title or summary
const META_KEYS: &[&str] = &[
    "og:title",
    "og:description",
    "twitter:title",
    "twitter:description",
    "description",
];

/// Elements whose text never counts as page text
const NON_TEXT_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

static REGION_LABEL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"직거래지역\s*[:\-]?\s*[^\n]{1,150}").expect("Invalid region label regex")
});

static DATE_LABEL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"작성일|등록일|게시일|업로드\s*일|올린\s*날짜").expect("Invalid date label regex")
});

static DATE_LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:작성일|등록일|게시일)\s*[:\-]?\s*([^\n]{4,30})").expect("Invalid date line regex")
});

/// Raw sources extracted from one rendered detail page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RenderedPage {
    /// Parsed `#__NEXT_DATA__` payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_data: Option<serde_json::Value>,
    /// Text of the value shown next to the "직거래지역" label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region_value: Option<String>,
    /// Longest province mention (with context) found inside a `<script>`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script_region: Option<String>,
    /// Value of a 작성일/등록일-style label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labeled_date: Option<String>,
    /// og/twitter/description meta contents joined with " | "
    #[serde(default)]
    pub meta_text: String,
    /// Visible text, one space between text nodes
    #[serde(default)]
    pub text: String,
}

impl RenderedPage {
    /// Parse a detail page's HTML
    pub fn parse(html: &str) -> Self {
        let document = Html::parse_document(html);
        let text = visible_text(&document, " ");
        let lines = visible_text(&document, "\n");

        Self {
            next_data: next_data(&document),
            region_value: region_value(&document, &text),
            script_region: script_region(&document),
            labeled_date: labeled_date(&document, &lines),
            meta_text: meta_text(&document),
            text,
        }
    }

    /// True when the page offered no usable source at all
    pub fn is_empty(&self) -> bool {
        self.next_data.is_none()
            && self.region_value.is_none()
            && self.script_region.is_none()
            && self.labeled_date.is_none()
            && self.meta_text.is_empty()
            && self.text.is_empty()
    }
}

fn element_text(element: ElementRef) -> String {
    collapse_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

fn has_value_class(element: &ElementRef) -> bool {
    element
        .value()
        .attr("class")
        .map(|c| c.contains("Value"))
        .unwrap_or(false)
}

/// Trimmed text nodes outside scripts and styles, joined by `separator`
fn visible_text(document: &Html, separator: &str) -> String {
    let mut parts = Vec::new();
    for node in document.root_element().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node
            .parent()
            .and_then(ElementRef::wrap)
            .map(|parent| NON_TEXT_ELEMENTS.contains(&parent.value().name()))
            .unwrap_or(false);
        if hidden {
            continue;
        }
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            parts.push(trimmed);
        }
    }
    parts.join(separator)
}

fn next_data(document: &Html) -> Option<serde_json::Value> {
    let selector = Selector::parse("#__NEXT_DATA__").ok()?;
    let element = document.select(&selector).next()?;
    let raw: String = element.text().collect();
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!("Ignoring malformed __NEXT_DATA__: {}", e);
            None
        }
    }
}

/// Innermost element whose whole text is the region label
fn region_label(document: &Html) -> Option<ElementRef<'_>> {
    let selector = Selector::parse("body *").ok()?;
    document.select(&selector).find(|element| {
        element_text(*element) == REGION_LABEL
            && element
                .children()
                .filter_map(ElementRef::wrap)
                .all(|child| element_text(child) != REGION_LABEL)
    })
}

fn region_value(document: &Html, page_text: &str) -> Option<String> {
    // 1. A "Value" element near the label: inside the label or one of its
    //    two nearest ancestors, or a following sibling of one
    if let Some(label) = region_label(document) {
        let value_selector = Selector::parse(r#"[class*="Value"]"#).ok()?;
        let ancestors = std::iter::once(label)
            .chain(label.ancestors().filter_map(ElementRef::wrap))
            .take(3);
        for up in ancestors {
            if let Some(value) = up.select(&value_selector).next() {
                return Some(clean_text(&element_text(value)));
            }
            let sibling = up
                .next_siblings()
                .filter_map(ElementRef::wrap)
                .find(has_value_class);
            if let Some(value) = sibling {
                return Some(clean_text(&element_text(value)));
            }
        }
    }

    // 2. Summary value elements whose previous sibling is the label
    if let Ok(selector) = Selector::parse(
        r#"div[class*="ProductSummarystyle__Value"], span[class*="ProductSummarystyle__Value"]"#,
    ) {
        for value in document.select(&selector) {
            let label = value.prev_siblings().find_map(ElementRef::wrap);
            if label.map(|l| element_text(l).contains(REGION_LABEL)).unwrap_or(false) {
                return Some(clean_text(&element_text(value)));
            }
        }
    }

    // 3. The label and whatever follows it in page text
    REGION_LABEL_RE
        .find(page_text)
        .map(|m| clean_text(m.as_str()))
}

fn script_region(document: &Html) -> Option<String> {
    let selector = Selector::parse("script").ok()?;
    document
        .select(&selector)
        .filter_map(|script| {
            let body: String = script.text().collect();
            let m = SIDO_RE.find(&body)?;
            Some(clean_text(char_window(&body, m.start(), m.end(), 20, 60)))
        })
        .max_by_key(|segment| segment.chars().count())
}

fn labeled_date(document: &Html, lines: &str) -> Option<String> {
    if let Ok(selector) = Selector::parse(r#"[class*="Value"], [class*="value"], [class*="content"]"#) {
        for value in document.select(&selector) {
            let label = value.prev_siblings().find_map(ElementRef::wrap);
            if label.map(|l| DATE_LABEL_RE.is_match(&element_text(l))).unwrap_or(false) {
                return Some(clean_text(&element_text(value)));
            }
        }
    }

    DATE_LINE_RE
        .captures(lines)
        .and_then(|c| c.get(1))
        .map(|m| clean_text(m.as_str()))
}

fn meta_text(document: &Html) -> String {
    let mut texts = Vec::new();
    for key in META_KEYS {
        let query = format!(r#"meta[property="{key}"], meta[name="{key}"]"#);
        let Ok(selector) = Selector::parse(&query) else {
            continue;
        };
        let content = document
            .select(&selector)
            .find_map(|m| m.value().attr("content"))
            .filter(|c| !c.trim().is_empty());
        if let Some(content) = content {
            texts.push(content.to_string());
        }
    }
    texts.join(" | ")
}
