//! Page summary extractor
//!
//! Produces one [`PageRecord`] per page with:
//! - The page title (from `<title>`, `"N/A"` when missing)
//! - The number of followable links
//! - The extraction timestamp

use crate::extract::{ExtractionError, Extractor};
use chrono::{SecondsFormat, Utc};
use scraper::{Html, Selector};
use serde::Serialize;
use url::Url;

/// Placeholder used when a page has no usable title
pub const MISSING_TITLE: &str = "N/A";

/// Summary of one fetched page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageRecord {
    pub url: String,
    pub title: String,

    /// Number of `<a href>` links that resolve to http(s) URLs
    pub link_count: usize,

    /// RFC 3339 UTC time of extraction
    pub scraped_at: String,
}

/// Extracts page titles and link counts
#[derive(Debug, Clone, Default)]
pub struct PageExtractor;

impl PageExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Extractor for PageExtractor {
    type Record = PageRecord;

    /// # Example
    ///
    /// ```
    /// use sumi_harvest::extract::{Extractor, PageExtractor};
    ///
    /// let html = r#"<html><head><title>Test</title></head><body><a href="/page">Link</a></body></html>"#;
    /// let record = PageExtractor::new()
    ///     .extract(html, "https://example.com/")
    ///     .unwrap()
    ///     .unwrap();
    /// assert_eq!(record.title, "Test");
    /// assert_eq!(record.link_count, 1);
    /// ```
    fn extract(&self, markup: &str, url: &str) -> Result<Option<PageRecord>, ExtractionError> {
        let base_url = Url::parse(url).map_err(|e| ExtractionError::InvalidUrl {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        let document = Html::parse_document(markup);

        let title = extract_title(&document).unwrap_or_else(|| MISSING_TITLE.to_string());
        let link_count = extract_links(&document, &base_url).len();

        Ok(Some(PageRecord {
            url: url.to_string(),
            title,
            link_count,
            scraped_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        }))
    }
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Extracts all followable links from the HTML document
fn extract_links(document: &Html, base_url: &Url) -> Vec<String> {
    let Ok(a_selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    document
        .select(&a_selector)
        .filter(|element| element.value().attr("download").is_none())
        .filter_map(|element| element.value().attr("href"))
        .filter_map(|href| resolve_link(href, base_url))
        .collect()
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - Fragment-only anchors
/// - Non-HTTP(S) URLs after resolution
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    let absolute_url = base_url.join(href).ok()?;
    match absolute_url.scheme() {
        "http" | "https" => Some(absolute_url.to_string()),
        _ => None,
    }
}
