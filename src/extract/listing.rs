//! Product listing extractor
//!
//! Catalogue pages list one product per `<article>`. Each card yields a
//! [`ProductRecord`] with the product name (the card image's `alt`), the
//! price and the star rating class.

use crate::extract::{ExtractionError, Extractor};
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;

/// Placeholder for a card field that is missing
pub const MISSING_VALUE: &str = "N/A";

/// One product card
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductRecord {
    /// Page the card was found on
    pub page_url: String,
    pub product: String,

    /// Price with the currency symbol stripped; empty in CSV when unparseable
    pub price: Option<f64>,

    /// Second class of the rating paragraph, e.g. `Three` for `star-rating Three`
    pub rating: String,
}

/// Extracts every product card of a listing page
///
/// A page with no cards produces no record, so only pages that actually
/// list products count towards the written records.
#[derive(Debug, Clone, Default)]
pub struct ListingExtractor;

impl ListingExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Extractor for ListingExtractor {
    type Record = Vec<ProductRecord>;

    fn extract(
        &self,
        markup: &str,
        url: &str,
    ) -> Result<Option<Vec<ProductRecord>>, ExtractionError> {
        let article = selector("article", url)?;
        let image = selector("a img", url)?;
        let price = selector(".price_color", url)?;
        let rating = selector("p", url)?;

        let document = Html::parse_document(markup);
        let products: Vec<ProductRecord> = document
            .select(&article)
            .map(|card| ProductRecord {
                page_url: url.to_string(),
                product: first(card, &image)
                    .and_then(|img| img.value().attr("alt"))
                    .map(|alt| alt.trim().to_string())
                    .unwrap_or_else(|| MISSING_VALUE.to_string()),
                price: first(card, &price).and_then(|node| parse_price(&node_text(node))),
                rating: first(card, &rating)
                    .and_then(|p| p.value().attr("class"))
                    .and_then(|class| class.split_whitespace().nth(1))
                    .map(str::to_string)
                    .unwrap_or_else(|| MISSING_VALUE.to_string()),
            })
            .collect();

        if products.is_empty() {
            return Ok(None);
        }
        Ok(Some(products))
    }
}

fn selector(css: &str, url: &str) -> Result<Selector, ExtractionError> {
    Selector::parse(css).map_err(|e| ExtractionError::Markup {
        url: url.to_string(),
        message: format!("bad selector {}: {}", css, e),
    })
}

fn first<'a>(card: ElementRef<'a>, selector: &Selector) -> Option<ElementRef<'a>> {
    card.select(selector).next()
}

fn node_text(node: ElementRef<'_>) -> String {
    node.text().collect::<String>()
}

/// Parses a price such as `£51.77`, ignoring the leading currency symbol
fn parse_price(text: &str) -> Option<f64> {
    text.trim()
        .trim_start_matches(|c: char| !c.is_ascii_digit())
        .replace(',', "")
        .parse()
        .ok()
}
