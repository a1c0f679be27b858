//! Record extraction from fetched markup
//!
//! The fetch core hands every successful response body to an [`Extractor`]
//! exactly once. Extractors are pure: the same markup and URL always map to
//! the same record (modulo timestamps the extractor chooses to add).

mod listing;
mod page;

pub use listing::{ListingExtractor, ProductRecord};
pub use page::{PageExtractor, PageRecord};

use thiserror::Error;

/// Errors raised while turning markup into a record
///
/// An extraction error only drops the affected record; the batch carries on.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Invalid page URL {url}: {message}")]
    InvalidUrl { url: String, message: String },

    #[error("Unexpected markup for {url}: {message}")]
    Markup { url: String, message: String },
}

/// Converts a fetched page into a record
pub trait Extractor: Send + Sync {
    /// The record type produced per page
    type Record: Send + 'static;

    /// Extracts a record from `markup` fetched from `url`
    ///
    /// # Returns
    ///
    /// * `Ok(Some(record))` - A record was produced
    /// * `Ok(None)` - The page holds nothing worth recording
    /// * `Err(ExtractionError)` - The markup or URL could not be handled
    fn extract(&self, markup: &str, url: &str) -> Result<Option<Self::Record>, ExtractionError>;
}
