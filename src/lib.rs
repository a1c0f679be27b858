//! Sumi-Harvest: a bounded-concurrency page harvester
//!
//! This crate fetches a batch of URLs under a concurrency cap, rotates the
//! request identity on every attempt, backs off from rate-limited responses,
//! and extracts one record per fetched page.

pub mod config;
pub mod extract;
pub mod fetch;
pub mod output;
pub mod state;

use thiserror::Error;

/// Main error type for Sumi-Harvest operations
///
/// Only batch-level conditions end up here. Failures of individual URLs are
/// captured per slot in the batch report and never raised to the caller.
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to initialize transport: {0}")]
    TransportInit(#[source] fetch::TransportError),

    #[error("Batch deadline of {seconds}s exceeded")]
    DeadlineExceeded { seconds: f64 },

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Sumi-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use extract::{Extractor, ListingExtractor, PageExtractor, PageRecord, ProductRecord};
pub use fetch::{
    BatchReport, BatchResult, BatchSummary, DiagnosticEvent, Diagnostics, FailureReason,
    FetchOutcome, FetchRequest, HttpTransport, Identity, IdentityProvider, Orchestrator,
    Transport,
};
pub use state::RequestState;
