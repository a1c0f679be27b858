//! Fetch orchestration core
//!
//! This module contains the bounded, rate-limit-aware fetching logic:
//! - Identity rotation (user agent and proxy per attempt)
//! - The transport contract and its reqwest implementation
//! - Retry with linear backoff on HTTP 429
//! - Global concurrency limiting
//! - Batch orchestration and result reassembly

mod diagnostics;
mod identity;
mod limiter;
mod orchestrator;
mod outcome;
mod retry;
mod transport;

pub use diagnostics::{DiagnosticEvent, Diagnostics};
pub use identity::{Identity, IdentityProvider, BROWSER_USER_AGENTS};
pub use limiter::{ConcurrencyLimiter, SlotGuard};
pub use orchestrator::{BatchReport, BatchResult, BatchSummary, Orchestrator, SettledRequest};
pub use outcome::{classify_response, FailureReason, FetchOutcome, FetchRequest, TOO_MANY_REQUESTS};
pub use retry::{RetryController, RetryPolicy};
pub use transport::{HttpTransport, Transport, TransportError, TransportResponse};

use crate::config::Config;
use crate::extract::{Extractor, PageExtractor};
use crate::{HarvestError, PageRecord};
use std::sync::Arc;

/// Runs a complete batch over HTTP with the page summary extractor
///
/// # Returns
///
/// * `Ok(BatchReport)` - The batch settled; individual URLs may have failed
/// * `Err(HarvestError::TransportInit)` - The transport could not be built
pub async fn harvest(
    config: &Config,
    diagnostics: Diagnostics,
) -> Result<BatchReport<PageRecord>, HarvestError> {
    harvest_with(config, PageExtractor::new(), diagnostics).await
}

/// Runs a complete batch over HTTP for the configured URLs
///
/// This is the main entry point used by the binary. It will:
/// 1. Build the HTTP transport (one client per proxy)
/// 2. Build the orchestrator from the configuration
/// 3. Fetch the explicit URLs followed by the generated pages, and hand
///    every fetched body to `extractor`
pub async fn harvest_with<E: Extractor>(
    config: &Config,
    extractor: E,
    diagnostics: Diagnostics,
) -> Result<BatchReport<E::Record>, HarvestError> {
    let transport = HttpTransport::new(&config.proxies).map_err(HarvestError::TransportInit)?;

    let orchestrator =
        Orchestrator::from_config(config, Arc::new(transport), extractor, diagnostics);

    Ok(orchestrator.run(&config.target_urls()).await)
}
