//! Batch orchestration
//!
//! The orchestrator turns a list of URLs into an input-ordered batch result:
//! - One task per URL, admitted through the concurrency limiter
//! - Each task runs the retry controller to a terminal outcome
//! - An optional overall deadline cancels whatever is still running
//! - Successful bodies go through the extractor, in input order

use crate::config::Config;
use crate::extract::Extractor;
use crate::fetch::diagnostics::{DiagnosticEvent, Diagnostics};
use crate::fetch::identity::IdentityProvider;
use crate::fetch::limiter::ConcurrencyLimiter;
use crate::fetch::outcome::{FailureReason, FetchOutcome, FetchRequest};
use crate::fetch::retry::{RetryController, RetryPolicy};
use crate::fetch::transport::Transport;
use crate::state::RequestState;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Input-ordered records; `None` marks a URL that produced no record
#[derive(Debug, Clone, PartialEq)]
pub struct BatchResult<R> {
    slots: Vec<Option<R>>,
}

impl<R> BatchResult<R> {
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// The record for the URL at `index`, if one was produced
    pub fn get(&self, index: usize) -> Option<&R> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    pub fn slots(&self) -> &[Option<R>] {
        &self.slots
    }

    /// Present records in index order
    pub fn records(&self) -> impl Iterator<Item = &R> {
        self.slots.iter().flatten()
    }

    /// Consumes the result, keeping present records in index order
    pub fn into_records(self) -> Vec<R> {
        self.slots.into_iter().flatten().collect()
    }
}

/// How one URL settled
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettledRequest {
    pub url: String,

    /// Always `Succeeded` or `Failed`
    pub state: RequestState,

    /// HTTP status of the successful response
    pub status: Option<u16>,

    pub failure: Option<FailureReason>,
}

/// Aggregate counts for a batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub total_urls: usize,

    /// URLs whose fetch succeeded
    pub succeeded: usize,

    /// URLs that failed terminally
    pub failed: usize,

    /// Successful fetches whose extraction produced no record
    pub dropped: usize,
}

impl BatchSummary {
    /// Number of records that made it into the batch result
    pub fn records(&self) -> usize {
        self.succeeded - self.dropped
    }
}

/// Everything a batch run produces
#[derive(Debug, Clone)]
pub struct BatchReport<R> {
    pub results: BatchResult<R>,

    /// Per-URL settlement, same order as the input
    pub settled: Vec<SettledRequest>,

    pub summary: BatchSummary,

    /// True if the overall deadline cut the batch short
    pub deadline_exceeded: bool,

    pub elapsed: Duration,
}

impl<R> BatchReport<R> {
    /// Settled entries that failed
    pub fn failures(&self) -> impl Iterator<Item = &SettledRequest> {
        self.settled
            .iter()
            .filter(|s| s.state == RequestState::Failed)
    }
}

/// Main batch driver
pub struct Orchestrator<E: Extractor> {
    controller: Arc<RetryController>,
    limiter: ConcurrencyLimiter,
    extractor: E,
    deadline: Option<Duration>,
    diagnostics: Diagnostics,
}

impl<E: Extractor> Orchestrator<E> {
    /// Creates an orchestrator from explicit parts
    ///
    /// # Arguments
    ///
    /// * `policy` - Retry budget and timing
    /// * `max_concurrent` - Limiter capacity
    /// * `identities` - Identity pool shared by all tasks
    /// * `transport` - Round-trip implementation
    /// * `extractor` - Markup to record conversion
    pub fn new(
        policy: RetryPolicy,
        max_concurrent: usize,
        identities: Arc<IdentityProvider>,
        transport: Arc<dyn Transport>,
        extractor: E,
    ) -> Self {
        Self::with_diagnostics(
            policy,
            max_concurrent,
            identities,
            transport,
            extractor,
            Diagnostics::new(),
        )
    }

    /// Same as [`Orchestrator::new`], reporting through the given diagnostics
    pub fn with_diagnostics(
        policy: RetryPolicy,
        max_concurrent: usize,
        identities: Arc<IdentityProvider>,
        transport: Arc<dyn Transport>,
        extractor: E,
        diagnostics: Diagnostics,
    ) -> Self {
        let controller = RetryController::new(policy, identities, transport, diagnostics.clone());
        Self {
            controller: Arc::new(controller),
            limiter: ConcurrencyLimiter::new(max_concurrent),
            extractor,
            deadline: None,
            diagnostics,
        }
    }

    /// Builds an orchestrator from configuration
    pub fn from_config(
        config: &Config,
        transport: Arc<dyn Transport>,
        extractor: E,
        diagnostics: Diagnostics,
    ) -> Self {
        let identities = IdentityProvider::new(
            config.user_agents.clone().unwrap_or_default(),
            config.proxies.clone(),
        );

        Self::with_diagnostics(
            RetryPolicy::from_config(config),
            config.max_concurrent as usize,
            Arc::new(identities),
            transport,
            extractor,
            diagnostics,
        )
        .with_deadline(config.deadline())
    }

    /// Sets or clears the overall batch deadline
    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn limiter(&self) -> &ConcurrencyLimiter {
        &self.limiter
    }

    /// Runs a batch to completion
    ///
    /// Returns only once every URL has settled (or been cancelled by the
    /// deadline). Per-URL failures are reported in the result, never raised.
    pub async fn run(&self, urls: &[String]) -> BatchReport<E::Record> {
        let started = Instant::now();
        // A deadline too far out to represent is no deadline at all
        let deadline = self.deadline.and_then(|d| started.checked_add(d));

        tracing::info!(
            urls = urls.len(),
            max_concurrent = self.limiter.capacity(),
            "Starting batch"
        );

        let handles: Vec<_> = urls
            .iter()
            .map(|url| {
                let request = FetchRequest::new(url.clone());
                let controller = Arc::clone(&self.controller);
                let limiter = self.limiter.clone();

                tokio::spawn(async move {
                    let work = async {
                        let _slot = match limiter.acquire().await {
                            Ok(slot) => slot,
                            Err(e) => {
                                return FetchOutcome::Failed(FailureReason::Aborted(e.to_string()))
                            }
                        };
                        controller.execute(request).await
                    };

                    match deadline {
                        Some(at) => tokio::time::timeout_at(at, work)
                            .await
                            .unwrap_or(FetchOutcome::Failed(FailureReason::DeadlineExceeded)),
                        None => work.await,
                    }
                })
            })
            .collect();

        // Awaiting in spawn order keeps the results aligned with the input
        let mut outcomes = Vec::with_capacity(handles.len());
        for handle in handles {
            let outcome = handle
                .await
                .unwrap_or_else(|e| FetchOutcome::Failed(FailureReason::Aborted(e.to_string())));
            outcomes.push(outcome);
        }

        let report = self.assemble(urls, outcomes, started.elapsed());

        self.diagnostics.emit(DiagnosticEvent::BatchCompleted {
            total_urls: report.summary.total_urls,
            succeeded: report.summary.succeeded,
            failed: report.summary.failed,
        });

        report
    }

    /// Maps settled outcomes into records and counts
    fn assemble(
        &self,
        urls: &[String],
        outcomes: Vec<FetchOutcome>,
        elapsed: Duration,
    ) -> BatchReport<E::Record> {
        let mut slots = Vec::with_capacity(outcomes.len());
        let mut settled = Vec::with_capacity(outcomes.len());
        let mut summary = BatchSummary {
            total_urls: urls.len(),
            ..BatchSummary::default()
        };
        let mut deadline_exceeded = false;

        for (url, outcome) in urls.iter().zip(outcomes) {
            match outcome {
                FetchOutcome::Success { status, body } => {
                    summary.succeeded += 1;

                    let record = match self.extractor.extract(&body, url) {
                        Ok(Some(record)) => Some(record),
                        Ok(None) => {
                            tracing::debug!(url = %url, "Extractor produced no record");
                            None
                        }
                        Err(e) => {
                            tracing::warn!(url = %url, error = %e, "Extraction failed, dropping record");
                            None
                        }
                    };
                    if record.is_none() {
                        summary.dropped += 1;
                    }

                    slots.push(record);
                    settled.push(SettledRequest {
                        url: url.clone(),
                        state: RequestState::Succeeded,
                        status: Some(status),
                        failure: None,
                    });
                }
                FetchOutcome::Failed(reason) => {
                    summary.failed += 1;

                    // The retry controller reports its own failures; these two
                    // happen outside it
                    if matches!(
                        reason,
                        FailureReason::DeadlineExceeded | FailureReason::Aborted(_)
                    ) {
                        deadline_exceeded |= reason == FailureReason::DeadlineExceeded;
                        self.diagnostics.emit(DiagnosticEvent::Failed {
                            url: url.clone(),
                            reason: reason.clone(),
                        });
                    }

                    slots.push(None);
                    settled.push(SettledRequest {
                        url: url.clone(),
                        state: RequestState::Failed,
                        status: None,
                        failure: Some(reason),
                    });
                }
                FetchOutcome::RateLimited => {
                    // execute() never hands this back; treat it as spent budget
                    summary.failed += 1;
                    slots.push(None);
                    settled.push(SettledRequest {
                        url: url.clone(),
                        state: RequestState::Failed,
                        status: None,
                        failure: Some(FailureReason::RateLimitExhausted),
                    });
                }
            }
        }

        BatchReport {
            results: BatchResult { slots },
            settled,
            summary,
            deadline_exceeded,
            elapsed,
        }
    }
}
