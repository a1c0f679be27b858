//! Retry controller
//!
//! Drives one request through its lifecycle:
//!
//! 1. Draw a fresh identity
//! 2. Sleep a random pre-request jitter
//! 3. Call the transport under the request timeout
//! 4. Classify the response
//!
//! A 429 puts the request into backoff (`base * attempt`) and loops back to
//! step 1 until the retry budget is spent. Transport failures are terminal
//! and never retried.
//!
//! # Retry Logic
//!
//! | Condition | Action |
//! |-----------|--------|
//! | HTTP 429, attempt < max | Sleep `base * attempt`, retry |
//! | HTTP 429, attempt == max | Failed(rate-limit-exhausted) |
//! | Transport error / timeout | Failed(transport), no retry |
//! | Any other status | Success (lenient) or per status policy |

use crate::config::{Config, StatusPolicy};
use crate::fetch::diagnostics::{DiagnosticEvent, Diagnostics};
use crate::fetch::identity::IdentityProvider;
use crate::fetch::outcome::{classify_response, FailureReason, FetchOutcome, FetchRequest};
use crate::fetch::transport::{Transport, TransportError};
use crate::state::RequestState;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;

/// Retry budget and per-attempt timing
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of attempts while rate limited
    pub max_retries: u32,

    /// Linear backoff unit
    pub backoff_base: Duration,

    /// Pre-request jitter bounds (inclusive)
    pub jitter_min: Duration,
    pub jitter_max: Duration,

    /// Timeout imposed on each transport call
    pub request_timeout: Duration,

    pub status_policy: StatusPolicy,
}

impl RetryPolicy {
    pub fn from_config(config: &Config) -> Self {
        let (jitter_min, jitter_max) = config.jitter_range();
        Self {
            max_retries: config.max_retries.max(1),
            backoff_base: config.backoff_base(),
            jitter_min,
            jitter_max,
            request_timeout: config.request_timeout(),
            status_policy: config.status_policy,
        }
    }

    /// Backoff after a 429 on the given attempt: 1 → base, 2 → 2×base, …
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.backoff_base.saturating_mul(attempt)
    }

    /// True once `attempt` is the last one the budget allows
    pub fn is_exhausted(&self, attempt: u32) -> bool {
        attempt >= self.max_retries
    }

    /// Samples a jitter delay uniformly from the configured range
    pub fn sample_jitter(&self) -> Duration {
        if self.jitter_max <= self.jitter_min {
            return self.jitter_min;
        }

        let secs = rand::thread_rng()
            .gen_range(self.jitter_min.as_secs_f64()..=self.jitter_max.as_secs_f64());
        Duration::from_secs_f64(secs)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Runs requests to a terminal outcome
pub struct RetryController {
    policy: RetryPolicy,
    identities: Arc<IdentityProvider>,
    transport: Arc<dyn Transport>,
    diagnostics: Diagnostics,
}

impl RetryController {
    pub fn new(
        policy: RetryPolicy,
        identities: Arc<IdentityProvider>,
        transport: Arc<dyn Transport>,
        diagnostics: Diagnostics,
    ) -> Self {
        Self {
            policy,
            identities,
            transport,
            diagnostics,
        }
    }

    /// Executes a request until it succeeds or fails terminally
    ///
    /// Never returns [`FetchOutcome::RateLimited`].
    pub async fn execute(&self, request: FetchRequest) -> FetchOutcome {
        let mut request = request;
        let mut state = RequestState::Pending;

        loop {
            advance(&request, &mut state, RequestState::Attempting);

            match self.attempt(&request).await {
                FetchOutcome::RateLimited => {
                    advance(&request, &mut state, RequestState::RateLimited);

                    if self.policy.is_exhausted(request.attempt) {
                        self.diagnostics.emit(DiagnosticEvent::RateLimited {
                            url: request.url.clone(),
                            attempt: request.attempt,
                            wait: None,
                        });
                        return self.fail(&request, &mut state, FailureReason::RateLimitExhausted);
                    }

                    let wait = self.policy.backoff_for(request.attempt);
                    self.diagnostics.emit(DiagnosticEvent::RateLimited {
                        url: request.url.clone(),
                        attempt: request.attempt,
                        wait: Some(wait),
                    });

                    tokio::time::sleep(wait).await;
                    request = request.next_attempt();
                }
                FetchOutcome::Failed(reason) => {
                    return self.fail(&request, &mut state, reason);
                }
                success @ FetchOutcome::Success { .. } => {
                    advance(&request, &mut state, RequestState::Succeeded);
                    return success;
                }
            }
        }
    }

    /// Performs a single attempt and classifies it
    async fn attempt(&self, request: &FetchRequest) -> FetchOutcome {
        let identity = self.identities.next();

        let jitter = self.policy.sample_jitter();
        if !jitter.is_zero() {
            tokio::time::sleep(jitter).await;
        }

        tracing::trace!(
            url = %request.url,
            attempt = request.attempt,
            user_agent = %identity.user_agent,
            proxy = identity.proxy.as_deref().unwrap_or("-"),
            "Sending request"
        );

        let timeout = self.policy.request_timeout;
        let result = tokio::time::timeout(
            timeout,
            self.transport.perform(request, &identity, timeout),
        )
        .await;

        match result {
            Ok(Ok(response)) => classify_response(response, self.policy.status_policy),
            Ok(Err(error)) => FetchOutcome::Failed(FailureReason::Transport(error.to_string())),
            Err(_) => {
                let error = TransportError::Timeout {
                    url: request.url.clone(),
                };
                FetchOutcome::Failed(FailureReason::Transport(error.to_string()))
            }
        }
    }

    fn fail(
        &self,
        request: &FetchRequest,
        state: &mut RequestState,
        reason: FailureReason,
    ) -> FetchOutcome {
        advance(request, state, RequestState::Failed);
        self.diagnostics.emit(DiagnosticEvent::Failed {
            url: request.url.clone(),
            reason: reason.clone(),
        });
        FetchOutcome::Failed(reason)
    }
}

fn advance(request: &FetchRequest, state: &mut RequestState, next: RequestState) {
    debug_assert!(
        state.can_transition_to(next),
        "invalid request transition {} -> {}",
        state,
        next
    );
    tracing::trace!(url = %request.url, attempt = request.attempt, from = %state, to = %next);
    *state = next;
}
