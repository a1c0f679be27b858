//! Diagnostic event stream
//!
//! The fetch core reports rate-limit observations, terminal failures and the
//! batch summary as structured events. Every event is logged through
//! `tracing`; callers that want to inspect events programmatically can
//! subscribe through a channel.

use crate::fetch::outcome::FailureReason;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// A structured diagnostic event
#[derive(Debug, Clone, PartialEq)]
pub enum DiagnosticEvent {
    /// An attempt came back with HTTP 429
    RateLimited {
        url: String,
        attempt: u32,
        /// Backoff before the next attempt; `None` when the budget is spent
        wait: Option<Duration>,
    },

    /// A request settled in a failure
    Failed { url: String, reason: FailureReason },

    /// The whole batch settled
    BatchCompleted {
        total_urls: usize,
        succeeded: usize,
        failed: usize,
    },
}

/// Emits diagnostic events to the log and an optional subscriber
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    subscriber: Option<UnboundedSender<DiagnosticEvent>>,
}

impl Diagnostics {
    /// Log-only diagnostics
    pub fn new() -> Self {
        Self::default()
    }

    /// Diagnostics that also forward every event to the returned receiver
    pub fn channel() -> (Self, UnboundedReceiver<DiagnosticEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                subscriber: Some(tx),
            },
            rx,
        )
    }

    pub fn emit(&self, event: DiagnosticEvent) {
        match &event {
            DiagnosticEvent::RateLimited { url, attempt, wait } => match wait {
                Some(wait) => tracing::warn!(
                    url = %url,
                    attempt,
                    wait_ms = wait.as_millis() as u64,
                    "Rate limited, backing off"
                ),
                None => tracing::warn!(url = %url, attempt, "Rate limited, retry budget spent"),
            },
            DiagnosticEvent::Failed { url, reason } => {
                tracing::error!(url = %url, reason = %reason, "Request failed");
            }
            DiagnosticEvent::BatchCompleted {
                total_urls,
                succeeded,
                failed,
            } => {
                tracing::info!(total_urls, succeeded, failed, "Batch completed");
            }
        }

        if let Some(tx) = &self.subscriber {
            // A dropped receiver just means nobody is listening any more
            let _ = tx.send(event);
        }
    }
}
