/// Request state definitions for tracking one URL through a batch
use std::fmt;

/// Represents the current state of a request in the batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestState {
    // ===== Active States =====
    /// Request has been created but not admitted by the limiter yet
    Pending,

    /// A transport attempt is underway (including its jitter delay)
    Attempting,

    /// The last attempt returned HTTP 429 and a retry is scheduled
    RateLimited,

    // ===== Terminal States =====
    /// A response was received and handed to the extractor
    Succeeded,

    /// Transport failure, exhausted retry budget, or deadline
    Failed,
}

impl RequestState {
    /// Returns true if no further attempts will be made
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    /// Returns true if the request may still make progress
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// Checks whether moving to `next` is a legal lifecycle step
    ///
    /// Any active state may fail (deadline cancellation can strike while a
    /// request is still queued or backing off).
    pub fn can_transition_to(&self, next: RequestState) -> bool {
        use RequestState::*;

        match (self, next) {
            (Pending, Attempting) => true,
            (Attempting, RateLimited | Succeeded | Failed) => true,
            (RateLimited, Attempting) => true,
            (Pending | RateLimited, Failed) => true,
            _ => false,
        }
    }

    /// Stable lowercase name, used in logs and reports
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Attempting => "attempting",
            Self::RateLimited => "rate_limited",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        }
    }

    /// Returns all possible request states
    pub fn all_states() -> Vec<Self> {
        vec![
            Self::Pending,
            Self::Attempting,
            Self::RateLimited,
            Self::Succeeded,
            Self::Failed,
        ]
    }
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
