//! Request and outcome types, plus response classification

use crate::config::StatusPolicy;
use crate::fetch::transport::TransportResponse;
use std::fmt;

/// HTTP status that signals the target is rate limiting us
pub const TOO_MANY_REQUESTS: u16 = 429;

/// One attempt at fetching a URL
///
/// Requests are immutable; a retry is a new request with the attempt
/// counter bumped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    /// Target URL
    pub url: String,

    /// 1-based attempt number
    pub attempt: u32,
}

impl FetchRequest {
    /// Creates the first attempt for a URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            attempt: 1,
        }
    }

    /// Returns the request for the following attempt
    pub fn next_attempt(&self) -> Self {
        Self {
            url: self.url.clone(),
            attempt: self.attempt + 1,
        }
    }
}

/// Why a request ended without a usable response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// Connection, timeout, or other transport-level failure
    Transport(String),

    /// Still rate limited after the last permitted attempt
    RateLimitExhausted,

    /// The batch deadline expired before the request settled
    DeadlineExceeded,

    /// Non-success status under the strict status policy
    HttpStatus(u16),

    /// The task driving the request did not run to completion
    Aborted(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(cause) => write!(f, "transport: {}", cause),
            Self::RateLimitExhausted => write!(f, "rate-limit-exhausted"),
            Self::DeadlineExceeded => write!(f, "deadline-exceeded"),
            Self::HttpStatus(status) => write!(f, "http-{}", status),
            Self::Aborted(cause) => write!(f, "aborted: {}", cause),
        }
    }
}

/// Classified result of a fetch attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// A response was received and its body is ready for extraction
    Success { status: u16, body: String },

    /// The target answered 429; retryable while budget remains
    RateLimited,

    /// Terminal failure
    Failed(FailureReason),
}

impl FetchOutcome {
    /// Returns true for Success and Failed
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::RateLimited)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// The failure reason, if this outcome is a failure
    pub fn failure(&self) -> Option<&FailureReason> {
        match self {
            Self::Failed(reason) => Some(reason),
            _ => None,
        }
    }
}

/// Classifies a completed round trip
///
/// | Status | Lenient | Strict |
/// |--------|---------|--------|
/// | 429 | RateLimited | RateLimited |
/// | 2xx | Success | Success |
/// | anything else | Success | Failed(HttpStatus) |
pub fn classify_response(response: TransportResponse, policy: StatusPolicy) -> FetchOutcome {
    let TransportResponse { status, body } = response;

    if status == TOO_MANY_REQUESTS {
        return FetchOutcome::RateLimited;
    }

    match policy {
        StatusPolicy::Strict if !(200..300).contains(&status) => {
            FetchOutcome::Failed(FailureReason::HttpStatus(status))
        }
        _ => FetchOutcome::Success { status, body },
    }
}
