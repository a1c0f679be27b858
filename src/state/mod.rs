//! State module for tracking request progress
//!
//! Every URL in a batch moves through a small lifecycle:
//!
//! ```text
//! Pending -> Attempting -> { RateLimited -> Attempting | Succeeded | Failed }
//! ```
//!
//! `Succeeded` and `Failed` are terminal.

mod request_state;

pub use request_state::RequestState;
