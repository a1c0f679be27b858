//! Output sink traits and error types
//!
//! This module defines the interface the binary uses to persist the records
//! of a settled batch.

use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Persists the records of a batch
///
/// Called once per batch, after every request has settled, with the present
/// records in input order.
pub trait Sink<R> {
    fn persist(&mut self, records: &[R]) -> OutputResult<()>;
}
