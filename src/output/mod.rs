//! Output module for persisting records and reporting results
//!
//! This module handles:
//! - The sink interface records are persisted through
//! - CSV output
//! - Terminal summaries of a batch

mod csv_sink;
pub mod stats;
mod traits;

pub use csv_sink::CsvSink;
pub use stats::{format_summary, print_summary, success_rate};
pub use traits::{OutputError, OutputResult, Sink};
