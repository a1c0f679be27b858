//! CSV output
//!
//! Writes one header row derived from the record's fields, then one row per
//! record.

use crate::output::traits::{OutputResult, Sink};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Writes records to a CSV file, replacing any previous content
#[derive(Debug, Clone)]
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<R: Serialize> Sink<R> for CsvSink {
    /// Writes the records; an empty batch leaves the file untouched
    fn persist(&mut self, records: &[R]) -> OutputResult<()> {
        if records.is_empty() {
            tracing::info!("No records to write, skipping {}", self.path.display());
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut writer = csv::Writer::from_path(&self.path)?;
        for record in records {
            writer.serialize(record)?;
        }
        writer.flush()?;

        tracing::info!(
            "Wrote {} records to {}",
            records.len(),
            self.path.display()
        );
        Ok(())
    }
}
