//! Configuration module for Sumi-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! The settings table may live at the root of a dedicated file, under
//! `[scraper]`, or under `[tool.scraper]` inside a `pyproject.toml`.
//!
//! # Example
//!
//! ```no_run
//! use sumi_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("scraper.toml")).unwrap();
//! println!("Harvester will keep {} requests in flight", config.max_concurrent);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, ExtractorKind, StatusPolicy, PAGE_PLACEHOLDER};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
