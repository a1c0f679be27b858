use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use sumi_harvest::config::load_config;
///
/// let config = load_config(Path::new("pyproject.toml")).unwrap();
/// println!("Max retries: {}", config.max_retries);
/// ```
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses and validates configuration from TOML text
///
/// The settings table is taken from `[tool.scraper]` when present, then
/// `[scraper]`, and otherwise the document root.
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let document: toml::Table = content.parse()?;
    let section = settings_section(document);

    let config: Config = toml::Value::Table(section).try_into()?;

    validate(&config)?;

    Ok(config)
}

/// Picks the table holding the harvester settings
fn settings_section(mut document: toml::Table) -> toml::Table {
    let nested = document
        .get_mut("tool")
        .and_then(|tool| tool.as_table_mut())
        .and_then(|tool| tool.remove("scraper"));
    if let Some(toml::Value::Table(table)) = nested {
        return table;
    }

    if let Some(toml::Value::Table(table)) = document.remove("scraper") {
        return table;
    }

    document
}

/// Computes a SHA-256 hash of the configuration file content
///
/// Logged at startup so output files can be correlated with the settings
/// that produced them.
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(String)` - Hex-encoded SHA-256 hash of the file content
/// * `Err(ConfigError)` - Failed to read the file
pub fn compute_config_hash(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let result = hasher.finalize();
    Ok(hex::encode(result))
}

/// Loads a configuration and returns both the config and its hash
pub fn load_config_with_hash(path: &Path) -> Result<(Config, String), ConfigError> {
    let config = load_config(path)?;
    let hash = compute_config_hash(path)?;
    Ok((config, hash))
}
