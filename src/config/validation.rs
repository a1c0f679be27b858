use crate::config::types::{Config, PAGE_PLACEHOLDER};
use crate::ConfigError;
use url::Url;

/// Upper bound for backoff, jitter and request timeout (one day)
pub const MAX_DELAY_SECONDS: f64 = 86_400.0;

/// Upper bound for the batch deadline (thirty days)
pub const MAX_DEADLINE_SECONDS: f64 = 30.0 * 86_400.0;

/// Upper bound for `max-pages`
pub const MAX_PAGES: u32 = 10_000;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_limits(config)?;
    validate_timing(config)?;
    validate_pagination(config)?;
    validate_urls(&config.target_urls())?;
    validate_proxies(&config.proxies)?;
    if let Some(agents) = &config.user_agents {
        validate_user_agents(agents)?;
    }

    if config.output_path.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "output_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates concurrency and retry limits
fn validate_limits(config: &Config) -> Result<(), ConfigError> {
    if config.max_concurrent < 1 || config.max_concurrent > 100 {
        return Err(ConfigError::Validation(format!(
            "max_concurrent must be between 1 and 100, got {}",
            config.max_concurrent
        )));
    }

    if config.max_retries < 1 {
        return Err(ConfigError::Validation(format!(
            "max_retries must be >= 1, got {}",
            config.max_retries
        )));
    }

    Ok(())
}

/// Validates backoff, jitter, timeout and deadline durations
fn validate_timing(config: &Config) -> Result<(), ConfigError> {
    non_negative("backoff_base_seconds", config.backoff_base_seconds)?;
    non_negative("jitter_min_seconds", config.jitter_min_seconds)?;
    non_negative("jitter_max_seconds", config.jitter_max_seconds)?;
    at_most("backoff_base_seconds", config.backoff_base_seconds, MAX_DELAY_SECONDS)?;
    at_most("jitter_max_seconds", config.jitter_max_seconds, MAX_DELAY_SECONDS)?;

    if config.jitter_min_seconds > config.jitter_max_seconds {
        return Err(ConfigError::Validation(format!(
            "jitter_min_seconds ({}) must not exceed jitter_max_seconds ({})",
            config.jitter_min_seconds, config.jitter_max_seconds
        )));
    }

    positive("request_timeout_seconds", config.request_timeout_seconds)?;
    at_most(
        "request_timeout_seconds",
        config.request_timeout_seconds,
        MAX_DELAY_SECONDS,
    )?;

    if let Some(deadline) = config.deadline_seconds {
        positive("deadline_seconds", deadline)?;
        at_most("deadline_seconds", deadline, MAX_DEADLINE_SECONDS)?;
    }

    Ok(())
}

/// Validates the `base-url` / `max-pages` pair
fn validate_pagination(config: &Config) -> Result<(), ConfigError> {
    match (&config.base_url, config.max_pages) {
        (None, None) => Ok(()),
        (Some(_), None) => Err(ConfigError::Validation(
            "base_url requires max_pages".to_string(),
        )),
        (None, Some(_)) => Err(ConfigError::Validation(
            "max_pages requires base_url".to_string(),
        )),
        (Some(template), Some(pages)) => {
            if !template.contains(PAGE_PLACEHOLDER) {
                return Err(ConfigError::Validation(format!(
                    "base_url '{}' must contain a {} page placeholder",
                    template, PAGE_PLACEHOLDER
                )));
            }

            if pages < 1 || pages > MAX_PAGES {
                return Err(ConfigError::Validation(format!(
                    "max_pages must be between 1 and {}, got {}",
                    MAX_PAGES, pages
                )));
            }

            Ok(())
        }
    }
}

fn non_negative(name: &str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ConfigError::Validation(format!(
            "{} must be a finite number >= 0, got {}",
            name, value
        )));
    }
    Ok(())
}

fn at_most(name: &str, value: f64, limit: f64) -> Result<(), ConfigError> {
    if value > limit {
        return Err(ConfigError::Validation(format!(
            "{} must be at most {}, got {}",
            name, limit, value
        )));
    }
    Ok(())
}

fn positive(name: &str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ConfigError::Validation(format!(
            "{} must be a finite number > 0, got {}",
            name, value
        )));
    }
    Ok(())
}

/// Validates target URLs
fn validate_urls(urls: &[String]) -> Result<(), ConfigError> {
    for raw in urls {
        let url = Url::parse(raw)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid URL '{}': {}", raw, e)))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidUrl(format!(
                "URL '{}' must use the http or https scheme",
                raw
            )));
        }
    }

    Ok(())
}

/// Validates proxy endpoints
fn validate_proxies(proxies: &[String]) -> Result<(), ConfigError> {
    for raw in proxies {
        let url = Url::parse(raw)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid proxy '{}': {}", raw, e)))?;

        if !matches!(url.scheme(), "http" | "https" | "socks5" | "socks5h") {
            return Err(ConfigError::InvalidUrl(format!(
                "Proxy '{}' must use http, https, socks5 or socks5h",
                raw
            )));
        }

        if url.host_str().is_none() {
            return Err(ConfigError::InvalidUrl(format!(
                "Proxy '{}' is missing a host",
                raw
            )));
        }
    }

    Ok(())
}

/// Validates a user agent pool override
fn validate_user_agents(agents: &[String]) -> Result<(), ConfigError> {
    if agents.is_empty() {
        return Err(ConfigError::Validation(
            "user_agents must contain at least one entry when set".to_string(),
        ));
    }

    if agents.iter().any(|agent| agent.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "user_agents cannot contain blank entries".to_string(),
        ));
    }

    Ok(())
}
