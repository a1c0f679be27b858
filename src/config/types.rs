use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Placeholder in `base-url` that is replaced with the page number
pub const PAGE_PLACEHOLDER: &str = "{}";

/// How a completed response with a status other than 429 is classified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StatusPolicy {
    /// Any non-429 status is a success and its body goes to the extractor
    #[default]
    Lenient,

    /// Only 2xx is a success; other statuses fail the request
    Strict,
}

/// Which extractor turns fetched pages into records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExtractorKind {
    /// One title/link-count record per page
    #[default]
    Page,

    /// One record per `<article>` product card
    Listing,
}

/// Harvester settings
///
/// Read from `[tool.scraper]`, `[scraper]` or the document root, in that
/// order. Every key is optional. Keys are kebab-case; the snake_case
/// spellings are accepted too, as are the upper-case pagination keys
/// (`BASE_URL`, `MAX_PAGES`, `CONCURRENCY`).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// URLs to fetch, in output order
    #[serde(default)]
    pub urls: Vec<String>,

    /// Page URL template containing a `{}` placeholder
    #[serde(default, alias = "base_url", alias = "BASE_URL")]
    pub base_url: Option<String>,

    /// Number of pages generated from `base_url`, numbered from 1
    #[serde(default, alias = "max_pages", alias = "MAX_PAGES")]
    pub max_pages: Option<u32>,

    /// Maximum number of requests in flight at once
    #[serde(
        default = "default_max_concurrent",
        alias = "max_concurrent",
        alias = "CONCURRENCY"
    )]
    pub max_concurrent: u32,

    /// Maximum number of attempts per URL while rate limited
    #[serde(default = "default_max_retries", alias = "max_retries")]
    pub max_retries: u32,

    /// Linear backoff unit; attempt n waits n times this long after a 429
    #[serde(default = "default_backoff_base", alias = "backoff_base_seconds")]
    pub backoff_base_seconds: f64,

    /// Lower bound of the pre-request jitter
    #[serde(default = "default_jitter_min", alias = "jitter_min_seconds")]
    pub jitter_min_seconds: f64,

    /// Upper bound of the pre-request jitter
    #[serde(default = "default_jitter_max", alias = "jitter_max_seconds")]
    pub jitter_max_seconds: f64,

    /// Timeout imposed on every transport round trip
    #[serde(default = "default_request_timeout", alias = "request_timeout_seconds")]
    pub request_timeout_seconds: f64,

    /// Overall batch deadline, unlimited when absent
    #[serde(default, alias = "deadline_seconds")]
    pub deadline_seconds: Option<f64>,

    /// Whether a rendering transport should run without a visible window
    #[serde(default = "default_headless")]
    pub headless: bool,

    /// Proxy endpoints to rotate through
    #[serde(default)]
    pub proxies: Vec<String>,

    /// User agent pool override; the built-in browser pool is used when absent
    #[serde(default, alias = "user_agents")]
    pub user_agents: Option<Vec<String>>,

    #[serde(default, alias = "status_policy")]
    pub status_policy: StatusPolicy,

    #[serde(default)]
    pub extractor: ExtractorKind,

    /// Where the CSV output is written
    #[serde(default = "default_output_path", alias = "output_path")]
    pub output_path: PathBuf,
}

fn default_max_concurrent() -> u32 {
    2
}

fn default_max_retries() -> u32 {
    3
}

fn default_backoff_base() -> f64 {
    5.0
}

fn default_jitter_min() -> f64 {
    1.0
}

fn default_jitter_max() -> f64 {
    3.0
}

fn default_request_timeout() -> f64 {
    30.0
}

fn default_headless() -> bool {
    true
}

fn default_output_path() -> PathBuf {
    PathBuf::from("data/results.csv")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            urls: Vec::new(),
            base_url: None,
            max_pages: None,
            max_concurrent: default_max_concurrent(),
            max_retries: default_max_retries(),
            backoff_base_seconds: default_backoff_base(),
            jitter_min_seconds: default_jitter_min(),
            jitter_max_seconds: default_jitter_max(),
            request_timeout_seconds: default_request_timeout(),
            deadline_seconds: None,
            headless: default_headless(),
            proxies: Vec::new(),
            user_agents: None,
            status_policy: StatusPolicy::default(),
            extractor: ExtractorKind::default(),
            output_path: default_output_path(),
        }
    }
}

impl Config {
    /// Every URL of the batch: explicit `urls` first, then the generated pages
    ///
    /// # Example
    ///
    /// ```
    /// use sumi_harvest::config::Config;
    ///
    /// let config = Config {
    ///     urls: vec!["https://example.com/".to_string()],
    ///     base_url: Some("https://example.com/page-{}.html".to_string()),
    ///     max_pages: Some(2),
    ///     ..Config::default()
    /// };
    /// assert_eq!(
    ///     config.target_urls(),
    ///     vec![
    ///         "https://example.com/",
    ///         "https://example.com/page-1.html",
    ///         "https://example.com/page-2.html",
    ///     ]
    /// );
    /// ```
    pub fn target_urls(&self) -> Vec<String> {
        let mut urls = self.urls.clone();
        urls.extend(self.page_urls());
        urls
    }

    /// URLs generated from `base_url` for pages `1..=max_pages`
    pub fn page_urls(&self) -> Vec<String> {
        match (&self.base_url, self.max_pages) {
            (Some(template), Some(pages)) => (1..=pages)
                .map(|page| template.replace(PAGE_PLACEHOLDER, &page.to_string()))
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn backoff_base(&self) -> Duration {
        seconds(self.backoff_base_seconds)
    }

    pub fn jitter_range(&self) -> (Duration, Duration) {
        (
            seconds(self.jitter_min_seconds),
            seconds(self.jitter_max_seconds),
        )
    }

    pub fn request_timeout(&self) -> Duration {
        seconds(self.request_timeout_seconds)
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_seconds.map(seconds)
    }
}

/// Converts configured seconds, saturating instead of panicking
///
/// Negative and NaN values become zero, values too large for a `Duration`
/// become `Duration::MAX`. Validation rejects both long before this.
fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(if value > 0.0 {
        Duration::MAX
    } else {
        Duration::ZERO
    })
}
