//! Request identity rotation
//!
//! Every attempt presents a freshly drawn user agent and, when a proxy pool is
//! configured, a proxy endpoint. The pools are fixed at construction time, so
//! a single provider can be shared across tasks without locking.

use rand::seq::SliceRandom;

/// Realistic desktop browser signatures used when no pool is configured
pub const BROWSER_USER_AGENTS: &[&str] = &[
    // Chrome on Windows
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36",
    // Chrome on Mac
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    // Chrome on Linux
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    // Firefox on Windows
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:133.0) Gecko/20100101 Firefox/133.0",
    // Firefox on Mac
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:133.0) Gecko/20100101 Firefox/133.0",
    // Firefox on Linux
    "Mozilla/5.0 (X11; Linux x86_64; rv:133.0) Gecko/20100101 Firefox/133.0",
    // Safari on Mac
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/18.1 Safari/605.1.15",
    // Edge on Windows
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36 Edg/131.0.0.0",
];

/// The identity presented for one attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_agent: String,
    pub proxy: Option<String>,
}

/// Draws a random identity per attempt from read-only pools
#[derive(Debug, Clone)]
pub struct IdentityProvider {
    user_agents: Vec<String>,
    proxies: Vec<String>,
}

impl IdentityProvider {
    /// Creates a provider from explicit pools
    ///
    /// An empty user agent pool falls back to [`BROWSER_USER_AGENTS`].
    pub fn new(user_agents: Vec<String>, proxies: Vec<String>) -> Self {
        let user_agents = if user_agents.is_empty() {
            default_user_agents()
        } else {
            user_agents
        };

        Self {
            user_agents,
            proxies,
        }
    }

    /// Creates a provider using the built-in browser pool
    pub fn with_proxies(proxies: Vec<String>) -> Self {
        Self::new(Vec::new(), proxies)
    }

    /// Draws the identity for the next attempt
    pub fn next(&self) -> Identity {
        let mut rng = rand::thread_rng();

        let user_agent = self
            .user_agents
            .choose(&mut rng)
            .cloned()
            .unwrap_or_else(|| BROWSER_USER_AGENTS[0].to_string());
        let proxy = self.proxies.choose(&mut rng).cloned();

        Identity { user_agent, proxy }
    }

    pub fn user_agents(&self) -> &[String] {
        &self.user_agents
    }

    pub fn proxies(&self) -> &[String] {
        &self.proxies
    }
}

impl Default for IdentityProvider {
    fn default() -> Self {
        Self::new(Vec::new(), Vec::new())
    }
}

fn default_user_agents() -> Vec<String> {
    BROWSER_USER_AGENTS.iter().map(|ua| ua.to_string()).collect()
}
