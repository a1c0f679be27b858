//! Transport layer
//!
//! This module defines the contract the fetch core consumes to perform one
//! round trip, and the reqwest-backed implementation used by the binary:
//! - One pre-built client for direct requests and one per proxy endpoint
//! - Per-request user agent and timeout
//! - Error classification into timeout / connect / other

use crate::fetch::identity::Identity;
use crate::fetch::outcome::FetchRequest;
use async_trait::async_trait;
use reqwest::header::USER_AGENT;
use reqwest::{Client, Proxy};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by a transport
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Connection failed for {url}: {message}")]
    Connect { url: String, message: String },

    #[error("Request failed for {url}: {message}")]
    Request { url: String, message: String },

    #[error("No client configured for proxy {proxy}")]
    UnknownProxy { proxy: String },

    #[error("Failed to build HTTP client: {0}")]
    Init(String),
}

/// A completed HTTP-level round trip
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

/// Performs one network round trip for a request
///
/// Implementations may be slow and may fail; the caller imposes its own
/// timeout on top of the one passed in.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn perform(
        &self,
        request: &FetchRequest,
        identity: &Identity,
        timeout: Duration,
    ) -> Result<TransportResponse, TransportError>;
}

/// reqwest-backed transport
///
/// Proxies are bound at client construction in reqwest, so a client is built
/// per proxy endpoint up front and selected per attempt.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    direct: Client,
    proxied: HashMap<String, Client>,
}

impl HttpTransport {
    /// Builds the direct client and one client per proxy endpoint
    ///
    /// # Returns
    ///
    /// * `Ok(HttpTransport)` - All clients were built
    /// * `Err(TransportError::Init)` - A client or proxy could not be built
    pub fn new(proxies: &[String]) -> Result<Self, TransportError> {
        let direct = build_http_client(None)?;

        let mut proxied = HashMap::with_capacity(proxies.len());
        for endpoint in proxies {
            let proxy = Proxy::all(endpoint.as_str())
                .map_err(|e| TransportError::Init(format!("invalid proxy {}: {}", endpoint, e)))?;
            proxied.insert(endpoint.clone(), build_http_client(Some(proxy))?);
        }

        Ok(Self { direct, proxied })
    }

    fn client_for(&self, identity: &Identity) -> Result<&Client, TransportError> {
        match &identity.proxy {
            None => Ok(&self.direct),
            Some(proxy) => self
                .proxied
                .get(proxy)
                .ok_or_else(|| TransportError::UnknownProxy {
                    proxy: proxy.clone(),
                }),
        }
    }
}

/// Builds an HTTP client with the harvester's defaults
fn build_http_client(proxy: Option<Proxy>) -> Result<Client, TransportError> {
    let mut builder = Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true);

    if let Some(proxy) = proxy {
        builder = builder.proxy(proxy);
    }

    builder
        .build()
        .map_err(|e| TransportError::Init(e.to_string()))
}

#[async_trait]
impl Transport for HttpTransport {
    async fn perform(
        &self,
        request: &FetchRequest,
        identity: &Identity,
        timeout: Duration,
    ) -> Result<TransportResponse, TransportError> {
        let client = self.client_for(identity)?;

        let response = client
            .get(&request.url)
            .header(USER_AGENT, identity.user_agent.as_str())
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify_error(&request.url, e))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| classify_error(&request.url, e))?;

        Ok(TransportResponse { status, body })
    }
}

/// Maps a reqwest error onto the transport taxonomy
fn classify_error(url: &str, error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout {
            url: url.to_string(),
        }
    } else if error.is_connect() {
        TransportError::Connect {
            url: url.to_string(),
            message: error.to_string(),
        }
    } else {
        TransportError::Request {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}
