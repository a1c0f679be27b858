//! Shared test doubles for the integration tests

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use sumi_harvest::config::StatusPolicy;
use sumi_harvest::extract::{ExtractionError, Extractor};
use sumi_harvest::fetch::{
    DiagnosticEvent, Diagnostics, FetchRequest, Identity, IdentityProvider, Orchestrator,
    RetryPolicy, Transport, TransportError, TransportResponse,
};
use tokio::sync::mpsc::UnboundedReceiver;

/// What the stub answers for one call
#[derive(Debug, Clone)]
pub enum Reply {
    Status(u16),
    ConnectError,
}

/// Scripted, instrumented transport
///
/// Each URL replays its own script and then answers 200. The stub tracks
/// how many calls are in flight at once.
#[derive(Default)]
pub struct StubTransport {
    scripts: Mutex<HashMap<String, VecDeque<Reply>>>,
    delays: HashMap<String, Duration>,
    default_delay: Duration,
    calls: Mutex<HashMap<String, u32>>,
    identities: Mutex<Vec<Identity>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl StubTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_script(self, url: &str, replies: Vec<Reply>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(url.to_string(), replies.into());
        self
    }

    pub fn with_delay(mut self, url: &str, delay: Duration) -> Self {
        self.delays.insert(url.to_string(), delay);
        self
    }

    pub fn with_default_delay(mut self, delay: Duration) -> Self {
        self.default_delay = delay;
        self
    }

    pub fn calls(&self, url: &str) -> u32 {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn identities(&self) -> Vec<Identity> {
        self.identities.lock().unwrap().clone()
    }
}

/// Decrements the in-flight counter even when the call is cancelled
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn perform(
        &self,
        request: &FetchRequest,
        identity: &Identity,
        _timeout: Duration,
    ) -> Result<TransportResponse, TransportError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _guard = InFlight(&self.in_flight);
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        *self
            .calls
            .lock()
            .unwrap()
            .entry(request.url.clone())
            .or_insert(0) += 1;
        self.identities.lock().unwrap().push(identity.clone());

        let reply = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&request.url)
            .and_then(|script| script.pop_front())
            .unwrap_or(Reply::Status(200));

        let delay = self
            .delays
            .get(&request.url)
            .copied()
            .unwrap_or(self.default_delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        match reply {
            Reply::Status(status) => Ok(TransportResponse {
                status,
                body: format!("{}:{}", status, request.url),
            }),
            Reply::ConnectError => Err(TransportError::Connect {
                url: request.url.clone(),
                message: "connection refused".to_string(),
            }),
        }
    }
}

/// Turns the body into the record verbatim; bodies for URLs containing
/// "broken" fail and URLs containing "empty" produce nothing
#[derive(Debug, Clone, Default)]
pub struct EchoExtractor;

impl Extractor for EchoExtractor {
    type Record = String;

    fn extract(&self, markup: &str, url: &str) -> Result<Option<String>, ExtractionError> {
        if url.contains("broken") {
            return Err(ExtractionError::Markup {
                url: url.to_string(),
                message: "no content".to_string(),
            });
        }
        if url.contains("empty") {
            return Ok(None);
        }
        Ok(Some(markup.to_string()))
    }
}

/// Retry policy with no jitter and a 5 second backoff base
pub fn quiet_policy(max_retries: u32) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        backoff_base: Duration::from_secs(5),
        jitter_min: Duration::ZERO,
        jitter_max: Duration::ZERO,
        request_timeout: Duration::from_secs(30),
        status_policy: StatusPolicy::Lenient,
    }
}

pub fn orchestrator(
    transport: Arc<StubTransport>,
    max_concurrent: usize,
    policy: RetryPolicy,
) -> (
    Orchestrator<EchoExtractor>,
    UnboundedReceiver<DiagnosticEvent>,
) {
    let (diagnostics, rx) = Diagnostics::channel();
    let identities = Arc::new(IdentityProvider::new(
        vec!["TestAgent/1.0".to_string()],
        vec![],
    ));

    let orchestrator = Orchestrator::with_diagnostics(
        policy,
        max_concurrent,
        identities,
        transport,
        EchoExtractor,
        diagnostics,
    );
    (orchestrator, rx)
}

pub fn drain(rx: &mut UnboundedReceiver<DiagnosticEvent>) -> Vec<DiagnosticEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

pub fn urls(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}
