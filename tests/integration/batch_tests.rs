//! Orchestration tests against the scripted stub transport
//!
//! All tests run on a paused tokio clock, so backoff and jitter sleeps
//! complete instantly while elapsed time stays measurable.

use crate::support::{drain, orchestrator, quiet_policy, urls, Reply, StubTransport};
use std::sync::Arc;
use std::time::Duration;
use sumi_harvest::fetch::{DiagnosticEvent, FailureReason, IdentityProvider, Orchestrator};
use sumi_harvest::state::RequestState;
use tokio::time::Instant;

#[tokio::test(start_paused = true)]
async fn test_rate_limited_url_recovers_in_order() {
    let transport = Arc::new(StubTransport::new().with_script(
        "b",
        vec![Reply::Status(429), Reply::Status(429), Reply::Status(200)],
    ));
    let (orchestrator, mut rx) = orchestrator(transport.clone(), 2, quiet_policy(3));

    let report = orchestrator.run(&urls(&["a", "b", "c"])).await;

    assert_eq!(report.results.len(), 3);
    assert_eq!(report.results.get(0), Some(&"200:a".to_string()));
    assert_eq!(report.results.get(1), Some(&"200:b".to_string()));
    assert_eq!(report.results.get(2), Some(&"200:c".to_string()));
    assert_eq!(report.summary.succeeded, 3);
    assert_eq!(report.summary.failed, 0);
    assert!(!report.deadline_exceeded);

    assert_eq!(transport.calls("a"), 1);
    assert_eq!(transport.calls("b"), 3);
    assert_eq!(transport.calls("c"), 1);

    let events = drain(&mut rx);
    let backoffs: Vec<_> = events
        .iter()
        .filter_map(|event| match event {
            DiagnosticEvent::RateLimited { url, wait, .. } if url == "b" => *wait,
            _ => None,
        })
        .collect();
    assert_eq!(
        backoffs,
        vec![Duration::from_secs(5), Duration::from_secs(10)]
    );
    assert_eq!(
        events.last(),
        Some(&DiagnosticEvent::BatchCompleted {
            total_urls: 3,
            succeeded: 3,
            failed: 0,
        })
    );
}

#[tokio::test(start_paused = true)]
async fn test_persistent_rate_limit_exhausts_budget() {
    let transport =
        Arc::new(StubTransport::new().with_script("x", vec![Reply::Status(429); 10]));
    let (orchestrator, mut rx) = orchestrator(transport.clone(), 2, quiet_policy(2));

    let report = orchestrator.run(&urls(&["x"])).await;

    assert_eq!(report.results.get(0), None);
    assert_eq!(report.summary.failed, 1);
    assert_eq!(
        report.settled[0].failure,
        Some(FailureReason::RateLimitExhausted)
    );
    assert_eq!(report.settled[0].state, RequestState::Failed);
    assert_eq!(transport.calls("x"), 2);

    let events = drain(&mut rx);
    let rate_limited = events
        .iter()
        .filter(|e| matches!(e, DiagnosticEvent::RateLimited { .. }))
        .count();
    assert_eq!(rate_limited, 2);
    assert!(events.contains(&DiagnosticEvent::Failed {
        url: "x".to_string(),
        reason: FailureReason::RateLimitExhausted,
    }));
}

#[tokio::test(start_paused = true)]
async fn test_one_rate_limit_costs_one_backoff() {
    let transport =
        Arc::new(StubTransport::new().with_script("a", vec![Reply::Status(429)]));
    let (orchestrator, _rx) = orchestrator(transport.clone(), 1, quiet_policy(3));

    let start = Instant::now();
    let report = orchestrator.run(&urls(&["a"])).await;
    let elapsed = start.elapsed();

    assert_eq!(report.summary.succeeded, 1);
    assert_eq!(transport.calls("a"), 2);
    assert!(elapsed >= Duration::from_secs(5));
    assert!(elapsed < Duration::from_secs(10));
}

#[tokio::test(start_paused = true)]
async fn test_concurrency_never_exceeds_capacity() {
    let transport =
        Arc::new(StubTransport::new().with_default_delay(Duration::from_millis(50)));
    let (orchestrator, _rx) = orchestrator(transport.clone(), 3, quiet_policy(3));

    let names: Vec<String> = (0..25).map(|i| format!("u{}", i)).collect();
    let report = orchestrator.run(&names).await;

    assert_eq!(report.summary.succeeded, 25);
    assert_eq!(transport.max_in_flight(), 3);
    assert_eq!(transport.in_flight(), 0);
    assert_eq!(orchestrator.limiter().in_use(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_concurrency_cap_holds_through_backoff() {
    let mut transport = StubTransport::new().with_default_delay(Duration::from_millis(20));
    for i in 0..10 {
        transport = transport.with_script(&format!("u{}", i), vec![Reply::Status(429)]);
    }
    let transport = Arc::new(transport);
    let (orchestrator, _rx) = orchestrator(transport.clone(), 2, quiet_policy(3));

    let names: Vec<String> = (0..10).map(|i| format!("u{}", i)).collect();
    let report = orchestrator.run(&names).await;

    assert_eq!(report.summary.succeeded, 10);
    assert!(transport.max_in_flight() <= 2);
}

#[tokio::test(start_paused = true)]
async fn test_results_keep_input_order() {
    // Earlier URLs take longer, so completion order is the reverse of input order
    let mut transport = StubTransport::new();
    let names: Vec<String> = (0..8).map(|i| format!("u{}", i)).collect();
    for (i, name) in names.iter().enumerate() {
        transport = transport.with_delay(name, Duration::from_millis(100 * (8 - i as u64)));
    }
    let (orchestrator, _rx) = orchestrator(Arc::new(transport), 8, quiet_policy(3));

    let report = orchestrator.run(&names).await;

    assert_eq!(report.results.len(), names.len());
    for (i, name) in names.iter().enumerate() {
        assert_eq!(report.results.get(i), Some(&format!("200:{}", name)));
        assert_eq!(&report.settled[i].url, name);
    }
}

#[tokio::test(start_paused = true)]
async fn test_transport_error_fails_without_retry() {
    let transport =
        Arc::new(StubTransport::new().with_script("down", vec![Reply::ConnectError]));
    let (orchestrator, mut rx) = orchestrator(transport.clone(), 2, quiet_policy(3));

    let report = orchestrator.run(&urls(&["up", "down", "up2"])).await;

    assert_eq!(transport.calls("down"), 1);
    assert_eq!(report.results.get(1), None);
    assert!(matches!(
        report.settled[1].failure,
        Some(FailureReason::Transport(_))
    ));
    assert_eq!(report.summary.succeeded, 2);
    assert_eq!(report.summary.failed, 1);

    let events = drain(&mut rx);
    assert!(!events
        .iter()
        .any(|e| matches!(e, DiagnosticEvent::RateLimited { .. })));
}

#[tokio::test(start_paused = true)]
async fn test_extraction_problems_drop_only_that_record() {
    let transport = Arc::new(StubTransport::new());
    let (orchestrator, _rx) = orchestrator(transport, 2, quiet_policy(3));

    let report = orchestrator
        .run(&urls(&["fine", "broken", "empty", "fine2"]))
        .await;

    assert_eq!(report.summary.succeeded, 4);
    assert_eq!(report.summary.failed, 0);
    assert_eq!(report.summary.dropped, 2);
    assert_eq!(report.summary.records(), 2);
    assert_eq!(
        report.results.into_records(),
        vec!["200:fine".to_string(), "200:fine2".to_string()]
    );
}

#[tokio::test(start_paused = true)]
async fn test_deadline_cancels_in_flight_requests() {
    let transport = Arc::new(
        StubTransport::new()
            .with_delay("slow", Duration::from_secs(25))
            .with_delay("fast", Duration::from_millis(10)),
    );
    let (orchestrator, mut rx) = orchestrator(transport.clone(), 2, quiet_policy(3));
    let orchestrator = orchestrator.with_deadline(Some(Duration::from_secs(10)));

    let start = Instant::now();
    let report = orchestrator.run(&urls(&["fast", "slow"])).await;

    assert!(start.elapsed() < Duration::from_secs(11));
    assert!(report.deadline_exceeded);
    assert_eq!(report.results.get(0), Some(&"200:fast".to_string()));
    assert_eq!(report.results.get(1), None);
    assert_eq!(
        report.settled[1].failure,
        Some(FailureReason::DeadlineExceeded)
    );
    assert_eq!(transport.in_flight(), 0);
    assert_eq!(orchestrator.limiter().in_use(), 0);

    assert!(drain(&mut rx).contains(&DiagnosticEvent::Failed {
        url: "slow".to_string(),
        reason: FailureReason::DeadlineExceeded,
    }));
}

#[tokio::test(start_paused = true)]
async fn test_deadline_not_hit() {
    let transport = Arc::new(StubTransport::new());
    let (orchestrator, _rx) = orchestrator(transport, 2, quiet_policy(3));
    let orchestrator = orchestrator.with_deadline(Some(Duration::from_secs(60)));

    let report = orchestrator.run(&urls(&["a", "b"])).await;

    assert!(!report.deadline_exceeded);
    assert_eq!(report.summary.succeeded, 2);
}

#[tokio::test(start_paused = true)]
async fn test_unrepresentable_deadline_means_no_deadline() {
    let transport = Arc::new(StubTransport::new().with_default_delay(Duration::from_millis(5)));
    let (orchestrator, _rx) = orchestrator(transport, 2, quiet_policy(3));
    let orchestrator = orchestrator.with_deadline(Some(Duration::MAX));

    let report = orchestrator.run(&urls(&["a", "b"])).await;

    assert!(!report.deadline_exceeded);
    assert_eq!(report.summary.succeeded, 2);
}

#[tokio::test(start_paused = true)]
async fn test_repeated_runs_are_identical() {
    let script = || {
        StubTransport::new()
            .with_script("b", vec![Reply::Status(429), Reply::Status(200)])
            .with_script("d", vec![Reply::ConnectError])
            .with_default_delay(Duration::from_millis(5))
    };
    let names = urls(&["a", "b", "c", "d"]);

    let (first, _rx1) = orchestrator(Arc::new(script()), 2, quiet_policy(3));
    let (second, _rx2) = orchestrator(Arc::new(script()), 2, quiet_policy(3));

    let first = first.run(&names).await;
    let second = second.run(&names).await;

    assert_eq!(first.results, second.results);
    assert_eq!(first.settled, second.settled);
    assert_eq!(first.summary, second.summary);
}

#[tokio::test(start_paused = true)]
async fn test_empty_batch() {
    let transport = Arc::new(StubTransport::new());
    let (orchestrator, mut rx) = orchestrator(transport, 2, quiet_policy(3));

    let report = orchestrator.run(&[]).await;

    assert!(report.results.is_empty());
    assert_eq!(report.summary.total_urls, 0);
    assert_eq!(
        drain(&mut rx),
        vec![DiagnosticEvent::BatchCompleted {
            total_urls: 0,
            succeeded: 0,
            failed: 0,
        }]
    );
}

#[tokio::test(start_paused = true)]
async fn test_identity_rotates_over_proxy_pool() {
    let transport = Arc::new(
        StubTransport::new().with_script("a", vec![Reply::Status(429), Reply::Status(429)]),
    );
    let proxies = vec![
        "http://10.0.0.1:3128".to_string(),
        "http://10.0.0.2:3128".to_string(),
    ];
    let identities = Arc::new(IdentityProvider::with_proxies(proxies.clone()));
    let orchestrator = Orchestrator::new(
        quiet_policy(3),
        2,
        identities,
        transport.clone(),
        crate::support::EchoExtractor,
    );

    let report = orchestrator.run(&urls(&["a", "b"])).await;

    assert_eq!(report.summary.succeeded, 2);
    let seen = transport.identities();
    assert_eq!(seen.len(), 4);
    for identity in seen {
        assert!(identity.user_agent.starts_with("Mozilla/5.0"));
        assert!(proxies.contains(identity.proxy.as_ref().unwrap()));
    }
}
