//! End-to-end behavior of the resilient client against mock services.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use reqwest::header::{HeaderValue, AUTHORIZATION};
use resilient_client::config::ClientConfig;
use resilient_client::{BreakerConfig, CircuitState, RequestBody, RequestOptions};

mod common;

use common::{fast_client_config, metric, SERVICE};

fn breaker(fail_max: u32, reset_timeout: Duration) -> BreakerConfig {
    BreakerConfig { fail_max, reset_timeout }
}

#[tokio::test]
async fn test_success_returns_raw_response() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = seen.clone();
    let addr = common::start_programmable_backend(move |request| {
        log.lock().unwrap().push(request);
        async { (200, "hello".to_string()) }
    })
    .await;

    let (registry, sink) = common::registry(addr, BreakerConfig::default(), fast_client_config());
    let client = registry.client(SERVICE).unwrap();

    let options = RequestOptions::new()
        .header(AUTHORIZATION, HeaderValue::from_static("Token 0x123"))
        .query("user", "42");
    let response = client.get(options).await.expect("service should answer");

    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "hello");
    assert!(sink.names().is_empty());

    let request = seen.lock().unwrap()[0].to_lowercase();
    assert!(request.starts_with("get /recommendations?user=42 "));
    assert!(request.contains("authorization: token 0x123"));
    assert!(request.contains("x-request-id: "));
}

#[tokio::test]
async fn test_five_connection_errors_open_the_breaker() {
    let (registry, sink) = common::registry(
        common::refused_addr(),
        breaker(5, Duration::from_secs(30)),
        fast_client_config(),
    );
    let client = registry.client(SERVICE).unwrap();

    for _ in 0..5 {
        assert!(client.get(RequestOptions::new()).await.is_none());
    }
    assert_eq!(sink.count(&metric("connection_error")), 5);
    assert_eq!(client.breaker().unwrap().state(), CircuitState::Open);

    assert!(client.get(RequestOptions::new()).await.is_none());
    assert_eq!(sink.last(), Some(metric("breaker_open")));
    assert_eq!(sink.count(&metric("connection_error")), 5);
}

#[tokio::test]
async fn test_open_breaker_makes_no_network_attempt() {
    let (addr, attempts) = common::start_silent_backend().await;
    let (registry, sink) =
        common::registry(addr, breaker(2, Duration::from_secs(30)), fast_client_config());
    let client = registry.client(SERVICE).unwrap().with_timeout(Duration::from_millis(100));

    client.get(RequestOptions::new()).await;
    client.get(RequestOptions::new()).await;
    assert_eq!(attempts.load(Ordering::SeqCst), 2);

    for _ in 0..3 {
        assert!(client.get(RequestOptions::new()).await.is_none());
    }
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
    assert_eq!(sink.count(&metric("timeout")), 2);
    assert_eq!(sink.count(&metric("breaker_open")), 3);
}

#[tokio::test]
async fn test_retries_timeouts_and_reports_one_failure() {
    let (addr, attempts) = common::start_silent_backend().await;
    let (registry, sink) =
        common::registry(addr, breaker(5, Duration::from_secs(30)), fast_client_config());
    let client = registry
        .client(SERVICE)
        .unwrap()
        .with_timeout(Duration::from_millis(100))
        .with_max_retries(3);

    assert!(client.get(RequestOptions::new()).await.is_none());

    assert_eq!(attempts.load(Ordering::SeqCst), 4);
    assert_eq!(sink.names(), vec![metric("timeout")]);
    assert_eq!(client.breaker().unwrap().failure_count(), 1);
}

#[tokio::test]
async fn test_dropped_connections_are_retried_as_connection_errors() {
    let (addr, attempts) = common::start_hangup_backend().await;
    let (registry, sink) =
        common::registry(addr, breaker(5, Duration::from_secs(30)), fast_client_config());
    let client = registry.client(SERVICE).unwrap().with_max_retries(2);

    assert!(client.get(RequestOptions::new()).await.is_none());

    assert_eq!(attempts.load(Ordering::SeqCst), 3);
    assert_eq!(sink.names(), vec![metric("connection_error")]);
    assert_eq!(client.breaker().unwrap().failure_count(), 1);
}

#[tokio::test]
async fn test_default_timeout_applies_without_explicit_one() {
    let (addr, _) = common::start_silent_backend().await;
    let (registry, sink) = common::registry(addr, BreakerConfig::default(), fast_client_config());
    let client = registry.client(SERVICE).unwrap();
    assert_eq!(client.timeout(), Duration::from_millis(200));

    let start = Instant::now();
    assert!(client.get(RequestOptions::new()).await.is_none());
    let elapsed = start.elapsed();

    assert!(elapsed >= Duration::from_millis(200), "returned after {elapsed:?}");
    assert!(elapsed < Duration::from_secs(1), "returned after {elapsed:?}");
    assert_eq!(sink.names(), vec![metric("timeout")]);
}

#[tokio::test]
async fn test_explicit_timeout_overrides_default() {
    let (addr, _) = common::start_silent_backend().await;
    let (registry, _) = common::registry(addr, BreakerConfig::default(), fast_client_config());
    let client = registry.client(SERVICE).unwrap().with_timeout(Duration::from_secs(10));

    let start = Instant::now();
    let response = client
        .get(RequestOptions::new().timeout(Duration::from_millis(100)))
        .await;

    assert!(response.is_none());
    assert!(start.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_breaker_closes_after_cooldown_and_successful_trial() {
    let healthy = Arc::new(AtomicBool::new(false));
    let flag = healthy.clone();
    let addr = common::start_programmable_backend(move |_| {
        let up = flag.load(Ordering::SeqCst);
        async move {
            if up {
                (200, "ok".to_string())
            } else {
                (503, "down".to_string())
            }
        }
    })
    .await;

    let client_config = ClientConfig {
        trip_on_server_error: true,
        ..fast_client_config()
    };
    let (registry, sink) =
        common::registry(addr, breaker(2, Duration::from_millis(200)), client_config);
    let client = registry.client(SERVICE).unwrap();

    assert!(client.get(RequestOptions::new()).await.is_none());
    assert!(client.get(RequestOptions::new()).await.is_none());
    assert_eq!(sink.count(&metric("error")), 2);
    assert_eq!(client.breaker().unwrap().state(), CircuitState::Open);

    healthy.store(true, Ordering::SeqCst);
    assert!(client.get(RequestOptions::new()).await.is_none());
    assert_eq!(sink.last(), Some(metric("breaker_open")));

    tokio::time::sleep(Duration::from_millis(250)).await;
    let response = client.get(RequestOptions::new()).await.expect("trial call should pass");

    assert_eq!(response.status(), 200);
    let breaker = client.breaker().unwrap();
    assert_eq!(breaker.state(), CircuitState::Closed);
    assert_eq!(breaker.failure_count(), 0);
}

#[tokio::test]
async fn test_server_errors_pass_through_by_default() {
    let addr = common::start_programmable_backend(|_| async { (503, "busy".to_string()) }).await;
    let (registry, sink) =
        common::registry(addr, breaker(1, Duration::from_secs(30)), fast_client_config());
    let client = registry.client(SERVICE).unwrap();

    for _ in 0..3 {
        let response = client.get(RequestOptions::new()).await.unwrap();
        assert_eq!(response.status(), 503);
    }
    assert_eq!(client.breaker().unwrap().state(), CircuitState::Closed);
    assert!(sink.names().is_empty());
}

#[tokio::test]
async fn test_post_and_delete_reach_the_base_url() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = seen.clone();
    let addr = common::start_programmable_backend(move |request| {
        log.lock().unwrap().push(request);
        async { (200, String::new()) }
    })
    .await;

    let (registry, _) = common::registry(addr, BreakerConfig::default(), fast_client_config());
    let client = registry.client(SERVICE).unwrap();

    let body = RequestBody::Json(serde_json::json!({ "circuit_breakers": true }));
    assert!(client.post(Some(body), RequestOptions::new()).await.is_some());
    assert!(client.delete(RequestOptions::new()).await.is_some());

    let requests = seen.lock().unwrap().clone();
    assert!(requests[0].starts_with("POST /recommendations "));
    assert!(requests[0].to_lowercase().contains("content-type: application/json"));
    assert!(requests[0].ends_with(r#"{"circuit_breakers":true}"#));
    assert!(requests[1].starts_with("DELETE /recommendations "));
}

#[tokio::test]
async fn test_disabled_breakers_never_reject() {
    let client_config = ClientConfig {
        circuit_breakers: false,
        ..fast_client_config()
    };
    let (registry, sink) = common::registry(
        common::refused_addr(),
        breaker(1, Duration::from_secs(30)),
        client_config,
    );
    let client = registry.client(SERVICE).unwrap();

    for _ in 0..4 {
        assert!(client.get(RequestOptions::new()).await.is_none());
    }
    assert_eq!(sink.count(&metric("connection_error")), 4);
    assert_eq!(sink.count(&metric("breaker_open")), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_clients_share_one_breaker() {
    let (registry, sink) = common::registry(
        common::refused_addr(),
        breaker(5, Duration::from_secs(30)),
        fast_client_config(),
    );
    let registry = Arc::new(registry);

    let calls: Vec<_> = (0..20)
        .map(|_| {
            let registry = registry.clone();
            tokio::spawn(async move {
                let client = registry.client(SERVICE).unwrap();
                client.get(RequestOptions::new()).await.is_none()
            })
        })
        .collect();

    for result in futures_util::future::join_all(calls).await {
        assert!(result.unwrap());
    }

    assert_eq!(registry.breaker(SERVICE).unwrap().state(), CircuitState::Open);
    let failures = sink.count(&metric("connection_error"));
    assert!(failures >= 5, "only {failures} connection errors recorded");
    assert_eq!(failures + sink.count(&metric("breaker_open")), 20);
}

#[tokio::test]
async fn test_failing_service_does_not_affect_others() {
    let healthy_addr =
        common::start_programmable_backend(|_| async { (200, "ok".to_string()) }).await;
    let (registry, sink) = common::registry(
        common::refused_addr(),
        breaker(1, Duration::from_secs(30)),
        fast_client_config(),
    );
    let registry = registry
        .with_service(
            "popular",
            &format!("http://{}/popular_items", healthy_addr),
            breaker(1, Duration::from_secs(30)),
        )
        .unwrap();

    let failing = registry.client(SERVICE).unwrap();
    let popular = registry.client("popular").unwrap();

    assert!(failing.get(RequestOptions::new()).await.is_none());
    assert!(failing.get(RequestOptions::new()).await.is_none());
    assert_eq!(sink.last(), Some(metric("breaker_open")));

    assert!(popular.get(RequestOptions::new()).await.is_some());
    assert_eq!(popular.breaker().unwrap().state(), CircuitState::Closed);
}
