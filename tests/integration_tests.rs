//! Integration tests using wiremock to simulate HTTP servers.

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};
use std::time::{Duration, Instant};
use tenax::{
    ApiConfig, AuthScheme, CancellationToken, Client, Error, OutboundRequest, RawResponse,
    Transport,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct TestData {
    id: u32,
    name: String,
}

static TRACING: Once = Once::new();

/// Opt-in log output for debugging: `RUST_LOG=tenax=debug cargo test -- --nocapture`.
fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

fn test_config(base_url: &str) -> ApiConfig {
    init_tracing();
    ApiConfig::builder()
        .base_url(base_url)
        .api_version("v1")
        .max_retries(2)
        .retry_delay(Duration::from_millis(100))
        .enable_logging(false)
        .build()
        .unwrap()
}

fn client_for(base_url: &str) -> Client {
    Client::new(test_config(base_url)).unwrap()
}

#[derive(Debug, Deserialize, PartialEq)]
struct Health {
    ok: bool,
}

#[tokio::test]
async fn get_health_returns_typed_envelope() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/health"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "data": { "ok": true }
            })),
        )
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server.uri());
    let cancel = CancellationToken::new();

    let envelope = client.get::<Health>("health", None, &cancel).await.unwrap();

    assert!(envelope.success);
    assert_eq!(envelope.data, Some(Health { ok: true }));
    assert_eq!(envelope.status_code, 200);
    assert_eq!(envelope.request_id.len(), 8);
}

#[tokio::test]
async fn wire_status_code_overrides_the_bodys_claim() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/item"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "data": { "id": 1, "name": "x" },
                "statusCode": 999
            })),
        )
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server.uri());
    let cancel = CancellationToken::new();

    let envelope = client
        .get::<TestData>("item", None, &cancel)
        .await
        .unwrap();
    assert_eq!(envelope.status_code, 200);
}

#[tokio::test]
async fn bare_payload_is_wrapped_in_a_success_envelope() {
    let mock_server = MockServer::start().await;

    let payload = TestData {
        id: 7,
        name: "bare".to_string(),
    };

    Mock::given(method("GET"))
        .and(path("/v1/item"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&payload))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server.uri());
    let cancel = CancellationToken::new();

    let envelope = client
        .get::<TestData>("item", None, &cancel)
        .await
        .unwrap();
    assert!(envelope.success);
    assert_eq!(envelope.data, Some(payload));
    assert_eq!(envelope.status_code, 200);
}

#[tokio::test]
async fn always_failing_server_yields_n_plus_1_attempts_and_failed_envelope() {
    let mock_server = MockServer::start().await;
    let attempt_count = Arc::new(AtomicUsize::new(0));
    let attempt_count_clone = attempt_count.clone();

    Mock::given(method("GET"))
        .and(path("/v1/flaky"))
        .respond_with(move |_req: &wiremock::Request| {
            attempt_count_clone.fetch_add(1, Ordering::SeqCst);
            ResponseTemplate::new(503).set_body_string("unavailable")
        })
        .mount(&mock_server)
        .await;

    let mut config = test_config(&mock_server.uri());
    config.enable_metrics = true;
    let client = Client::new(config).unwrap();
    let mut completed = client.on_request_completed();
    let cancel = CancellationToken::new();

    let start = Instant::now();
    let envelope = client
        .get::<TestData>("flaky", None, &cancel)
        .await
        .unwrap();
    let elapsed = start.elapsed();

    // max_retries = 2 means 3 attempts in total.
    assert_eq!(attempt_count.load(Ordering::SeqCst), 3);
    assert!(!envelope.success);
    assert_eq!(envelope.status_code, 503);
    assert!(envelope.message.is_some());

    // Linear backoff: 100ms * 1 + 100ms * 2 = 300ms of sleeping.
    assert!(
        elapsed >= Duration::from_millis(300),
        "expected at least 300ms of backoff, got {elapsed:?}"
    );

    let metrics = completed.recv().await.unwrap();
    assert_eq!(metrics.retry_count, 2);
    assert!(!metrics.success);
    assert_eq!(metrics.status_code, 503);
}

#[tokio::test]
async fn succeeds_on_a_later_attempt() {
    let mock_server = MockServer::start().await;
    let attempt_count = Arc::new(AtomicUsize::new(0));
    let attempt_count_clone = attempt_count.clone();

    Mock::given(method("GET"))
        .and(path("/v1/flaky"))
        .respond_with(move |_req: &wiremock::Request| {
            let count = attempt_count_clone.fetch_add(1, Ordering::SeqCst);
            if count < 2 {
                ResponseTemplate::new(500).set_body_string("server error")
            } else {
                ResponseTemplate::new(200).set_body_json(json!({
                    "success": true,
                    "data": { "id": 1, "name": "ok" }
                }))
            }
        })
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server.uri());
    let cancel = CancellationToken::new();

    let envelope = client
        .get::<TestData>("flaky", None, &cancel)
        .await
        .unwrap();

    assert_eq!(attempt_count.load(Ordering::SeqCst), 3);
    assert!(envelope.success);
    assert_eq!(envelope.status_code, 200);
}

#[tokio::test]
async fn cancellation_during_backoff_prevents_the_next_attempt() {
    let mock_server = MockServer::start().await;
    let attempt_count = Arc::new(AtomicUsize::new(0));
    let attempt_count_clone = attempt_count.clone();

    Mock::given(method("GET"))
        .and(path("/v1/flaky"))
        .respond_with(move |_req: &wiremock::Request| {
            attempt_count_clone.fetch_add(1, Ordering::SeqCst);
            ResponseTemplate::new(503).set_body_string("unavailable")
        })
        .mount(&mock_server)
        .await;

    let config = ApiConfig::builder()
        .base_url(mock_server.uri())
        .api_version("v1")
        .max_retries(3)
        .retry_delay(Duration::from_millis(500))
        .enable_logging(false)
        .build()
        .unwrap();
    let client = Client::new(config).unwrap();

    let cancel = CancellationToken::new();
    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        cancel_clone.cancel();
    });

    let start = Instant::now();
    let result = client.get::<TestData>("flaky", None, &cancel).await;

    assert!(matches!(result, Err(Error::Cancelled)));
    // Cancelled mid-backoff: only the first attempt was issued.
    assert_eq!(attempt_count.load(Ordering::SeqCst), 1);
    assert!(start.elapsed() < Duration::from_millis(500));
}

#[tokio::test]
async fn bearer_auth_applies_to_next_request_and_clears() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server.uri());
    let cancel = CancellationToken::new();

    client.set_authentication("tok", AuthScheme::Bearer);
    let _ = client
        .get::<serde_json::Value>("me", None, &cancel)
        .await
        .unwrap();

    client.clear_authentication();
    let _ = client
        .get::<serde_json::Value>("me", None, &cancel)
        .await
        .unwrap();

    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    assert_eq!(
        requests[0].headers.get("authorization").unwrap(),
        "Bearer tok"
    );
    assert!(requests[1].headers.get("authorization").is_none());
}

#[tokio::test]
async fn per_call_headers_override_client_defaults_on_the_wire() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/echo"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server.uri());
    client.add_default_header("X-Env", "dev").unwrap();
    let cancel = CancellationToken::new();

    let mut per_call = http::HeaderMap::new();
    per_call.insert("x-env", http::HeaderValue::from_static("prod"));

    let _ = client
        .get::<serde_json::Value>("echo", Some(per_call), &cancel)
        .await
        .unwrap();

    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests[0].headers.get("x-env").unwrap(), "prod");
    assert_eq!(requests[0].headers.get("accept").unwrap(), "application/json");
    assert!(requests[0].headers.get("user-agent").is_some());
}

#[tokio::test]
async fn metrics_event_fires_once_per_logical_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .mount(&mock_server)
        .await;

    let mut config = test_config(&mock_server.uri());
    config.enable_metrics = true;
    let client = Client::new(config).unwrap();
    let mut completed = client.on_request_completed();
    let cancel = CancellationToken::new();

    let _ = client
        .get::<serde_json::Value>("health", None, &cancel)
        .await
        .unwrap();

    let metrics = completed.recv().await.unwrap();
    assert!(metrics.success);
    assert_eq!(metrics.status_code, 200);
    assert_eq!(metrics.retry_count, 0);
    assert_eq!(metrics.method, http::Method::GET);
    assert!(metrics.url.ends_with("/v1/health"));

    // Exactly one event for one logical request.
    assert!(matches!(
        completed.try_recv(),
        Err(tokio::sync::broadcast::error::TryRecvError::Empty)
    ));
}

#[tokio::test]
async fn metrics_are_skipped_when_disabled() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .mount(&mock_server)
        .await;

    // Metrics are off by default.
    let client = client_for(&mock_server.uri());
    let mut completed = client.on_request_completed();
    let cancel = CancellationToken::new();

    let _ = client
        .get::<serde_json::Value>("health", None, &cancel)
        .await
        .unwrap();

    assert!(matches!(
        completed.try_recv(),
        Err(tokio::sync::broadcast::error::TryRecvError::Empty)
    ));
}

#[tokio::test]
async fn failure_event_carries_the_final_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
        .mount(&mock_server)
        .await;

    let config = ApiConfig::builder()
        .base_url(mock_server.uri())
        .api_version("v1")
        .max_retries(0)
        .enable_logging(false)
        .build()
        .unwrap();
    let client = Client::new(config).unwrap();
    let mut failed = client.on_request_failed();
    let cancel = CancellationToken::new();

    let envelope = client
        .get::<TestData>("missing", None, &cancel)
        .await
        .unwrap();

    assert!(!envelope.success);
    assert_eq!(envelope.status_code, 404);

    let event = failed.recv().await.unwrap();
    assert_eq!(event.status_code, 404);
    assert!(event.message.contains("404"));
}

#[tokio::test]
async fn download_returns_raw_bytes() {
    let mock_server = MockServer::start().await;

    let blob: Vec<u8> = vec![0x00, 0xFF, 0x42, 0x13, 0x37];
    Mock::given(method("GET"))
        .and(path("/v1/blob"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(blob.clone()))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server.uri());
    let cancel = CancellationToken::new();

    let bytes = client.download("blob", None, &cancel).await.unwrap();
    assert_eq!(bytes.as_ref(), blob.as_slice());
}

#[tokio::test]
async fn download_errors_propagate_instead_of_enveloping() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/blob"))
        .respond_with(ResponseTemplate::new(404).set_body_string("gone"))
        .mount(&mock_server)
        .await;

    let config = ApiConfig::builder()
        .base_url(mock_server.uri())
        .api_version("v1")
        .max_retries(0)
        .enable_logging(false)
        .build()
        .unwrap();
    let client = Client::new(config).unwrap();
    let cancel = CancellationToken::new();

    match client.download("blob", None, &cancel).await {
        Err(Error::Http { status, .. }) => assert_eq!(status.as_u16(), 404),
        other => panic!("expected Http error, got {other:?}"),
    }
}

#[tokio::test]
async fn upload_sends_a_multipart_file() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/files"))
        .respond_with(ResponseTemplate::new(200).set_body_string("uploaded"))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server.uri());
    let cancel = CancellationToken::new();

    let envelope = client
        .upload("files", b"file-bytes", "report.bin", None, None, &cancel)
        .await
        .unwrap();

    assert!(envelope.success);
    assert_eq!(envelope.data.as_deref(), Some("uploaded"));

    let requests = mock_server.received_requests().await.unwrap();
    let content_type = requests[0]
        .headers
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap();
    assert!(content_type.starts_with("multipart/form-data; boundary="));

    let body = String::from_utf8_lossy(&requests[0].body);
    assert!(body.contains("filename=\"report.bin\""));
    assert!(body.contains("application/octet-stream"));
    assert!(body.contains("file-bytes"));
}

#[tokio::test]
async fn get_text_returns_the_body_verbatim() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/motd"))
        .respond_with(ResponseTemplate::new(200).set_body_string("hello, not json"))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server.uri());
    let cancel = CancellationToken::new();

    let envelope = client.get_text("motd", None, &cancel).await.unwrap();
    assert!(envelope.success);
    assert_eq!(envelope.data.as_deref(), Some("hello, not json"));
}

#[tokio::test]
async fn empty_endpoint_resolves_to_the_versioned_base() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server.uri());
    let cancel = CancellationToken::new();

    let envelope = client
        .get::<serde_json::Value>("", None, &cancel)
        .await
        .unwrap();
    assert!(envelope.success);
}

struct FailingTransport {
    attempts: AtomicUsize,
}

#[async_trait::async_trait]
impl Transport for FailingTransport {
    async fn send(&self, _request: OutboundRequest) -> tenax::Result<RawResponse> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(Error::Transport {
            message: "connection refused".to_string(),
        })
    }
}

#[tokio::test]
async fn transport_failures_use_the_sentinel_status() {
    let transport = Arc::new(FailingTransport {
        attempts: AtomicUsize::new(0),
    });

    let config = ApiConfig::builder()
        .base_url("https://unreachable.example.com")
        .api_version("v1")
        .max_retries(1)
        .retry_delay(Duration::from_millis(100))
        .enable_logging(false)
        .build()
        .unwrap();
    let client =
        Client::with_transport(config, Arc::clone(&transport) as Arc<dyn Transport>).unwrap();
    let cancel = CancellationToken::new();

    let envelope = client
        .get::<TestData>("anything", None, &cancel)
        .await
        .unwrap();

    assert_eq!(transport.attempts.load(Ordering::SeqCst), 2);
    assert!(!envelope.success);
    assert_eq!(envelope.status_code, 500);
}

#[tokio::test]
async fn config_swap_affects_only_later_requests() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v2/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server.uri());
    let cancel = CancellationToken::new();

    let mut swapped = test_config(&mock_server.uri());
    swapped.api_version = "v2".to_string();
    client.update_configuration(swapped).unwrap();

    let envelope = client
        .get::<serde_json::Value>("health", None, &cancel)
        .await
        .unwrap();
    assert!(envelope.success);

    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests[0].url.path(), "/v2/health");
}
