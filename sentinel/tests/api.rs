//! HTTP client and metric service behavior against a mock backend.

use sentinel::api::ApiClient;
use sentinel::error::ApiError;
use sentinel::series::{CacheTtl, MetricKind, MetricService};
use sentinel::types::{AnalyticsPeriod, LogQuery, Period};
use serde_json::json;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> ApiClient {
    ApiClient::new(&server.uri(), None).unwrap()
}

#[tokio::test]
async fn metrics_range_passes_period_and_decodes_nulls() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/metrics/range"))
        .and(query_param("period", "6h"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"timestamp": "2024-05-01T10:00:00", "cpu_usage": 10.0, "memory_usage": null},
            {"timestamp": "2024-05-01T10:01:00Z", "cpu_usage": 12.5, "memory_usage": 40.0}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let raw = client(&server).metrics_range(Period::SixHours).await.unwrap();
    assert_eq!(raw.len(), 2);
    assert_eq!(raw[0].memory_usage, None);
    assert_eq!(raw[1].cpu_usage, Some(12.5));
}

#[tokio::test]
async fn server_error_fails_the_service_and_leaves_no_cache() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/metrics/range"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let api = client(&server);
    let mut svc = MetricService::new(MetricKind::Cpu, CacheTtl::default());
    let err = svc.load(&api, Period::OneHour).await.unwrap_err();
    assert!(matches!(err, ApiError::Status { status: 500, .. }), "{err:?}");
    assert!(svc.cached(Period::OneHour).is_none());
}

#[tokio::test]
async fn service_caches_successful_loads() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/metrics/range"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"timestamp": "2024-05-01T10:01:00Z", "disk_usage": 71.0},
            {"timestamp": "2024-05-01T10:00:00Z", "disk_usage": 70.0}
        ])))
        // second load must come from the cache
        .expect(1)
        .mount(&server)
        .await;

    let api = client(&server);
    let mut svc = MetricService::new(MetricKind::Disk, CacheTtl::default());
    let first = svc.load(&api, Period::TwelveHours).await.unwrap();
    let second = svc.load(&api, Period::TwelveHours).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first[0].usage, 70.0);
    assert_eq!(first[1].formatted_usage, "71.0%");
}

#[tokio::test]
async fn malformed_body_is_a_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/logs/recent"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    let err = client(&server).recent_logs(10).await.unwrap_err();
    assert!(matches!(err, ApiError::Parse { ref path, .. } if path == "/logs/recent"));
}

#[tokio::test]
async fn quick_search_sends_only_non_empty_filters() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/logs/search/quick"))
        .and(query_param("q", "timeout"))
        .and(query_param("level", "ERROR"))
        .and(query_param("hours", "24"))
        .and(query_param("size", "50"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total": 1,
            "documents": [{
                "timestamp": "2024-05-01T10:00:00Z",
                "message": "db timeout",
                "level": "ERROR"
            }],
            "took": 4,
            "fallback": true
        })))
        .mount(&server)
        .await;

    let q = LogQuery {
        q: Some("timeout".into()),
        level: Some("ERROR".into()),
        container: Some("   ".into()),
        ..LogQuery::default()
    };
    let r = client(&server).search_logs(&q).await.unwrap();
    assert_eq!(r.total, 1);
    assert!(r.fallback);
    assert_eq!(r.documents[0].log_level.as_deref(), Some("ERROR"));

    let received = server.received_requests().await.unwrap();
    assert!(!received[0].url.query().unwrap_or("").contains("container"));
}

#[tokio::test]
async fn anomalies_accept_wrapped_list() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/analytics/anomalies"))
        .and(query_param("period", "7d"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "anomalies": [{"type": "cpu_spike"}, {"type": "disk_spike"}],
            "total": 2
        })))
        .mount(&server)
        .await;

    let list = client(&server).anomalies(AnalyticsPeriod::Week).await.unwrap();
    assert_eq!(list.len(), 2);
}

#[tokio::test]
async fn ask_posts_query_and_extracts_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/nlp/query"))
        .and(body_json(json!({"query": "cpu?"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "result": {"response": "CPU is fine."},
            "processing_time_ms": 12.0
        })))
        .mount(&server)
        .await;

    let reply = client(&server).ask("cpu?").await.unwrap();
    assert_eq!(reply.text, "CPU is fine.");
    assert_eq!(reply.processing_time_ms, Some(12.0));
}

#[tokio::test]
async fn ask_surfaces_backend_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/nlp/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": false,
            "error": "model unavailable"
        })))
        .mount(&server)
        .await;

    let err = client(&server).ask("hi").await.unwrap_err();
    assert!(matches!(err, ApiError::Backend(ref m) if m == "model unavailable"));
}

#[tokio::test]
async fn probe_reads_server_clock() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/healthz"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Date", "Wed, 01 May 2024 12:00:00 GMT")
                .set_body_json(json!({"status": "ok"})),
        )
        .mount(&server)
        .await;

    let p = client(&server).probe().await;
    assert!(p.online);
    assert_eq!(
        p.server_time.unwrap().to_rfc3339(),
        "2024-05-01T12:00:00+00:00"
    );
}

#[tokio::test]
async fn probe_reports_offline_on_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/healthz"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let p = client(&server).probe().await;
    assert!(!p.online);
    assert!(p.server_time.is_none());
}
