//! HTTP routes served to the sentinel client.

use std::time::Instant;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::analytics;
use crate::state::{AppState, LogSearch};
use crate::types::{
    analytics_hours, period_hours, LogFilters, LogRecord, LogSearchResult, MetricSample, NlpQuery,
    NlpResponse,
};

/// Handler failure rendered as `{ "detail": ... }` with a status code.
#[derive(Debug)]
pub struct ApiError(StatusCode, String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.0, Json(json!({ "detail": self.1 }))).into_response()
    }
}

fn bad_request(msg: impl Into<String>) -> ApiError {
    ApiError(StatusCode::BAD_REQUEST, msg.into())
}

type ApiResult<T> = Result<Json<T>, ApiError>;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/metrics/range", get(metrics_range))
        .route("/logs/recent", get(recent_logs))
        .route("/api/logs/search/quick", get(search_logs))
        .route("/api/logs/filters", get(log_filters))
        .route("/api/logs/health", get(log_health))
        .route("/analytics/summary", get(summary))
        .route("/analytics/performance-report", get(performance_report))
        .route("/analytics/anomalies", get(anomalies))
        .route("/api/nlp/query", post(nlp_query))
        .with_state(state)
}

async fn healthz() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339(),
        "service": "sentinel-agent",
    }))
}

#[derive(Debug, Deserialize)]
pub struct PeriodParams {
    period: Option<String>,
}

async fn metrics_range(
    State(state): State<AppState>,
    Query(p): Query<PeriodParams>,
) -> ApiResult<Vec<MetricSample>> {
    let period = p.period.unwrap_or_else(|| "1h".into());
    let hours =
        period_hours(&period).ok_or_else(|| bad_request("Invalid period. Use 1h, 6h, or 12h"))?;
    let points = state.store.read().await.range(hours, Utc::now());
    debug!(%period, points = points.len(), "metrics range");
    Ok(Json(points))
}

#[derive(Debug, Deserialize)]
pub struct RecentParams {
    limit: Option<usize>,
}

async fn recent_logs(
    State(state): State<AppState>,
    Query(p): Query<RecentParams>,
) -> Json<Vec<LogRecord>> {
    let limit = p.limit.unwrap_or(100).clamp(1, 1000);
    Json(state.store.read().await.recent_logs(limit))
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    q: Option<String>,
    hours: Option<i64>,
    level: Option<String>,
    container: Option<String>,
    size: Option<usize>,
}

fn non_blank(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

async fn search_logs(
    State(state): State<AppState>,
    Query(p): Query<SearchParams>,
) -> ApiResult<LogSearchResult> {
    let started = Instant::now();
    let criteria = LogSearch {
        q: non_blank(p.q),
        level: non_blank(p.level),
        container: non_blank(p.container),
        hours: p.hours.unwrap_or(24).clamp(1, 24 * 30),
        size: p.size.unwrap_or(50).clamp(1, 500),
    };
    let (total, documents) = state.store.read().await.search(&criteria, Utc::now());
    Ok(Json(LogSearchResult {
        total,
        documents,
        took: started.elapsed().as_millis() as u64,
        fallback: false,
    }))
}

async fn log_filters(State(state): State<AppState>) -> Json<LogFilters> {
    Json(state.store.read().await.filters())
}

async fn log_health(State(state): State<AppState>) -> Json<Value> {
    let store = state.store.read().await;
    let count = store.logs().count();
    let status = if count > 0 { "healthy" } else { "degraded" };
    Json(json!({
        "status": status,
        "message": format!("{count} lines buffered"),
        "uptime_secs": (Utc::now() - state.started).num_seconds(),
    }))
}

/// Samples and logs inside an analytics period.
async fn window(
    state: &AppState,
    period: &str,
) -> Result<(Vec<MetricSample>, Vec<LogRecord>), ApiError> {
    let hours = analytics_hours(period)
        .ok_or_else(|| bad_request("Invalid period. Use 1h, 6h, 12h, 24h, 7d or 30d"))?;
    let now = Utc::now();
    let store = state.store.read().await;
    let from = now - chrono::Duration::hours(hours);
    let logs = store.logs().filter(|l| l.timestamp >= from).cloned().collect();
    Ok((store.range(hours, now), logs))
}

fn analytics_period(p: PeriodParams) -> String {
    p.period.unwrap_or_else(|| "24h".into())
}

async fn summary(State(state): State<AppState>, Query(p): Query<PeriodParams>) -> ApiResult<Value> {
    let period = analytics_period(p);
    let (samples, logs) = window(&state, &period).await?;
    Ok(Json(analytics::summary(&samples, &logs, &period, Utc::now())))
}

async fn performance_report(
    State(state): State<AppState>,
    Query(p): Query<PeriodParams>,
) -> ApiResult<Value> {
    let period = analytics_period(p);
    let (samples, _) = window(&state, &period).await?;
    Ok(Json(analytics::performance_report(&samples, &period, Utc::now())))
}

async fn anomalies(
    State(state): State<AppState>,
    Query(p): Query<PeriodParams>,
) -> ApiResult<Value> {
    let period = analytics_period(p);
    let (samples, _) = window(&state, &period).await?;
    let found = analytics::anomalies(&samples);
    Ok(Json(json!({
        "period": period,
        "total": found.len(),
        "anomalies": found,
    })))
}

async fn nlp_query(State(state): State<AppState>, Json(q): Json<NlpQuery>) -> Json<NlpResponse> {
    let started = Instant::now();
    if q.query.trim().is_empty() {
        return Json(NlpResponse {
            success: false,
            result: None,
            processing_time_ms: 0.0,
            error: Some("query must not be empty".into()),
        });
    }
    let samples: Vec<MetricSample> = state.store.read().await.samples().cloned().collect();
    let result = analytics::answer(&q.query, &samples);
    Json(NlpResponse {
        success: true,
        result: Some(result),
        processing_time_ms: started.elapsed().as_secs_f64() * 1000.0,
        error: None,
    })
}
