//! HTTP client for the metrics, logs, analytics and assistant endpoints.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{header::DATE, Client, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info};
use url::Url;

use crate::error::{ApiError, Result};
use crate::series::RangeSource;
use crate::time_sync::parse_timestamp;
use crate::types::{
    AnalyticsPeriod, ChatReply, LogEntry, LogFilters, LogHealth, LogQuery, LogSearchResponse,
    NlpQueryRequest, NlpQueryResponse, Period, RawMetricPoint,
};

/// Connectivity probes give up after this long and report offline.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base: Url,
}

/// Outcome of a `/healthz` probe.
#[derive(Debug, Clone, PartialEq)]
pub struct Probe {
    pub online: bool,
    pub server_time: Option<DateTime<Utc>>,
    pub local_time: DateTime<Utc>,
}

impl ApiClient {
    /// `tls_ca` is an extra PEM root to trust, for agents behind self-signed certs.
    pub fn new(base_url: &str, tls_ca: Option<&str>) -> Result<Self> {
        let mut base = Url::parse(base_url)?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let mut builder = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("sentinel/", env!("CARGO_PKG_VERSION")));
        if let Some(path) = tls_ca {
            let pem = std::fs::read(path).map_err(|e| ApiError::Tls(format!("{path}: {e}")))?;
            let cert = reqwest::Certificate::from_pem(&pem)
                .map_err(|e| ApiError::Tls(format!("{path}: {e}")))?;
            builder = builder.add_root_certificate(cert);
            info!(ca = path, "trusting extra root certificate");
        }
        Ok(Self {
            http: builder.build()?,
            base,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn url(&self, path: &str) -> Result<Url> {
        Ok(self.base.join(path.trim_start_matches('/'))?)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        debug!(path, ?query, "GET");
        let resp = self.http.get(self.url(path)?).query(query).send().await?;
        decode(path, resp).await
    }

    pub async fn metrics_range(&self, period: Period) -> Result<Vec<RawMetricPoint>> {
        self.get_json("/metrics/range", &[("period", period.to_string())])
            .await
    }

    pub async fn recent_logs(&self, limit: u32) -> Result<Vec<LogEntry>> {
        self.get_json("/logs/recent", &[("limit", limit.to_string())])
            .await
    }

    pub async fn search_logs(&self, q: &LogQuery) -> Result<LogSearchResponse> {
        let mut params = vec![("hours", q.hours.to_string()), ("size", q.size.to_string())];
        let optional = [("q", &q.q), ("level", &q.level), ("container", &q.container)];
        for (key, value) in optional {
            if let Some(v) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
                params.push((key, v.to_string()));
            }
        }
        self.get_json("/api/logs/search/quick", &params).await
    }

    pub async fn log_filters(&self) -> Result<LogFilters> {
        self.get_json("/api/logs/filters", &[]).await
    }

    pub async fn log_health(&self) -> Result<LogHealth> {
        self.get_json("/api/logs/health", &[]).await
    }

    pub async fn analytics_summary(&self, period: AnalyticsPeriod) -> Result<Value> {
        self.get_json("/analytics/summary", &[("period", period.as_str().into())])
            .await
    }

    pub async fn performance_report(&self, period: AnalyticsPeriod) -> Result<Value> {
        self.get_json(
            "/analytics/performance-report",
            &[("period", period.as_str().into())],
        )
        .await
    }

    pub async fn anomalies(&self, period: AnalyticsPeriod) -> Result<Vec<Value>> {
        let v: Value = self
            .get_json("/analytics/anomalies", &[("period", period.as_str().into())])
            .await?;
        Ok(anomaly_list(v))
    }

    pub async fn ask(&self, query: &str) -> Result<ChatReply> {
        let path = "/api/nlp/query";
        let resp = self
            .http
            .post(self.url(path)?)
            .json(&NlpQueryRequest { query })
            .send()
            .await?;
        let body: NlpQueryResponse = decode(path, resp).await?;
        body.into_reply().map_err(ApiError::Backend)
    }

    /// Reachability check with an explicit timeout. The `Date` header (or the body's
    /// `timestamp`) doubles as the server clock reading for drift reporting.
    pub async fn probe(&self) -> Probe {
        let local_time = Utc::now();
        let offline = Probe {
            online: false,
            server_time: None,
            local_time,
        };
        let Ok(url) = self.url("/healthz") else {
            return offline;
        };
        let resp = match tokio::time::timeout(PROBE_TIMEOUT, self.http.get(url).send()).await {
            Ok(Ok(r)) if r.status().is_success() => r,
            Ok(Ok(r)) => {
                debug!(status = r.status().as_u16(), "probe: unhealthy status");
                return offline;
            }
            Ok(Err(e)) => {
                debug!(error = %e, "probe failed");
                return offline;
            }
            Err(_) => {
                debug!("probe timed out");
                return offline;
            }
        };
        let header_time = resp
            .headers()
            .get(DATE)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| DateTime::parse_from_rfc2822(s).ok())
            .map(|d| d.with_timezone(&Utc));
        let server_time = match header_time {
            Some(t) => Some(t),
            None => resp
                .json::<Value>()
                .await
                .ok()
                .and_then(|v| v.get("timestamp").and_then(|t| t.as_str()).map(str::to_string))
                .and_then(|s| parse_timestamp(&s).ok()),
        };
        Probe {
            online: true,
            server_time,
            local_time,
        }
    }
}

impl RangeSource for ApiClient {
    async fn fetch_range(&self, period: Period) -> Result<Vec<RawMetricPoint>> {
        self.metrics_range(period).await
    }
}

async fn decode<T: DeserializeOwned>(path: &str, resp: Response) -> Result<T> {
    let status = resp.status();
    if !status.is_success() {
        return Err(ApiError::Status {
            status: status.as_u16(),
            path: path.to_string(),
        });
    }
    let body = resp.bytes().await?;
    serde_json::from_slice(&body).map_err(|source| ApiError::Parse {
        path: path.to_string(),
        source,
    })
}

/// The anomalies endpoint answers either a bare array or an object wrapping one.
pub fn anomaly_list(v: Value) -> Vec<Value> {
    match v {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("anomalies") {
            Some(Value::Array(items)) => items,
            _ if map.is_empty() => Vec::new(),
            _ => vec![Value::Object(map)],
        },
        Value::Null => Vec::new(),
        other => vec![other],
    }
}
