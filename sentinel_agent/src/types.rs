//! Wire types served by the agent. Field names match what the sentinel client decodes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One sample across all metrics. Rates are bytes per second.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    pub timestamp: DateTime<Utc>,
    pub cpu_usage: f64,
    pub memory_usage: f64,
    pub disk_usage: f64,
    pub network_rx: f64,
    pub network_tx: f64,
    // unknown off Linux
    pub tcp_connections: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub container: String,
    pub host: String,
    pub environment: String,
    pub log_level: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogSearchResult {
    pub total: usize,
    pub documents: Vec<LogRecord>,
    pub took: u64,
    pub fallback: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LogFilters {
    pub containers: Vec<String>,
    pub hosts: Vec<String>,
    pub environments: Vec<String>,
    pub log_levels: Vec<String>,
    pub severities: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NlpQuery {
    pub query: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NlpResponse {
    pub success: bool,
    pub result: Option<serde_json::Value>,
    pub processing_time_ms: f64,
    pub error: Option<String>,
}

/// Metric range periods.
pub fn period_hours(period: &str) -> Option<i64> {
    match period {
        "1h" => Some(1),
        "6h" => Some(6),
        "12h" => Some(12),
        _ => None,
    }
}

/// Analytics periods; the ring buffer only holds 12h, longer windows cover what exists.
pub fn analytics_hours(period: &str) -> Option<i64> {
    match period {
        "24h" | "1d" => Some(24),
        "7d" => Some(24 * 7),
        "30d" => Some(24 * 30),
        other => period_hours(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn periods() {
        assert_eq!(period_hours("6h"), Some(6));
        assert_eq!(period_hours("24h"), None);
        assert_eq!(analytics_hours("24h"), Some(24));
        assert_eq!(analytics_hours("7d"), Some(168));
        assert_eq!(analytics_hours("1w"), None);
    }

    #[test]
    fn sample_serializes_like_a_raw_point() {
        let s = MetricSample {
            timestamp: "2024-05-01T12:00:00Z".parse().unwrap(),
            cpu_usage: 12.5,
            memory_usage: 40.0,
            disk_usage: 70.0,
            network_rx: 1024.0,
            network_tx: 0.0,
            tcp_connections: None,
        };
        let v = serde_json::to_value(&s).unwrap();
        assert_eq!(v["timestamp"], "2024-05-01T12:00:00Z");
        assert_eq!(v["cpu_usage"], 12.5);
        assert!(v["tcp_connections"].is_null());
    }
}
