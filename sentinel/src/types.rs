//! Types that mirror the backend's JSON schema.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One sampled instant across all metrics, as returned by `/metrics/range`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMetricPoint {
    pub timestamp: String,
    #[serde(default)]
    pub cpu_usage: Option<f64>,
    #[serde(default)]
    pub memory_usage: Option<f64>,
    #[serde(default)]
    pub disk_usage: Option<f64>,
    // bytes per second
    #[serde(default)]
    pub network_rx: Option<f64>,
    #[serde(default)]
    pub network_tx: Option<f64>,
    #[serde(default)]
    pub tcp_connections: Option<f64>,
}

/// Time ranges accepted by the metrics API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Period {
    #[default]
    OneHour,
    SixHours,
    TwelveHours,
}

impl Period {
    pub const ALL: [Period; 3] = [Period::OneHour, Period::SixHours, Period::TwelveHours];

    pub fn as_str(&self) -> &'static str {
        match self {
            Period::OneHour => "1h",
            Period::SixHours => "6h",
            Period::TwelveHours => "12h",
        }
    }

    pub fn hours(&self) -> f64 {
        match self {
            Period::OneHour => 1.0,
            Period::SixHours => 6.0,
            Period::TwelveHours => 12.0,
        }
    }

    pub fn duration_ms(&self) -> f64 {
        self.hours() * 3_600_000.0
    }

    /// Next longer period, saturating at 12h.
    pub fn longer(self) -> Self {
        match self {
            Period::OneHour => Period::SixHours,
            _ => Period::TwelveHours,
        }
    }

    /// Next shorter period, saturating at 1h.
    pub fn shorter(self) -> Self {
        match self {
            Period::TwelveHours => Period::SixHours,
            _ => Period::OneHour,
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1h" => Ok(Period::OneHour),
            "6h" => Ok(Period::SixHours),
            "12h" => Ok(Period::TwelveHours),
            other => Err(format!("invalid period '{other}' (use 1h, 6h or 12h)")),
        }
    }
}

/// Periods accepted by the analytics endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnalyticsPeriod {
    OneHour,
    SixHours,
    TwelveHours,
    #[default]
    Day,
    Week,
    Month,
}

impl AnalyticsPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalyticsPeriod::OneHour => "1h",
            AnalyticsPeriod::SixHours => "6h",
            AnalyticsPeriod::TwelveHours => "12h",
            AnalyticsPeriod::Day => "24h",
            AnalyticsPeriod::Week => "7d",
            AnalyticsPeriod::Month => "30d",
        }
    }

    pub fn next(self) -> Self {
        match self {
            AnalyticsPeriod::OneHour => AnalyticsPeriod::SixHours,
            AnalyticsPeriod::SixHours => AnalyticsPeriod::TwelveHours,
            AnalyticsPeriod::TwelveHours => AnalyticsPeriod::Day,
            AnalyticsPeriod::Day => AnalyticsPeriod::Week,
            AnalyticsPeriod::Week => AnalyticsPeriod::Month,
            AnalyticsPeriod::Month => AnalyticsPeriod::OneHour,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: String,
    #[serde(default)]
    pub container: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default, alias = "level")]
    pub log_level: Option<String>,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub environment: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogSearchResponse {
    pub total: u64,
    #[serde(default)]
    pub documents: Vec<LogEntry>,
    #[serde(default)]
    pub took: u64,
    #[serde(default)]
    pub fallback: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogFilters {
    #[serde(default)]
    pub containers: Vec<String>,
    #[serde(default)]
    pub hosts: Vec<String>,
    #[serde(default)]
    pub environments: Vec<String>,
    #[serde(default)]
    pub log_levels: Vec<String>,
    #[serde(default)]
    pub severities: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogHealth {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

/// Parameters for `/api/logs/search/quick`.
#[derive(Debug, Clone, PartialEq)]
pub struct LogQuery {
    pub q: Option<String>,
    pub hours: u32,
    pub level: Option<String>,
    pub container: Option<String>,
    pub size: u32,
}

impl Default for LogQuery {
    fn default() -> Self {
        Self {
            q: None,
            hours: 24,
            level: None,
            container: None,
            size: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NlpQueryRequest<'a> {
    pub query: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NlpQueryResponse {
    pub success: bool,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub processing_time_ms: Option<f64>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatReply {
    pub text: String,
    pub processing_time_ms: Option<f64>,
}

impl NlpQueryResponse {
    /// Pull a displayable answer out of the opaque `result` blob.
    pub fn into_reply(self) -> Result<ChatReply, String> {
        if !self.success {
            return Err(self.error.unwrap_or_else(|| "assistant returned no answer".into()));
        }
        let text = match self.result {
            Some(serde_json::Value::String(s)) => s,
            Some(serde_json::Value::Object(map)) => ["response", "answer", "message", "summary"]
                .iter()
                .find_map(|k| map.get(*k).and_then(|v| v.as_str()).map(str::to_string))
                .unwrap_or_else(|| {
                    serde_json::to_string_pretty(&serde_json::Value::Object(map))
                        .unwrap_or_default()
                }),
            Some(other) => other.to_string(),
            None => String::new(),
        };
        Ok(ChatReply {
            text,
            processing_time_ms: self.processing_time_ms,
        })
    }
}
