//! Synthetic log lines: derived from live samples, plus a steady background of service chatter.

use chrono::{DateTime, Utc};

use crate::types::{LogRecord, MetricSample};

pub const ENVIRONMENT: &str = "demo";
const SERVICES: [&str; 4] = ["api-gateway", "auth-service", "postgres", "worker"];

const CHATTER: [(&str, &str); 8] = [
    ("INFO", "GET /api/v1/status 200"),
    ("INFO", "session refreshed for user"),
    ("DEBUG", "cache hit ratio 0.93"),
    ("INFO", "checkpoint complete"),
    ("WARN", "slow query took 1.8s"),
    ("INFO", "job batch processed"),
    ("ERROR", "upstream connection timeout after 30s"),
    ("WARN", "retrying failed login attempt"),
];

fn record(ts: DateTime<Utc>, host: &str, container: &str, level: &str, msg: String) -> LogRecord {
    LogRecord {
        timestamp: ts,
        container: container.to_string(),
        host: host.to_string(),
        environment: ENVIRONMENT.to_string(),
        log_level: level.to_string(),
        message: msg,
    }
}

/// Log lines for one sample: one from the collector, a warning per breached threshold,
/// and the `tick`-th background chatter line.
pub fn lines_for_sample(s: &MetricSample, host: &str, tick: u64) -> Vec<LogRecord> {
    let ts = s.timestamp;
    let mut out = vec![record(
        ts,
        host,
        "sentinel-agent",
        "DEBUG",
        format!(
            "sampled cpu={:.1}% mem={:.1}% disk={:.1}%",
            s.cpu_usage, s.memory_usage, s.disk_usage
        ),
    )];
    if s.cpu_usage >= 85.0 {
        let msg = format!("high cpu usage {:.1}%", s.cpu_usage);
        out.push(record(ts, host, "sentinel-agent", "WARN", msg));
    }
    if s.memory_usage >= 90.0 {
        let msg = format!("memory pressure {:.1}%", s.memory_usage);
        out.push(record(ts, host, "sentinel-agent", "WARN", msg));
    }
    if s.disk_usage >= 90.0 {
        let msg = format!("disk nearly full {:.1}%", s.disk_usage);
        out.push(record(ts, host, "sentinel-agent", "ERROR", msg));
    }
    let (level, msg) = CHATTER[(tick as usize) % CHATTER.len()];
    let service = SERVICES[(tick as usize / CHATTER.len()) % SERVICES.len()];
    out.push(record(ts, host, service, level, msg.to_string()));
    out
}
