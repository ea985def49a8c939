//! Analytics over the sample buffer: summary, performance report, threshold anomalies and the
//! canned assistant answers.

use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use crate::types::{LogRecord, MetricSample};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Agg {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
}

pub fn aggregate<I: IntoIterator<Item = f64>>(values: I) -> Option<Agg> {
    let mut n = 0usize;
    let (mut min, mut max, mut sum) = (f64::INFINITY, f64::NEG_INFINITY, 0.0);
    for v in values {
        n += 1;
        min = min.min(v);
        max = max.max(v);
        sum += v;
    }
    (n > 0).then(|| Agg {
        min: round1(min),
        max: round1(max),
        avg: round1(sum / n as f64),
    })
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

fn agg_json(a: Option<Agg>) -> Value {
    match a {
        Some(a) => json!({"avg": a.avg, "min": a.min, "max": a.max}),
        None => Value::Null,
    }
}

pub fn summary(
    samples: &[MetricSample],
    logs: &[LogRecord],
    period: &str,
    now: DateTime<Utc>,
) -> Value {
    let errors = logs.iter().filter(|l| l.log_level == "ERROR").count();
    let warnings = logs.iter().filter(|l| l.log_level == "WARN").count();
    json!({
        "period": period,
        "generated_at": now.to_rfc3339(),
        "samples": samples.len(),
        "cpu": agg_json(aggregate(samples.iter().map(|s| s.cpu_usage))),
        "memory": agg_json(aggregate(samples.iter().map(|s| s.memory_usage))),
        "disk": agg_json(aggregate(samples.iter().map(|s| s.disk_usage))),
        "network": {
            "rx_avg_bps": aggregate(samples.iter().map(|s| s.network_rx)).map(|a| a.avg),
            "tx_avg_bps": aggregate(samples.iter().map(|s| s.network_tx)).map(|a| a.avg),
        },
        "tcp_connections": agg_json(aggregate(samples.iter().filter_map(|s| s.tcp_connections))),
        "logs": {"total": logs.len(), "errors": errors, "warnings": warnings},
    })
}

/// 100 minus weighted penalties for sustained load.
pub fn health_score(cpu: Option<Agg>, mem: Option<Agg>, disk: Option<Agg>) -> f64 {
    let penalty = |a: Option<Agg>, soft: f64, weight: f64| {
        a.map(|a| (a.avg - soft).max(0.0) * weight).unwrap_or(0.0)
    };
    let score =
        100.0 - penalty(cpu, 50.0, 1.0) - penalty(mem, 70.0, 1.5) - penalty(disk, 80.0, 2.0);
    round1(score.clamp(0.0, 100.0))
}

pub fn performance_report(samples: &[MetricSample], period: &str, now: DateTime<Utc>) -> Value {
    let cpu = aggregate(samples.iter().map(|s| s.cpu_usage));
    let mem = aggregate(samples.iter().map(|s| s.memory_usage));
    let disk = aggregate(samples.iter().map(|s| s.disk_usage));
    let mut bottlenecks = Vec::new();
    let mut recommendations = Vec::new();
    if cpu.is_some_and(|a| a.avg > 70.0) {
        bottlenecks.push("cpu");
        recommendations.push("Sustained CPU load: profile hot services or scale out.");
    }
    if mem.is_some_and(|a| a.avg > 85.0) {
        bottlenecks.push("memory");
        recommendations.push("Memory pressure: check for leaks or raise limits.");
    }
    if disk.is_some_and(|a| a.max > 90.0) {
        bottlenecks.push("disk");
        recommendations.push("Disk nearly full: rotate logs or grow the volume.");
    }
    if recommendations.is_empty() {
        recommendations.push("No action needed.");
    }
    json!({
        "period": period,
        "generated_at": now.to_rfc3339(),
        "health_score": health_score(cpu, mem, disk),
        "cpu": agg_json(cpu),
        "memory": agg_json(mem),
        "disk": agg_json(disk),
        "bottlenecks": bottlenecks,
        "recommendations": recommendations,
    })
}

struct Rule {
    kind: &'static str,
    medium: f64,
    high: f64,
    pick: fn(&MetricSample) -> Option<f64>,
}

const RULES: [Rule; 3] = [
    Rule {
        kind: "cpu_spike",
        medium: 75.0,
        high: 90.0,
        pick: |s| Some(s.cpu_usage),
    },
    Rule {
        kind: "memory_spike",
        medium: 85.0,
        high: 95.0,
        pick: |s| Some(s.memory_usage),
    },
    Rule {
        kind: "disk_spike",
        medium: 85.0,
        high: 95.0,
        pick: |s| Some(s.disk_usage),
    },
];

/// One anomaly per contiguous run of samples above a rule's threshold, reported at its peak.
pub fn anomalies(samples: &[MetricSample]) -> Vec<Value> {
    let mut out = Vec::new();
    for rule in &RULES {
        let mut peak: Option<(f64, DateTime<Utc>)> = None;
        let mut flush = |peak: &mut Option<(f64, DateTime<Utc>)>| {
            if let Some((v, ts)) = peak.take() {
                let severity = if v >= rule.high { "HIGH" } else { "MEDIUM" };
                out.push(json!({
                    "type": rule.kind,
                    "severity": severity,
                    "timestamp": ts.to_rfc3339(),
                    "description": format!("{} reached {v:.1}%", rule.kind.replace('_', " ")),
                    "details": {"value": v, "threshold": rule.medium},
                }));
            }
        };
        for s in samples {
            match (rule.pick)(s) {
                Some(v) if v >= rule.medium => {
                    if peak.map_or(true, |(p, _)| v > p) {
                        peak = Some((v, s.timestamp));
                    }
                }
                _ => flush(&mut peak),
            }
        }
        flush(&mut peak);
    }
    out
}

/// Keyword-routed answer built from the newest sample and the buffer.
pub fn answer(query: &str, samples: &[MetricSample]) -> Value {
    let q = query.to_lowercase();
    let Some(latest) = samples.last() else {
        return json!({"response": "No samples collected yet."});
    };
    let mentions = |words: &[&str]| words.iter().any(|w| q.contains(w));
    let response = if mentions(&["anomal", "spike", "unusual"]) {
        let found = anomalies(samples);
        match found.len() {
            0 => "No anomalies in the buffered window.".to_string(),
            n => format!(
                "{n} anomalies found; the most recent is: {}",
                found[n - 1]["description"].as_str().unwrap_or("unknown")
            ),
        }
    } else if mentions(&["cpu", "processor", "load"]) {
        let a = aggregate(samples.iter().map(|s| s.cpu_usage));
        format!(
            "CPU is at {:.1}% (average {:.1}%, peak {:.1}%).",
            latest.cpu_usage,
            a.map_or(0.0, |a| a.avg),
            a.map_or(0.0, |a| a.max)
        )
    } else if mentions(&["mem", "ram"]) {
        format!("Memory usage is {:.1}%.", latest.memory_usage)
    } else if mentions(&["disk", "storage"]) {
        format!("Disk usage is {:.1}%.", latest.disk_usage)
    } else if mentions(&["network", "traffic", "bandwidth"]) {
        format!(
            "Network: {:.0} B/s in, {:.0} B/s out.",
            latest.network_rx, latest.network_tx
        )
    } else if mentions(&["tcp", "connection"]) {
        match latest.tcp_connections {
            Some(n) => format!("{n:.0} TCP connections are open."),
            None => "TCP connection counts are not available on this host.".to_string(),
        }
    } else {
        format!(
            "Latest sample: CPU {:.1}%, memory {:.1}%, disk {:.1}%.",
            latest.cpu_usage, latest.memory_usage, latest.disk_usage
        )
    };
    json!({"response": response, "sample_time": latest.timestamp.to_rfc3339()})
}
