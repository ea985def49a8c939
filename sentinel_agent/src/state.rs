//! Shared agent state: the sample ring buffer and the synthetic log store.

use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;

use crate::types::{LogFilters, LogRecord, MetricSample};

/// Samples older than this (relative to the newest) are evicted.
pub const HISTORY_HOURS: i64 = 12;
pub const MAX_LOGS: usize = 5_000;

#[derive(Debug, Default)]
pub struct Store {
    samples: VecDeque<MetricSample>,
    logs: VecDeque<LogRecord>,
}

/// Criteria for the quick log search.
#[derive(Debug, Clone, Default)]
pub struct LogSearch {
    pub q: Option<String>,
    pub level: Option<String>,
    pub container: Option<String>,
    pub hours: i64,
    pub size: usize,
}

impl Store {
    pub fn push_sample(&mut self, s: MetricSample) {
        let cutoff = s.timestamp - Duration::hours(HISTORY_HOURS);
        self.samples.push_back(s);
        while self.samples.front().is_some_and(|f| f.timestamp < cutoff) {
            self.samples.pop_front();
        }
    }

    pub fn samples(&self) -> impl Iterator<Item = &MetricSample> {
        self.samples.iter()
    }

    pub fn latest(&self) -> Option<&MetricSample> {
        self.samples.back()
    }

    /// Samples from the last `hours` before `now`, oldest first.
    pub fn range(&self, hours: i64, now: DateTime<Utc>) -> Vec<MetricSample> {
        let from = now - Duration::hours(hours);
        self.samples
            .iter()
            .filter(|s| s.timestamp >= from && s.timestamp <= now)
            .cloned()
            .collect()
    }

    pub fn push_log(&mut self, l: LogRecord) {
        self.logs.push_back(l);
        while self.logs.len() > MAX_LOGS {
            self.logs.pop_front();
        }
    }

    pub fn logs(&self) -> impl Iterator<Item = &LogRecord> {
        self.logs.iter()
    }

    /// Newest first.
    pub fn recent_logs(&self, limit: usize) -> Vec<LogRecord> {
        self.logs.iter().rev().take(limit).cloned().collect()
    }

    /// Case-insensitive substring match on message and container; newest first.
    /// Returns the total hit count and at most `size` documents.
    pub fn search(&self, c: &LogSearch, now: DateTime<Utc>) -> (usize, Vec<LogRecord>) {
        let from = now - Duration::hours(c.hours.max(1));
        let needle = c.q.as_deref().map(str::to_lowercase);
        let hits: Vec<&LogRecord> = self
            .logs
            .iter()
            .rev()
            .filter(|l| l.timestamp >= from)
            .filter(|l| {
                c.level
                    .as_deref()
                    .map_or(true, |lv| l.log_level.eq_ignore_ascii_case(lv))
            })
            .filter(|l| c.container.as_deref().map_or(true, |ct| l.container == ct))
            .filter(|l| {
                needle.as_deref().map_or(true, |n| {
                    l.message.to_lowercase().contains(n) || l.container.to_lowercase().contains(n)
                })
            })
            .collect();
        let total = hits.len();
        (total, hits.into_iter().take(c.size).cloned().collect())
    }

    pub fn filters(&self) -> LogFilters {
        let mut containers = BTreeSet::new();
        let mut hosts = BTreeSet::new();
        let mut envs = BTreeSet::new();
        let mut levels = BTreeSet::new();
        for l in &self.logs {
            containers.insert(l.container.clone());
            hosts.insert(l.host.clone());
            envs.insert(l.environment.clone());
            levels.insert(l.log_level.clone());
        }
        let levels: Vec<String> = levels.into_iter().collect();
        LogFilters {
            containers: containers.into_iter().collect(),
            hosts: hosts.into_iter().collect(),
            environments: envs.into_iter().collect(),
            severities: levels.clone(),
            log_levels: levels,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RwLock<Store>>,
    pub hostname: String,
    pub started: DateTime<Utc>,
}

impl AppState {
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            store: Arc::new(RwLock::new(Store::default())),
            hostname: hostname.into(),
            started: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, h, m, 0).unwrap()
    }

    fn sample(ts: DateTime<Utc>) -> MetricSample {
        MetricSample {
            timestamp: ts,
            cpu_usage: 1.0,
            memory_usage: 2.0,
            disk_usage: 3.0,
            network_rx: 0.0,
            network_tx: 0.0,
            tcp_connections: Some(4.0),
        }
    }

    fn log(ts: DateTime<Utc>, level: &str, container: &str, msg: &str) -> LogRecord {
        LogRecord {
            timestamp: ts,
            container: container.into(),
            host: "h".into(),
            environment: "demo".into(),
            log_level: level.into(),
            message: msg.into(),
        }
    }

    #[test]
    fn ring_buffer_keeps_twelve_hours() {
        let mut s = Store::default();
        s.push_sample(sample(t(0, 0)));
        s.push_sample(sample(t(6, 0)));
        s.push_sample(sample(t(12, 30)));
        assert_eq!(s.samples().count(), 2);
        assert_eq!(s.range(1, t(12, 30)).len(), 1);
        assert_eq!(s.range(12, t(12, 30)).len(), 2);
    }

    #[test]
    fn search_filters_and_limits() {
        let mut s = Store::default();
        s.push_log(log(t(11, 0), "INFO", "api", "request served"));
        s.push_log(log(t(11, 5), "ERROR", "db", "Connection TIMEOUT"));
        s.push_log(log(t(11, 10), "WARN", "api", "slow timeout path"));
        let now = t(12, 0);

        let q = LogSearch {
            q: Some("timeout".into()),
            hours: 24,
            size: 10,
            ..LogSearch::default()
        };
        let (total, docs) = s.search(&q, now);
        assert_eq!(total, 2);
        assert_eq!(docs[0].log_level, "WARN");

        let q = LogSearch {
            level: Some("error".into()),
            hours: 24,
            size: 10,
            ..LogSearch::default()
        };
        assert_eq!(s.search(&q, now).0, 1);

        let q = LogSearch {
            container: Some("api".into()),
            hours: 24,
            size: 1,
            ..LogSearch::default()
        };
        let (total, docs) = s.search(&q, now);
        assert_eq!((total, docs.len()), (2, 1));
    }

    #[test]
    fn filters_are_sorted_and_unique() {
        let mut s = Store::default();
        s.push_log(log(t(1, 0), "INFO", "web", "a"));
        s.push_log(log(t(1, 1), "ERROR", "api", "b"));
        s.push_log(log(t(1, 2), "INFO", "api", "c"));
        let f = s.filters();
        assert_eq!(f.containers, vec!["api", "web"]);
        assert_eq!(f.log_levels, vec!["ERROR", "INFO"]);
        assert_eq!(s.recent_logs(1)[0].message, "c");
    }
}
