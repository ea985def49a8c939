//! Metric time-series service: fetch a period, pick one field, cache briefly, summarize.
//!
//! One `MetricService` exists per `MetricKind`. The kind supplies the field selector and
//! the value formatter, so CPU, memory, disk, network and TCP series all share the same
//! fetch/cache/stat logic.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::Result;
use crate::time_sync::parse_timestamp;
use crate::types::{Period, RawMetricPoint};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    Cpu,
    Memory,
    Disk,
    NetworkRx,
    NetworkTx,
    Tcp,
}

impl MetricKind {
    pub const ALL: [MetricKind; 6] = [
        MetricKind::Cpu,
        MetricKind::Memory,
        MetricKind::Disk,
        MetricKind::NetworkRx,
        MetricKind::NetworkTx,
        MetricKind::Tcp,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            MetricKind::Cpu => "CPU",
            MetricKind::Memory => "Memory",
            MetricKind::Disk => "Disk",
            MetricKind::NetworkRx => "Network RX",
            MetricKind::NetworkTx => "Network TX",
            MetricKind::Tcp => "TCP connections",
        }
    }

    pub fn select(&self, p: &RawMetricPoint) -> Option<f64> {
        let v = match self {
            MetricKind::Cpu => p.cpu_usage,
            MetricKind::Memory => p.memory_usage,
            MetricKind::Disk => p.disk_usage,
            MetricKind::NetworkRx => p.network_rx,
            MetricKind::NetworkTx => p.network_tx,
            MetricKind::Tcp => p.tcp_connections,
        };
        v.filter(|x| x.is_finite())
    }

    pub fn format_value(&self, v: f64) -> String {
        match self {
            MetricKind::Cpu | MetricKind::Memory | MetricKind::Disk => format!("{v:.1}%"),
            MetricKind::NetworkRx | MetricKind::NetworkTx => human_rate(v),
            MetricKind::Tcp => format!("{}", v.round() as i64),
        }
    }
}

/// Human-readable byte rate (1024-based).
pub fn human_rate(bytes_per_sec: f64) -> String {
    const K: f64 = 1024.0;
    let b = bytes_per_sec.max(0.0);
    if b < K {
        return format!("{b:.0} B/s");
    }
    let kb = b / K;
    if kb < K {
        return format!("{kb:.1} KB/s");
    }
    let mb = kb / K;
    if mb < K {
        return format!("{mb:.1} MB/s");
    }
    format!("{:.2} GB/s", mb / K)
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedPoint {
    pub timestamp: DateTime<Utc>,
    pub usage: f64,
    pub formatted_time: String,
    pub formatted_usage: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stats {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    pub current: f64,
}

impl Stats {
    pub fn formatted(&self, kind: MetricKind) -> [String; 4] {
        [
            kind.format_value(self.min),
            kind.format_value(self.avg),
            kind.format_value(self.max),
            kind.format_value(self.current),
        ]
    }
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

/// min/avg/max rounded to one decimal; `current` is the last value as-is.
pub fn calculate_stats(points: &[ProcessedPoint]) -> Option<Stats> {
    let last = points.last()?;
    let (mut min, mut max, mut sum) = (f64::INFINITY, f64::NEG_INFINITY, 0.0);
    for p in points {
        min = min.min(p.usage);
        max = max.max(p.usage);
        sum += p.usage;
    }
    Some(Stats {
        min: round1(min),
        max: round1(max),
        avg: round1(sum / points.len() as f64),
        current: last.usage,
    })
}

/// Points within `hours` of `now`. An empty window falls back to the last
/// `ceil(hours)` points so a chart is never blank while data exists.
pub fn data_for_range(
    points: &[ProcessedPoint],
    hours: f64,
    now: DateTime<Utc>,
) -> Vec<ProcessedPoint> {
    if points.is_empty() {
        return Vec::new();
    }
    let cutoff = crate::time_sync::time_range(hours, now).start;
    // ascending: everything from the first point at/after the cutoff
    let first = points.partition_point(|p| p.timestamp < cutoff);
    if first < points.len() {
        return points[first..].to_vec();
    }
    let n = (hours.ceil().max(1.0) as usize).min(points.len());
    points[points.len() - n..].to_vec()
}

/// Anything that can return the raw series for a period.
pub trait RangeSource {
    fn fetch_range(
        &self,
        period: Period,
    ) -> impl Future<Output = Result<Vec<RawMetricPoint>>> + Send;
}

/// How long a cached period stays fresh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheTtl {
    pub live: Duration,
    pub historical: Duration,
}

impl Default for CacheTtl {
    fn default() -> Self {
        Self {
            live: Duration::from_secs(10),
            historical: Duration::from_secs(300),
        }
    }
}

impl CacheTtl {
    pub fn for_period(&self, period: Period) -> Duration {
        match period {
            Period::OneHour => self.live,
            _ => self.historical,
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    points: Vec<ProcessedPoint>,
    fetched_at: Instant,
}

pub struct MetricService {
    kind: MetricKind,
    ttl: CacheTtl,
    cache: HashMap<Period, CacheEntry>,
}

impl MetricService {
    pub fn new(kind: MetricKind, ttl: CacheTtl) -> Self {
        Self {
            kind,
            ttl,
            cache: HashMap::new(),
        }
    }

    pub fn kind(&self) -> MetricKind {
        self.kind
    }

    /// Fresh cached points for `period`, if any.
    pub fn cached(&self, period: Period) -> Option<&[ProcessedPoint]> {
        let entry = self.cache.get(&period)?;
        (entry.fetched_at.elapsed() < self.ttl.for_period(period)).then_some(&entry.points[..])
    }

    pub async fn load<S>(&mut self, source: &S, period: Period) -> Result<Vec<ProcessedPoint>>
    where
        S: RangeSource + Sync,
    {
        if let Some(hit) = self.cached(period) {
            debug!(metric = self.kind.label(), %period, "cache hit");
            return Ok(hit.to_vec());
        }
        let fetched = source
            .fetch_range(period)
            .await
            .and_then(|raw| self.process(&raw));
        match fetched {
            Ok(points) => {
                self.cache.insert(
                    period,
                    CacheEntry {
                        points: points.clone(),
                        fetched_at: Instant::now(),
                    },
                );
                Ok(points)
            }
            Err(e) => {
                // never serve the stale entry after a failure
                self.cache.remove(&period);
                warn!(metric = self.kind.label(), %period, error = %e, "metric fetch failed");
                Err(e)
            }
        }
    }

    /// Select this metric's field from each raw point. Points with no value are skipped;
    /// output is timestamp-ascending.
    pub fn process(&self, raw: &[RawMetricPoint]) -> Result<Vec<ProcessedPoint>> {
        let mut out = Vec::with_capacity(raw.len());
        for p in raw {
            let Some(usage) = self.kind.select(p) else {
                continue;
            };
            let timestamp = parse_timestamp(&p.timestamp)?;
            out.push(ProcessedPoint {
                timestamp,
                usage,
                formatted_time: timestamp.format("%H:%M:%S").to_string(),
                formatted_usage: self.kind.format_value(usage),
            });
        }
        out.sort_by_key(|p| p.timestamp);
        Ok(out)
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::ApiError;
    use chrono::{Duration as ChronoDuration, TimeZone};
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub(crate) fn point_at(ts: DateTime<Utc>, usage: f64) -> ProcessedPoint {
        ProcessedPoint {
            timestamp: ts,
            usage,
            formatted_time: ts.format("%H:%M:%S").to_string(),
            formatted_usage: format!("{usage:.1}%"),
        }
    }

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()
    }

    fn raw(minute: i64, cpu: Option<f64>) -> RawMetricPoint {
        RawMetricPoint {
            timestamp: (base() + ChronoDuration::minutes(minute))
                .naive_utc()
                .format("%Y-%m-%dT%H:%M:%S")
                .to_string(),
            cpu_usage: cpu,
            memory_usage: Some(50.0),
            disk_usage: Some(70.0),
            network_rx: Some(2048.0),
            network_tx: Some(512.0),
            tcp_connections: Some(12.0),
        }
    }

    struct FakeSource {
        calls: AtomicUsize,
        fail: bool,
        points: Vec<RawMetricPoint>,
    }

    impl FakeSource {
        fn ok(points: Vec<RawMetricPoint>) -> Self {
            Self { calls: AtomicUsize::new(0), fail: false, points }
        }
    }

    impl RangeSource for FakeSource {
        async fn fetch_range(&self, _period: Period) -> Result<Vec<RawMetricPoint>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(ApiError::Status { status: 500, path: "/metrics/range".into() })
            } else {
                Ok(self.points.clone())
            }
        }
    }

    #[test]
    fn stats_are_ordered_and_current_is_last() {
        let pts: Vec<_> = [10.04, 50.0, 90.0, 33.33]
            .iter()
            .enumerate()
            .map(|(i, v)| point_at(base() + ChronoDuration::minutes(i as i64), *v))
            .collect();
        let s = calculate_stats(&pts).unwrap();
        assert!(s.min <= s.avg && s.avg <= s.max);
        assert_eq!(s.min, 10.0);
        assert_eq!(s.max, 90.0);
        assert_eq!(s.avg, 45.8);
        assert_eq!(s.current, 33.33);
        assert!(calculate_stats(&[]).is_none());
    }

    #[test]
    fn range_filter_keeps_recent_points() {
        let now = base() + ChronoDuration::hours(3);
        let pts: Vec<_> = (0..=6)
            .map(|i| point_at(base() + ChronoDuration::minutes(30 * i), i as f64))
            .collect();
        let got = data_for_range(&pts, 1.0, now);
        let usages: Vec<f64> = got.iter().map(|p| p.usage).collect();
        assert_eq!(usages, vec![4.0, 5.0, 6.0]);
    }

    #[test]
    fn range_filter_falls_back_to_last_points() {
        // three points, hours apart, with "now" an hour past the last one
        let pts = vec![
            point_at(base(), 10.0),
            point_at(base() + ChronoDuration::hours(3), 50.0),
            point_at(base() + ChronoDuration::hours(6), 90.0),
        ];
        let now = base() + ChronoDuration::hours(8);
        let got = data_for_range(&pts, 1.0, now);
        assert_eq!(got, vec![pts[2].clone()]);

        // 6.5h cutoff is still past the last point: fallback takes ceil(1.5) = 2
        let got = data_for_range(&pts, 1.5, now);
        assert_eq!(got, pts[1..].to_vec());
        assert!(data_for_range(&pts, 0.0, now).len() == 1);
        assert!(data_for_range(&[], 1.0, now).is_empty());
    }

    #[test]
    fn process_skips_missing_values_and_sorts() {
        let svc = MetricService::new(MetricKind::Cpu, CacheTtl::default());
        let pts = svc
            .process(&[raw(2, Some(30.0)), raw(0, Some(10.0)), raw(1, None)])
            .unwrap();
        assert_eq!(pts.len(), 2);
        assert!(pts[0].timestamp < pts[1].timestamp);
        assert_eq!(pts[0].formatted_usage, "10.0%");

        let net = MetricService::new(MetricKind::NetworkRx, CacheTtl::default());
        let pts = net.process(&[raw(0, None)]).unwrap();
        assert_eq!(pts[0].formatted_usage, "2.0 KB/s");
    }

    #[test]
    fn process_rejects_bad_timestamp() {
        let svc = MetricService::new(MetricKind::Cpu, CacheTtl::default());
        let mut bad = raw(0, Some(1.0));
        bad.timestamp = "not a time".into();
        assert!(matches!(svc.process(&[bad]), Err(ApiError::Timestamp { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn load_caches_until_ttl_expires() {
        let src = FakeSource::ok(vec![raw(0, Some(1.0)), raw(1, Some(2.0))]);
        let mut svc = MetricService::new(MetricKind::Cpu, CacheTtl::default());

        assert_eq!(svc.load(&src, Period::OneHour).await.unwrap().len(), 2);
        svc.load(&src, Period::OneHour).await.unwrap();
        assert_eq!(src.calls.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(11)).await;
        svc.load(&src, Period::OneHour).await.unwrap();
        assert_eq!(src.calls.load(Ordering::SeqCst), 2);

        // 6h uses the longer TTL
        svc.load(&src, Period::SixHours).await.unwrap();
        tokio::time::advance(Duration::from_secs(60)).await;
        svc.load(&src, Period::SixHours).await.unwrap();
        assert_eq!(src.calls.load(Ordering::SeqCst), 3);

        svc.clear_cache();
        svc.load(&src, Period::SixHours).await.unwrap();
        assert_eq!(src.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_fetch_propagates_and_evicts() {
        let mut src = FakeSource::ok(vec![raw(0, Some(1.0))]);
        let mut svc = MetricService::new(MetricKind::Cpu, CacheTtl::default());
        svc.load(&src, Period::OneHour).await.unwrap();

        tokio::time::advance(Duration::from_secs(11)).await;
        src.fail = true;
        let err = svc.load(&src, Period::OneHour).await.unwrap_err();
        assert!(matches!(err, ApiError::Status { status: 500, .. }));
        assert!(svc.cached(Period::OneHour).is_none());
        assert!(svc.cache.get(&Period::OneHour).is_none());
    }

    #[test]
    fn rates_are_human_readable() {
        assert_eq!(human_rate(512.0), "512 B/s");
        assert_eq!(human_rate(1536.0), "1.5 KB/s");
        assert_eq!(human_rate(3.0 * 1024.0 * 1024.0), "3.0 MB/s");
        assert_eq!(MetricKind::Tcp.format_value(17.4), "17");
    }
}
