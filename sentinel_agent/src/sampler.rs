//! Background sampler: periodically collects a sample into the ring buffer and derives log
//! lines from it. `backfill` seeds history so charts have data from the first request.

use std::f64::consts::TAU;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, info};

use crate::logs::lines_for_sample;
use crate::metrics::Collector;
use crate::state::{AppState, HISTORY_HOURS};
use crate::types::MetricSample;

pub const BACKFILL_STEP_SECS: i64 = 60;

pub fn spawn_sampler(state: AppState, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut collector = Collector::new();
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut tick: u64 = 0;
        loop {
            ticker.tick().await;
            let sample = collector.sample();
            let lines = lines_for_sample(&sample, &state.hostname, tick);
            let mut store = state.store.write().await;
            store.push_sample(sample);
            for l in lines {
                store.push_log(l);
            }
            drop(store);
            tick = tick.wrapping_add(1);
            debug!(tick, "sample stored");
        }
    })
}

/// Deterministic synthetic sample `i` steps into the backfill, shaped like a daily load curve
/// around `base`.
pub fn synthetic_sample(base: &MetricSample, ts: DateTime<Utc>, i: i64) -> MetricSample {
    let x = i as f64;
    let wave = |period: f64, amp: f64| (TAU * x / period).sin() * amp;
    let clamp = |v: f64| v.clamp(0.0, 100.0);
    MetricSample {
        timestamp: ts,
        cpu_usage: clamp(base.cpu_usage.max(8.0) + wave(180.0, 12.0) + wave(17.0, 4.0)),
        memory_usage: clamp(base.memory_usage + wave(360.0, 5.0)),
        disk_usage: clamp(base.disk_usage - x * 0.002),
        network_rx: (base.network_rx.max(20_000.0) * (1.0 + wave(45.0, 0.6))).max(0.0),
        network_tx: (base.network_tx.max(8_000.0) * (1.0 + wave(60.0, 0.5))).max(0.0),
        tcp_connections: base
            .tcp_connections
            .map(|n| (n + wave(90.0, n.max(10.0) * 0.3)).max(0.0).round()),
    }
}

/// Fill the 12h window before `now` at `BACKFILL_STEP_SECS` spacing, plus matching logs.
pub async fn backfill(state: &AppState, base: &MetricSample, now: DateTime<Utc>) {
    let steps = HISTORY_HOURS * 3600 / BACKFILL_STEP_SECS;
    let mut store = state.store.write().await;
    for i in (1..=steps).rev() {
        let ts = now - ChronoDuration::seconds(i * BACKFILL_STEP_SECS);
        let s = synthetic_sample(base, ts, steps - i);
        for l in lines_for_sample(&s, &state.hostname, (steps - i) as u64) {
            store.push_log(l);
        }
        store.push_sample(s);
    }
    info!(samples = steps, "history backfilled");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> MetricSample {
        MetricSample {
            timestamp: Utc::now(),
            cpu_usage: 20.0,
            memory_usage: 50.0,
            disk_usage: 60.0,
            network_rx: 0.0,
            network_tx: 0.0,
            tcp_connections: Some(40.0),
        }
    }

    #[test]
    fn synthetic_values_stay_in_bounds() {
        let b = base();
        for i in 0..720 {
            let s = synthetic_sample(&b, b.timestamp, i);
            assert!((0.0..=100.0).contains(&s.cpu_usage));
            assert!((0.0..=100.0).contains(&s.memory_usage));
            assert!(s.network_rx >= 0.0 && s.network_tx >= 0.0);
            assert!(s.tcp_connections.unwrap() >= 0.0);
        }
    }

    #[tokio::test]
    async fn backfill_covers_the_window() {
        let state = AppState::new("test");
        let now = Utc::now();
        backfill(&state, &base(), now).await;
        let store = state.store.read().await;
        assert_eq!(store.range(12, now).len(), 720);
        assert_eq!(store.range(1, now).len(), 60);
        assert!(store.logs().count() > 0);
    }
}
