//! Host sampling with sysinfo: CPU, memory, disk fill, network rates and TCP connection count.

#[cfg(target_os = "linux")]
use std::fs;
use std::time::Instant;

use chrono::Utc;
use sysinfo::{Disks, Networks, System};
use tracing::debug;

use crate::types::MetricSample;

/// Persistent sysinfo handles; network rates are deltas between two `sample` calls.
pub struct Collector {
    sys: System,
    disks: Disks,
    nets: Networks,
    last_net: Option<Instant>,
}

impl Default for Collector {
    fn default() -> Self {
        Self::new()
    }
}

impl Collector {
    pub fn new() -> Self {
        let mut sys = System::new();
        sys.refresh_cpu_usage();
        sys.refresh_memory();
        Self {
            sys,
            disks: Disks::new_with_refreshed_list(),
            nets: Networks::new_with_refreshed_list(),
            last_net: Some(Instant::now()),
        }
    }

    pub fn sample(&mut self) -> MetricSample {
        self.sys.refresh_cpu_usage();
        self.sys.refresh_memory();
        let cpu_usage = self.sys.global_cpu_usage() as f64;

        let mem_total = self.sys.total_memory();
        let mem_used = mem_total.saturating_sub(self.sys.available_memory());
        let memory_usage = percent(mem_used, mem_total);

        self.disks.refresh(true);
        // overlay/pseudo filesystems report zero capacity
        let (total, avail) = self
            .disks
            .list()
            .iter()
            .filter(|d| d.total_space() > 0)
            .fold((0u64, 0u64), |(t, a), d| {
                (t.saturating_add(d.total_space()), a.saturating_add(d.available_space()))
            });
        let disk_usage = percent(total.saturating_sub(avail), total);

        self.nets.refresh(true);
        let now = Instant::now();
        let elapsed = self
            .last_net
            .map(|t| now.duration_since(t).as_secs_f64())
            .unwrap_or(0.0)
            .max(1e-3);
        self.last_net = Some(now);
        // sysinfo: received()/transmitted() are deltas since the previous refresh
        let (rx, tx) = self
            .nets
            .iter()
            .filter(|(name, _)| name.as_str() != "lo")
            .fold((0u64, 0u64), |(r, t), (_, d)| {
                (r.saturating_add(d.received()), t.saturating_add(d.transmitted()))
            });

        let tcp_connections = tcp_connection_count().map(|n| n as f64);
        debug!(cpu_usage, memory_usage, disk_usage, ?tcp_connections, "sampled");

        MetricSample {
            timestamp: Utc::now(),
            cpu_usage: round2(cpu_usage),
            memory_usage: round2(memory_usage),
            disk_usage: round2(disk_usage),
            network_rx: round2(rx as f64 / elapsed),
            network_tx: round2(tx as f64 / elapsed),
            tcp_connections,
        }
    }
}

fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Entries in /proc/net/tcp and /proc/net/tcp6 (header lines excluded).
#[cfg(target_os = "linux")]
pub fn tcp_connection_count() -> Option<usize> {
    let mut seen = false;
    let mut n = 0;
    for path in ["/proc/net/tcp", "/proc/net/tcp6"] {
        if let Ok(s) = fs::read_to_string(path) {
            seen = true;
            n += count_socket_lines(&s);
        }
    }
    seen.then_some(n)
}

#[cfg(not(target_os = "linux"))]
pub fn tcp_connection_count() -> Option<usize> {
    None
}

/// Socket rows in a /proc/net/tcp style table.
pub fn count_socket_lines(table: &str) -> usize {
    table
        .lines()
        .skip(1)
        .filter(|l| !l.trim().is_empty())
        .count()
}
