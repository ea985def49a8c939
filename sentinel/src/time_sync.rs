//! Server timestamp parsing, time-range windows and client/server clock drift reporting.
//!
//! Timestamps coming from the backend are authoritative: drift is only ever reported,
//! never applied to sample values. The measured offset does feed `TimeSync::now()`, which
//! is what range filtering and live chart domains treat as "now".

use chrono::{DateTime, Duration, NaiveDateTime, Utc};

use crate::error::{ApiError, Result};

/// Parse an ISO-8601 timestamp. Values without an offset are taken as UTC, which is
/// what the backend's `isoformat()` emits.
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(naive.and_utc());
        }
    }
    Err(ApiError::Timestamp {
        value: s.to_string(),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// `[now - hours, now]`.
pub fn time_range(hours: f64, now: DateTime<Utc>) -> TimeRange {
    let span = Duration::milliseconds((hours * 3_600_000.0).round() as i64);
    TimeRange {
        start: now - span,
        end: now,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncHealth {
    Good,
    Warning,
    Error,
    Unknown,
}

impl SyncHealth {
    pub fn label(&self) -> &'static str {
        match self {
            SyncHealth::Good => "good",
            SyncHealth::Warning => "warning",
            SyncHealth::Error => "error",
            SyncHealth::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimeSyncStatus {
    pub is_valid: bool,
    pub offset_seconds: f64,
    pub offset_hours: f64,
    pub status: SyncHealth,
    pub message: String,
}

const WARN_AFTER_SECS: f64 = 60.0;
const ERROR_AFTER_SECS: f64 = 300.0;

pub fn classify_offset(offset_seconds: f64) -> SyncHealth {
    let abs = offset_seconds.abs();
    if abs < WARN_AFTER_SECS {
        SyncHealth::Good
    } else if abs <= ERROR_AFTER_SECS {
        SyncHealth::Warning
    } else {
        SyncHealth::Error
    }
}

/// Tracks the offset between the backend clock and ours.
#[derive(Debug, Clone, Default)]
pub struct TimeSync {
    // server - local
    offset: Option<Duration>,
    checked_at: Option<DateTime<Utc>>,
}

impl TimeSync {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a server clock reading taken at local time `local_now`.
    pub fn observe(&mut self, server_now: DateTime<Utc>, local_now: DateTime<Utc>) {
        self.offset = Some(server_now - local_now);
        self.checked_at = Some(local_now);
    }

    pub fn offset(&self) -> Option<Duration> {
        self.offset
    }

    pub fn checked_at(&self) -> Option<DateTime<Utc>> {
        self.checked_at
    }

    /// Local time shifted onto the server clock.
    pub fn synchronized(&self, local: DateTime<Utc>) -> DateTime<Utc> {
        match self.offset {
            Some(off) => local + off,
            None => local,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.synchronized(Utc::now())
    }

    pub fn status(&self) -> TimeSyncStatus {
        let Some(off) = self.offset else {
            return TimeSyncStatus {
                is_valid: false,
                offset_seconds: 0.0,
                offset_hours: 0.0,
                status: SyncHealth::Unknown,
                message: "clock not checked yet".into(),
            };
        };
        let secs = off.num_milliseconds() as f64 / 1000.0;
        let status = classify_offset(secs);
        let direction = if secs >= 0.0 { "behind" } else { "ahead of" };
        let message = match status {
            SyncHealth::Good => "clock in sync".to_string(),
            SyncHealth::Warning => format!("local clock {:.0}s {direction} server", secs.abs()),
            _ => format!(
                "local clock {:.1}h {direction} server",
                (secs / 3600.0).abs()
            ),
        };
        TimeSyncStatus {
            is_valid: matches!(status, SyncHealth::Good | SyncHealth::Warning),
            offset_seconds: secs,
            offset_hours: secs / 3600.0,
            status,
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_naive_and_offset_timestamps() {
        let naive = parse_timestamp("2024-05-01T12:30:00.123456").unwrap();
        assert_eq!(
            naive,
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap() + Duration::microseconds(123_456)
        );
        let zoned = parse_timestamp("2024-05-01T14:30:00+02:00").unwrap();
        assert_eq!(zoned, Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap());
        assert!(parse_timestamp("yesterday").is_err());
    }

    #[test]
    fn range_ends_at_now() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let r = time_range(6.0, now);
        assert_eq!(r.end, now);
        assert_eq!(r.start, Utc.with_ymd_and_hms(2024, 5, 1, 6, 0, 0).unwrap());
    }

    #[test]
    fn drift_bands() {
        assert_eq!(classify_offset(0.0), SyncHealth::Good);
        assert_eq!(classify_offset(-59.9), SyncHealth::Good);
        assert_eq!(classify_offset(60.0), SyncHealth::Warning);
        assert_eq!(classify_offset(300.0), SyncHealth::Warning);
        assert_eq!(classify_offset(-301.0), SyncHealth::Error);
    }

    #[test]
    fn status_unknown_until_observed() {
        let mut ts = TimeSync::new();
        let st = ts.status();
        assert_eq!(st.status, SyncHealth::Unknown);
        assert!(!st.is_valid);

        let local = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        ts.observe(local + Duration::seconds(120), local);
        let st = ts.status();
        assert_eq!(st.status, SyncHealth::Warning);
        assert!(st.is_valid);
        assert!((st.offset_seconds - 120.0).abs() < 1e-9);
        assert_eq!(ts.synchronized(local), local + Duration::seconds(120));
    }
}
