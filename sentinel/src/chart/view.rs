//! Per-chart interactive state: rendered series, hover, domain transition and pending data.

use std::time::Instant;

use chrono::{DateTime, Utc};

use super::animation::{anchored_domain, DomainAnimation, TransitionConfig};
use super::{
    downsample, nearest_point, to_ms, visible, visible_range, Domain, Projection, MAX_POINTS,
};
use crate::series::{calculate_stats, data_for_range, MetricKind, ProcessedPoint, Stats};
use crate::types::Period;

#[derive(Debug, Clone, PartialEq)]
pub enum ChartStatus {
    Loading,
    Ready,
    Failed(String),
}

pub struct ChartView {
    kind: MetricKind,
    period: Period,
    points: Vec<ProcessedPoint>,
    // fetched during a transition, swapped in when it completes
    pending: Option<Vec<ProcessedPoint>>,
    animation: DomainAnimation,
    transition: TransitionConfig,
    status: ChartStatus,
    hover: Option<usize>,
    // newest request issued; older replies are dropped
    seq: u64,
    // request whose reply completes a period change; it lands in the transition's target
    transition_seq: Option<u64>,
    // idle refreshes pan to now; cleared once a hovered point anchors the window
    follow_now: bool,
}

impl ChartView {
    pub fn new(
        kind: MetricKind,
        period: Period,
        now: DateTime<Utc>,
        transition: TransitionConfig,
    ) -> Self {
        Self {
            kind,
            period,
            points: Vec::new(),
            pending: None,
            animation: DomainAnimation::idle(Domain::ending_at(now, period.duration_ms())),
            transition,
            status: ChartStatus::Loading,
            hover: None,
            seq: 0,
            transition_seq: None,
            follow_now: true,
        }
    }

    pub fn kind(&self) -> MetricKind {
        self.kind
    }

    pub fn period(&self) -> Period {
        self.period
    }

    pub fn status(&self) -> &ChartStatus {
        &self.status
    }

    pub fn is_animating(&self) -> bool {
        self.animation.is_animating()
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Issue a new request id for the current period (periodic refresh).
    pub fn next_request(&mut self) -> u64 {
        self.seq += 1;
        if self.transition_seq.is_some() {
            // a refresh that supersedes the transition fetch inherits its role
            self.transition_seq = Some(self.seq);
        }
        self.seq
    }

    pub fn follows_now(&self) -> bool {
        self.follow_now
    }

    /// Resume panning the window to the newest data on refresh.
    pub fn follow_live(&mut self) {
        self.follow_now = true;
    }

    /// Switch to `period`, anchoring the hovered point (or the window end) and starting the
    /// transition. Returns the request id the caller must fetch under, or `None` if the
    /// period did not change.
    pub fn request_period(&mut self, period: Period, now: Instant) -> Option<u64> {
        if period == self.period {
            return None;
        }
        let rendered = self.animation.current(now);
        let hovered = self.hovered().map(|p| to_ms(p.timestamp));
        if hovered.is_some() {
            self.follow_now = false;
        }
        let focal = hovered.unwrap_or(rendered.end);
        let target = anchored_domain(&rendered, focal, period.duration_ms());
        self.animation.begin(target, now, &self.transition);
        self.period = period;
        self.pending = None;
        if matches!(self.status, ChartStatus::Failed(_)) {
            self.status = ChartStatus::Loading;
        }
        let seq = self.next_request();
        self.transition_seq = Some(seq);
        Some(seq)
    }

    /// Apply a fetch result. `sync_now` is the synchronized clock used for range filtering.
    pub fn on_data(
        &mut self,
        seq: u64,
        result: Result<Vec<ProcessedPoint>, String>,
        sync_now: DateTime<Utc>,
    ) {
        if seq != self.seq {
            tracing::debug!(
                metric = self.kind.label(),
                seq,
                latest = self.seq,
                "dropping superseded reply"
            );
            return;
        }
        match result {
            Ok(series) => {
                let shaped = downsample(
                    &data_for_range(&series, self.period.hours(), sync_now),
                    MAX_POINTS,
                );
                let completes_transition = self.transition_seq.take() == Some(seq);
                if self.animation.is_animating() {
                    self.pending = Some(shaped);
                } else {
                    // the finished transition already chose the window
                    if !completes_transition && self.follow_now {
                        self.animation
                            .settle(Domain::ending_at(sync_now, self.period.duration_ms()));
                    }
                    self.swap_in(shaped);
                }
            }
            Err(msg) => {
                self.transition_seq = None;
                // adopt the selected window but show the error instead of stale data
                let target = self.animation.target();
                self.animation.settle(target);
                self.pending = None;
                self.points.clear();
                self.hover = None;
                self.status = ChartStatus::Failed(msg);
            }
        }
    }

    /// Advance the transition; pending data lands on the completing frame.
    pub fn tick(&mut self, now: Instant) -> Domain {
        let frame = self.animation.tick(now);
        if frame.completed {
            if let Some(shaped) = self.pending.take() {
                self.swap_in(shaped);
            }
        }
        frame.domain
    }

    fn swap_in(&mut self, shaped: Vec<ProcessedPoint>) {
        let hovered_at = self.hovered().map(|p| p.timestamp);
        self.points = shaped;
        // downsampling picks different indices each refresh; keep the closest point
        self.hover = hovered_at.and_then(|t| {
            self.points
                .iter()
                .enumerate()
                .min_by_key(|(_, p)| (p.timestamp - t).num_milliseconds().abs())
                .map(|(i, _)| i)
        });
        self.status = ChartStatus::Ready;
    }

    pub fn domain(&self, now: Instant) -> Domain {
        self.animation.current(now)
    }

    pub fn points(&self) -> &[ProcessedPoint] {
        &self.points
    }

    pub fn visible_points(&self, domain: &Domain) -> &[ProcessedPoint] {
        visible(&self.points, domain)
    }

    pub fn stats(&self) -> Option<Stats> {
        calculate_stats(&self.points)
    }

    pub fn hovered(&self) -> Option<&ProcessedPoint> {
        self.hover.and_then(|i| self.points.get(i))
    }

    /// Hover the visible point nearest to pointer column `px` on a `width` x `height` plot.
    pub fn hover_at(&mut self, px: f64, width: f64, height: f64, now: Instant) {
        let domain = self.animation.current(now);
        let range = visible_range(&self.points, &domain);
        let vis = &self.points[range.clone()];
        let Some(proj) = Projection::new(domain, vis, width, height) else {
            self.hover = None;
            return;
        };
        self.hover = nearest_point(&proj, vis, px).map(|i| i + range.start);
    }

    /// Keyboard hover: move by `delta` points, starting from the newest.
    pub fn step_hover(&mut self, delta: isize) {
        if self.points.is_empty() {
            self.hover = None;
            return;
        }
        let last = self.points.len() as isize - 1;
        let cur = self.hover.map(|i| i as isize).unwrap_or(last + 1);
        self.hover = Some((cur + delta).clamp(0, last) as usize);
    }

    pub fn clear_hover(&mut self) {
        self.hover = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::tests::point_at;
    use chrono::{Duration as ChronoDuration, TimeZone};
    use std::time::Duration;

    fn now_utc() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn minutes_back(n: i64) -> Vec<ProcessedPoint> {
        (0..n)
            .rev()
            .map(|i| point_at(now_utc() - ChronoDuration::minutes(i), (i % 7) as f64 * 10.0))
            .collect()
    }

    fn fresh_view() -> ChartView {
        ChartView::new(
            MetricKind::Cpu,
            Period::OneHour,
            now_utc(),
            TransitionConfig::default(),
        )
    }

    fn ready_view() -> ChartView {
        let mut v = fresh_view();
        let seq = v.next_request();
        v.on_data(seq, Ok(minutes_back(60)), now_utc());
        v
    }

    #[test]
    fn idle_data_is_filtered_and_downsampled() {
        let mut v = fresh_view();
        let seq = v.next_request();
        v.on_data(seq, Ok(minutes_back(300)), now_utc());
        assert_eq!(v.status(), &ChartStatus::Ready);
        assert!(v.points().len() <= MAX_POINTS);
        assert_eq!(v.points().last().unwrap().timestamp, now_utc());
        let cutoff = now_utc() - ChronoDuration::hours(1);
        assert!(v.points().iter().all(|p| p.timestamp >= cutoff));
    }

    #[test]
    fn data_fetched_mid_transition_waits_for_completion() {
        let t0 = Instant::now();
        let mut v = ready_view();
        let before = v.points().to_vec();

        let seq = v.request_period(Period::SixHours, t0).unwrap();
        assert!(v.is_animating());
        v.on_data(seq, Ok(minutes_back(360)), now_utc());
        assert_eq!(v.points(), &before[..]);

        v.tick(t0 + Duration::from_millis(100));
        assert_eq!(v.points(), &before[..]);

        let domain = v.tick(t0 + Duration::from_secs(1));
        assert!(!v.is_animating());
        assert_ne!(v.points(), &before[..]);
        assert!((domain.duration() - Period::SixHours.duration_ms()).abs() < 1e-6);
        // the window end was the focal point, so it stays put
        assert!((domain.end - to_ms(now_utc())).abs() < 1e-6);
    }

    #[test]
    fn hovered_point_is_the_focal_timestamp() {
        let t0 = Instant::now();
        let mut v = ready_view();
        v.step_hover(-20);
        let focal = v.hovered().unwrap().timestamp;
        let old = v.domain(t0);
        let f = old.fraction_of(to_ms(focal));

        v.request_period(Period::TwelveHours, t0).unwrap();
        let new = v.tick(t0 + Duration::from_secs(5));
        assert!((new.fraction_of(to_ms(focal)) - f).abs() < 1e-9);
    }

    #[test]
    fn late_transition_reply_keeps_anchored_window() {
        let t0 = Instant::now();
        let mut v = ready_view();
        v.step_hover(-30);
        let focal = to_ms(v.hovered().unwrap().timestamp);
        let f = v.domain(t0).fraction_of(focal);

        let seq = v.request_period(Period::SixHours, t0).unwrap();
        let settled = v.tick(t0 + Duration::from_secs(1));
        assert!(!v.is_animating());
        assert!((settled.fraction_of(focal) - f).abs() < 1e-9);

        // reply arrives after the animation finished, with the clock moved on
        v.on_data(seq, Ok(minutes_back(360)), now_utc() + ChronoDuration::seconds(30));
        assert_eq!(v.status(), &ChartStatus::Ready);
        let after = v.domain(t0 + Duration::from_secs(2));
        assert_eq!(after, settled);
        assert!((after.fraction_of(focal) - f).abs() < 1e-9);
        assert!(v.hovered().is_some());
    }

    #[test]
    fn idle_refresh_does_not_pan_an_anchored_window() {
        let t0 = Instant::now();
        let mut v = ready_view();
        v.step_hover(-30);
        let seq = v.request_period(Period::SixHours, t0).unwrap();
        v.on_data(seq, Ok(minutes_back(360)), now_utc());
        let anchored = v.tick(t0 + Duration::from_secs(1));
        assert!(!v.follows_now());

        let seq = v.next_request();
        v.on_data(seq, Ok(minutes_back(360)), now_utc() + ChronoDuration::seconds(10));
        assert_eq!(v.domain(t0 + Duration::from_secs(2)), anchored);

        v.follow_live();
        let seq = v.next_request();
        let later = now_utc() + ChronoDuration::seconds(20);
        v.on_data(seq, Ok(minutes_back(360)), later);
        assert!((v.domain(t0 + Duration::from_secs(3)).end - to_ms(later)).abs() < 1e-6);
    }

    #[test]
    fn idle_refresh_pans_to_now_without_anchor() {
        let t0 = Instant::now();
        let mut v = ready_view();
        let seq = v.next_request();
        let later = now_utc() + ChronoDuration::seconds(10);
        v.on_data(seq, Ok(minutes_back(60)), later);
        let d = v.domain(t0);
        assert!((d.end - to_ms(later)).abs() < 1e-6);
        assert!((d.duration() - Period::OneHour.duration_ms()).abs() < 1e-6);
    }

    #[test]
    fn hover_survives_a_refresh_on_the_nearest_point() {
        let mut v = ready_view();
        v.step_hover(-5);
        let before = v.hovered().unwrap().timestamp;
        // same hour, shifted by 20s so no timestamp matches exactly
        let shifted: Vec<_> = minutes_back(60)
            .into_iter()
            .map(|p| point_at(p.timestamp + ChronoDuration::seconds(20), p.usage))
            .collect();
        let seq = v.next_request();
        v.on_data(seq, Ok(shifted), now_utc() + ChronoDuration::seconds(20));
        let after = v.hovered().unwrap().timestamp;
        assert_eq!(after, before + ChronoDuration::seconds(20));
    }

    #[test]
    fn failure_during_transition_adopts_target_and_clears() {
        let t0 = Instant::now();
        let mut v = ready_view();
        let seq = v.request_period(Period::SixHours, t0).unwrap();
        v.on_data(seq, Err("HTTP 500 from /metrics/range".into()), now_utc());
        assert!(!v.is_animating());
        assert!(v.points().is_empty());
        assert!(matches!(v.status(), ChartStatus::Failed(_)));
        assert!((v.domain(t0).duration() - Period::SixHours.duration_ms()).abs() < 1e-6);
    }

    #[test]
    fn superseded_replies_are_ignored() {
        let t0 = Instant::now();
        let mut v = ready_view();
        let stale = v.request_period(Period::SixHours, t0).unwrap();
        let fresh = v.request_period(Period::TwelveHours, t0).unwrap();
        v.on_data(stale, Err("late".into()), now_utc());
        assert_eq!(v.status(), &ChartStatus::Ready);
        v.on_data(fresh, Ok(minutes_back(720)), now_utc());
        v.tick(t0 + Duration::from_secs(5));
        assert_eq!(v.period(), Period::TwelveHours);
        assert_eq!(v.points().len(), MAX_POINTS);
    }

    #[test]
    fn pointer_hover_picks_nearest_visible_point() {
        let t0 = Instant::now();
        let mut v = ready_view();
        let width = 120.0;
        v.hover_at(width, width, 20.0, t0);
        assert_eq!(v.hovered().unwrap().timestamp, now_utc());
        v.hover_at(0.0, width, 20.0, t0);
        let first_visible = v.visible_points(&v.domain(t0))[0].timestamp;
        assert_eq!(v.hovered().unwrap().timestamp, first_visible);
        v.clear_hover();
        assert!(v.hovered().is_none());
    }
}
