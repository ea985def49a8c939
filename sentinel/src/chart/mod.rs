//! Chart geometry: time domains, coordinate projection, hover lookup and downsampling.
//!
//! Everything here is pure so the UI layer only has to hand over a plot size.

pub mod animation;
pub mod view;

use std::ops::Range;

use chrono::{DateTime, TimeZone, Utc};

use crate::series::ProcessedPoint;

/// Point cap applied before drawing.
pub const MAX_POINTS: usize = 50;

/// Visible time window, in unix milliseconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Domain {
    pub start: f64,
    pub end: f64,
}

pub fn to_ms(t: DateTime<Utc>) -> f64 {
    t.timestamp_millis() as f64
}

pub fn from_ms(ms: f64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms.round() as i64)
        .single()
        .unwrap_or_default()
}

impl Domain {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    /// `[end - duration, end]`.
    pub fn ending_at(end: DateTime<Utc>, duration_ms: f64) -> Self {
        let end = to_ms(end);
        Self::new(end - duration_ms, end)
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Fractional position of `t` (ms); 0 at start, 1 at end.
    pub fn fraction_of(&self, t: f64) -> f64 {
        let d = self.duration();
        if d == 0.0 {
            return 1.0;
        }
        (t - self.start) / d
    }

    pub fn contains(&self, t: f64) -> bool {
        t >= self.start && t <= self.end
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        from_ms(self.start)
    }

    pub fn end_time(&self) -> DateTime<Utc> {
        from_ms(self.end)
    }

    /// Linear blend between two domains, `t` in `[0, 1]`.
    pub fn lerp(&self, to: &Domain, t: f64) -> Domain {
        let t = t.clamp(0.0, 1.0);
        Domain::new(
            self.start + (to.start - self.start) * t,
            self.end + (to.end - self.end) * t,
        )
    }
}

/// Vertical value range of the visible series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YRange {
    pub min: f64,
    pub max: f64,
}

const FLAT_PAD_RATIO: f64 = 0.1;
const FLAT_MIN_WIDTH: f64 = 5.0;

/// Min/max of `values`. A flat series gets an artificial symmetric range so it draws
/// as a visible line instead of collapsing.
pub fn y_range<I: IntoIterator<Item = f64>>(values: I) -> Option<YRange> {
    let mut it = values.into_iter();
    let first = it.next()?;
    let (min, max) = it.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if max > min {
        return Some(YRange { min, max });
    }
    let pad = (min.abs() * FLAT_PAD_RATIO).max(FLAT_MIN_WIDTH / 2.0);
    Some(YRange {
        min: min - pad,
        max: max + pad,
    })
}

/// Index range of an ascending series that falls inside `domain`.
pub fn visible_range(points: &[ProcessedPoint], domain: &Domain) -> Range<usize> {
    let lo = points.partition_point(|p| to_ms(p.timestamp) < domain.start);
    let hi = points.partition_point(|p| to_ms(p.timestamp) <= domain.end);
    lo..hi.max(lo)
}

pub fn visible<'a>(points: &'a [ProcessedPoint], domain: &Domain) -> &'a [ProcessedPoint] {
    &points[visible_range(points, domain)]
}

/// Maps (time, value) onto a `width` x `height` surface with y growing downwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub domain: Domain,
    pub y: YRange,
    pub width: f64,
    pub height: f64,
}

impl Projection {
    /// `None` when nothing is visible.
    pub fn new(
        domain: Domain,
        visible: &[ProcessedPoint],
        width: f64,
        height: f64,
    ) -> Option<Self> {
        let y = y_range(visible.iter().map(|p| p.usage))?;
        Some(Self {
            domain,
            y,
            width,
            height,
        })
    }

    pub fn x(&self, t: DateTime<Utc>) -> f64 {
        self.domain.fraction_of(to_ms(t)) * self.width
    }

    pub fn y(&self, v: f64) -> f64 {
        let span = self.y.max - self.y.min;
        (1.0 - (v - self.y.min) / span) * self.height
    }

    /// Inverse of `x`: pointer column back to a timestamp.
    pub fn time_at(&self, px: f64) -> DateTime<Utc> {
        let frac = if self.width > 0.0 { px / self.width } else { 1.0 };
        from_ms(self.domain.start + frac * self.domain.duration())
    }
}

/// Index of the point whose projected x is closest to `px`.
pub fn nearest_point(proj: &Projection, points: &[ProcessedPoint], px: f64) -> Option<usize> {
    points
        .iter()
        .enumerate()
        .map(|(i, p)| (i, (proj.x(p.timestamp) - px).abs()))
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(i, _)| i)
}

/// Reduce to at most `cap` points by evenly spaced index selection. Indices depend only
/// on the length, so the same series always yields the same shape. First and last are
/// always kept.
pub fn downsample<T: Clone>(points: &[T], cap: usize) -> Vec<T> {
    let len = points.len();
    if len <= cap {
        return points.to_vec();
    }
    if cap == 0 {
        return Vec::new();
    }
    if cap == 1 {
        return vec![points[len - 1].clone()];
    }
    let step = (len - 1) as f64 / (cap - 1) as f64;
    (0..cap)
        .map(|i| points[((i as f64 * step).round() as usize).min(len - 1)].clone())
        .collect()
}
