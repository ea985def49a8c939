//! Time-window transition: `Idle -> Animating -> Idle`, driven by `tick(now)`.
//!
//! A rescale keeps a focal timestamp at the same horizontal position, then eases the
//! rendered window from the old bounds to the new ones.

use std::time::{Duration, Instant};

use super::Domain;

/// New window of `duration_ms` that keeps `focal` at the fractional position it has in `old`.
pub fn anchored_domain(old: &Domain, focal: f64, duration_ms: f64) -> Domain {
    let f = old.fraction_of(focal);
    let start = focal - f * duration_ms;
    Domain::new(start, start + duration_ms)
}

/// Fast start, long tail. Used when the window shrinks.
pub fn ease_out_expo(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    if t >= 1.0 {
        1.0
    } else {
        1.0 - 2f64.powf(-10.0 * t)
    }
}

/// Symmetric and gentle. Used when the window grows.
pub fn ease_in_out_cubic(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Contract,
    Expand,
}

impl Direction {
    pub fn between(from: &Domain, to: &Domain) -> Self {
        if to.duration() < from.duration() {
            Direction::Contract
        } else {
            Direction::Expand
        }
    }

    fn ease(&self, t: f64) -> f64 {
        match self {
            Direction::Contract => ease_out_expo(t),
            Direction::Expand => ease_in_out_cubic(t),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransitionConfig {
    /// Zero makes contraction instant.
    pub contract: Duration,
    pub expand: Duration,
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            contract: Duration::from_millis(180),
            expand: Duration::from_millis(450),
        }
    }
}

impl TransitionConfig {
    fn duration(&self, dir: Direction) -> Duration {
        match dir {
            Direction::Contract => self.contract,
            Direction::Expand => self.expand,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DomainAnimation {
    Idle(Domain),
    Animating {
        from: Domain,
        to: Domain,
        started: Instant,
        duration: Duration,
        direction: Direction,
    },
}

/// What to draw this frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub domain: Domain,
    /// Eased progress in `[0, 1]`.
    pub progress: f64,
    /// Set on the tick that finished the transition.
    pub completed: bool,
}

impl DomainAnimation {
    pub fn idle(domain: Domain) -> Self {
        DomainAnimation::Idle(domain)
    }

    pub fn is_animating(&self) -> bool {
        matches!(self, DomainAnimation::Animating { .. })
    }

    /// Where the transition ends (or the current domain when idle).
    pub fn target(&self) -> Domain {
        match self {
            DomainAnimation::Idle(d) => *d,
            DomainAnimation::Animating { to, .. } => *to,
        }
    }

    /// Rendered domain at `now` without advancing the state.
    pub fn current(&self, now: Instant) -> Domain {
        match self {
            DomainAnimation::Idle(d) => *d,
            DomainAnimation::Animating {
                from,
                to,
                started,
                duration,
                direction,
            } => from.lerp(to, direction.ease(raw_progress(*started, *duration, now))),
        }
    }

    /// Start a transition from whatever is rendered at `now` towards `to`.
    pub fn begin(&mut self, to: Domain, now: Instant, cfg: &TransitionConfig) {
        let from = self.current(now);
        let direction = Direction::between(&from, &to);
        let duration = cfg.duration(direction);
        *self = if duration.is_zero() || from == to {
            DomainAnimation::Idle(to)
        } else {
            DomainAnimation::Animating {
                from,
                to,
                started: now,
                duration,
                direction,
            }
        };
    }

    /// Advance to `now`; completes into `Idle(to)` once progress reaches 1.
    pub fn tick(&mut self, now: Instant) -> Frame {
        match *self {
            DomainAnimation::Idle(d) => Frame {
                domain: d,
                progress: 1.0,
                completed: false,
            },
            DomainAnimation::Animating {
                from,
                to,
                started,
                duration,
                direction,
            } => {
                let raw = raw_progress(started, duration, now);
                if raw >= 1.0 {
                    *self = DomainAnimation::Idle(to);
                    Frame {
                        domain: to,
                        progress: 1.0,
                        completed: true,
                    }
                } else {
                    let progress = direction.ease(raw);
                    Frame {
                        domain: from.lerp(&to, progress),
                        progress,
                        completed: false,
                    }
                }
            }
        }
    }

    /// Drop any running transition and settle on `domain`.
    pub fn settle(&mut self, domain: Domain) {
        *self = DomainAnimation::Idle(domain);
    }
}

fn raw_progress(started: Instant, duration: Duration, now: Instant) -> f64 {
    if duration.is_zero() {
        return 1.0;
    }
    let elapsed = now.saturating_duration_since(started);
    (elapsed.as_secs_f64() / duration.as_secs_f64()).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: f64 = 3_600_000.0;

    #[test]
    fn focal_point_keeps_its_fraction() {
        let old = Domain::new(10.0 * HOUR, 11.0 * HOUR);
        for (focal, dur) in [
            (10.25 * HOUR, 6.0 * HOUR),
            (11.0 * HOUR, 12.0 * HOUR),
            (10.9 * HOUR, 0.5 * HOUR),
            (10.0 * HOUR, 6.0 * HOUR),
        ] {
            let f = old.fraction_of(focal);
            let new = anchored_domain(&old, focal, dur);
            assert!((new.duration() - dur).abs() < 1e-6);
            assert!((new.fraction_of(focal) - f).abs() < 1e-9);
        }
    }

    #[test]
    fn easings_hit_endpoints_and_stay_monotonic() {
        for ease in [ease_out_expo as fn(f64) -> f64, ease_in_out_cubic] {
            assert!(ease(0.0).abs() < 1e-12);
            assert_eq!(ease(1.0), 1.0);
            let mut prev = 0.0;
            for i in 1..=100 {
                let v = ease(i as f64 / 100.0);
                assert!(v >= prev);
                prev = v;
            }
        }
        // contraction front-loads its motion
        assert!(ease_out_expo(0.2) > ease_in_out_cubic(0.2));
    }

    #[test]
    fn transition_runs_to_target_then_idles() {
        let cfg = TransitionConfig::default();
        let t0 = Instant::now();
        let old = Domain::new(0.0, HOUR);
        let new = anchored_domain(&old, HOUR, 6.0 * HOUR);
        let mut anim = DomainAnimation::idle(old);
        anim.begin(new, t0, &cfg);
        assert!(anim.is_animating());
        assert_eq!(anim.target(), new);

        let mid = anim.tick(t0 + cfg.expand / 2);
        assert!(!mid.completed);
        assert!(mid.progress > 0.0 && mid.progress < 1.0);
        assert!(mid.domain.duration() > old.duration() && mid.domain.duration() < new.duration());
        // anchored at the end: both windows end at the same instant
        assert!((mid.domain.end - HOUR).abs() < 1e-6);

        let done = anim.tick(t0 + cfg.expand);
        assert!(done.completed);
        assert_eq!(done.domain, new);
        assert_eq!(anim, DomainAnimation::Idle(new));
        assert!(!anim.tick(t0 + cfg.expand * 2).completed);
    }

    #[test]
    fn zero_length_contraction_is_instant() {
        let cfg = TransitionConfig {
            contract: Duration::ZERO,
            ..TransitionConfig::default()
        };
        let old = Domain::new(0.0, 12.0 * HOUR);
        let new = anchored_domain(&old, 12.0 * HOUR, HOUR);
        let mut anim = DomainAnimation::idle(old);
        anim.begin(new, Instant::now(), &cfg);
        assert_eq!(anim, DomainAnimation::Idle(new));
    }

    #[test]
    fn retarget_mid_flight_starts_from_rendered_domain() {
        let cfg = TransitionConfig::default();
        let t0 = Instant::now();
        let mut anim = DomainAnimation::idle(Domain::new(0.0, HOUR));
        anim.begin(Domain::new(-5.0 * HOUR, HOUR), t0, &cfg);
        let at = t0 + cfg.expand / 3;
        let rendered = anim.current(at);
        anim.begin(Domain::new(-11.0 * HOUR, HOUR), at, &cfg);
        match anim {
            DomainAnimation::Animating { from, .. } => assert_eq!(from, rendered),
            other => panic!("expected animation, got {other:?}"),
        }
    }
}
