//! Refresh timing: edit throttling and the idle timer.
//!
//! Both are plain deadline trackers driven by the session; the driver loop
//! sleeps until [`Throttle::deadline`] or [`IdleTimer::deadline`].

use std::time::{Duration, Instant};

/// Configuration for event throttling.
#[derive(Debug, Clone)]
pub struct ThrottleConfig {
    /// Minimum interval between refreshes caused by document edits
    pub edit_refresh_interval: Duration,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            edit_refresh_interval: Duration::from_millis(2000),
        }
    }
}

/// Outcome of a throttled hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleDecision {
    /// Refresh now
    Fire,
    /// Refresh later, at the returned deadline
    Deferred(Instant),
}

/// Leading and trailing edge throttle.
///
/// The first hit fires immediately. Hits inside the interval collapse into a
/// single trailing refresh once the interval has elapsed, so the final state
/// is always reported.
#[derive(Debug, Clone)]
pub struct Throttle {
    config: ThrottleConfig,
    last_fire: Option<Instant>,
    pending: Option<Instant>,
}

impl Throttle {
    pub fn new(config: ThrottleConfig) -> Self {
        Self {
            config,
            last_fire: None,
            pending: None,
        }
    }

    pub fn set_interval(&mut self, interval: Duration) {
        self.config.edit_refresh_interval = interval;
    }

    pub fn hit(&mut self, now: Instant) -> ThrottleDecision {
        let interval = self.config.edit_refresh_interval;
        match self.last_fire {
            Some(last) if now.duration_since(last) < interval => {
                let due = last + interval;
                self.pending = Some(due);
                ThrottleDecision::Deferred(due)
            }
            _ => {
                self.last_fire = Some(now);
                self.pending = None;
                ThrottleDecision::Fire
            }
        }
    }

    /// Consume a pending trailing refresh if it is due.
    pub fn take_due(&mut self, now: Instant) -> bool {
        match self.pending {
            Some(due) if now >= due => {
                self.pending = None;
                self.last_fire = Some(now);
                true
            }
            _ => false,
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending
    }

    /// Forget pending work, e.g. when listeners are torn down.
    pub fn reset(&mut self) {
        self.last_fire = None;
        self.pending = None;
    }
}

/// A single re-armable idle deadline.
#[derive(Debug, Clone, Default)]
pub struct IdleTimer {
    deadline: Option<Instant>,
}

impl IdleTimer {
    pub fn schedule(&mut self, now: Instant, timeout: Duration) {
        self.deadline = Some(now + timeout);
    }

    pub fn clear(&mut self) {
        self.deadline = None;
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// True once when the deadline has passed.
    pub fn take_expired(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

/// Earliest of two optional deadlines.
pub fn earliest(a: Option<Instant>, b: Option<Instant>) -> Option<Instant> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}
