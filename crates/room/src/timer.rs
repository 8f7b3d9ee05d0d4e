//! Owned timers driven by an explicit clock
//!
//! Nothing here sleeps or spawns. The caller passes `now` in and asks whether a
//! deadline has passed. Cancelling a timer is dropping it.

use std::time::{Duration, Instant};

/// One-shot deadline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    deadline: Instant,
}

impl Countdown {
    pub fn new(now: Instant, duration: Duration) -> Self {
        Self {
            deadline: now + duration,
        }
    }

    pub fn is_elapsed(&self, now: Instant) -> bool {
        now >= self.deadline
    }
}

/// Repeating period remembering when it last fired
///
/// An interval that has never fired is due immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    period: Duration,
    last_fired: Option<Instant>,
}

impl Interval {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            last_fired: None,
        }
    }

    /// Interval whose first firing is one full period after `now`
    pub fn starting_at(period: Duration, now: Instant) -> Self {
        Self {
            period,
            last_fired: Some(now),
        }
    }

    pub fn last_fired(&self) -> Option<Instant> {
        self.last_fired
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.last_fired
            .map_or(true, |last| now.saturating_duration_since(last) >= self.period)
    }

    /// Fire if due; returns whether it fired
    pub fn poll(&mut self, now: Instant) -> bool {
        if !self.is_due(now) {
            return false;
        }
        self.last_fired = Some(now);
        true
    }
}
