//! Sliding window request counter for a single user.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Timestamps of one user's requests inside the last `duration`.
#[derive(Debug, Clone)]
pub struct RateWindow {
    duration: Duration,
    events: VecDeque<Instant>,
}

impl RateWindow {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            events: VecDeque::new(),
        }
    }

    /// Record one event at `now` and return the number of events in the window.
    pub fn record(&mut self, now: Instant) -> u64 {
        self.events.push_back(now);
        self.prune(now);
        self.events.len() as u64
    }

    /// Number of events inside the window ending at `now`.
    pub fn rate(&mut self, now: Instant) -> u64 {
        self.prune(now);
        self.events.len() as u64
    }

    /// Time of the most recent event.
    pub fn last_seen(&self) -> Option<Instant> {
        self.events.back().copied()
    }

    /// True when no event falls inside the window ending at `now`.
    ///
    /// An idle window counts exactly like a fresh one.
    pub fn is_idle(&self, now: Instant) -> bool {
        match (self.last_seen(), now.checked_sub(self.duration)) {
            (None, _) => true,
            (Some(last), Some(cutoff)) => last < cutoff,
            (Some(_), None) => false,
        }
    }

    /// Drop events older than the window.
    fn prune(&mut self, now: Instant) {
        // Near the clock origin nothing can be old enough to drop.
        let Some(cutoff) = now.checked_sub(self.duration) else {
            return;
        };
        while let Some(&front) = self.events.front() {
            if front < cutoff {
                self.events.pop_front();
            } else {
                break;
            }
        }
    }
}
