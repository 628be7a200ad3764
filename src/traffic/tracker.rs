//! Per-user sliding window rate tracking.
//!
//! # Responsibilities
//! - Keep one [`RateWindow`] per user id, created lazily
//! - Decide whether a user exceeded the threshold in the current window
//! - Reset a user's window once it triggers
//! - Bound memory: sweep idle windows, cap the number of tracked users
//!
//! # Design Decisions
//! - Owned by a single task, so plain `HashMap` with `&mut self`, no locking
//! - Time is injected (`record_and_check_at`) so decisions are testable

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::traffic::window::RateWindow;

/// Sliding window counters for every user seen recently.
#[derive(Debug)]
pub struct RateTracker {
    windows: HashMap<String, RateWindow>,
    window: Duration,
    threshold: u64,
    max_users: usize,
    last_sweep: Option<Instant>,
}

impl RateTracker {
    pub fn new(window: Duration, threshold: u64, max_users: usize) -> Self {
        Self {
            windows: HashMap::new(),
            window,
            threshold,
            max_users: max_users.max(1),
            last_sweep: None,
        }
    }

    /// Record one request for `user_id` now.
    pub fn record_and_check(&mut self, user_id: &str) -> bool {
        self.record_and_check_at(user_id, Instant::now())
    }

    /// Record one request for `user_id` at `now`.
    ///
    /// Returns true when the user made more than `threshold` requests within
    /// the window. The user's window is replaced by a fresh one in that case.
    pub fn record_and_check_at(&mut self, user_id: &str, now: Instant) -> bool {
        self.maybe_sweep(now);

        let window = self.window;
        let rate = self
            .windows
            .entry(user_id.to_string())
            .or_insert_with(|| RateWindow::new(window))
            .record(now);

        let exceeded = rate > self.threshold;
        if exceeded {
            self.windows.insert(user_id.to_string(), RateWindow::new(window));
        }

        if self.windows.len() > self.max_users {
            self.evict(now);
        }

        exceeded
    }

    /// Number of users currently tracked.
    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// Drop idle windows at most once per window length.
    fn maybe_sweep(&mut self, now: Instant) {
        let due = match self.last_sweep {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.window,
        };
        if due {
            self.sweep_idle(now);
            self.last_sweep = Some(now);
        }
    }

    fn sweep_idle(&mut self, now: Instant) {
        let before = self.windows.len();
        self.windows.retain(|_, w| !w.is_idle(now));
        let removed = before - self.windows.len();
        if removed > 0 {
            tracing::debug!(removed, remaining = self.windows.len(), "Swept idle rate windows");
        }
    }

    /// Bring the map back under capacity.
    ///
    /// Idle windows go first; if that is not enough, the least recently seen
    /// users are dropped until the map is at 90% of capacity, so a steady
    /// stream of new users does not pay for a scan on every request.
    fn evict(&mut self, now: Instant) {
        self.sweep_idle(now);
        self.last_sweep = Some(now);
        if self.windows.len() <= self.max_users {
            return;
        }

        let target = self.max_users - self.max_users / 10;
        let excess = self.windows.len().saturating_sub(target);

        let mut by_age: Vec<(Option<Instant>, String)> = self
            .windows
            .iter()
            .map(|(id, w)| (w.last_seen(), id.clone()))
            .collect();
        by_age.sort_unstable();

        for (_, id) in by_age.into_iter().take(excess) {
            self.windows.remove(&id);
        }
        tracing::warn!(
            evicted = excess,
            capacity = self.max_users,
            "Rate tracker over capacity, evicted least recently seen users"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_below_threshold_never_triggers() {
        let start = Instant::now();
        let mut tracker = RateTracker::new(Duration::from_secs(1), 3, 100);

        for i in 0..3 {
            assert!(!tracker.record_and_check_at("u2", start + ms(i * 10)));
        }
    }

    #[test]
    fn test_threshold_plus_one_triggers() {
        let start = Instant::now();
        let mut tracker = RateTracker::new(Duration::from_secs(1), 3, 100);

        assert!(!tracker.record_and_check_at("u1", start));
        assert!(!tracker.record_and_check_at("u1", start + ms(10)));
        assert!(!tracker.record_and_check_at("u1", start + ms(20)));
        assert!(tracker.record_and_check_at("u1", start + ms(30)));
    }

    #[test]
    fn test_window_resets_after_trigger() {
        let start = Instant::now();
        let mut tracker = RateTracker::new(Duration::from_secs(1), 2, 100);

        for i in 0..2 {
            tracker.record_and_check_at("u1", start + ms(i));
        }
        assert!(tracker.record_and_check_at("u1", start + ms(2)));

        // A fresh window needs threshold + 1 more events.
        assert!(!tracker.record_and_check_at("u1", start + ms(3)));
        assert!(!tracker.record_and_check_at("u1", start + ms(4)));
        assert!(tracker.record_and_check_at("u1", start + ms(5)));
    }

    #[test]
    fn test_requests_spread_over_windows_do_not_trigger() {
        let start = Instant::now();
        let mut tracker = RateTracker::new(Duration::from_secs(1), 2, 100);

        for i in 0..10 {
            assert!(!tracker.record_and_check_at("slow", start + ms(i * 600)));
        }
    }

    #[test]
    fn test_users_are_independent() {
        let start = Instant::now();
        let mut tracker = RateTracker::new(Duration::from_secs(1), 1, 100);

        assert!(!tracker.record_and_check_at("a", start));
        assert!(!tracker.record_and_check_at("b", start));
        assert!(tracker.record_and_check_at("a", start + ms(1)));
        assert!(tracker.record_and_check_at("b", start + ms(1)));
    }

    #[test]
    fn test_zero_threshold_trips_on_first_request() {
        let mut tracker = RateTracker::new(Duration::ZERO, 0, 100);
        assert!(tracker.record_and_check(""));
    }

    #[test]
    fn test_idle_windows_are_swept() {
        let start = Instant::now();
        let mut tracker = RateTracker::new(Duration::from_secs(1), 10, 100);

        tracker.record_and_check_at("old", start);
        tracker.record_and_check_at("other", start + ms(1));
        assert_eq!(tracker.len(), 2);

        tracker.record_and_check_at("new", start + ms(2500));
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn test_capacity_is_bounded() {
        let start = Instant::now();
        let mut tracker = RateTracker::new(Duration::from_secs(60), 10, 10);

        for i in 0..50u64 {
            tracker.record_and_check_at(&format!("user-{i}"), start + ms(i));
            assert!(tracker.len() <= 10);
        }
        // The most recent user survives eviction.
        assert!(!tracker.is_empty());
        assert!(tracker.windows.contains_key("user-49"));
        assert!(!tracker.windows.contains_key("user-0"));
    }
}
