//! Traffic monitor task.
//!
//! Consumes one event per proxied request, feeds the [`RateTracker`] and,
//! when a user crosses the threshold, proposes a new route snapshot with that
//! user flagged. The proposal is best effort: if the route table's adoption
//! slot is occupied, it is dropped and never retried.

use tokio::sync::mpsc;

use crate::observability::metrics;
use crate::traffic::table::{RouteTableError, RouteTableHandle};
use crate::traffic::tracker::RateTracker;

/// What happened to one request event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorOutcome {
    /// The user is within the threshold.
    WithinLimit,
    /// Over the threshold, but already flagged; no new snapshot.
    AlreadyFlagged,
    /// Over the threshold and a snapshot flagging the user was handed over.
    Flagged,
    /// Over the threshold, but the route table could not take the update.
    Dropped,
}

/// Owns the rate tracker; the only writer of per-user windows.
pub struct TrafficMonitor {
    tracker: RateTracker,
    table: RouteTableHandle,
}

/// Sender side of the monitor's event queue.
#[derive(Clone, Debug)]
pub struct TrafficMonitorHandle {
    events: mpsc::Sender<String>,
}

impl TrafficMonitor {
    pub fn new(tracker: RateTracker, table: RouteTableHandle) -> Self {
        Self { tracker, table }
    }

    /// Start the monitor task with an event queue of `capacity` entries.
    pub fn spawn(self, capacity: usize) -> TrafficMonitorHandle {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        tokio::spawn(self.run(rx));
        TrafficMonitorHandle { events: tx }
    }

    async fn run(mut self, mut events: mpsc::Receiver<String>) {
        while let Some(user_id) = events.recv().await {
            self.on_user_request(&user_id).await;
        }
        tracing::debug!("Traffic monitor stopped");
    }

    /// Account for one request from `user_id`.
    pub async fn on_user_request(&mut self, user_id: &str) -> MonitorOutcome {
        let exceeded = self.tracker.record_and_check(user_id);
        metrics::record_tracked_users(self.tracker.len());
        if !exceeded {
            return MonitorOutcome::WithinLimit;
        }

        let current = match self.table.snapshot().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::error!(user_id, error = %e, "Cannot read route table");
                return MonitorOutcome::Dropped;
            }
        };

        if current.is_flagged(user_id) {
            tracing::debug!(user_id, "User exceeded threshold again, already flagged");
            return MonitorOutcome::AlreadyFlagged;
        }

        match self.table.try_replace(current.with_flagged(user_id)) {
            Ok(()) => {
                tracing::info!(user_id, "User exceeded request threshold, flagging");
                MonitorOutcome::Flagged
            }
            Err(RouteTableError::Busy) => {
                tracing::debug!(user_id, "Route table busy, dropping update");
                metrics::record_route_update("dropped");
                MonitorOutcome::Dropped
            }
            Err(RouteTableError::Closed) => {
                tracing::error!(user_id, "Route table actor is gone, dropping update");
                MonitorOutcome::Dropped
            }
        }
    }
}

impl TrafficMonitorHandle {
    /// Queue a request event. Waits only while the queue is full.
    pub async fn report(&self, user_id: String) {
        if self.events.send(user_id).await.is_err() {
            tracing::error!("Traffic monitor is gone, request not counted");
        }
    }
}
