//! Route table actor.
//!
//! One task owns the current [`RouteSnapshot`]. Every loop iteration does
//! exactly one of two things:
//!
//! ```text
//! Offer:   requester ──oneshot──▶ Arc<RouteSnapshot> (current)
//! Replace: adoption slot (capacity 1) ──▶ current = candidate
//! ```
//!
//! Because the two never interleave, a snapshot that leaves the actor is
//! always complete. A pending candidate is adopted before any queued request
//! is answered, so a writer that replaces and then reads sees its own update.
//! Candidates are adopted only if they extend the current version by exactly
//! one, so a candidate built from a superseded snapshot can never erase a flag.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use crate::observability::metrics;
use crate::traffic::snapshot::RouteSnapshot;

/// Pending snapshot requests the actor will queue before senders wait.
const REQUEST_QUEUE: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RouteTableError {
    /// The adoption slot already holds a candidate.
    #[error("route table is busy")]
    Busy,

    /// The actor has stopped.
    #[error("route table actor is gone")]
    Closed,
}

type SnapshotReply = oneshot::Sender<Arc<RouteSnapshot>>;

/// The single owner of the route table.
pub struct RouteTable {
    current: Arc<RouteSnapshot>,
    requests: mpsc::Receiver<SnapshotReply>,
    updates: mpsc::Receiver<RouteSnapshot>,
}

/// Cheap, cloneable access to the route table actor.
#[derive(Clone, Debug)]
pub struct RouteTableHandle {
    requests: mpsc::Sender<SnapshotReply>,
    updates: mpsc::Sender<RouteSnapshot>,
}

impl RouteTable {
    /// Start the actor with `initial` as the current snapshot.
    ///
    /// Must be called from within a Tokio runtime. The actor runs until every
    /// handle has been dropped.
    pub fn spawn(initial: RouteSnapshot) -> RouteTableHandle {
        let (request_tx, request_rx) = mpsc::channel(REQUEST_QUEUE);
        let (update_tx, update_rx) = mpsc::channel(1);

        let actor = RouteTable {
            current: Arc::new(initial),
            requests: request_rx,
            updates: update_rx,
        };
        tokio::spawn(actor.run());

        RouteTableHandle {
            requests: request_tx,
            updates: update_tx,
        }
    }

    async fn run(mut self) {
        tracing::debug!(version = self.current.version(), "Route table actor started");
        loop {
            // Updates first: a candidate handed over before a request is
            // always visible to that request.
            tokio::select! {
                biased;

                Some(candidate) = self.updates.recv() => {
                    self.adopt(candidate);
                }
                Some(reply) = self.requests.recv() => {
                    // A requester that gave up is not an error.
                    let _ = reply.send(Arc::clone(&self.current));
                }
                else => break,
            }
        }
        tracing::debug!("Route table actor stopped");
    }

    fn adopt(&mut self, candidate: RouteSnapshot) {
        if candidate.version() != self.current.version() + 1 {
            tracing::debug!(
                current = self.current.version(),
                candidate = candidate.version(),
                "Discarding route snapshot built from a superseded version"
            );
            metrics::record_route_update("stale");
            return;
        }

        tracing::info!(
            version = candidate.version(),
            flagged = candidate.flagged().len(),
            "Route table updated"
        );
        metrics::record_route_update("adopted");
        metrics::record_flagged_users(candidate.flagged().len());
        self.current = Arc::new(candidate);
    }
}

impl RouteTableHandle {
    /// Wait for the actor to offer the current snapshot.
    pub async fn snapshot(&self) -> Result<Arc<RouteSnapshot>, RouteTableError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.requests
            .send(reply_tx)
            .await
            .map_err(|_| RouteTableError::Closed)?;
        reply_rx.await.map_err(|_| RouteTableError::Closed)
    }

    /// Hand a new snapshot to the actor without waiting.
    ///
    /// Fails with [`RouteTableError::Busy`] if a candidate is already waiting
    /// for adoption; the snapshot is dropped in that case.
    pub fn try_replace(&self, next: RouteSnapshot) -> Result<(), RouteTableError> {
        self.updates.try_send(next).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => RouteTableError::Busy,
            mpsc::error::TrySendError::Closed(_) => RouteTableError::Closed,
        })
    }
}
