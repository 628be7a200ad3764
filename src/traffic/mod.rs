//! Per-user traffic tracking and the shared route table.
//!
//! # Data Flow
//! ```text
//! Dispatcher (per request)
//!     → monitor.rs (event queue, single task)
//!         → tracker.rs / window.rs (sliding window per user)
//!         → on threshold crossed: snapshot.rs (copy + flagged user)
//!         → table.rs try_replace (best effort)
//!
//! Dispatcher (per request)
//!     → table.rs snapshot() ← Arc<RouteSnapshot>
//! ```
//!
//! # Design Decisions
//! - No locks: the tracker belongs to the monitor task, the table to its actor
//! - Snapshots are immutable and shared by `Arc`
//! - Route updates are dropped, never retried, when the table is busy

pub mod monitor;
pub mod snapshot;
pub mod table;
pub mod tracker;
pub mod window;

pub use monitor::{MonitorOutcome, TrafficMonitor, TrafficMonitorHandle};
pub use snapshot::RouteSnapshot;
pub use table::{RouteTable, RouteTableError, RouteTableHandle};
pub use tracker::RateTracker;
