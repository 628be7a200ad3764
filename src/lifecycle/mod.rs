//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Env overrides → Validate → Load lists → Start tasks → Bind
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Drain connections → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Fail fast on a bad config file or unreadable list
//! - Bad traffic parameters in the environment only warn
//! - Routing state is in memory only and dies with the process

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
