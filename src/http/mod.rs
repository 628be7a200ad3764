//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, method check, body buffering)
//!     → request.rs (request ID)
//!     → dispatch.rs (identity, traffic event, snapshot, routing headers)
//!         → identity.rs (form values → user id)
//!     → forward.rs (rewrite and send to the default backend)
//!     → Send backend response to client
//! ```

pub mod dispatch;
pub mod forward;
pub mod identity;
pub mod request;
pub mod server;

pub use dispatch::{Dispatcher, RoutingDecision};
pub use server::HttpServer;
