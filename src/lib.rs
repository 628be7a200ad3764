//! Traffic-aware reverse proxy library.
//!
//! Tracks each user's request rate in a sliding window and flags users over
//! the threshold in a route table owned by a single actor task.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod lists;
pub mod observability;
pub mod stats;
pub mod traffic;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use lists::RedirectLists;
