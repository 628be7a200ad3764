//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → loader.rs env overrides (DURATION, MAXREQUESTS, BANPERIOD, LOGPERIOD, log_level)
//!     → ProxyConfig (immutable for the life of the process)
//! ```
//!
//! # Design Decisions
//! - Config is read once at startup; there is no reload
//! - All fields have defaults to allow running without a file
//! - Bad integers in the environment are warnings, not startup failures

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{apply_env_overrides, load_config, ConfigError};
pub use schema::{
    ListenerConfig, ListsConfig, ObservabilityConfig, ProxyConfig, SecurityConfig,
    TimeoutConfig, TrafficConfig, UpstreamConfig,
};
