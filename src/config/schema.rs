//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// The backend every request is forwarded to.
    pub upstream: UpstreamConfig,

    /// Per-user rate tracking parameters.
    pub traffic: TrafficConfig,

    /// Static redirect lists loaded at startup.
    pub lists: ListsConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Request size limits.
    pub security: SecurityConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:9000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:9000".to_string(),
        }
    }
}

/// Upstream configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL of the default backend.
    pub default_backend: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            default_backend: "http://172.17.0.1:9001".to_string(),
        }
    }
}

/// Sliding window and threshold settings.
///
/// `window_secs`, `max_requests` and `ban_period_secs` default to zero, which
/// is also what they become when the matching environment variable holds
/// garbage. With a zero threshold every request trips the limit.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TrafficConfig {
    /// Sliding window length in seconds (`DURATION`).
    pub window_secs: u64,

    /// Requests allowed inside one window before a user is flagged (`MAXREQUESTS`).
    pub max_requests: u64,

    /// Intended lifetime of a flagged state in seconds (`BANPERIOD`).
    /// Read and reported only; flags never expire.
    pub ban_period_secs: u64,

    /// Upper bound on the number of per-user windows kept in memory.
    pub max_tracked_users: usize,

    /// Capacity of the request event queue feeding the traffic monitor.
    pub event_queue: usize,
}

impl TrafficConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

impl Default for TrafficConfig {
    fn default() -> Self {
        Self {
            window_secs: 0,
            max_requests: 0,
            ban_period_secs: 0,
            max_tracked_users: 100_000,
            event_queue: 1024,
        }
    }
}

/// Paths of the static redirect lists.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ListsConfig {
    /// Appids whose traffic is tagged for the k8s cluster.
    pub k8s_list_path: Option<PathBuf>,

    /// Client IPs of the ubitech integration.
    pub ubitech_list_path: Option<PathBuf>,
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Total time allowed for one proxied request, in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Request limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum body size in bytes. Bodies are buffered to read form values.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// "dev" logs every request at debug level; anything else is treated as production.
    pub log_level: String,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,

    /// How often the per-appid summary is published, in seconds (`LOGPERIOD`).
    pub stats_period_secs: u64,
}

impl ObservabilityConfig {
    pub fn is_dev(&self) -> bool {
        self.log_level == "dev"
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "production".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
            stats_period_secs: 60,
        }
    }
}
