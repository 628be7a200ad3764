//! Configuration loading from disk and the process environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ProxyConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Window duration in seconds.
pub const ENV_DURATION: &str = "DURATION";
/// Request-count threshold.
pub const ENV_MAX_REQUESTS: &str = "MAXREQUESTS";
/// Ban period in seconds.
pub const ENV_BAN_PERIOD: &str = "BANPERIOD";
/// Appid summary period in seconds.
pub const ENV_LOG_PERIOD: &str = "LOGPERIOD";
/// "dev" or "production".
pub const ENV_LOG_LEVEL: &str = "log_level";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: ProxyConfig = toml::from_str(&content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Layer the process environment over `config`.
pub fn apply_env_overrides(config: &mut ProxyConfig) {
    apply_overrides_from(config, |name| std::env::var(name).ok());
}

/// Layer overrides from an arbitrary lookup over `config`.
///
/// Integer parameters never abort startup: a value that does not parse is
/// logged and becomes zero, a missing one is logged and left as configured.
pub fn apply_overrides_from<F>(config: &mut ProxyConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let traffic = &mut config.traffic;
    traffic.window_secs = parse_env_u64(ENV_DURATION, lookup(ENV_DURATION), traffic.window_secs);
    traffic.max_requests =
        parse_env_u64(ENV_MAX_REQUESTS, lookup(ENV_MAX_REQUESTS), traffic.max_requests);
    traffic.ban_period_secs =
        parse_env_u64(ENV_BAN_PERIOD, lookup(ENV_BAN_PERIOD), traffic.ban_period_secs);

    let obs = &mut config.observability;
    obs.stats_period_secs =
        parse_env_u64(ENV_LOG_PERIOD, lookup(ENV_LOG_PERIOD), obs.stats_period_secs);
    if let Some(level) = lookup(ENV_LOG_LEVEL) {
        obs.log_level = level;
    }
}

/// Parse one integer environment value.
pub fn parse_env_u64(name: &str, raw: Option<String>, configured: u64) -> u64 {
    match raw {
        Some(value) => match value.trim().parse::<u64>() {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(variable = name, value = %value, error = %e, "Invalid integer in environment, using 0");
                0
            }
        },
        None => {
            tracing::warn!(variable = name, configured, "Environment variable not set, keeping configured value");
            configured
        }
    }
}
