//! Structured logging.
//!
//! `RUST_LOG` wins when set. Otherwise `log_level = "dev"` turns on debug
//! output for this crate (every proxied request is logged) and anything
//! else gives info.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter directive used when `RUST_LOG` is absent.
pub fn default_directive(log_level: &str) -> &'static str {
    if log_level == "dev" {
        "uid_proxy=debug,tower_http=debug"
    } else {
        "uid_proxy=info,tower_http=info"
    }
}

/// Install the global subscriber.
pub fn init(log_level: &str) {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_directive(log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive() {
        assert_eq!(default_directive("dev"), "uid_proxy=debug,tower_http=debug");
        assert_eq!(default_directive("production"), "uid_proxy=info,tower_http=info");
        assert_eq!(default_directive(""), "uid_proxy=info,tower_http=info");
    }
}
