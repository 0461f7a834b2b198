//! Logging setup
//!
//! Resources log through `tracing`. Embedders that do not install their own
//! subscriber can call [`init_logging`].

use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter (e.g. `stratus_cloud_aws=debug`)
pub const LOG_ENV: &str = "STRATUS_LOG";

/// Install a stderr `fmt` subscriber filtered by `STRATUS_LOG` (default `info`)
///
/// Returns `false` if a global subscriber was already installed.
pub fn try_init_logging() -> bool {
    try_init_logging_with_default("info")
}

/// Like [`try_init_logging`] with a caller-chosen default filter
pub fn try_init_logging_with_default(default_filter: &str) -> bool {
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}

/// Install the default subscriber, ignoring an already-installed one
pub fn init_logging() {
    if !try_init_logging() {
        tracing::debug!("Global tracing subscriber already installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_rejected() {
        // The first call may already have happened in another test thread.
        let _ = try_init_logging_with_default("debug");
        assert!(!try_init_logging());
        init_logging();
    }
}
