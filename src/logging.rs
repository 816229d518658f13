//! Logging initialisation via tracing-subscriber.
//!
//! Call [`init`] once at startup, before the post index is built.

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

/// The filter used when neither `--log-level` nor `RUST_LOG` is set.
pub const DEFAULT_LEVEL: &str = "info";

/// Installs the global subscriber, writing to stderr. An explicit `level`
/// (any [`EnvFilter`] directive, e.g. `debug` or `homepage=trace`) wins over
/// `RUST_LOG`, which wins over [`DEFAULT_LEVEL`].
pub fn init(level: Option<&str>) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(filter(level)?)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("failed to set subscriber: {}", e))
}

fn filter(level: Option<&str>) -> Result<EnvFilter> {
    match level {
        Some(level) => {
            EnvFilter::try_new(level).map_err(|e| anyhow!("invalid log level '{}': {}", level, e))
        }
        None => Ok(EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LEVEL))),
    }
}
