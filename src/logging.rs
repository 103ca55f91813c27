use tracing_subscriber::EnvFilter;

use crate::config::BaseConfig;
use crate::error::{BaseError, Result};

/// Installs the global `tracing` subscriber described by `config`.
///
/// A second call fails with [`BaseError::Logging`]; the first subscriber
/// stays installed.
pub fn init_logging(config: &BaseConfig) -> Result<()> {
    let filter = EnvFilter::try_new(&config.log_filter)
        .map_err(|err| BaseError::Logging(format!("invalid filter `{}`: {err}", config.log_filter)))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(config.log_ansi)
        .with_thread_names(config.log_thread_names)
        .with_target(true)
        .try_init()
        .map_err(|err| BaseError::Logging(err.to_string()))
}
