//! crates/logging/src/init.rs
//! Global subscriber installation.

use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::config::{LOG_ENV_VAR, LogConfig};

/// Errors raised while installing the tracing subscriber.
#[derive(Debug, Error)]
pub enum LogInitError {
    /// The filter directive could not be parsed.
    #[error("invalid log filter `{directive}`: {source}")]
    InvalidFilter {
        /// The rejected directive.
        directive: String,
        /// Parser error.
        #[source]
        source: tracing_subscriber::filter::ParseError,
    },
    /// A global subscriber was already set.
    #[error("tracing subscriber already installed: {0}")]
    AlreadyInstalled(String),
}

/// Builds the `EnvFilter` for `config`, honouring [`LOG_ENV_VAR`].
pub fn build_filter(config: &LogConfig) -> Result<EnvFilter, LogInitError> {
    let env_override = std::env::var(LOG_ENV_VAR).ok();
    parse_filter(&config.effective_filter(env_override.as_deref()))
}

fn parse_filter(directive: &str) -> Result<EnvFilter, LogInitError> {
    EnvFilter::try_new(directive).map_err(|source| LogInitError::InvalidFilter {
        directive: directive.to_owned(),
        source,
    })
}

/// Installs a formatting subscriber filtered according to `config`.
///
/// # Example
///
/// ```rust,ignore
/// use logging::{LogConfig, init_tracing};
///
/// init_tracing(&LogConfig::default().with_filter("handoff=debug"))?;
/// tracing::debug!(target: "handoff::session", "ready");
/// ```
pub fn init_tracing(config: &LogConfig) -> Result<(), LogInitError> {
    let filter = build_filter(config)?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(config.ansi)
        .with_target(config.with_target)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| LogInitError::AlreadyInstalled(err.to_string()))
}
