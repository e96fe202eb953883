#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Logging primitives shared across the Courier workspace.
//!
//! Centralises tracing-subscriber installation so every binary and test
//! suite adopts the same observability story: an `RUST_LOG`-aware env
//! filter, pretty output for debug builds, JSON elsewhere.

use anyhow::{Result, anyhow};
use once_cell::sync::OnceCell;
use tracing_subscriber::{EnvFilter, fmt};

/// Default logging target when `RUST_LOG` is not provided.
const DEFAULT_LOG_LEVEL: &str = "info";

static INSTALLED: OnceCell<()> = OnceCell::new();

/// Configure and install the global tracing subscriber.
///
/// Calling this more than once from the same process is a no-op; the
/// first configuration wins.
///
/// # Errors
///
/// Returns an error if another subscriber was already set globally by
/// something other than this function.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    if INSTALLED.get().is_some() {
        return Ok(());
    }

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.level));

    let builder = fmt::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_thread_ids(false);

    let installed = match config.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
    };
    installed.map_err(|err| anyhow!("failed to install tracing subscriber: {err}"))?;

    INSTALLED.set(()).ok();
    tracing::debug!(level = config.level, "logging initialised");
    Ok(())
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig<'a> {
    /// Filter directive used when `RUST_LOG` is unset.
    pub level: &'a str,
    /// Output format for the installed subscriber.
    pub format: LogFormat,
}

impl Default for LoggingConfig<'_> {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL,
            format: LogFormat::infer(),
        }
    }
}

/// Available output formats for the logger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Machine-readable JSON lines.
    Json,
    /// Human-readable multi-line output.
    Pretty,
}

impl LogFormat {
    /// Choose a sensible default for the current build.
    #[must_use]
    pub const fn infer() -> Self {
        if cfg!(debug_assertions) {
            Self::Pretty
        } else {
            Self::Json
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_initialisation_is_a_no_op() {
        let config = LoggingConfig {
            level: "debug",
            format: LogFormat::Pretty,
        };
        init_logging(&config).expect("first install");
        init_logging(&config).expect("second install is a no-op");
    }

    #[test]
    fn debug_builds_prefer_pretty_output() {
        if cfg!(debug_assertions) {
            assert_eq!(LogFormat::infer(), LogFormat::Pretty);
        } else {
            assert_eq!(LogFormat::infer(), LogFormat::Json);
        }
    }

    #[test]
    fn default_config_uses_the_default_level() {
        assert_eq!(LoggingConfig::default().level, DEFAULT_LOG_LEVEL);
    }
}
