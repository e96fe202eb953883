//! Configuration for the HTTP transport.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Settings for [`HttpTransport`](crate::HttpTransport).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct HttpTransportConfig {
    /// Directory download bodies are staged into. Created on transport
    /// construction when missing.
    pub staging_dir: PathBuf,
    /// Optional `User-Agent` header applied to every request.
    pub user_agent: Option<String>,
    /// Connection establishment timeout, in seconds.
    pub connect_timeout_secs: u64,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            staging_dir: std::env::temp_dir().join("courier"),
            user_agent: None,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
        }
    }
}

impl HttpTransportConfig {
    /// Check the configuration for values the transport cannot work
    /// with.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.staging_dir.as_os_str().is_empty() {
            return Err(ConfigError::EmptyStagingDir);
        }
        if self.connect_timeout_secs == 0 {
            return Err(ConfigError::ZeroConnectTimeout);
        }
        if let Some(user_agent) = &self.user_agent {
            if user_agent.trim().is_empty() {
                return Err(ConfigError::BlankUserAgent);
            }
        }
        Ok(())
    }

    /// The connect timeout as a duration.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Violations reported by [`HttpTransportConfig::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The staging directory is an empty path.
    #[error("staging directory must not be empty")]
    EmptyStagingDir,
    /// A zero connect timeout would fail every request.
    #[error("connect timeout must be positive")]
    ZeroConnectTimeout,
    /// A user agent consisting of whitespace is always a mistake.
    #[error("user agent must not be blank")]
    BlankUserAgent,
}
