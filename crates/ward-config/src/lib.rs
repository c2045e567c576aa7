//! Shared configuration for the Ward CLI.
//!
//! [`Config`] derives its loader from `ortho_config`. Values resolve in four
//! layers, later layers winning:
//!
//! 1. built-in defaults;
//! 2. a TOML file named by `--config-path` or `WARD_CONFIG_PATH`, or a
//!    discovered `.ward.toml`;
//! 3. `WARD_*` environment variables such as `WARD_LOG_FILTER`;
//! 4. command-line flags such as `--log-filter`.
//!
//! ```toml
//! log_filter = "ward=debug"
//! log_format = "json"
//! call_timeout_secs = 10
//! fail_fast = true
//! ```

mod logging;


use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use self::logging::{DEFAULT_LOG_FILTER, LogFormat, LogFormatParseError};

/// Default bound on a single execute call, in seconds.
pub const DEFAULT_CALL_TIMEOUT_SECS: u64 = 30;

/// Returns the default log filter directive.
#[must_use]
pub fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Returns the default log format.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Compact
}

/// Returns the default execute call bound, in seconds.
#[must_use]
pub const fn default_call_timeout_secs() -> u64 {
    DEFAULT_CALL_TIMEOUT_SECS
}

/// Errors raised when loaded values are out of range.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A value is out of range.
    #[error("invalid value for '{field}': {message}")]
    Invalid {
        /// Offending key.
        field: &'static str,
        /// Description of the problem.
        message: String,
    },
}

/// Resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "WARD")]
pub struct Config {
    /// Log filter directive, for example `info` or `ward_plugins=debug`.
    #[serde(default = "default_log_filter")]
    #[ortho_config(default = default_log_filter())]
    log_filter: String,

    /// Log output format: `json` or `compact`.
    #[serde(default = "default_log_format")]
    #[ortho_config(default = default_log_format())]
    log_format: LogFormat,

    /// Bound on each action or check execution, in seconds; 0 disables it.
    #[serde(default = "default_call_timeout_secs")]
    #[ortho_config(default = default_call_timeout_secs())]
    call_timeout_secs: u64,

    /// Stop a run at the first failing step.
    #[serde(default)]
    #[ortho_config(default = false)]
    fail_fast: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter(),
            log_format: default_log_format(),
            call_timeout_secs: default_call_timeout_secs(),
            fail_fast: false,
        }
    }
}

impl Config {
    /// Log filter directive.
    #[must_use]
    pub const fn log_filter(&self) -> &str {
        self.log_filter.as_str()
    }

    /// Log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Bound on each execute call, or `None` when disabled.
    #[must_use]
    pub const fn call_timeout(&self) -> Option<Duration> {
        match self.call_timeout_secs {
            0 => None,
            seconds => Some(Duration::from_secs(seconds)),
        }
    }

    /// Whether runs stop at the first failing step unless the command line
    /// says otherwise.
    #[must_use]
    pub const fn fail_fast(&self) -> bool {
        self.fail_fast
    }

    /// Checks the merged values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a blank log filter.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.log_filter.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "log_filter",
                message: String::from("must not be empty"),
            });
        }
        Ok(())
    }
}
