//! Log output settings.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Default `tracing` filter directive.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// How `ward` renders log events on stderr.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// One JSON object per event, fields flattened.
    Json,
    /// One human-readable line per event.
    #[default]
    Compact,
}

impl LogFormat {
    /// Returns `true` for [`LogFormat::Json`].
    #[must_use]
    pub const fn is_json(self) -> bool {
        matches!(self, Self::Json)
    }
}

/// Error returned when text names no [`LogFormat`].
pub type LogFormatParseError = strum::ParseError;
