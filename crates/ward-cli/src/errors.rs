//! Error types for the CLI runtime.

use std::io;
use std::sync::Arc;

use thiserror::Error;
use ward_config::ConfigError;
use ward_plugins::{PluginError, RunbookError};

use crate::telemetry::TelemetryError;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(#[from] ConfigError),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error("failed to register built-in plugins: {0}")]
    Registration(PluginError),
    #[error(transparent)]
    Runbook(#[from] RunbookError),
    #[error("failed to write output: {0}")]
    Write(#[from] io::Error),
}
