//! Configuration loading for the Ward CLI.
//!
//! Leading configuration flags are separated from the command tokens so the
//! `ortho_config` loader only receives the flags it understands and clap only
//! sees the command.

use std::ffi::{OsStr, OsString};

use ortho_config::OrthoConfig;
use ward_config::Config;

use crate::AppError;

/// CLI flags recognised by the configuration loader.
///
/// Kept in sync with the fields of [`Config`].
pub(crate) const CONFIG_CLI_FLAGS: &[&str] = &[
    "--config-path",
    "--log-filter",
    "--log-format",
    "--call-timeout-secs",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlagAction {
    Include { needs_value: bool },
    Skip,
}

fn classify(argument: &OsStr) -> FlagAction {
    let text = argument.to_string_lossy();
    let (flag, has_inline_value) = match text.split_once('=') {
        Some((flag, _)) => (flag, true),
        None => (text.as_ref(), false),
    };
    if CONFIG_CLI_FLAGS.contains(&flag) {
        FlagAction::Include {
            needs_value: !has_inline_value,
        }
    } else {
        FlagAction::Skip
    }
}

/// Arguments partitioned between the configuration loader and clap. Both
/// halves start with the program name.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct ConfigArgumentSplit {
    pub(crate) config_arguments: Vec<OsString>,
    pub(crate) command_arguments: Vec<OsString>,
}

/// Splits off the configuration flags that precede the first command token.
///
/// Configuration flags after the command are left for clap, which rejects
/// them.
pub(crate) fn split_config_arguments<I>(args: I) -> ConfigArgumentSplit
where
    I: IntoIterator<Item = OsString>,
{
    let mut remaining = args.into_iter();
    let Some(program) = remaining.next() else {
        return ConfigArgumentSplit::default();
    };

    let mut split = ConfigArgumentSplit {
        config_arguments: vec![program.clone()],
        command_arguments: vec![program],
    };
    while let Some(argument) = remaining.next() {
        match classify(&argument) {
            FlagAction::Include { needs_value } => {
                split.config_arguments.push(argument);
                if needs_value {
                    split.config_arguments.extend(remaining.next());
                }
            }
            FlagAction::Skip => {
                split.command_arguments.push(argument);
                split.command_arguments.extend(remaining.by_ref());
            }
        }
    }
    split
}

/// Loads and validates configuration from the split-off flags, the
/// environment, and any configuration file.
pub(crate) fn load_configuration(config_arguments: &[OsString]) -> Result<Config, AppError> {
    let config = Config::load_from_iter(config_arguments.iter().cloned())
        .map_err(AppError::LoadConfiguration)?;
    config.validate()?;
    Ok(config)
}
