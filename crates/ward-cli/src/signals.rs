//! Maps termination signals onto request cancellation.

use std::io;

use signal_hook::consts::signal::{SIGINT, SIGTERM};
use tracing::debug;
use ward_plugins::CancellationToken;

use crate::CLI_TARGET;

/// Cancels `token` when the process receives SIGINT or SIGTERM.
///
/// In-flight plugin calls observe the cancellation through their request
/// context and return promptly; remaining runbook steps are skipped.
pub(crate) fn cancel_on_termination(token: &CancellationToken) -> io::Result<()> {
    for signal in [SIGINT, SIGTERM] {
        signal_hook::flag::register(signal, token.flag())?;
    }
    debug!(target: CLI_TARGET, "termination signals cancel the run");
    Ok(())
}
