//! Lifecycle coordinator: claim, run, release, exactly once per supervisor
//! process.
//!
//! ## Sequence
//! ```text
//! claim_and_run(config)
//!   ├─► InstanceLock::replace()          (evicts any predecessor; fatal on error)
//!   ├─► sink selection                   (log file or console; fatal on error)
//!   ├─► log "options:" + config dump     (once, before the first spawn)
//!   ├─► select! {
//!   │     respawn loop reaches terminal  ─► exit code = child's last code
//!   │     termination signal observed    ─► exit code = 0
//!   │   }
//!   └─► InstanceClaim::release()         (unconditional; failure logged, swallowed)
//! ```
//!
//! Release is never reached without the claim having been obtained, and the
//! claim carries a Drop backstop for paths that unwind past this function.

use tokio_util::sync::CancellationToken;

use crate::config::{DaemonConfig, LogTarget};
use crate::error::DaemonError;
use crate::instance::InstanceLock;
use crate::sink::LogSink;

use super::{respawn, shutdown};

/// Claims the singleton slot for the configuration's name and supervises the
/// command until the respawn policy or a termination signal ends the run.
///
/// Returns the exit code the supervisor process should terminate with: the
/// last child exit code when the policy said stop, or 0 after a clean
/// signal-driven shutdown.
pub async fn claim_and_run(config: DaemonConfig) -> Result<i32, DaemonError> {
    let lock = InstanceLock::new(&config.name)?;
    claim_and_run_with(lock, config).await
}

/// [`claim_and_run`] against an explicit lock (tests use a scratch state
/// directory).
pub(crate) async fn claim_and_run_with(
    lock: InstanceLock,
    config: DaemonConfig,
) -> Result<i32, DaemonError> {
    let claim = lock.replace().await?;

    let sink = match open_sink(&config) {
        Ok(sink) => sink,
        Err(error) => {
            // Startup failed after the claim: vacate before reporting.
            let _ = claim.release();
            return Err(error);
        }
    };

    sink.info("options:");
    sink.value(&config.dump());

    let token = CancellationToken::new();
    let code = tokio::select! {
        terminal = respawn::run(&config, &sink, token.clone()) => terminal.unwrap_or(0),
        _ = shutdown::wait_for_shutdown_signal() => 0,
    };

    if let Err(error) = claim.release() {
        sink.info(&format!("failed to release instance claim: {error}."));
    }
    Ok(code)
}

/// Opens the configured sink. A file target echoes its path on the console
/// first, so the one place to look is always discoverable from the terminal
/// that started the daemon.
fn open_sink(config: &DaemonConfig) -> Result<LogSink, DaemonError> {
    match &config.log {
        LogTarget::File(path) => {
            println!("{}", path.display());
            LogSink::file(path).map_err(|source| DaemonError::LogSetup {
                path: path.clone(),
                source,
            })
        }
        LogTarget::Console => Ok(LogSink::console()),
    }
}
