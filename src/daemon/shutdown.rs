//! Termination-signal future for the supervisor process.
//!
//! On Unix this resolves on SIGINT, SIGTERM, or SIGQUIT. SIGTERM is the
//! signal the instance lock sends when evicting a holder, so listening for
//! it here is what makes singleton takeover cooperative. Elsewhere only
//! Ctrl-C is available.

/// Completes when the process receives a termination signal.
///
/// Each call installs fresh listeners. Returns `Err` only if listener
/// registration itself fails.
#[cfg(unix)]
pub(crate) async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    tokio::select! {
        _ = sigint.recv() => {}
        _ = sigterm.recv() => {}
        _ = sigquit.recv() => {}
    }
    Ok(())
}

/// Completes when the process receives a termination signal.
///
/// Each call installs fresh listeners. Returns `Err` only if listener
/// registration itself fails.
#[cfg(not(unix))]
pub(crate) async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}
