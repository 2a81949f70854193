//! Error types used by the daemon runtime and the setup tooling.
//!
//! Four enums cover the failure surface:
//!
//! - [`ConfigError`] - the launch payload or resolved options are unusable.
//! - [`LockError`] - the singleton instance marker could not be claimed,
//!   signaled, or written.
//! - [`DaemonError`] - umbrella for startup-phase failures inside the daemon
//!   process; once the child loop is running, failures are absorbed into the
//!   loop instead of surfacing here.
//! - [`SetupError`] - launcher-side failures (spawning the daemon, autostart
//!   registration).
//!
//! Startup-phase errors abort the daemon before any child is spawned and
//! before any partial state is left claimed. `as_label` returns short stable
//! strings for log lines.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors produced while decoding or resolving a daemon configuration.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The payload parsed as neither raw JSON nor base64-encoded JSON.
    #[error("configuration payload is not valid in either encoding: {reason}")]
    Payload {
        /// Parse failure from the raw JSON attempt (the authoritative one).
        reason: String,
    },

    /// A relative working directory reached the daemon; callers must resolve
    /// paths before handing the configuration over.
    #[error("working directory is not absolute: {}", path.display())]
    RelativeCwd { path: PathBuf },

    /// A path could not be resolved to an absolute form.
    #[error("failed to resolve path {}: {source}", path.display())]
    Resolve {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A process-environment lookup needed for defaulting failed.
    #[error("failed to determine {what}: {source}")]
    Environment {
        what: &'static str,
        #[source]
        source: io::Error,
    },
}

impl ConfigError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::Payload { .. } => "config_payload",
            ConfigError::RelativeCwd { .. } => "config_relative_cwd",
            ConfigError::Resolve { .. } => "config_resolve",
            ConfigError::Environment { .. } => "config_environment",
        }
    }
}

/// Errors produced by the instance lock.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum LockError {
    /// No state directory could be determined for instance markers.
    #[error("could not determine a state directory for instance markers")]
    StateDir,

    /// A live previous holder did not vacate within the bounded wait.
    #[error("previous holder (pid {pid}) did not exit within {timeout:?}")]
    EvictTimeout { pid: u32, timeout: Duration },

    /// The previous holder could not be signaled to stop.
    #[error("failed to signal holder (pid {pid}): {source}")]
    Signal {
        pid: u32,
        #[source]
        source: io::Error,
    },

    /// The marker file could not be read, written, or removed.
    #[error("failed to access instance marker {}: {source}", path.display())]
    Marker {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl LockError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            LockError::StateDir => "lock_state_dir",
            LockError::EvictTimeout { .. } => "lock_evict_timeout",
            LockError::Signal { .. } => "lock_signal",
            LockError::Marker { .. } => "lock_marker",
        }
    }
}

/// Startup-phase errors of the daemon process.
///
/// Any of these aborts the whole startup: no child is ever spawned, and a
/// failed claim leaves no marker behind.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum DaemonError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Lock(#[from] LockError),

    /// The configured log file could not be created or opened. Carries the
    /// intended path so the failure is diagnosable from the console.
    #[error("failed to open log file {}: {source}", path.display())]
    LogSetup {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl DaemonError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            DaemonError::Config(e) => e.as_label(),
            DaemonError::Lock(e) => e.as_label(),
            DaemonError::LogSetup { .. } => "log_setup",
        }
    }
}

/// Launcher-side errors raised by the setup tooling.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SetupError {
    /// The current process was itself spawned by a supervisor; starting
    /// another one from here would chain supervisors.
    #[error("process spawned by a keeprun daemon cannot start a daemon")]
    AlreadySupervised,

    /// The daemon binary could not be spawned.
    #[error("failed to spawn daemon binary {}: {source}", bin.display())]
    Spawn {
        bin: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The configured log file could not be prepared ahead of the launch.
    #[error("failed to ensure log file {}: {source}", path.display())]
    LogSetup {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Autostart registration or deregistration failed.
    #[error("autostart operation failed: {source}")]
    Autostart {
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Lock(#[from] LockError),
}

impl SetupError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            SetupError::AlreadySupervised => "setup_already_supervised",
            SetupError::Spawn { .. } => "setup_spawn",
            SetupError::LogSetup { .. } => "setup_log",
            SetupError::Autostart { .. } => "setup_autostart",
            SetupError::Lock(e) => e.as_label(),
        }
    }
}
