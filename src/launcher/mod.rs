//! Launcher: the setup-tool side of the supervisor.
//!
//! A [`Launcher`] owns a resolved [`DaemonConfig`] and knows where the
//! `keeprund` binary lives. It starts the daemon detached (new session on
//! Unix, detached process group on Windows) with the encoded payload as the
//! single argument, maps stop and status onto the instance lock, and drives
//! the platform [`Autostart`] registration.
//!
//! ## Example
//! ```no_run
//! use keeprun::{Launcher, RunOptions, SetupAction};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let launcher = Launcher::new(
//!     "my-service",
//!     RunOptions::new().command("my-server").args(["--port", "8080"]),
//! )?;
//!
//! let autostart = keeprun::platform_autostart("my-service")?;
//! launcher.setup(SetupAction::Enable, autostart.as_ref()).await?;
//! # Ok(())
//! # }
//! ```

mod autostart;
#[cfg(unix)]
mod xdg;
#[cfg(windows)]
mod windows;

pub use autostart::{platform_autostart, Autostart};
#[cfg(unix)]
pub use xdg::XdgAutostart;
#[cfg(windows)]
pub use windows::WindowsAutostart;

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use crate::config::{DaemonConfig, LogTarget, RunOptions};
use crate::error::{ConfigError, LockError, SetupError};
use crate::instance::InstanceLock;
use crate::marker;

/// What [`Launcher::setup`] should do.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SetupAction {
    /// Register with the platform autostart facility and start now.
    Enable,
    /// Stop the running daemon and deregister from autostart.
    Disable,
    /// Stop the running daemon; the caller starts a fresh one afterwards.
    Restart,
}

/// Setup-tool facade for one logical name.
pub struct Launcher {
    config: DaemonConfig,
    daemon_bin: PathBuf,
}

impl Launcher {
    /// Resolves `options` for `name` and locates the daemon binary next to
    /// the current executable.
    pub fn new(name: &str, options: RunOptions) -> Result<Self, ConfigError> {
        let config = options.resolve(name)?;
        let daemon_bin = default_daemon_bin()?;
        Ok(Self { config, daemon_bin })
    }

    /// Overrides the daemon binary location.
    pub fn with_daemon_bin(mut self, bin: impl Into<PathBuf>) -> Self {
        self.daemon_bin = bin.into();
        self
    }

    /// The resolved configuration the daemon will run with.
    pub fn config(&self) -> &DaemonConfig {
        &self.config
    }

    /// The command line that launches the daemon: binary plus payload. This
    /// is also what gets registered with the autostart facility.
    pub fn command_segments(&self) -> Vec<String> {
        vec![
            self.daemon_bin.to_string_lossy().into_owned(),
            self.config.encode_payload(),
        ]
    }

    /// Spawns the daemon, detached from this process.
    ///
    /// Refuses when the current process is itself supervised: a supervised
    /// child starting its own supervisor is how accidental chains form.
    pub fn start(&self) -> Result<(), SetupError> {
        if marker::running_under_supervisor() {
            return Err(SetupError::AlreadySupervised);
        }
        self.validate()?;

        let mut command = Command::new(&self.daemon_bin);
        command
            .arg(self.config.encode_payload())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        detach(&mut command);

        let child = command.spawn().map_err(|source| SetupError::Spawn {
            bin: self.daemon_bin.clone(),
            source,
        })?;
        // The handle is dropped, not awaited; the daemon runs in its own
        // session and outlives this process.
        drop(child);
        Ok(())
    }

    /// Asks the running daemon for this name, if any, to stop.
    pub fn stop(&self) -> Result<(), LockError> {
        InstanceLock::new(&self.config.name)?.kill()
    }

    /// True when a daemon for this name is registered and alive.
    pub fn is_running(&self) -> Result<bool, LockError> {
        InstanceLock::new(&self.config.name)?.is_running()
    }

    /// Applies a setup action. A supervised process silently skips setup,
    /// since the daemon re-runs the supervised command with the original
    /// arguments, setup included.
    pub async fn setup(
        &self,
        action: SetupAction,
        autostart: &dyn Autostart,
    ) -> Result<(), SetupError> {
        if marker::running_under_supervisor() {
            return Ok(());
        }
        match action {
            SetupAction::Enable => {
                autostart
                    .enable(&self.command_segments())
                    .await
                    .map_err(|source| SetupError::Autostart { source })?;
                self.start()
            }
            SetupAction::Disable => {
                self.stop()?;
                autostart
                    .disable()
                    .await
                    .map_err(|source| SetupError::Autostart { source })
            }
            SetupAction::Restart => {
                self.stop()?;
                Ok(())
            }
        }
    }

    /// Ensures the log target is usable before anything is registered or
    /// spawned, so a bad path fails here with the path in hand rather than
    /// inside the detached daemon.
    fn validate(&self) -> Result<(), SetupError> {
        let LogTarget::File(path) = &self.config.log else {
            return Ok(());
        };
        let ensure = || -> std::io::Result<()> {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            OpenOptions::new().create(true).append(true).open(path)?;
            Ok(())
        };
        ensure().map_err(|source| SetupError::LogSetup {
            path: path.clone(),
            source,
        })
    }
}

fn default_daemon_bin() -> Result<PathBuf, ConfigError> {
    let exe = std::env::current_exe().map_err(|source| ConfigError::Environment {
        what: "current executable",
        source,
    })?;
    let dir = exe.parent().unwrap_or_else(|| std::path::Path::new("."));
    Ok(dir.join(format!("keeprund{}", std::env::consts::EXE_SUFFIX)))
}

/// Detaches the child from this process so it survives the launcher exiting.
#[cfg(unix)]
fn detach(command: &mut Command) {
    use std::os::unix::process::CommandExt;

    // A new session breaks the tie to the controlling terminal; the daemon
    // must not die with the shell that started it.
    unsafe {
        command.pre_exec(|| {
            if nix::libc::setsid() == -1 {
                return Err(std::io::Error::last_os_error());
            }
            Ok(())
        });
    }
}

/// Detaches the child from this process so it survives the launcher exiting.
#[cfg(windows)]
fn detach(command: &mut Command) {
    use std::os::windows::process::CommandExt;

    const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
    const DETACHED_PROCESS: u32 = 0x0000_0008;
    command.creation_flags(CREATE_NEW_PROCESS_GROUP | DETACHED_PROCESS);
}
