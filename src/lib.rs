//! # keeprun
//!
//! **keeprun** keeps a command running. It is a lightweight single-command
//! process supervisor: a daemon that spawns a configured command, respawns it
//! whenever it exits, and registers itself with the platform's
//! run-at-login facility so supervision survives reboots.
//!
//! ## Architecture
//! ```text
//!  setup tool (your binary)                     daemon process (keeprund)
//! ┌───────────────────────────┐     spawns     ┌────────────────────────────────┐
//! │ Launcher                  │  ────────────► │ claim_and_run(config)          │
//! │  - RunOptions → config    │   detached,    │  ├─ InstanceLock::replace()    │
//! │  - start/stop/is_running  │   payload arg  │  │    (evicts predecessor)     │
//! │  - setup(Enable/Disable)  │                │  ├─ LogSink (file or console)  │
//! └───────────┬───────────────┘                │  ├─ respawn loop  ◄─── select! │
//!             │                                │  │    spawn → wait → log       │
//!             ▼                                │  │    → delay → again          │
//! ┌───────────────────────────┐                │  ├─ shutdown signal ◄── select!│
//! │ Autostart (per platform)  │                │  └─ InstanceClaim::release()   │
//! │  - XDG desktop entry      │                └───────────────┬────────────────┘
//! │  - HKCU run key           │                                ▼
//! └───────────────────────────┘                      child command
//!                                              (respawned per RespawnPolicy)
//! ```
//!
//! One supervisor per logical name: the pid marker under `~/.keeprun` is the
//! cross-process singleton slot. Starting a new supervisor for a name evicts
//! the old one (signal, bounded wait, re-verify), so "restart" is simply
//! "start again". The supervised child receives the supervisor's pid in the
//! `KEEPRUN_SUPERVISOR` environment variable and uses
//! [`running_under_supervisor`] to refuse to start a supervisor of its own.
//!
//! ## Key types
//! | Area          | Description                                         | Key types                         |
//! |---------------|-----------------------------------------------------|-----------------------------------|
//! | **Daemon**    | Claim the name, supervise the command until done.   | [`claim_and_run`]                 |
//! | **Singleton** | One live supervisor per name, observable/stoppable. | [`InstanceLock`], [`InstanceClaim`] |
//! | **Policies**  | What happens after the child exits.                 | [`RespawnPolicy`]                 |
//! | **Config**    | Payload codec and caller-side defaults.             | [`DaemonConfig`], [`RunOptions`]  |
//! | **Setup**     | Start/stop/status plus login persistence.           | [`Launcher`], [`Autostart`]       |
//! | **Logging**   | Attributable lifecycle lines, file or console.      | [`LogSink`]                       |
//!
//! ## Example
//! ```no_run
//! use keeprun::{Launcher, RunOptions, SetupAction};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let launcher = Launcher::new(
//!     "my-agent",
//!     RunOptions::new()
//!         .command("my-agent")
//!         .args(["serve"])
//!         .respawn_delay(std::time::Duration::from_secs(1)),
//! )?;
//!
//! // Register at login and start supervising right away.
//! let autostart = keeprun::platform_autostart("my-agent")?;
//! launcher.setup(SetupAction::Enable, autostart.as_ref()).await?;
//! # Ok(())
//! # }
//! ```

mod config;
mod daemon;
mod error;
mod instance;
mod launcher;
mod marker;
mod policy;
mod sink;

pub use config::{DaemonConfig, LogTarget, RunOptions};
pub use daemon::claim_and_run;
pub use error::{ConfigError, DaemonError, LockError, SetupError};
pub use instance::{InstanceClaim, InstanceLock};
pub use launcher::{platform_autostart, Autostart, Launcher, SetupAction};
#[cfg(windows)]
pub use launcher::WindowsAutostart;
#[cfg(unix)]
pub use launcher::XdgAutostart;
pub use marker::{running_under_supervisor, SUPERVISOR_ENV};
pub use policy::{RespawnPolicy, DEFAULT_RESPAWN_DELAY};
pub use sink::LogSink;
