//! Name-keyed singleton lock backed by a pid marker file.
//!
//! A supervisor named `N` registers itself by writing its pid to
//! `<state-dir>/N.pid`. Any process can then discover the holder, verify it
//! is actually alive, and signal it to stop. The three sanctioned mutations:
//!
//! - [`InstanceLock::replace`]: evict a live predecessor (signal, then wait
//!   for it to vacate with a bounded timeout), then register the caller.
//!   Stale markers, left behind by a crash, are overwritten directly.
//! - [`InstanceClaim::release`]: remove the marker, but only while it still
//!   names this process; idempotent, with a Drop backstop for unwinding
//!   exit paths.
//! - [`InstanceLock::kill`]: signal whatever holder is registered, without
//!   registering the caller.
//!
//! Takeover rather than refuse-to-start: restarting a supervisor is "start a
//! new one, it evicts the old one". Marker writes go through a temp file and
//! a rename so a reader never observes a half-written pid.

use std::fs;
use std::io;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::LockError;
use crate::instance::os;

/// How often the evicting claimant re-checks the predecessor.
const EVICT_CHECK_INTERVAL: Duration = Duration::from_millis(100);

/// Re-check attempts before eviction is declared failed (bounds the total
/// wait at `EVICT_ATTEMPTS * EVICT_CHECK_INTERVAL`).
const EVICT_ATTEMPTS: u32 = 50;

/// Handle to the singleton slot for one logical name.
#[derive(Clone, Debug)]
pub struct InstanceLock {
    name: String,
    dir: PathBuf,
}

impl InstanceLock {
    /// Lock for `name` in the default state directory (`~/.keeprun`).
    pub fn new(name: &str) -> Result<Self, LockError> {
        let dir = dirs::home_dir()
            .map(|home| home.join(".keeprun"))
            .ok_or(LockError::StateDir)?;
        Ok(Self::with_state_dir(name, dir))
    }

    /// Lock for `name` with an explicit state directory.
    pub fn with_state_dir(name: &str, dir: impl Into<PathBuf>) -> Self {
        Self {
            name: name.to_string(),
            dir: dir.into(),
        }
    }

    /// Registers the current process as the holder, evicting any live
    /// predecessor first.
    ///
    /// The predecessor is signaled to stop and polled until it vacates;
    /// verification runs again after the signal, so a holder that exits
    /// concurrently with the check is handled the same as a stale marker.
    /// Fails with [`LockError::EvictTimeout`] if a live holder does not
    /// vacate within the bound.
    pub async fn replace(&self) -> Result<InstanceClaim, LockError> {
        if let Some(pid) = self.read_holder()? {
            if pid != os::current_pid() && os::process_alive(pid) {
                os::signal_stop(pid).map_err(|source| LockError::Signal { pid, source })?;
                self.wait_vacated(pid).await?;
            }
        }
        self.register()
    }

    /// Signals the registered holder to stop without registering the caller.
    /// No-op when no holder is registered or the marker is stale.
    pub fn kill(&self) -> Result<(), LockError> {
        if let Some(pid) = self.read_holder()? {
            if pid != os::current_pid() && os::process_alive(pid) {
                os::signal_stop(pid).map_err(|source| LockError::Signal { pid, source })?;
            }
        }
        Ok(())
    }

    /// True when a holder is registered and verified alive.
    pub fn is_running(&self) -> Result<bool, LockError> {
        Ok(self
            .read_holder()?
            .map(os::process_alive)
            .unwrap_or(false))
    }

    fn marker_path(&self) -> PathBuf {
        self.dir.join(format!("{}.pid", self.name))
    }

    /// Reads the registered pid. Missing files and unparseable contents both
    /// read as "no holder"; garbage in the marker is treated like staleness.
    fn read_holder(&self) -> Result<Option<u32>, LockError> {
        let path = self.marker_path();
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(contents.trim().parse::<u32>().ok()),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(LockError::Marker { path, source }),
        }
    }

    async fn wait_vacated(&self, pid: u32) -> Result<(), LockError> {
        for _ in 0..EVICT_ATTEMPTS {
            if !os::process_alive(pid) {
                return Ok(());
            }
            tokio::time::sleep(EVICT_CHECK_INTERVAL).await;
        }
        if !os::process_alive(pid) {
            return Ok(());
        }
        Err(LockError::EvictTimeout {
            pid,
            timeout: EVICT_CHECK_INTERVAL * EVICT_ATTEMPTS,
        })
    }

    fn register(&self) -> Result<InstanceClaim, LockError> {
        let path = self.marker_path();
        let marker = |source| LockError::Marker {
            path: path.clone(),
            source,
        };

        fs::create_dir_all(&self.dir).map_err(marker)?;
        let pid = os::current_pid();
        let staging = self.dir.join(format!("{}.pid.tmp", self.name));
        let mut file = fs::File::create(&staging).map_err(marker)?;
        writeln!(file, "{pid}").map_err(marker)?;
        file.sync_all().map_err(marker)?;
        drop(file);
        fs::rename(&staging, &path).map_err(marker)?;

        Ok(InstanceClaim {
            path,
            pid,
            released: false,
        })
    }
}

/// Proof that this process is the registered holder of a name's singleton
/// slot.
///
/// Release runs at most once; the Drop backstop covers exit paths that never
/// reach the explicit [`release`](InstanceClaim::release) call.
#[derive(Debug)]
pub struct InstanceClaim {
    path: PathBuf,
    pid: u32,
    released: bool,
}

impl InstanceClaim {
    /// Pid recorded in the marker (the current process).
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Unregisters the marker.
    ///
    /// No-op when the marker is already gone or has been superseded by a
    /// newer holder; the claim only ever removes a marker naming its own
    /// pid.
    pub fn release(mut self) -> Result<(), LockError> {
        self.release_inner()
    }

    fn release_inner(&mut self) -> Result<(), LockError> {
        if self.released {
            return Ok(());
        }
        self.released = true;

        let current = match fs::read_to_string(&self.path) {
            Ok(contents) => contents.trim().parse::<u32>().ok(),
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(source) => {
                return Err(LockError::Marker {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        if current != Some(self.pid) {
            // Superseded; the marker belongs to the new holder now.
            return Ok(());
        }
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(LockError::Marker {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

impl Drop for InstanceClaim {
    fn drop(&mut self) {
        let _ = self.release_inner();
    }
}
