//! OS process primitives: liveness, identity, and stop signaling.
//!
//! The only platform-specific code in the daemon core. Liveness goes through
//! the system process table; a process that is present but already a zombie
//! counts as dead, otherwise an evicted-but-unreaped holder would stall
//! takeover until its parent gets around to waiting on it.

use std::io;

use sysinfo::{Pid, ProcessStatus, ProcessesToUpdate, System};

/// Pid of the current process.
pub(crate) fn current_pid() -> u32 {
    std::process::id()
}

/// Pid of the parent of the current process, if the process table has it.
pub(crate) fn parent_pid() -> Option<u32> {
    let me = Pid::from_u32(current_pid());
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::Some(&[me]), true);
    system
        .process(me)
        .and_then(|process| process.parent())
        .map(|pid| pid.as_u32())
}

/// True when `pid` names a live (non-zombie) process.
pub(crate) fn process_alive(pid: u32) -> bool {
    if pid == 0 {
        return false;
    }
    let target = Pid::from_u32(pid);
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::Some(&[target]), true);
    match system.process(target) {
        None => false,
        Some(process) => !matches!(
            process.status(),
            ProcessStatus::Zombie | ProcessStatus::Dead
        ),
    }
}

/// Asks `pid` to stop. A target that is already gone is not an error.
#[cfg(unix)]
pub(crate) fn signal_stop(pid: u32) -> io::Result<()> {
    use nix::errno::Errno;
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid as NixPid;

    match kill(NixPid::from_raw(pid as i32), Signal::SIGTERM) {
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(errno) => Err(io::Error::from_raw_os_error(errno as i32)),
    }
}

/// Asks `pid` to stop. A target that is already gone is not an error.
#[cfg(not(unix))]
pub(crate) fn signal_stop(pid: u32) -> io::Result<()> {
    use std::process::Command;

    let status = Command::new("taskkill")
        .args(["/PID", &pid.to_string()])
        .status()?;
    if status.success() || !process_alive(pid) {
        Ok(())
    } else {
        Err(io::Error::other(format!(
            "taskkill for pid {pid} exited with {status}"
        )))
    }
}
