//! The respawn loop: spawn the child, wait, log, repeat or terminate.
//!
//! One iteration is one child run:
//!
//! ```text
//! loop {
//!   ├─► spawn(command, args, cwd, env + supervisor marker)
//!   │     ├─ Ok   ──► log "started process <pid>."
//!   │     │          wait for exit (cancellable)
//!   │     │          log "exited with code 0x<hex>."
//!   │     └─ Err  ──► log the spawn failure, code = 127
//!   ├─► RespawnPolicy::Never   ─► return the code (loop terminal state)
//!   └─► RespawnPolicy::After   ─► sleep the delay (cancellable), continue
//! }
//! ```
//!
//! Cancellation is observed at the loop head, while waiting for the child,
//! and during the respawn delay. The loop never kills an in-flight child: on
//! cancellation it returns `None` and the child is left to the operating
//! system. A spawn failure is an ordinary failed run, the environment may
//! heal before the next attempt.

use std::process::ExitStatus;

use tokio::process::Command;
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::config::DaemonConfig;
use crate::instance::os;
use crate::marker::SUPERVISOR_ENV;
use crate::policy::RespawnPolicy;
use crate::sink::LogSink;

/// Exit code reported for a command that could not be launched at all, the
/// shell convention for "command not found".
const SPAWN_FAILURE_CODE: i32 = 127;

/// Runs child attempts until the policy says stop or `token` is cancelled.
///
/// Returns `Some(code)` when the loop reached its terminal state under
/// [`RespawnPolicy::Never`] (the supervisor propagates that code), or `None`
/// when cancellation won.
pub(crate) async fn run(
    config: &DaemonConfig,
    sink: &LogSink,
    token: CancellationToken,
) -> Option<i32> {
    loop {
        if token.is_cancelled() {
            return None;
        }

        let code = match spawn_child(config, sink) {
            Ok(mut child) => {
                sink.info(&started_line(child.id()));
                let status = tokio::select! {
                    status = child.wait() => status,
                    _ = token.cancelled() => return None,
                };
                let code = match status {
                    Ok(status) => exit_code(status),
                    Err(error) => {
                        sink.info(&format!("failed to await process exit: {error}."));
                        1
                    }
                };
                sink.info(&exited_line(code));
                code
            }
            Err(error) => {
                sink.info(&format!("failed to spawn {}: {error}.", config.command));
                SPAWN_FAILURE_CODE
            }
        };

        match config.respawn {
            RespawnPolicy::Never => return Some(code),
            RespawnPolicy::After(delay) => {
                tokio::select! {
                    _ = time::sleep(delay) => {}
                    _ = token.cancelled() => return None,
                }
            }
        }
    }
}

fn spawn_child(config: &DaemonConfig, sink: &LogSink) -> std::io::Result<tokio::process::Child> {
    let mut command = Command::new(&config.command);
    command
        .args(&config.args)
        .current_dir(&config.cwd)
        .envs(&config.env)
        .env(SUPERVISOR_ENV, os::current_pid().to_string());
    if let Some((out, err)) = sink.child_stdio()? {
        command.stdout(out).stderr(err);
    }
    command.spawn()
}

fn started_line(id: Option<u32>) -> String {
    match id {
        Some(id) => format!("started process {id}."),
        None => "started process n/a.".to_string(),
    }
}

/// Lowercase hex, natural width: code 2 renders as `0x2`, 255 as `0xff`.
fn exited_line(code: i32) -> String {
    format!("exited with code 0x{code:x}.")
}

/// Exit code of a finished child. A signal-killed child on Unix has no code;
/// it maps to `128 + signal`, the shell convention.
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LogTarget;
    use std::collections::BTreeMap;
    use std::path::PathBuf;
    use std::time::{Duration, Instant};

    #[test]
    fn exit_line_uses_natural_width_lowercase_hex() {
        assert_eq!(exited_line(0), "exited with code 0x0.");
        assert_eq!(exited_line(2), "exited with code 0x2.");
        assert_eq!(exited_line(255), "exited with code 0xff.");
    }

    #[test]
    fn started_line_falls_back_to_placeholder() {
        assert_eq!(started_line(Some(42)), "started process 42.");
        assert_eq!(started_line(None), "started process n/a.");
    }

    #[cfg(unix)]
    mod with_real_children {
        use super::*;

        fn shell_config(script: &str, respawn: RespawnPolicy) -> DaemonConfig {
            DaemonConfig {
                name: "svc".to_string(),
                command: "/bin/sh".to_string(),
                args: vec!["-c".to_string(), script.to_string()],
                cwd: std::env::temp_dir(),
                env: BTreeMap::new(),
                log: LogTarget::Console,
                respawn,
            }
        }

        fn file_sink(dir: &tempfile::TempDir) -> (LogSink, PathBuf) {
            let path = dir.path().join("svc.log");
            (LogSink::file(&path).unwrap(), path)
        }

        fn count_lines(path: &PathBuf, needle: &str) -> usize {
            std::fs::read_to_string(path)
                .unwrap_or_default()
                .lines()
                .filter(|line| line.contains(needle))
                .count()
        }

        #[tokio::test]
        async fn no_respawn_propagates_exit_code() {
            let dir = tempfile::tempdir().unwrap();
            let (sink, path) = file_sink(&dir);
            let config = shell_config("exit 7", RespawnPolicy::Never);

            let outcome = run(&config, &sink, CancellationToken::new()).await;
            assert_eq!(outcome, Some(7));
            assert_eq!(count_lines(&path, "started process"), 1);
            assert_eq!(count_lines(&path, "exited with code 0x7."), 1);
        }

        #[tokio::test]
        async fn clean_exit_propagates_zero() {
            let dir = tempfile::tempdir().unwrap();
            let (sink, _path) = file_sink(&dir);
            let config = shell_config("exit 0", RespawnPolicy::Never);

            let outcome = run(&config, &sink, CancellationToken::new()).await;
            assert_eq!(outcome, Some(0));
        }

        #[tokio::test]
        async fn spawn_failure_is_terminal_127_without_respawn() {
            let dir = tempfile::tempdir().unwrap();
            let (sink, path) = file_sink(&dir);
            let mut config = shell_config("exit 0", RespawnPolicy::Never);
            config.command = "/definitely/not/a/command".to_string();

            let outcome = run(&config, &sink, CancellationToken::new()).await;
            assert_eq!(outcome, Some(SPAWN_FAILURE_CODE));
            assert_eq!(count_lines(&path, "failed to spawn"), 1);
            assert_eq!(count_lines(&path, "started process"), 0);
        }

        #[tokio::test]
        async fn respawns_after_the_fixed_delay() {
            let dir = tempfile::tempdir().unwrap();
            let (sink, path) = file_sink(&dir);
            let config = shell_config(
                "exit 1",
                RespawnPolicy::After(Duration::from_millis(100)),
            );

            let token = CancellationToken::new();
            let handle = {
                let token = token.clone();
                tokio::spawn(async move { run(&config, &sink, token).await })
            };

            tokio::time::sleep(Duration::from_millis(350)).await;
            token.cancel();
            let outcome = handle.await.unwrap();

            assert_eq!(outcome, None);
            let spawns = count_lines(&path, "started process");
            // Immediate exits plus a 100ms delay: 350ms of wall time admits
            // at most four spawns, and certainly more than one.
            assert!((2..=4).contains(&spawns), "unexpected spawn count {spawns}");
            assert_eq!(count_lines(&path, "exited with code 0x1."), spawns);

            // Cancellation is final: no spawns trickle in afterwards.
            tokio::time::sleep(Duration::from_millis(200)).await;
            assert_eq!(count_lines(&path, "started process"), spawns);
        }

        #[tokio::test]
        async fn cancellation_mid_child_returns_promptly() {
            let dir = tempfile::tempdir().unwrap();
            let (sink, path) = file_sink(&dir);
            let config = shell_config(
                "sleep 30",
                RespawnPolicy::After(Duration::from_millis(10)),
            );

            let token = CancellationToken::new();
            let started = Instant::now();
            let handle = {
                let token = token.clone();
                tokio::spawn(async move { run(&config, &sink, token).await })
            };

            tokio::time::sleep(Duration::from_millis(150)).await;
            token.cancel();
            let outcome = handle.await.unwrap();

            assert_eq!(outcome, None);
            assert!(started.elapsed() < Duration::from_secs(5));
            assert_eq!(count_lines(&path, "started process"), 1);
        }

        #[tokio::test]
        async fn pending_respawn_delay_is_cancellable() {
            let dir = tempfile::tempdir().unwrap();
            let (sink, _path) = file_sink(&dir);
            // A long delay: cancellation must not have to sit it out.
            let config = shell_config("exit 0", RespawnPolicy::After(Duration::from_secs(30)));

            let token = CancellationToken::new();
            let handle = {
                let token = token.clone();
                tokio::spawn(async move { run(&config, &sink, token).await })
            };

            tokio::time::sleep(Duration::from_millis(200)).await;
            let cancelled_at = Instant::now();
            token.cancel();
            let outcome = handle.await.unwrap();

            assert_eq!(outcome, None);
            assert!(cancelled_at.elapsed() < Duration::from_secs(1));
        }
    }
}
