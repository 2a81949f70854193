//! Autostart via the per-user Windows run key.
//!
//! Values under `HKCU\Software\Microsoft\Windows\CurrentVersion\Run` are
//! executed at login. The key is driven through `reg.exe`, which ships with
//! every Windows installation.

use std::io;

use async_trait::async_trait;
use tokio::process::Command;

use super::autostart::{join_command_line, Autostart};

const RUN_KEY: &str = r"HKCU\Software\Microsoft\Windows\CurrentVersion\Run";

/// Autostart backed by a value named after the daemon in the HKCU run key.
pub struct WindowsAutostart {
    name: String,
}

impl WindowsAutostart {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

#[async_trait]
impl Autostart for WindowsAutostart {
    async fn enable(&self, command: &[String]) -> io::Result<()> {
        let line = join_command_line(command);
        let status = Command::new("reg")
            .args(["add", RUN_KEY, "/v", &self.name, "/t", "REG_SZ", "/d", &line, "/f"])
            .status()
            .await?;
        if status.success() {
            Ok(())
        } else {
            Err(io::Error::other(format!(
                "reg add for value {} exited with {status}",
                self.name
            )))
        }
    }

    async fn disable(&self) -> io::Result<()> {
        if !self.is_enabled().await? {
            return Ok(());
        }
        let status = Command::new("reg")
            .args(["delete", RUN_KEY, "/v", &self.name, "/f"])
            .status()
            .await?;
        if status.success() {
            Ok(())
        } else {
            Err(io::Error::other(format!(
                "reg delete for value {} exited with {status}",
                self.name
            )))
        }
    }

    async fn is_enabled(&self) -> io::Result<bool> {
        let status = Command::new("reg")
            .args(["query", RUN_KEY, "/v", &self.name])
            .status()
            .await?;
        Ok(status.success())
    }
}
