//! Autostart via an XDG desktop entry.
//!
//! Desktop sessions following the XDG autostart convention launch every
//! `.desktop` entry found under the user autostart directory at login. Enable
//! writes `<name>.desktop` there; disable removes it.

use std::io;
use std::path::PathBuf;

use async_trait::async_trait;

use super::autostart::{join_command_line, Autostart};

/// Autostart backed by `~/.config/autostart/<name>.desktop`.
pub struct XdgAutostart {
    name: String,
    entry: PathBuf,
}

impl XdgAutostart {
    /// Entry for `name` in the user autostart directory.
    pub fn new(name: &str) -> io::Result<Self> {
        let config = dirs::config_dir().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                "no user configuration directory for autostart entries",
            )
        })?;
        Ok(Self {
            name: name.to_string(),
            entry: config.join("autostart").join(format!("{name}.desktop")),
        })
    }

    /// Where the entry lives (mainly for diagnostics and tests).
    pub fn entry_path(&self) -> &std::path::Path {
        &self.entry
    }

    #[cfg(test)]
    fn at(name: &str, entry: PathBuf) -> Self {
        Self {
            name: name.to_string(),
            entry,
        }
    }
}

#[async_trait]
impl Autostart for XdgAutostart {
    async fn enable(&self, command: &[String]) -> io::Result<()> {
        if let Some(parent) = self.entry.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let contents = format!(
            "[Desktop Entry]\n\
             Type=Application\n\
             Name={}\n\
             Exec={}\n\
             X-GNOME-Autostart-enabled=true\n",
            self.name,
            join_command_line(command),
        );
        tokio::fs::write(&self.entry, contents).await
    }

    async fn disable(&self) -> io::Result<()> {
        match tokio::fs::remove_file(&self.entry).await {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(error),
        }
    }

    async fn is_enabled(&self) -> io::Result<bool> {
        tokio::fs::try_exists(&self.entry).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry_in(dir: &tempfile::TempDir) -> XdgAutostart {
        XdgAutostart::at("svc", dir.path().join("autostart").join("svc.desktop"))
    }

    #[tokio::test]
    async fn enable_writes_a_desktop_entry() {
        let dir = tempfile::tempdir().unwrap();
        let autostart = entry_in(&dir);

        assert!(!autostart.is_enabled().await.unwrap());
        autostart
            .enable(&["/usr/bin/keeprund".to_string(), "payload".to_string()])
            .await
            .unwrap();
        assert!(autostart.is_enabled().await.unwrap());

        let contents = std::fs::read_to_string(autostart.entry_path()).unwrap();
        assert!(contents.starts_with("[Desktop Entry]\n"));
        assert!(contents.contains("Exec=/usr/bin/keeprund payload\n"));
        assert!(contents.contains("Name=svc\n"));
    }

    #[tokio::test]
    async fn disable_removes_and_tolerates_absence() {
        let dir = tempfile::tempdir().unwrap();
        let autostart = entry_in(&dir);

        autostart
            .enable(&["/usr/bin/keeprund".to_string()])
            .await
            .unwrap();
        autostart.disable().await.unwrap();
        assert!(!autostart.is_enabled().await.unwrap());
        // Disabling again is not an error.
        autostart.disable().await.unwrap();
    }
}
