//! Autostart capability: run the daemon at login.
//!
//! Each platform persists "run this command at login" differently (a
//! registry run key, a desktop entry, a service unit). The daemon core never
//! sees any of that; it is modeled as the [`Autostart`] capability with one
//! implementation per platform, selected at build time by
//! [`platform_autostart`].

use std::io;

use async_trait::async_trait;

/// Login-persistence capability for a named daemon command line.
#[async_trait]
pub trait Autostart: Send + Sync {
    /// Registers `command` (binary plus arguments) to run at login.
    async fn enable(&self, command: &[String]) -> io::Result<()>;

    /// Removes the registration. Not an error when none exists.
    async fn disable(&self) -> io::Result<()>;

    /// True when a registration currently exists.
    async fn is_enabled(&self) -> io::Result<bool>;
}

/// The autostart implementation for the current platform.
#[cfg(unix)]
pub fn platform_autostart(name: &str) -> io::Result<Box<dyn Autostart>> {
    Ok(Box::new(super::xdg::XdgAutostart::new(name)?))
}

/// The autostart implementation for the current platform.
#[cfg(windows)]
pub fn platform_autostart(name: &str) -> io::Result<Box<dyn Autostart>> {
    Ok(Box::new(super::windows::WindowsAutostart::new(name)))
}

/// Joins command segments into one line, quoting segments that would
/// otherwise split or swallow quotes. Autostart facilities store a single
/// string, not an argv.
pub(crate) fn join_command_line(segments: &[String]) -> String {
    segments
        .iter()
        .map(|segment| quote(segment))
        .collect::<Vec<_>>()
        .join(" ")
}

fn quote(segment: &str) -> String {
    let needs_quoting =
        segment.is_empty() || segment.chars().any(|c| c.is_whitespace() || c == '"');
    if !needs_quoting {
        return segment.to_string();
    }
    let escaped = segment.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(segments: &[&str]) -> String {
        let owned: Vec<String> = segments.iter().map(|s| s.to_string()).collect();
        join_command_line(&owned)
    }

    #[test]
    fn plain_segments_stay_unquoted() {
        assert_eq!(line(&["/usr/bin/keeprund", "eyJuYW1lIjoi"]), "/usr/bin/keeprund eyJuYW1lIjoi");
    }

    #[test]
    fn whitespace_forces_quotes() {
        assert_eq!(line(&["C:\\Program Files\\keeprund"]), "\"C:\\\\Program Files\\\\keeprund\"");
    }

    #[test]
    fn embedded_quotes_are_escaped() {
        assert_eq!(line(&["say \"hi\""]), "\"say \\\"hi\\\"\"");
    }

    #[test]
    fn empty_segment_survives() {
        assert_eq!(line(&[""]), "\"\"");
    }
}
