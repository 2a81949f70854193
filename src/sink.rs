//! Log sink: attributable lifecycle logging for the daemon.
//!
//! Every message, free text or structured, is rendered as one or more
//! physical lines and each line carries the `[daemon] ` prefix, so
//! multi-line output stays attributable when interleaved with child output.
//! Structured values render as pretty JSON with sorted map keys, which keeps
//! the rendering deterministic for a given input.
//!
//! A file-backed sink also hands out cloned handles so the child's
//! stdout/stderr can be appended to the same file.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Mutex;

use serde::Serialize;

/// Prefix stamped on every physical log line.
const LINE_PREFIX: &str = "[daemon] ";

/// Destination for supervisor lifecycle events.
pub struct LogSink {
    inner: SinkKind,
}

enum SinkKind {
    Console,
    File { file: Mutex<File>, path: PathBuf },
}

impl LogSink {
    /// Sink writing to the supervisor's stdout.
    pub fn console() -> Self {
        Self {
            inner: SinkKind::Console,
        }
    }

    /// Sink appending to `path`, creating the file and any missing parent
    /// directories first.
    pub fn file(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            inner: SinkKind::File {
                file: Mutex::new(file),
                path: path.to_path_buf(),
            },
        })
    }

    /// Logs a free-text message. Each line of a multi-line message is framed
    /// separately.
    pub fn info(&self, message: &str) {
        self.write_framed(message);
    }

    /// Logs a structured value rendered as pretty JSON.
    pub fn value<T: Serialize>(&self, value: &T) {
        match serde_json::to_string_pretty(value) {
            Ok(rendered) => self.write_framed(&rendered),
            Err(error) => self.write_framed(&format!("<unrenderable value: {error}>")),
        }
    }

    /// The log file path, for file-backed sinks.
    pub fn path(&self) -> Option<&Path> {
        match &self.inner {
            SinkKind::Console => None,
            SinkKind::File { path, .. } => Some(path),
        }
    }

    /// Handles for routing child stdout/stderr into the log file. `None`
    /// means the child should inherit the supervisor's stdio.
    pub(crate) fn child_stdio(&self) -> io::Result<Option<(Stdio, Stdio)>> {
        match &self.inner {
            SinkKind::Console => Ok(None),
            SinkKind::File { file, .. } => {
                let file = file.lock().expect("log sink lock poisoned");
                let out = file.try_clone()?;
                let err = file.try_clone()?;
                Ok(Some((Stdio::from(out), Stdio::from(err))))
            }
        }
    }

    fn write_framed(&self, message: &str) {
        let framed = frame(message);
        // Logging must not take the supervisor down; write failures are
        // dropped.
        match &self.inner {
            SinkKind::Console => {
                let stdout = io::stdout();
                let mut handle = stdout.lock();
                let _ = writeln!(handle, "{framed}");
            }
            SinkKind::File { file, .. } => {
                let mut file = file.lock().expect("log sink lock poisoned");
                let _ = writeln!(file, "{framed}");
            }
        }
    }
}

/// Prefixes every physical line of `message`.
fn frame(message: &str) -> String {
    if message.is_empty() {
        return LINE_PREFIX.trim_end().to_string();
    }
    message
        .lines()
        .map(|line| format!("{LINE_PREFIX}{line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn frames_single_line() {
        assert_eq!(frame("started process 42."), "[daemon] started process 42.");
    }

    #[test]
    fn frames_every_line_of_multiline_message() {
        let framed = frame("options:\n{\n  \"a\": 1\n}");
        for line in framed.lines() {
            assert!(line.starts_with("[daemon] "), "unframed line: {line:?}");
        }
        assert_eq!(framed.lines().count(), 4);
    }

    #[test]
    fn structured_rendering_is_deterministic() {
        let mut map = BTreeMap::new();
        map.insert("zeta", 1);
        map.insert("alpha", 2);
        let a = serde_json::to_string_pretty(&map).unwrap();
        let b = serde_json::to_string_pretty(&map).unwrap();
        assert_eq!(a, b);
        assert!(a.find("alpha").unwrap() < a.find("zeta").unwrap());
    }

    #[test]
    fn file_sink_appends_framed_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("svc.log");
        let sink = LogSink::file(&path).unwrap();
        sink.info("first");
        sink.info("second\nthird");

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(
            lines,
            vec!["[daemon] first", "[daemon] second", "[daemon] third"]
        );
    }

    #[test]
    fn file_sink_reports_its_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("svc.log");
        let sink = LogSink::file(&path).unwrap();
        assert_eq!(sink.path(), Some(path.as_path()));
        assert!(LogSink::console().path().is_none());
    }
}
