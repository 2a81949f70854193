//! Daemon configuration: data model, payload codec, and caller-side defaults.
//!
//! [`DaemonConfig`] is the immutable configuration one supervisor process runs
//! with. It travels to the daemon binary as a single argument, either raw JSON
//! or base64-encoded JSON; [`DaemonConfig::decode_payload`] accepts both,
//! trying the raw form first (two encodings exist historically and both must
//! keep working).
//!
//! Defaults are never applied by the daemon. [`RunOptions`] is the caller-side
//! option bag that fills them in and resolves every path to an absolute form
//! before the configuration is handed over.
//!
//! ## Example
//! ```rust
//! use keeprun::{DaemonConfig, RunOptions};
//!
//! let config = RunOptions::new()
//!     .command("ping")
//!     .args(["localhost"])
//!     .resolve("my-service")
//!     .unwrap();
//! assert!(config.cwd.is_absolute());
//!
//! let payload = config.encode_payload();
//! let decoded = DaemonConfig::decode_payload(&payload).unwrap();
//! assert_eq!(decoded.command, "ping");
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use base64::prelude::{Engine, BASE64_STANDARD};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ConfigError;
use crate::policy::RespawnPolicy;

/// Destination for supervisor lifecycle logging.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LogTarget {
    /// Append to this file; child stdout/stderr are routed there too.
    File(PathBuf),
    /// Write to the supervisor's own console; the child inherits stdio.
    Console,
}

/// Wire form: a path string, or a boolean (`false` selects the console; the
/// daemon treats any boolean as "no file", matching the historical decoder).
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum LogWire {
    Path(PathBuf),
    Toggle(bool),
}

impl Serialize for LogTarget {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            LogTarget::File(path) => LogWire::Path(path.clone()).serialize(serializer),
            LogTarget::Console => LogWire::Toggle(false).serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for LogTarget {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match LogWire::deserialize(deserializer)? {
            LogWire::Path(path) => LogTarget::File(path),
            LogWire::Toggle(_) => LogTarget::Console,
        })
    }
}

/// Immutable configuration for one supervisor process.
///
/// Invariants at the point the daemon consumes it: `cwd` is absolute, and a
/// file `log` target has already been resolved against `cwd`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Logical name; keys the instance lock and the default log file stem.
    pub name: String,
    /// Program to run.
    pub command: String,
    /// Arguments for the program.
    #[serde(default)]
    pub args: Vec<String>,
    /// Working directory for the child, absolute.
    pub cwd: PathBuf,
    /// Extra environment variables merged over the inherited environment.
    /// Ordered so the configuration dump renders deterministically.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// Where lifecycle events (and child output) go.
    pub log: LogTarget,
    /// What happens after the child exits.
    pub respawn: RespawnPolicy,
}

impl DaemonConfig {
    /// Decodes a launch payload, trying raw JSON first and falling back to
    /// base64-encoded JSON.
    ///
    /// The error reports the raw-JSON failure, since that is the encoding a
    /// human most likely intended.
    pub fn decode_payload(payload: &str) -> Result<Self, ConfigError> {
        let config = match serde_json::from_str::<DaemonConfig>(payload) {
            Ok(config) => config,
            Err(direct) => {
                let bytes = BASE64_STANDARD
                    .decode(payload.trim())
                    .map_err(|_| ConfigError::Payload {
                        reason: direct.to_string(),
                    })?;
                serde_json::from_slice(&bytes).map_err(|_| ConfigError::Payload {
                    reason: direct.to_string(),
                })?
            }
        };
        config.validate()
    }

    /// Encodes this configuration as the base64 payload handed to the daemon
    /// binary (the encoding survives shell and registry quoting unscathed).
    pub fn encode_payload(&self) -> String {
        let json = serde_json::to_string(self).expect("configuration serializes to JSON");
        BASE64_STANDARD.encode(json)
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if !self.cwd.is_absolute() {
            return Err(ConfigError::RelativeCwd { path: self.cwd });
        }
        Ok(self)
    }

    /// View of the effective configuration echoed to the log on startup.
    pub(crate) fn dump(&self) -> ConfigDump<'_> {
        ConfigDump {
            command: &self.command,
            args: &self.args,
            cwd: &self.cwd,
            env: &self.env,
            log: &self.log,
            respawn: &self.respawn,
        }
    }
}

/// The `options:` echo, everything but the name (which keys the log itself).
#[derive(Serialize)]
pub(crate) struct ConfigDump<'a> {
    command: &'a str,
    args: &'a [String],
    cwd: &'a Path,
    env: &'a BTreeMap<String, String>,
    log: &'a LogTarget,
    respawn: &'a RespawnPolicy,
}

/// Caller-side options with defaults, resolved into a [`DaemonConfig`].
///
/// Unset fields default to: the current executable, the current process
/// arguments (without argv0), the current directory, an empty environment,
/// logging to `<name>.log` under the working directory, and a respawn delay
/// of one second.
#[derive(Clone, Debug, Default)]
pub struct RunOptions {
    command: Option<String>,
    args: Option<Vec<String>>,
    cwd: Option<PathBuf>,
    env: BTreeMap<String, String>,
    log: Option<LogChoice>,
    respawn: Option<RespawnPolicy>,
}

#[derive(Clone, Debug)]
enum LogChoice {
    Off,
    Path(PathBuf),
}

impl RunOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Program to run instead of the current executable.
    pub fn command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    /// Arguments for the program instead of the current process arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = Some(args.into_iter().map(Into::into).collect());
        self
    }

    /// Working directory instead of the current one.
    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Adds one extra environment variable for the child.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Log to this file instead of the `<name>.log` default. Relative paths
    /// resolve against the working directory.
    pub fn log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.log = Some(LogChoice::Path(path.into()));
        self
    }

    /// Log to the console instead of a file.
    pub fn log_to_console(mut self) -> Self {
        self.log = Some(LogChoice::Off);
        self
    }

    /// Respawn after this delay instead of the one-second default.
    pub fn respawn_delay(mut self, delay: Duration) -> Self {
        self.respawn = Some(RespawnPolicy::After(delay));
        self
    }

    /// Run the command once and propagate its exit code.
    pub fn no_respawn(mut self) -> Self {
        self.respawn = Some(RespawnPolicy::Never);
        self
    }

    /// Applies defaults and path resolution, producing the configuration the
    /// daemon will consume.
    pub fn resolve(self, name: &str) -> Result<DaemonConfig, ConfigError> {
        let command = match self.command {
            Some(command) => command,
            None => std::env::current_exe()
                .map_err(|source| ConfigError::Environment {
                    what: "current executable",
                    source,
                })?
                .to_string_lossy()
                .into_owned(),
        };
        let args = self
            .args
            .unwrap_or_else(|| std::env::args().skip(1).collect());
        let cwd = match self.cwd {
            Some(cwd) => absolute(cwd)?,
            None => std::env::current_dir().map_err(|source| ConfigError::Environment {
                what: "current directory",
                source,
            })?,
        };
        let log = match self.log {
            Some(LogChoice::Off) => LogTarget::Console,
            Some(LogChoice::Path(path)) => LogTarget::File(resolve_in(&cwd, path)),
            None => LogTarget::File(cwd.join(format!("{name}.log"))),
        };
        let respawn = self.respawn.unwrap_or_default();

        DaemonConfig {
            name: name.to_string(),
            command,
            args,
            cwd,
            env: self.env,
            log,
            respawn,
        }
        .validate()
    }
}

fn absolute(path: PathBuf) -> Result<PathBuf, ConfigError> {
    if path.is_absolute() {
        return Ok(path);
    }
    std::path::absolute(&path).map_err(|source| ConfigError::Resolve { path, source })
}

fn resolve_in(cwd: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        cwd.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json() -> String {
        r#"{
            "name": "svc",
            "command": "ping",
            "args": ["localhost"],
            "cwd": "/tmp",
            "env": {"A": "1"},
            "log": "/tmp/svc.log",
            "respawn": 100
        }"#
        .to_string()
    }

    #[test]
    fn decodes_raw_json() {
        let config = DaemonConfig::decode_payload(&sample_json()).unwrap();
        assert_eq!(config.name, "svc");
        assert_eq!(config.command, "ping");
        assert_eq!(config.log, LogTarget::File(PathBuf::from("/tmp/svc.log")));
        assert_eq!(
            config.respawn,
            RespawnPolicy::After(Duration::from_millis(100))
        );
    }

    #[test]
    fn falls_back_to_base64() {
        let encoded = BASE64_STANDARD.encode(sample_json());
        let config = DaemonConfig::decode_payload(&encoded).unwrap();
        assert_eq!(config.name, "svc");
    }

    #[test]
    fn rejects_garbage_with_config_error() {
        let err = DaemonConfig::decode_payload("not json, not base64!").unwrap_err();
        assert_eq!(err.as_label(), "config_payload");
    }

    #[test]
    fn rejects_relative_cwd() {
        let json = sample_json().replace("\"/tmp\"", "\"relative/dir\"");
        let err = DaemonConfig::decode_payload(&json).unwrap_err();
        assert_eq!(err.as_label(), "config_relative_cwd");
    }

    #[test]
    fn false_toggles_select_console_and_never() {
        let json = sample_json()
            .replace("\"/tmp/svc.log\"", "false")
            .replace("\"respawn\": 100", "\"respawn\": false");
        let config = DaemonConfig::decode_payload(&json).unwrap();
        assert_eq!(config.log, LogTarget::Console);
        assert_eq!(config.respawn, RespawnPolicy::Never);
    }

    #[test]
    fn payload_roundtrip_through_base64() {
        let config = DaemonConfig::decode_payload(&sample_json()).unwrap();
        let decoded = DaemonConfig::decode_payload(&config.encode_payload()).unwrap();
        assert_eq!(decoded.command, config.command);
        assert_eq!(decoded.env, config.env);
        assert_eq!(decoded.respawn, config.respawn);
    }

    #[test]
    fn options_default_log_is_name_log_under_cwd() {
        let config = RunOptions::new()
            .command("sleep")
            .args(["1"])
            .cwd("/tmp")
            .resolve("svc")
            .unwrap();
        assert_eq!(config.log, LogTarget::File(PathBuf::from("/tmp/svc.log")));
        assert_eq!(config.respawn, RespawnPolicy::default());
    }

    #[test]
    fn options_resolve_relative_log_against_cwd() {
        let config = RunOptions::new()
            .command("sleep")
            .args(["1"])
            .cwd("/tmp")
            .log_path("logs/out.log")
            .resolve("svc")
            .unwrap();
        assert_eq!(
            config.log,
            LogTarget::File(PathBuf::from("/tmp/logs/out.log"))
        );
    }

    #[test]
    fn options_cwd_is_made_absolute() {
        let config = RunOptions::new()
            .command("sleep")
            .args(["1"])
            .cwd("some/relative/dir")
            .resolve("svc")
            .unwrap();
        assert!(config.cwd.is_absolute());
    }
}
