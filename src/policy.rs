//! Respawn policy for the supervised command.
//!
//! [`RespawnPolicy`] decides what happens after the child exits:
//!
//! - [`RespawnPolicy::Never`] the supervisor terminates and propagates the
//!   child's exit code as its own.
//! - [`RespawnPolicy::After`] the supervisor waits a fixed delay and spawns
//!   the command again, indefinitely.
//!
//! On the wire (the launch payload) the policy is encoded the way it always
//! has been: a non-negative delay in milliseconds, or `false` for "do not
//! respawn". A bare `true` is tolerated and maps to the historical default of
//! one second.

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Default delay between a child exit and the next spawn.
pub const DEFAULT_RESPAWN_DELAY: Duration = Duration::from_millis(1000);

/// Policy controlling whether the command is spawned again after it exits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RespawnPolicy {
    /// Run the command once; its exit code becomes the supervisor's.
    Never,
    /// Spawn again after the fixed delay, every time the command exits.
    After(Duration),
}

impl Default for RespawnPolicy {
    /// Returns [`RespawnPolicy::After`] with [`DEFAULT_RESPAWN_DELAY`].
    fn default() -> Self {
        RespawnPolicy::After(DEFAULT_RESPAWN_DELAY)
    }
}

impl RespawnPolicy {
    /// Returns the configured delay, or `None` under [`RespawnPolicy::Never`].
    pub fn delay(&self) -> Option<Duration> {
        match self {
            RespawnPolicy::Never => None,
            RespawnPolicy::After(delay) => Some(*delay),
        }
    }
}

/// Wire form: milliseconds, or a boolean toggle.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum Wire {
    Millis(u64),
    Toggle(bool),
}

impl Serialize for RespawnPolicy {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let wire = match self {
            RespawnPolicy::Never => Wire::Toggle(false),
            RespawnPolicy::After(delay) => Wire::Millis(delay.as_millis() as u64),
        };
        wire.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for RespawnPolicy {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Wire::deserialize(deserializer)? {
            Wire::Millis(ms) => RespawnPolicy::After(Duration::from_millis(ms)),
            Wire::Toggle(false) => RespawnPolicy::Never,
            Wire::Toggle(true) => RespawnPolicy::After(DEFAULT_RESPAWN_DELAY),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn false_means_never() {
        let policy: RespawnPolicy = serde_json::from_str("false").unwrap();
        assert_eq!(policy, RespawnPolicy::Never);
        assert_eq!(policy.delay(), None);
    }

    #[test]
    fn millis_mean_fixed_delay() {
        let policy: RespawnPolicy = serde_json::from_str("250").unwrap();
        assert_eq!(policy, RespawnPolicy::After(Duration::from_millis(250)));
        assert_eq!(policy.delay(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn true_maps_to_default_delay() {
        let policy: RespawnPolicy = serde_json::from_str("true").unwrap();
        assert_eq!(policy, RespawnPolicy::After(DEFAULT_RESPAWN_DELAY));
    }

    #[test]
    fn serializes_back_to_wire_form() {
        assert_eq!(serde_json::to_string(&RespawnPolicy::Never).unwrap(), "false");
        assert_eq!(
            serde_json::to_string(&RespawnPolicy::After(Duration::from_millis(100))).unwrap(),
            "100"
        );
    }
}
