//! Supervision marker: how a child knows it runs under a supervisor.
//!
//! The supervisor exposes its own pid to the child through one well-known
//! environment variable. A process whose parent pid equals that value was
//! spawned by a supervisor and must refuse to start another one, which is
//! what prevents accidental supervisor-of-supervisor chains.
//!
//! This is an ambient-global convention, so it lives behind a single
//! constant and a single predicate; call sites never inspect the variable
//! themselves.

use crate::instance::os;

/// Environment variable carrying the supervisor's pid into the child.
pub const SUPERVISOR_ENV: &str = "KEEPRUN_SUPERVISOR";

/// True when the current process was spawned by a keeprun supervisor.
pub fn running_under_supervisor() -> bool {
    let value = std::env::var(SUPERVISOR_ENV).ok();
    marker_matches(value.as_deref(), os::parent_pid())
}

/// Pure comparison behind [`running_under_supervisor`]: the marker matches
/// when it parses as a pid equal to the parent pid.
fn marker_matches(value: Option<&str>, parent: Option<u32>) -> bool {
    match (value.and_then(|v| v.trim().parse::<u32>().ok()), parent) {
        (Some(marked), Some(parent)) => marked == parent,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_only_when_marker_equals_parent() {
        assert!(marker_matches(Some("42"), Some(42)));
        assert!(!marker_matches(Some("42"), Some(43)));
    }

    #[test]
    fn missing_or_malformed_marker_never_matches() {
        assert!(!marker_matches(None, Some(42)));
        assert!(!marker_matches(Some("not-a-pid"), Some(42)));
        assert!(!marker_matches(Some(""), Some(42)));
        assert!(!marker_matches(Some("42"), None));
    }

    #[test]
    fn tolerates_surrounding_whitespace() {
        assert!(marker_matches(Some(" 42\n"), Some(42)));
    }
}
