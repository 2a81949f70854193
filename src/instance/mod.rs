//! Singleton instance coordination.
//!
//! One supervisor per logical name, enforced through an on-disk pid marker:
//!
//! - [`lock`]: claim, release, and terminate operations keyed by name;
//! - [`os`]: the platform-specific liveness and signaling primitives.
//!
//! Everything that touches the marker goes through [`InstanceLock`] and
//! [`InstanceClaim`]; nothing else in the crate manipulates it directly.

mod lock;
pub(crate) mod os;

pub use lock::{InstanceClaim, InstanceLock};
