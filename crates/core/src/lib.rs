#![warn(missing_docs)]
//! Core primitives shared across the workspace.

pub mod registry;
pub mod resources;
pub mod subscription;

use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;

// Re-export commonly used types
pub use registry::{FamilyId, FamilyIdError};
pub use resources::{Cost, ResourceKind, Resources};
pub use subscription::SubscriptionTier;

/// Milliseconds in one second.
pub const MS_PER_SEC: u64 = 1_000;
/// Milliseconds in one hour.
pub const MS_PER_HOUR: u64 = 3_600 * MS_PER_SEC;
/// Milliseconds in one day.
pub const MS_PER_DAY: u64 = 24 * MS_PER_HOUR;

/// Wall-clock instant in milliseconds since the Unix epoch.
///
/// Every engine operation receives "now" explicitly as a `Millis`; nothing in
/// the engine reads the system clock.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Millis(pub u64);

impl Millis {
    /// The Unix epoch.
    pub const ZERO: Self = Self(0);

    /// Build an instant from whole seconds.
    pub const fn from_secs(secs: u64) -> Self {
        Self(secs * MS_PER_SEC)
    }

    /// Build an instant from whole hours.
    pub const fn from_hours(hours: u64) -> Self {
        Self(hours * MS_PER_HOUR)
    }

    /// Milliseconds elapsed since `earlier`, zero if `earlier` is in the future.
    pub fn since(self, earlier: Millis) -> u64 {
        self.0.saturating_sub(earlier.0)
    }

    /// Advance by `delta` milliseconds.
    pub fn advance(self, delta: u64) -> Self {
        Self(self.0.saturating_add(delta))
    }

    /// Whole days since the epoch; used to scope daily randomness.
    pub fn day_index(self) -> u64 {
        self.0 / MS_PER_DAY
    }
}

impl fmt::Display for Millis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

/// Stable player identity as resolved by the external identity provider.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Helper to derive a reproducible RNG seeded by player + domain.
///
/// The same player and domain always yield the same stream, so anything drawn
/// from it (quest picks, referral codes) is a pure function of stored state.
pub fn scoped_rng(player: PlayerId, domain: u64) -> StdRng {
    let seed = player.0.rotate_left(17) ^ domain.wrapping_mul(0x9E37_79B9_7F4A_7C15);
    StdRng::seed_from_u64(seed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn since_saturates_for_future_instants() {
        assert_eq!(Millis(5_000).since(Millis(2_000)), 3_000);
        assert_eq!(Millis(2_000).since(Millis(5_000)), 0);
    }

    #[test]
    fn hour_and_second_constructors_agree() {
        assert_eq!(Millis::from_hours(1), Millis::from_secs(3_600));
        assert_eq!(Millis::from_hours(24).day_index(), 1);
    }

    #[test]
    fn scoped_rng_is_reproducible() {
        let a: u64 = scoped_rng(PlayerId(7), 3).gen();
        let b: u64 = scoped_rng(PlayerId(7), 3).gen();
        let c: u64 = scoped_rng(PlayerId(7), 4).gen();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
