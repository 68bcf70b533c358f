//! Aggregate version numbers.
//!
//! Every aggregate carries a [`Version`] that starts at 1 when it is created and
//! increments by exactly one on every mutating operation. Repositories use it as
//! an optimistic-concurrency token: a write is only accepted when it advances the
//! stored version by one.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Aggregate version number for optimistic concurrency control.
///
/// # Examples
///
/// ```
/// use hotel_core::version::Version;
///
/// let v1 = Version::FIRST;
/// let v2 = v1.next();
/// assert_eq!(v2, Version::new(2));
/// assert!(v2.follows(v1));
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(u64);

impl Version {
    /// The version of a freshly created aggregate.
    pub const FIRST: Self = Self(1);

    /// Create a new `Version` with the given value.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Get the version number.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Get the next version (current + 1).
    ///
    /// Saturates at `u64::MAX`, which no aggregate will ever reach in practice.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Whether this version is the direct successor of `previous`.
    #[must_use]
    pub const fn follows(self, previous: Self) -> bool {
        previous.0 < u64::MAX && self.0 == previous.0 + 1
    }
}

impl Default for Version {
    fn default() -> Self {
        Self::FIRST
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Version {
    fn from(value: u64) -> Self {
        Self(value)
    }
}
