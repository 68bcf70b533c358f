//! Aggregate persistence contract.
//!
//! Every aggregate in the system (an Availability row, a Reservation, a waitlist
//! entry) is stored behind the same minimal contract:
//!
//! - `save(entity)` with optimistic concurrency on the aggregate [`Version`]
//! - `find_by_id(id)` failing with [`RepositoryError::NotFound`]
//! - `find_all()`
//!
//! Aggregate-specific finders (by confirmation code, by guest, …) are declared as
//! extension traits in the domain crate on top of [`Repository`].
//!
//! # Optimistic Concurrency
//!
//! Aggregates increment their version on every mutating operation. A repository
//! accepts a `save` when:
//!
//! - no record with that id exists yet (insert), or
//! - the entity's version is exactly the stored version + 1 (update)
//!
//! Anything else means the entity was derived from a stale read and is rejected
//! with [`RepositoryError::ConcurrentModification`] instead of silently
//! overwriting the newer record.
//!
//! # Dyn Compatibility
//!
//! The trait uses `async_trait` so services can hold `Arc<dyn Repository<A>>`
//! (or an extension trait object) and stay independent of the storage technology.

use crate::version::Version;
use async_trait::async_trait;
use std::fmt::{Debug, Display};
use std::hash::Hash;
use thiserror::Error;

/// Errors that can occur during repository operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// No aggregate with the requested identity exists.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Aggregate kind (e.g. `"Reservation"`)
        kind: &'static str,
        /// Rendered identity
        id: String,
    },

    /// The saved entity does not advance the stored version by exactly one.
    ///
    /// This typically means another writer has modified the aggregate since it
    /// was loaded.
    #[error("Concurrent modification of {kind} {id}: expected version {expected}, found {actual}")]
    ConcurrentModification {
        /// Aggregate kind
        kind: &'static str,
        /// Rendered identity
        id: String,
        /// The version the write required (stored + 1)
        expected: Version,
        /// The version carried by the rejected entity
        actual: Version,
    },

    /// The underlying storage failed.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl RepositoryError {
    /// Build a `NotFound` error for an aggregate type.
    #[must_use]
    pub fn not_found<A: Aggregate>(id: &A::Id) -> Self {
        Self::NotFound {
            kind: A::KIND,
            id: id.to_string(),
        }
    }
}

/// An independently addressable consistency boundary.
pub trait Aggregate: Clone + Send + Sync + 'static {
    /// Identity type of the aggregate.
    type Id: Clone + Eq + Hash + Ord + Debug + Display + Send + Sync + 'static;

    /// Human-readable aggregate kind used in errors and logs.
    const KIND: &'static str;

    /// The aggregate's identity.
    fn id(&self) -> Self::Id;

    /// The aggregate's current version.
    fn version(&self) -> Version;
}

/// Persistence contract shared by every aggregate.
#[async_trait]
pub trait Repository<A: Aggregate>: Send + Sync {
    /// Persist an aggregate.
    ///
    /// # Errors
    ///
    /// - `ConcurrentModification`: the entity does not advance the stored version by one
    /// - `Storage`: the backing store failed
    async fn save(&self, aggregate: &A) -> Result<(), RepositoryError>;

    /// Load an aggregate by identity.
    ///
    /// # Errors
    ///
    /// - `NotFound`: no aggregate with this identity
    /// - `Storage`: the backing store failed
    async fn find_by_id(&self, id: &A::Id) -> Result<A, RepositoryError>;

    /// Load every stored aggregate.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the backing store failed.
    async fn find_all(&self) -> Result<Vec<A>, RepositoryError>;
}

/// Check the optimistic-concurrency rule for a write.
///
/// `stored` is the version currently persisted (if any) and `incoming` the
/// version carried by the entity being saved.
///
/// # Errors
///
/// Returns `ConcurrentModification` when `incoming` is not `stored + 1`.
pub fn check_version<A: Aggregate>(
    aggregate: &A,
    stored: Option<Version>,
) -> Result<(), RepositoryError> {
    match stored {
        None => Ok(()),
        Some(stored) if aggregate.version().follows(stored) => Ok(()),
        Some(stored) => Err(RepositoryError::ConcurrentModification {
            kind: A::KIND,
            id: aggregate.id().to_string(),
            expected: stored.next(),
            actual: aggregate.version(),
        }),
    }
}
