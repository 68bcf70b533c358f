//! Versioned in-memory aggregate storage.
//!
//! [`InMemoryStore`] is the storage engine behind every in-memory repository.
//! It enforces the optimistic-concurrency rule of
//! [`hotel_core::repository::check_version`] on each write and keeps records in
//! identity order so `find_all` is deterministic.

use async_trait::async_trait;
use hotel_core::repository::{Aggregate, Repository, RepositoryError, check_version};
use std::collections::BTreeMap;
use tokio::sync::RwLock;

/// A map of aggregates keyed by identity, guarded by an async `RwLock`.
///
/// # Example
///
/// ```
/// use hotel_core::{Aggregate, Version};
/// use hotel_runtime::InMemoryStore;
///
/// #[derive(Clone)]
/// struct Room {
///     number: u32,
///     version: Version,
/// }
///
/// impl Aggregate for Room {
///     type Id = u32;
///     const KIND: &'static str = "Room";
///
///     fn id(&self) -> u32 {
///         self.number
///     }
///
///     fn version(&self) -> Version {
///         self.version
///     }
/// }
///
/// # tokio_test::block_on(async {
/// let store = InMemoryStore::new();
/// store.save(&Room { number: 101, version: Version::FIRST }).await.unwrap();
///
/// // A second writer starting from the same version loses.
/// let stale = Room { number: 101, version: Version::FIRST };
/// assert!(store.save(&stale).await.is_err());
/// assert_eq!(store.len().await, 1);
/// # });
/// ```
#[derive(Debug)]
pub struct InMemoryStore<A: Aggregate> {
    records: RwLock<BTreeMap<A::Id, A>>,
}

impl<A: Aggregate> Default for InMemoryStore<A> {
    fn default() -> Self {
        Self {
            records: RwLock::new(BTreeMap::new()),
        }
    }
}

impl<A: Aggregate> InMemoryStore<A> {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or update an aggregate.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::ConcurrentModification`] when an existing record
    /// is not advanced by exactly one version.
    pub async fn save(&self, aggregate: &A) -> Result<(), RepositoryError> {
        let mut records = self.records.write().await;
        let id = aggregate.id();
        check_version(aggregate, records.get(&id).map(|stored| stored.version()))?;

        tracing::trace!(kind = A::KIND, %id, version = %aggregate.version(), "Stored aggregate");
        records.insert(id, aggregate.clone());
        Ok(())
    }

    /// Load a single aggregate.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::NotFound`] if no record exists.
    pub async fn get(&self, id: &A::Id) -> Result<A, RepositoryError> {
        self.records
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| RepositoryError::not_found::<A>(id))
    }

    /// Every stored aggregate, in identity order.
    pub async fn all(&self) -> Vec<A> {
        self.records.read().await.values().cloned().collect()
    }

    /// Every stored aggregate matching `predicate`, in identity order.
    pub async fn filter<P>(&self, predicate: P) -> Vec<A>
    where
        P: Fn(&A) -> bool,
    {
        self.records
            .read()
            .await
            .values()
            .filter(|aggregate| predicate(aggregate))
            .cloned()
            .collect()
    }

    /// Number of stored aggregates.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Whether the store is empty.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl<A: Aggregate> Repository<A> for InMemoryStore<A> {
    async fn save(&self, aggregate: &A) -> Result<(), RepositoryError> {
        Self::save(self, aggregate).await
    }

    async fn find_by_id(&self, id: &A::Id) -> Result<A, RepositoryError> {
        self.get(id).await
    }

    async fn find_all(&self) -> Result<Vec<A>, RepositoryError> {
        Ok(self.all().await)
    }
}
