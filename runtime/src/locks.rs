//! Per-identity async locks.
//!
//! [`KeyedLocks`] hands out one `tokio::sync::Mutex` per key, created lazily on
//! first use. Operations that touch several keys (every date of a stay, for
//! example) acquire them through [`KeyedLocks::lock_all`], which sorts and
//! deduplicates the keys first. Two callers that lock overlapping key sets can
//! therefore never wait on each other in opposite orders.
//!
//! Locks of different aggregate kinds live in separate `KeyedLocks` instances;
//! callers are expected to acquire those instances in a fixed order as well.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::{Arc, Mutex as TableMutex, PoisonError};
use tokio::sync::{Mutex, OwnedMutexGuard};

type LockTable<K> = Arc<TableMutex<HashMap<K, Arc<Mutex<()>>>>>;

/// A table of lazily created per-key mutexes.
///
/// A key's entry lives only while a guard holds it or a caller waits for it;
/// the last guard to release a key removes its entry.
#[derive(Debug)]
pub struct KeyedLocks<K> {
    table: LockTable<K>,
}

impl<K> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self {
            table: Arc::new(TableMutex::new(HashMap::new())),
        }
    }
}

impl<K> KeyedLocks<K>
where
    K: Clone + Eq + Hash + Ord + Debug + Send + Sync + 'static,
{
    /// Create an empty lock table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for a single key.
    pub async fn lock(&self, key: K) -> KeyedGuard<K> {
        self.lock_all(std::iter::once(key)).await
    }

    /// Acquire the locks for every key, in ascending key order.
    ///
    /// Duplicate keys are acquired once. The returned guard releases every lock
    /// when dropped.
    pub async fn lock_all<I>(&self, keys: I) -> KeyedGuard<K>
    where
        I: IntoIterator<Item = K>,
    {
        let mut keys: Vec<K> = keys.into_iter().collect();
        keys.sort();
        keys.dedup();

        let mut guard = KeyedGuard {
            guards: Vec::with_capacity(keys.len()),
            keys,
            table: Arc::clone(&self.table),
        };

        // Cloned under the table lock, so pruning never removes a mutex that
        // someone is about to wait on.
        let mutexes: Vec<Arc<Mutex<()>>> = {
            let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
            guard
                .keys
                .iter()
                .map(|key| Arc::clone(table.entry(key.clone()).or_default()))
                .collect()
        };

        for mutex in mutexes {
            guard.guards.push(mutex.lock_owned().await);
        }

        tracing::trace!(count = guard.keys.len(), "Acquired keyed locks");
        guard
    }

    /// Number of keys currently held or waited for.
    #[must_use]
    pub fn tracked_keys(&self) -> usize {
        self.table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Guard over a set of keyed locks; releases them on drop.
#[derive(Debug)]
#[must_use = "locks are released as soon as the guard is dropped"]
pub struct KeyedGuard<K: Eq + Hash> {
    keys: Vec<K>,
    guards: Vec<OwnedMutexGuard<()>>,
    table: LockTable<K>,
}

impl<K: Eq + Hash> KeyedGuard<K> {
    /// Keys held by this guard, sorted and deduplicated.
    #[must_use]
    pub fn keys(&self) -> &[K] {
        &self.keys
    }

    /// Whether the guard holds the lock for `key`.
    pub fn holds(&self, key: &K) -> bool
    where
        K: Ord,
    {
        self.keys.binary_search(key).is_ok()
    }
}

impl<K: Eq + Hash> Drop for KeyedGuard<K> {
    fn drop(&mut self) {
        self.guards.clear();

        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        for key in &self.keys {
            if table.get(key).is_some_and(|mutex| Arc::strong_count(mutex) == 1) {
                table.remove(key);
            }
        }
    }
}
