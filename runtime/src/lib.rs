//! # Hotel Runtime
//!
//! Runtime building blocks shared by the hotel reservation services.
//!
//! The domain crate expresses *what* happens to rooms, reservations and waitlist
//! entries; this crate supplies the machinery that makes those operations safe to
//! run concurrently.
//!
//! ## Core Components
//!
//! - **Keyed locks**: per-identity async mutexes with deadlock-free multi-key acquisition
//! - **In-memory store**: a versioned map implementing optimistic concurrency
//! - **Retry**: exponential backoff used for compensating actions
//! - **Metrics**: Prometheus exporter and metric recorders
//! - **Tracing event bus**: the default event publisher, logging every event
//!
//! ## Example
//!
//! ```
//! use hotel_runtime::locks::KeyedLocks;
//!
//! # async fn example() {
//! let locks: KeyedLocks<(String, u32)> = KeyedLocks::new();
//! let keys = vec![("DELUXE".to_string(), 2), ("DELUXE".to_string(), 1)];
//!
//! // Keys are acquired in sorted order regardless of the order given.
//! let _guard = locks.lock_all(keys).await;
//! # }
//! ```

/// Logging event publisher
pub mod event_bus;

/// Per-identity async locks
pub mod locks;

/// Prometheus metrics for observability
pub mod metrics;

/// Retry logic with exponential backoff
pub mod retry;

/// Versioned in-memory aggregate storage
pub mod store;

pub use event_bus::TracingEventBus;
pub use locks::{KeyedGuard, KeyedLocks};
pub use retry::{RetryPolicy, retry_with_predicate};
pub use store::InMemoryStore;
