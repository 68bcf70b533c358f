//! # Hotel Core
//!
//! Core traits and types shared by the hotel reservation workspace.
//!
//! This crate deliberately knows nothing about rooms, guests or money. It provides
//! the storage-agnostic seams the domain crate is built against:
//!
//! - **Environment**: injected dependencies such as the [`Clock`](environment::Clock)
//! - **Version**: the optimistic-concurrency token carried by every aggregate
//! - **Repository**: the per-aggregate persistence contract and its errors
//! - **Events**: serialized domain events and the publisher they are sent through
//!
//! ## Example
//!
//! ```ignore
//! use hotel_core::repository::{Aggregate, Repository};
//!
//! async fn load<A: Aggregate>(repo: &dyn Repository<A>, id: &A::Id) -> Option<A> {
//!     repo.find_by_id(id).await.ok()
//! }
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, NaiveDate, Utc};
pub use serde::{Deserialize, Serialize};

/// Serialized domain events
pub mod event;

/// Event publishing abstraction
pub mod event_bus;

/// Aggregate persistence contract
pub mod repository;

/// Aggregate versioning
pub mod version;

/// Environment module - Dependency injection traits
///
/// All external dependencies that make behaviour time-dependent are abstracted
/// behind traits and injected into services.
pub mod environment {
    use chrono::{DateTime, NaiveDate, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```
    /// use hotel_core::environment::{Clock, SystemClock};
    ///
    /// let clock = SystemClock;
    /// assert!(clock.today() <= clock.now().date_naive());
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;

        /// Get the current calendar date (UTC)
        fn today(&self) -> NaiveDate {
            self.now().date_naive()
        }
    }

    /// Production clock backed by the system time.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}

pub use environment::{Clock, SystemClock};
pub use event::SerializedEvent;
pub use event_bus::{EventBusError, EventPublisher};
pub use repository::{Aggregate, Repository, RepositoryError};
pub use version::Version;
