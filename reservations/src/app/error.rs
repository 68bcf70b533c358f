//! Errors returned by the coordination services.

use crate::error::DomainError;
use crate::pricing::PricingError;
use crate::types::RoomTypeId;
use chrono::NaiveDate;
use hotel_core::Version;
use hotel_core::repository::RepositoryError;
use thiserror::Error;

/// Transport-independent classification of a [`ServiceError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed input; fix and resend
    Validation,
    /// The lifecycle does not allow the operation
    InvalidTransition,
    /// A night ran out of rooms during an inventory operation
    InsufficientCapacity,
    /// A booking request could not be accommodated
    RoomsUnavailable,
    /// Unknown identifier or code
    NotFound,
    /// The record already exists
    AlreadyExists,
    /// Releasing more rooms than are held
    InvalidRelease,
    /// Priority did not increase
    InvalidPriority,
    /// Confirmation attempted without payment
    PaymentNotConfirmed,
    /// Lost an optimistic-concurrency race
    ConcurrentModification,
    /// Undoing a partial update failed; inventory needs repair
    CompensationFailed,
    /// Storage, pricing or other infrastructure failure
    Internal,
}

/// Errors from the coordination services.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// An aggregate rejected the operation
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Unknown identity
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Aggregate kind
        kind: &'static str,
        /// Rendered identity
        id: String,
    },

    /// The record to create already exists
    #[error("{kind} already exists: {id}")]
    AlreadyExists {
        /// Aggregate kind
        kind: &'static str,
        /// Rendered identity
        id: String,
    },

    /// Not enough rooms for the whole stay
    #[error("No {requested} room(s) of {room_type_id} available from {check_in} to {check_out}")]
    RoomsUnavailable {
        /// Room type
        room_type_id: RoomTypeId,
        /// First night
        check_in: NaiveDate,
        /// Departure date
        check_out: NaiveDate,
        /// Rooms per night requested
        requested: u32,
    },

    /// Another writer updated the aggregate first
    #[error("Concurrent modification of {kind} {id}: expected version {expected}, found {actual}")]
    ConcurrentModification {
        /// Aggregate kind
        kind: &'static str,
        /// Rendered identity
        id: String,
        /// Version the write required
        expected: Version,
        /// Version the write carried
        actual: Version,
    },

    /// The repository failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// Rate lookup failed
    #[error("Pricing error: {0}")]
    Pricing(String),

    /// An operation failed and undoing its earlier steps failed too
    #[error("Compensation failed after '{cause}': {compensation}")]
    CompensationFailed {
        /// Error that triggered the compensation
        cause: Box<ServiceError>,
        /// Error raised by the compensation
        compensation: Box<ServiceError>,
    },
}

impl ServiceError {
    /// Classify the error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Domain(domain) => match domain {
                DomainError::Validation(_) | DomainError::Money(_) => ErrorKind::Validation,
                DomainError::InvalidTransition { .. } => ErrorKind::InvalidTransition,
                DomainError::InsufficientCapacity { .. } => ErrorKind::InsufficientCapacity,
                DomainError::InvalidRelease { .. } => ErrorKind::InvalidRelease,
                DomainError::InvalidPriority { .. } => ErrorKind::InvalidPriority,
                DomainError::PaymentNotConfirmed => ErrorKind::PaymentNotConfirmed,
            },
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            Self::RoomsUnavailable { .. } => ErrorKind::RoomsUnavailable,
            Self::ConcurrentModification { .. } => ErrorKind::ConcurrentModification,
            Self::CompensationFailed { .. } => ErrorKind::CompensationFailed,
            Self::Storage(_) | Self::Pricing(_) => ErrorKind::Internal,
        }
    }

    /// Transient failures a compensating action may retry.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::ConcurrentModification { .. })
    }

    /// Shorthand for [`DomainError::Validation`]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Domain(DomainError::validation(message))
    }
}

impl From<RepositoryError> for ServiceError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::NotFound { kind, id } => Self::NotFound { kind, id },
            RepositoryError::ConcurrentModification {
                kind,
                id,
                expected,
                actual,
            } => Self::ConcurrentModification {
                kind,
                id,
                expected,
                actual,
            },
            RepositoryError::Storage(message) => Self::Storage(message),
        }
    }
}

impl From<PricingError> for ServiceError {
    fn from(error: PricingError) -> Self {
        Self::Pricing(error.to_string())
    }
}
