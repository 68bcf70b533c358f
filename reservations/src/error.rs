//! Domain rule violations.
//!
//! These errors are raised by value objects and aggregates. The coordination
//! layer wraps them in [`ServiceError`](crate::app::ServiceError) together with
//! storage and lookup failures.

use crate::types::{Currency, Priority, RoomTypeId};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors from monetary arithmetic.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MoneyError {
    /// An amount or factor was below zero
    #[error("Amount cannot be negative: {0}")]
    Negative(Decimal),

    /// The operands use different currencies
    #[error("Currency mismatch: {left} vs {right}")]
    CurrencyMismatch {
        /// Left operand currency
        left: Currency,
        /// Right operand currency
        right: Currency,
    },

    /// The result does not fit in a decimal amount
    #[error("Amount overflow")]
    Overflow,

    /// A currency code was not three uppercase letters
    #[error("Invalid currency code '{0}'")]
    InvalidCurrency(String),
}

/// Violations of aggregate or value-object rules.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Malformed or out-of-range input
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The lifecycle has no edge for the attempted operation
    #[error("Invalid {aggregate} transition from {from} to {to}")]
    InvalidTransition {
        /// Aggregate kind
        aggregate: &'static str,
        /// Current status
        from: &'static str,
        /// Attempted target status or operation
        to: &'static str,
    },

    /// Reserving or blocking would exceed capacity plus overbooking allowance
    #[error(
        "Insufficient capacity for {room_type_id} on {date}: requested {requested}, available {available}"
    )]
    InsufficientCapacity {
        /// Room type
        room_type_id: RoomTypeId,
        /// Night that ran out
        date: NaiveDate,
        /// Rooms requested
        requested: u32,
        /// Rooms still assignable (including overbooking allowance)
        available: i64,
    },

    /// Releasing or unblocking more rooms than are held
    #[error("Cannot release {requested} rooms, only {held} held")]
    InvalidRelease {
        /// Rooms to release
        requested: u32,
        /// Rooms currently held
        held: u32,
    },

    /// Waitlist priority may only increase
    #[error("Priority can only increase: current {current}, requested {requested}")]
    InvalidPriority {
        /// Current priority
        current: Priority,
        /// Rejected priority
        requested: Priority,
    },

    /// Confirmation requires a confirmed payment
    #[error("Payment must be confirmed before the reservation can be confirmed")]
    PaymentNotConfirmed,

    /// Monetary arithmetic failed
    #[error(transparent)]
    Money(#[from] MoneyError),
}

impl DomainError {
    /// Shorthand for [`DomainError::Validation`]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}
