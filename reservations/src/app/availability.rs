//! Availability service: inventory setup, lookups and counter updates.
//!
//! Every counter update goes through [`AvailabilityService::adjust_locked`],
//! which runs in two phases while the caller holds the locks of every touched
//! room-date key:
//!
//! 1. **Compute**: load each record and apply its change in memory. Any rule
//!    violation aborts here, before anything is written.
//! 2. **Commit**: save the records one by one. If a save fails, the records
//!    already written are restored with the inverse change (retried with
//!    backoff on transient errors) before the error is returned.
//!
//! This gives multi-night operations all-or-nothing semantics on top of a
//! repository that only guarantees per-record atomicity.

use super::error::ServiceError;
use super::publish_event;
use crate::aggregates::{Availability, InventoryAction};
use crate::error::DomainError;
use crate::events::HotelEvent;
use crate::repository::AvailabilityRepository;
use crate::types::{AvailabilityKey, DateRange, RoomTypeId};
use chrono::{DateTime, NaiveDate, Utc};
use hotel_core::environment::Clock;
use hotel_core::event_bus::EventPublisher;
use hotel_core::repository::RepositoryError;
use hotel_runtime::metrics::{CompensationMetrics, InventoryMetrics};
use hotel_runtime::{KeyedGuard, KeyedLocks, RetryPolicy, retry_with_predicate};
use std::collections::BTreeSet;
use std::sync::Arc;

/// One counter change within an inventory update.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Adjustment {
    /// Record to change
    pub key: AvailabilityKey,
    /// Counter change
    pub action: InventoryAction,
    /// Rooms affected
    pub count: u32,
    /// Audit reason for blocks
    pub reason: Option<String>,
}

impl Adjustment {
    /// A change without a reason
    #[must_use]
    pub const fn new(key: AvailabilityKey, action: InventoryAction, count: u32) -> Self {
        Self {
            key,
            action,
            count,
            reason: None,
        }
    }

    /// The same change on every night of `range`
    #[must_use]
    pub fn for_range(
        room_type_id: &RoomTypeId,
        range: &DateRange,
        action: InventoryAction,
        count: u32,
    ) -> Vec<Self> {
        AvailabilityKey::for_range(room_type_id, range)
            .into_iter()
            .map(|key| Self::new(key, action, count))
            .collect()
    }

    /// The change that undoes this one
    #[must_use]
    pub fn inverse(&self) -> Self {
        Self {
            key: self.key.clone(),
            action: self.action.inverse(),
            count: self.count,
            reason: self.reason.clone(),
        }
    }
}

/// Coordinates reads and writes of [`Availability`] records.
pub struct AvailabilityService {
    repository: Arc<dyn AvailabilityRepository>,
    locks: KeyedLocks<AvailabilityKey>,
    clock: Arc<dyn Clock>,
    publisher: Arc<dyn EventPublisher>,
    retry_policy: RetryPolicy,
}

impl AvailabilityService {
    /// Create a service over `repository`.
    #[must_use]
    pub fn new(
        repository: Arc<dyn AvailabilityRepository>,
        clock: Arc<dyn Clock>,
        publisher: Arc<dyn EventPublisher>,
        retry_policy: RetryPolicy,
    ) -> Self {
        Self {
            repository,
            locks: KeyedLocks::new(),
            clock,
            publisher,
            retry_policy,
        }
    }

    // ========================================================================
    // Setup and queries
    // ========================================================================

    /// Set up inventory for one room type and night.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::AlreadyExists`] if the night was already set up
    /// - [`ServiceError::Storage`] if the repository failed
    #[tracing::instrument(skip(self))]
    pub async fn create_availability(
        &self,
        room_type_id: &RoomTypeId,
        date: NaiveDate,
        total_rooms: u32,
        overbooking_threshold: u32,
    ) -> Result<Availability, ServiceError> {
        let key = AvailabilityKey::new(room_type_id.clone(), date);
        let _guard = self.locks.lock(key.clone()).await;

        match self.repository.find_by_id(&key).await {
            Ok(_) => {
                return Err(ServiceError::AlreadyExists {
                    kind: "Availability",
                    id: key.to_string(),
                });
            }
            Err(RepositoryError::NotFound { .. }) => {}
            Err(err) => return Err(err.into()),
        }

        let availability = Availability::new(
            room_type_id.clone(),
            date,
            total_rooms,
            overbooking_threshold,
            self.clock.now(),
        );
        self.repository.save(&availability).await?;

        tracing::info!(%key, total_rooms, overbooking_threshold, "Availability created");
        Ok(availability)
    }

    /// Load the record for one night.
    ///
    /// # Errors
    ///
    /// [`ServiceError::NotFound`] if the night was never set up.
    pub async fn get_availability(
        &self,
        room_type_id: &RoomTypeId,
        date: NaiveDate,
    ) -> Result<Availability, ServiceError> {
        Ok(self
            .repository
            .find_by_room_type_and_date(room_type_id, date)
            .await?)
    }

    /// Records that exist for the nights of `range`, in date order.
    ///
    /// # Errors
    ///
    /// [`ServiceError::Storage`] if the repository failed.
    pub async fn find_range(
        &self,
        room_type_id: &RoomTypeId,
        range: &DateRange,
    ) -> Result<Vec<Availability>, ServiceError> {
        Ok(self.repository.find_range(room_type_id, range).await?)
    }

    /// Whether `count` more rooms fit on every night of `range`. A night that
    /// was never set up cannot accommodate anything.
    ///
    /// This is a snapshot read; callers that act on the answer must hold the
    /// keys' locks (see [`AvailabilityService::lock_keys`]).
    ///
    /// # Errors
    ///
    /// [`ServiceError::Storage`] if the repository failed.
    pub async fn can_accommodate(
        &self,
        room_type_id: &RoomTypeId,
        range: &DateRange,
        count: u32,
    ) -> Result<bool, ServiceError> {
        for key in AvailabilityKey::for_range(room_type_id, range) {
            match self.repository.find_by_id(&key).await {
                Ok(availability) if availability.can_accommodate(count) => {}
                Ok(_) | Err(RepositoryError::NotFound { .. }) => return Ok(false),
                Err(err) => return Err(err.into()),
            }
        }
        Ok(true)
    }

    // ========================================================================
    // Single-night updates
    // ========================================================================

    /// Hold `count` rooms on one night.
    ///
    /// # Errors
    ///
    /// See [`AvailabilityService::adjust_locked`].
    pub async fn reserve_rooms(
        &self,
        room_type_id: &RoomTypeId,
        date: NaiveDate,
        count: u32,
    ) -> Result<Availability, ServiceError> {
        self.adjust_one(Adjustment::new(
            AvailabilityKey::new(room_type_id.clone(), date),
            InventoryAction::Reserve,
            count,
        ))
        .await
    }

    /// Return `count` reserved rooms on one night.
    ///
    /// # Errors
    ///
    /// See [`AvailabilityService::adjust_locked`].
    pub async fn release_rooms(
        &self,
        room_type_id: &RoomTypeId,
        date: NaiveDate,
        count: u32,
    ) -> Result<Availability, ServiceError> {
        self.adjust_one(Adjustment::new(
            AvailabilityKey::new(room_type_id.clone(), date),
            InventoryAction::Release,
            count,
        ))
        .await
    }

    /// Take `count` rooms out of sale on one night.
    ///
    /// # Errors
    ///
    /// See [`AvailabilityService::adjust_locked`].
    pub async fn block_rooms(
        &self,
        room_type_id: &RoomTypeId,
        date: NaiveDate,
        count: u32,
        reason: &str,
    ) -> Result<Availability, ServiceError> {
        let mut adjustment = Adjustment::new(
            AvailabilityKey::new(room_type_id.clone(), date),
            InventoryAction::Block,
            count,
        );
        adjustment.reason = Some(reason.to_string());
        self.adjust_one(adjustment).await
    }

    /// Put `count` blocked rooms back on sale on one night.
    ///
    /// # Errors
    ///
    /// See [`AvailabilityService::adjust_locked`].
    pub async fn unblock_rooms(
        &self,
        room_type_id: &RoomTypeId,
        date: NaiveDate,
        count: u32,
    ) -> Result<Availability, ServiceError> {
        self.adjust_one(Adjustment::new(
            AvailabilityKey::new(room_type_id.clone(), date),
            InventoryAction::Unblock,
            count,
        ))
        .await
    }

    async fn adjust_one(&self, adjustment: Adjustment) -> Result<Availability, ServiceError> {
        let key = adjustment.key.clone();
        let mut updated = self.adjust_committed(vec![adjustment]).await?;
        updated.pop().ok_or_else(|| ServiceError::NotFound {
            kind: "Availability",
            id: key.to_string(),
        })
    }

    async fn adjust_committed(
        &self,
        adjustments: Vec<Adjustment>,
    ) -> Result<Vec<Availability>, ServiceError> {
        let guard = self.lock_keys(adjustments.iter().map(|a| a.key.clone())).await;
        let updated = self.adjust_locked(&guard, &adjustments).await?;
        drop(guard);

        self.announce_changes(&adjustments, &updated).await;
        Ok(updated)
    }

    // ========================================================================
    // Range updates
    // ========================================================================

    /// Hold `count` rooms on every night of `range`, or on none of them.
    ///
    /// # Errors
    ///
    /// See [`AvailabilityService::adjust_locked`].
    pub async fn reserve_rooms_for_range(
        &self,
        room_type_id: &RoomTypeId,
        range: &DateRange,
        count: u32,
    ) -> Result<Vec<Availability>, ServiceError> {
        self.adjust_range(room_type_id, range, InventoryAction::Reserve, count, None)
            .await
    }

    /// Return `count` rooms on every night of `range`, or on none of them.
    ///
    /// # Errors
    ///
    /// See [`AvailabilityService::adjust_locked`].
    pub async fn release_rooms_for_range(
        &self,
        room_type_id: &RoomTypeId,
        range: &DateRange,
        count: u32,
    ) -> Result<Vec<Availability>, ServiceError> {
        self.adjust_range(room_type_id, range, InventoryAction::Release, count, None)
            .await
    }

    /// Block `count` rooms on every night of `range`, or on none of them.
    ///
    /// # Errors
    ///
    /// See [`AvailabilityService::adjust_locked`].
    pub async fn block_rooms_for_range(
        &self,
        room_type_id: &RoomTypeId,
        range: &DateRange,
        count: u32,
        reason: &str,
    ) -> Result<Vec<Availability>, ServiceError> {
        self.adjust_range(room_type_id, range, InventoryAction::Block, count, Some(reason))
            .await
    }

    /// Unblock `count` rooms on every night of `range`, or on none of them.
    ///
    /// # Errors
    ///
    /// See [`AvailabilityService::adjust_locked`].
    pub async fn unblock_rooms_for_range(
        &self,
        room_type_id: &RoomTypeId,
        range: &DateRange,
        count: u32,
    ) -> Result<Vec<Availability>, ServiceError> {
        self.adjust_range(room_type_id, range, InventoryAction::Unblock, count, None)
            .await
    }

    async fn adjust_range(
        &self,
        room_type_id: &RoomTypeId,
        range: &DateRange,
        action: InventoryAction,
        count: u32,
        reason: Option<&str>,
    ) -> Result<Vec<Availability>, ServiceError> {
        let mut adjustments = Adjustment::for_range(room_type_id, range, action, count);
        for adjustment in &mut adjustments {
            adjustment.reason = reason.map(str::to_string);
        }
        self.adjust_committed(adjustments).await
    }

    // ========================================================================
    // Locked primitives used by the other services
    // ========================================================================

    /// Acquire the locks of `keys` in ascending order.
    pub async fn lock_keys<I>(&self, keys: I) -> KeyedGuard<AvailabilityKey>
    where
        I: IntoIterator<Item = AvailabilityKey>,
    {
        self.locks.lock_all(keys).await
    }

    /// Apply `adjustments` all-or-nothing. The caller must hold the lock of
    /// every key in `guard`, and each key may appear only once.
    ///
    /// Nothing is published here. Once the caller's whole operation has
    /// committed it passes the result to [`AvailabilityService::announce_changes`].
    ///
    /// # Errors
    ///
    /// - [`ServiceError::Domain`] when a change breaks a record's rules; nothing is written
    /// - [`ServiceError::NotFound`] when a night was never set up; nothing is written
    /// - [`ServiceError::Storage`] or [`ServiceError::ConcurrentModification`]
    ///   when a save failed and the earlier saves were undone
    /// - [`ServiceError::CompensationFailed`] when undoing failed too
    #[tracing::instrument(skip(self, guard, adjustments), fields(changes = adjustments.len()))]
    pub async fn adjust_locked(
        &self,
        guard: &KeyedGuard<AvailabilityKey>,
        adjustments: &[Adjustment],
    ) -> Result<Vec<Availability>, ServiceError> {
        let mut seen = BTreeSet::new();
        for adjustment in adjustments {
            if !guard.holds(&adjustment.key) {
                return Err(ServiceError::validation(format!(
                    "lock for {} is not held",
                    adjustment.key
                )));
            }
            if !seen.insert(&adjustment.key) {
                return Err(ServiceError::validation(format!(
                    "{} appears twice in one update",
                    adjustment.key
                )));
            }
        }

        let now = self.clock.now();
        let mut updated = Vec::with_capacity(adjustments.len());
        for adjustment in adjustments {
            let mut availability = self.repository.find_by_id(&adjustment.key).await?;
            if let Err(err) = availability.apply(
                adjustment.action,
                adjustment.count,
                adjustment.reason.as_deref(),
                now,
            ) {
                if matches!(err, DomainError::InsufficientCapacity { .. }) {
                    InventoryMetrics::record_capacity_rejection();
                }
                tracing::warn!(
                    key = %adjustment.key,
                    action = %adjustment.action,
                    count = adjustment.count,
                    error = %err,
                    "Inventory update rejected"
                );
                return Err(err.into());
            }
            updated.push(availability);
        }

        for (index, availability) in updated.iter().enumerate() {
            if let Err(err) = self.repository.save(availability).await {
                let cause = ServiceError::from(err);
                tracing::error!(
                    key = %availability.key(),
                    error = %cause,
                    "Inventory save failed, undoing earlier saves"
                );
                return Err(self.undo_locked(guard, &adjustments[..index], cause).await);
            }
        }

        tracing::info!(changes = adjustments.len(), "Inventory updated");
        Ok(updated)
    }

    /// Record and publish inventory changes returned by
    /// [`AvailabilityService::adjust_locked`]. Call this only once the
    /// surrounding operation has committed, after its guards are dropped;
    /// changes that were undone are never announced.
    pub async fn announce_changes(&self, adjustments: &[Adjustment], updated: &[Availability]) {
        for (adjustment, availability) in adjustments.iter().zip(updated) {
            record_inventory_metrics(adjustment);
            publish_event(
                self.publisher.as_ref(),
                &HotelEvent::availability_changed(availability, adjustment.action, adjustment.count),
            )
            .await;
        }
    }

    /// Undo `applied` (already committed adjustments) after `cause` made the
    /// surrounding operation fail. Returns the error to surface: `cause` when
    /// every undo succeeded, [`ServiceError::CompensationFailed`] otherwise.
    pub async fn undo_locked(
        &self,
        guard: &KeyedGuard<AvailabilityKey>,
        applied: &[Adjustment],
        cause: ServiceError,
    ) -> ServiceError {
        for adjustment in applied.iter().rev() {
            let inverse = adjustment.inverse();
            if !guard.holds(&inverse.key) {
                CompensationMetrics::record_failed();
                return ServiceError::CompensationFailed {
                    cause: Box::new(cause),
                    compensation: Box::new(ServiceError::validation(format!(
                        "lock for {} is not held",
                        inverse.key
                    ))),
                };
            }

            let now = self.clock.now();
            let result = retry_with_predicate(
                self.retry_policy.clone(),
                || self.apply_and_save(&inverse, now),
                ServiceError::is_retryable,
            )
            .await;

            if let Err(compensation) = result {
                CompensationMetrics::record_failed();
                tracing::error!(
                    key = %inverse.key,
                    action = %inverse.action,
                    count = inverse.count,
                    cause = %cause,
                    error = %compensation,
                    "Compensation failed, inventory needs manual repair"
                );
                return ServiceError::CompensationFailed {
                    cause: Box::new(cause),
                    compensation: Box::new(compensation),
                };
            }
        }

        if !applied.is_empty() {
            CompensationMetrics::record_succeeded();
            tracing::warn!(undone = applied.len(), cause = %cause, "Inventory changes undone");
        }
        cause
    }

    async fn apply_and_save(
        &self,
        adjustment: &Adjustment,
        now: DateTime<Utc>,
    ) -> Result<Availability, ServiceError> {
        let mut availability = self.repository.find_by_id(&adjustment.key).await?;
        availability.apply(
            adjustment.action,
            adjustment.count,
            adjustment.reason.as_deref(),
            now,
        )?;
        self.repository.save(&availability).await?;
        Ok(availability)
    }
}

fn record_inventory_metrics(adjustment: &Adjustment) {
    match adjustment.action {
        InventoryAction::Reserve => InventoryMetrics::record_reserved(u64::from(adjustment.count)),
        InventoryAction::Release => InventoryMetrics::record_released(u64::from(adjustment.count)),
        InventoryAction::Block | InventoryAction::Unblock => {}
    }
}
