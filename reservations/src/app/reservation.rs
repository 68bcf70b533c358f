//! Reservation service: bookings and the inventory they hold.
//!
//! A non-terminal reservation always holds `room_count` rooms on every night of
//! its stay. Each operation here keeps that true:
//!
//! - **create**: reserve the stay under the availability locks, then store the
//!   reservation; if storing fails the rooms are released again
//! - **modify**: compute the net change per night between the old and the new
//!   hold, apply it all-or-nothing, then store the reservation
//! - **cancel / no-show / check-out**: release the stay, then store the
//!   reservation; if storing fails the rooms are reserved again. Matching
//!   waitlist entries are notified afterwards.

use super::availability::{Adjustment, AvailabilityService};
use super::commands::{CreateReservation, ReservationChanges};
use super::error::ServiceError;
use super::publish_event;
use super::waitlist::WaitlistService;
use crate::aggregates::{
    InventoryAction, InventoryHold, NewReservation, Reservation, StayRules,
};
use crate::error::DomainError;
use crate::events::HotelEvent;
use crate::pricing::RateProvider;
use crate::repository::ReservationRepository;
use crate::types::{
    AvailabilityKey, ConfirmationCode, GuestId, Money, RequestType, ReservationId,
    SpecialRequestId, WaitlistId,
};
use chrono::{DateTime, Utc};
use hotel_core::environment::Clock;
use hotel_core::event_bus::EventPublisher;
use hotel_core::repository::RepositoryError;
use hotel_runtime::KeyedLocks;
use hotel_runtime::metrics::ReservationMetrics;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

const MAX_CODE_ATTEMPTS: usize = 10;

/// Result of a cancellation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CancellationOutcome {
    /// The cancelled reservation
    pub reservation: Reservation,
    /// Refund owed to the guest
    pub refund: Money,
    /// Waitlist entries notified about the released rooms
    pub notified_waitlist: Vec<WaitlistId>,
}

/// Result of a no-show.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReleaseOutcome {
    /// The reservation marked NO_SHOW
    pub reservation: Reservation,
    /// Waitlist entries notified about the released rooms
    pub notified_waitlist: Vec<WaitlistId>,
}

/// Result of a check-out.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckOutOutcome {
    /// The checked-out reservation
    pub reservation: Reservation,
    /// Amount due from the guest
    pub amount_due: Money,
    /// Waitlist entries notified about the released rooms
    pub notified_waitlist: Vec<WaitlistId>,
}

/// Coordinates [`Reservation`]s with the inventory they hold.
pub struct ReservationService {
    repository: Arc<dyn ReservationRepository>,
    availability: Arc<AvailabilityService>,
    waitlist: Arc<WaitlistService>,
    rates: Arc<dyn RateProvider>,
    locks: KeyedLocks<ReservationId>,
    clock: Arc<dyn Clock>,
    publisher: Arc<dyn EventPublisher>,
    rules: StayRules,
}

impl ReservationService {
    /// Create a service.
    #[must_use]
    pub fn new(
        repository: Arc<dyn ReservationRepository>,
        availability: Arc<AvailabilityService>,
        waitlist: Arc<WaitlistService>,
        rates: Arc<dyn RateProvider>,
        clock: Arc<dyn Clock>,
        publisher: Arc<dyn EventPublisher>,
        rules: StayRules,
    ) -> Self {
        Self {
            repository,
            availability,
            waitlist,
            rates,
            locks: KeyedLocks::new(),
            clock,
            publisher,
            rules,
        }
    }

    // ========================================================================
    // Booking
    // ========================================================================

    /// Book rooms for a stay.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::RoomsUnavailable`] when some night cannot take the rooms;
    ///   the caller may add the guest to the waitlist instead
    /// - [`ServiceError::Domain`] for invalid input
    /// - [`ServiceError::Pricing`] when no rate is known for the room type
    /// - [`ServiceError::CompensationFailed`] when the booking failed after the
    ///   rooms were reserved and releasing them failed too
    #[tracing::instrument(
        skip(self, command),
        fields(
            guest_id = %command.guest_id,
            room_type_id = %command.room_type_id,
            check_in = %command.date_range.check_in(),
            check_out = %command.date_range.check_out(),
            rooms = command.room_count,
        )
    )]
    pub async fn create_reservation(&self, command: CreateReservation) -> Result<Reservation, ServiceError> {
        let started = Instant::now();
        let now = self.clock.now();
        if command.room_count == 0 {
            return Err(ServiceError::validation("room count must be at least 1"));
        }
        self.rules.validate(&command.date_range, now)?;

        let hold = InventoryHold {
            room_type_id: command.room_type_id.clone(),
            date_range: command.date_range,
            room_count: command.room_count,
        };
        let guard = self.availability.lock_keys(hold.keys()).await;

        if !self
            .availability
            .can_accommodate(&hold.room_type_id, &hold.date_range, hold.room_count)
            .await?
        {
            ReservationMetrics::record_rejected("rooms_unavailable");
            tracing::warn!("Rooms unavailable for requested stay");
            return Err(rooms_unavailable(&hold));
        }

        let adjustments = Adjustment::for_range(
            &hold.room_type_id,
            &hold.date_range,
            InventoryAction::Reserve,
            hold.room_count,
        );
        let updated = self
            .availability
            .adjust_locked(&guard, &adjustments)
            .await
            .map_err(|err| capacity_to_unavailable(err, &hold))?;

        let reservation = match self.open_reservation(command, now).await {
            Ok(reservation) => reservation,
            Err(err) => {
                ReservationMetrics::record_rejected("creation_failed");
                tracing::warn!(error = %err, "Reservation could not be stored, releasing rooms");
                return Err(self.availability.undo_locked(&guard, &adjustments, err).await);
            }
        };
        drop(guard);

        self.availability.announce_changes(&adjustments, &updated).await;
        ReservationMetrics::record_created();
        ReservationMetrics::record_operation("create_reservation", started.elapsed());
        publish_event(self.publisher.as_ref(), &HotelEvent::reservation_created(&reservation)).await;
        tracing::info!(
            reservation_id = %reservation.id(),
            confirmation_code = %reservation.confirmation_code(),
            total = %reservation.total_amount(),
            "Reservation created"
        );
        Ok(reservation)
    }

    async fn open_reservation(
        &self,
        command: CreateReservation,
        now: DateTime<Utc>,
    ) -> Result<Reservation, ServiceError> {
        let nightly_rate = self.rates.nightly_rate(&command.room_type_id).await?;
        let confirmation_code = self.unique_confirmation_code().await?;
        let reservation = Reservation::create(
            NewReservation {
                confirmation_code,
                guest_id: command.guest_id,
                room_type_id: command.room_type_id,
                date_range: command.date_range,
                guest_count: command.guest_count,
                room_count: command.room_count,
                nightly_rate,
                source: command.source,
                special_requests: command.special_requests,
                created_by: command.created_by,
            },
            now,
            &self.rules,
        )?;
        self.repository.save(&reservation).await?;
        Ok(reservation)
    }

    async fn unique_confirmation_code(&self) -> Result<ConfirmationCode, ServiceError> {
        for _ in 0..MAX_CODE_ATTEMPTS {
            let code = ConfirmationCode::generate();
            match self.repository.find_by_confirmation_code(&code).await {
                Err(RepositoryError::NotFound { .. }) => return Ok(code),
                Ok(_) => tracing::debug!(%code, "Confirmation code collision"),
                Err(err) => return Err(err.into()),
            }
        }
        Err(ServiceError::Storage(format!(
            "no unique confirmation code after {MAX_CODE_ATTEMPTS} attempts"
        )))
    }

    /// Change dates, room type, room count or guests of a PENDING or CONFIRMED
    /// reservation.
    ///
    /// The inventory change is computed as a net delta per night and applied
    /// before the reservation is stored; when a night cannot take the new hold
    /// the original hold is left untouched.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::RoomsUnavailable`] when the new hold does not fit
    /// - [`ServiceError::Domain`] for invalid changes or a non-modifiable status
    /// - [`ServiceError::NotFound`] for an unknown reservation or night
    #[tracing::instrument(skip(self, changes))]
    pub async fn modify_reservation(
        &self,
        id: ReservationId,
        changes: ReservationChanges,
    ) -> Result<Reservation, ServiceError> {
        let started = Instant::now();
        let _reservation_guard = self.locks.lock(id).await;
        let current = self.repository.find_by_id(&id).await?;
        let now = self.clock.now();

        let current_hold = current.inventory_hold();
        let target_hold = changes.apply_to(&current_hold);
        let nightly_rate = if target_hold.room_type_id == current_hold.room_type_id {
            current.nightly_rate().clone()
        } else {
            self.rates.nightly_rate(&target_hold.room_type_id).await?
        };

        let mut modified = current.clone();
        modified
            .modify(changes, nightly_rate, now, &self.rules)
            .inspect_err(|err| tracing::warn!(error = %err, "Modification rejected"))?;

        let adjustments = inventory_delta(&current_hold, &target_hold)?;
        let guard = self
            .availability
            .lock_keys(adjustments.iter().map(|a| a.key.clone()))
            .await;
        let updated = self
            .availability
            .adjust_locked(&guard, &adjustments)
            .await
            .map_err(|err| capacity_to_unavailable(err, &target_hold))?;

        if let Err(err) = self.repository.save(&modified).await {
            return Err(self
                .availability
                .undo_locked(&guard, &adjustments, err.into())
                .await);
        }
        drop(guard);

        self.availability.announce_changes(&adjustments, &updated).await;
        ReservationMetrics::record_operation("modify_reservation", started.elapsed());
        publish_event(self.publisher.as_ref(), &HotelEvent::reservation_modified(&modified)).await;
        tracing::info!(total = %modified.total_amount(), "Reservation modified");
        Ok(modified)
    }

    // ========================================================================
    // Lifecycle without inventory changes
    // ========================================================================

    /// PENDING → CONFIRMED once payment has cleared.
    ///
    /// # Errors
    ///
    /// [`ServiceError::NotFound`], or [`ServiceError::Domain`] for a wrong
    /// status or missing payment.
    pub async fn confirm_reservation(
        &self,
        id: ReservationId,
        payment_confirmed: bool,
    ) -> Result<Reservation, ServiceError> {
        let (reservation, ()) = self
            .update(id, "confirm", |reservation, now| {
                reservation.confirm(payment_confirmed, now)
            })
            .await?;
        publish_event(
            self.publisher.as_ref(),
            &HotelEvent::ReservationConfirmed {
                reservation_id: id,
                occurred_at: reservation.modified_at(),
            },
        )
        .await;
        Ok(reservation)
    }

    /// CONFIRMED → CHECKED_IN with an assigned room.
    ///
    /// # Errors
    ///
    /// [`ServiceError::NotFound`], or [`ServiceError::Domain`] for a wrong
    /// status or an early arrival.
    pub async fn check_in_guest(
        &self,
        id: ReservationId,
        room_number: &str,
    ) -> Result<Reservation, ServiceError> {
        let (reservation, ()) = self
            .update(id, "check_in", |reservation, now| {
                reservation.check_in(room_number, now)
            })
            .await?;
        publish_event(
            self.publisher.as_ref(),
            &HotelEvent::GuestCheckedIn {
                reservation_id: id,
                room_number: room_number.to_string(),
                occurred_at: reservation.modified_at(),
            },
        )
        .await;
        Ok(reservation)
    }

    /// Attach a special request.
    ///
    /// # Errors
    ///
    /// [`ServiceError::NotFound`], or [`ServiceError::Domain`] for a terminal
    /// reservation.
    pub async fn add_special_request(
        &self,
        id: ReservationId,
        request_type: RequestType,
        description: &str,
    ) -> Result<SpecialRequestId, ServiceError> {
        let (reservation, request_id) = self
            .update(id, "add_special_request", |reservation, now| {
                reservation.add_special_request(request_type, description, now)
            })
            .await?;
        publish_event(
            self.publisher.as_ref(),
            &HotelEvent::SpecialRequestAdded {
                reservation_id: id,
                request_id,
                request_type,
                occurred_at: reservation.modified_at(),
            },
        )
        .await;
        Ok(request_id)
    }

    /// Mark a special request fulfilled.
    ///
    /// # Errors
    ///
    /// [`ServiceError::NotFound`], or [`ServiceError::Domain`] for a terminal
    /// reservation or unknown request.
    pub async fn fulfill_special_request(
        &self,
        id: ReservationId,
        request_id: SpecialRequestId,
        notes: Option<String>,
    ) -> Result<Reservation, ServiceError> {
        let (reservation, ()) = self
            .update(id, "fulfill_special_request", |reservation, now| {
                reservation.fulfill_special_request(request_id, notes, now)
            })
            .await?;
        Ok(reservation)
    }

    // ========================================================================
    // Lifecycle releasing inventory
    // ========================================================================

    /// PENDING | CONFIRMED → CANCELLED, releasing the stay and computing the
    /// refund.
    ///
    /// # Errors
    ///
    /// [`ServiceError::NotFound`], [`ServiceError::Domain`] for a wrong status,
    /// or [`ServiceError::CompensationFailed`].
    pub async fn cancel_reservation(
        &self,
        id: ReservationId,
        reason: &str,
    ) -> Result<CancellationOutcome, ServiceError> {
        let (reservation, refund) = self
            .terminate(id, "cancel", |reservation, now| reservation.cancel(reason, now))
            .await?;

        ReservationMetrics::record_cancelled();
        publish_event(
            self.publisher.as_ref(),
            &HotelEvent::ReservationCancelled {
                reservation_id: id,
                reason: reason.to_string(),
                refund: refund.clone(),
                occurred_at: reservation.modified_at(),
            },
        )
        .await;
        let notified_waitlist = self.notify_waitlist(&reservation).await;

        Ok(CancellationOutcome {
            reservation,
            refund,
            notified_waitlist,
        })
    }

    /// CONFIRMED → NO_SHOW, releasing the stay. No refund.
    ///
    /// # Errors
    ///
    /// [`ServiceError::NotFound`], [`ServiceError::Domain`] for a wrong status,
    /// or [`ServiceError::CompensationFailed`].
    pub async fn mark_no_show(&self, id: ReservationId) -> Result<ReleaseOutcome, ServiceError> {
        let (reservation, ()) = self
            .terminate(id, "no_show", |reservation, now| reservation.mark_no_show(now))
            .await?;

        publish_event(
            self.publisher.as_ref(),
            &HotelEvent::NoShowRecorded {
                reservation_id: id,
                occurred_at: reservation.modified_at(),
            },
        )
        .await;
        let notified_waitlist = self.notify_waitlist(&reservation).await;

        Ok(ReleaseOutcome {
            reservation,
            notified_waitlist,
        })
    }

    /// CHECKED_IN → CHECKED_OUT, releasing the stay. Returns the amount due.
    ///
    /// # Errors
    ///
    /// [`ServiceError::NotFound`], [`ServiceError::Domain`] for a wrong status,
    /// or [`ServiceError::CompensationFailed`].
    pub async fn check_out_guest(&self, id: ReservationId) -> Result<CheckOutOutcome, ServiceError> {
        let (reservation, amount_due) = self
            .terminate(id, "check_out", |reservation, now| reservation.check_out(now))
            .await?;

        publish_event(
            self.publisher.as_ref(),
            &HotelEvent::GuestCheckedOut {
                reservation_id: id,
                amount_due: amount_due.clone(),
                occurred_at: reservation.modified_at(),
            },
        )
        .await;
        let notified_waitlist = self.notify_waitlist(&reservation).await;

        Ok(CheckOutOutcome {
            reservation,
            amount_due,
            notified_waitlist,
        })
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Load a reservation.
    ///
    /// # Errors
    ///
    /// [`ServiceError::NotFound`] for an unknown id.
    pub async fn get_reservation(&self, id: ReservationId) -> Result<Reservation, ServiceError> {
        Ok(self.repository.find_by_id(&id).await?)
    }

    /// Load a reservation by the code given to the guest.
    ///
    /// # Errors
    ///
    /// [`ServiceError::Domain`] for a malformed code, [`ServiceError::NotFound`]
    /// for an unknown one.
    pub async fn find_by_confirmation_code(&self, code: &str) -> Result<Reservation, ServiceError> {
        let code = ConfirmationCode::parse(code)?;
        Ok(self.repository.find_by_confirmation_code(&code).await?)
    }

    /// Every reservation of a guest, oldest first.
    ///
    /// # Errors
    ///
    /// [`ServiceError::Storage`] if the repository failed.
    pub async fn find_by_guest(&self, guest_id: GuestId) -> Result<Vec<Reservation>, ServiceError> {
        Ok(self.repository.find_by_guest(guest_id).await?)
    }

    /// Every reservation.
    ///
    /// # Errors
    ///
    /// [`ServiceError::Storage`] if the repository failed.
    pub async fn list_reservations(&self) -> Result<Vec<Reservation>, ServiceError> {
        Ok(self.repository.find_all().await?)
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    async fn update<T, F>(
        &self,
        id: ReservationId,
        operation: &'static str,
        apply: F,
    ) -> Result<(Reservation, T), ServiceError>
    where
        F: FnOnce(&mut Reservation, DateTime<Utc>) -> Result<T, DomainError>,
    {
        let started = Instant::now();
        let _guard = self.locks.lock(id).await;
        let mut reservation = self.repository.find_by_id(&id).await?;
        let output = apply(&mut reservation, self.clock.now()).inspect_err(|err| {
            tracing::warn!(reservation_id = %id, operation, error = %err, "Reservation operation rejected");
        })?;
        self.repository.save(&reservation).await?;

        ReservationMetrics::record_operation(operation, started.elapsed());
        tracing::info!(reservation_id = %id, operation, status = %reservation.status(), "Reservation updated");
        Ok((reservation, output))
    }

    /// Run a transition that ends the reservation's hold on inventory. The
    /// transition is validated in memory first, then the rooms are released,
    /// then the reservation is stored.
    async fn terminate<T, F>(
        &self,
        id: ReservationId,
        operation: &'static str,
        apply: F,
    ) -> Result<(Reservation, T), ServiceError>
    where
        F: FnOnce(&mut Reservation, DateTime<Utc>) -> Result<T, DomainError>,
    {
        let started = Instant::now();
        let reservation_guard = self.locks.lock(id).await;
        let mut reservation = self.repository.find_by_id(&id).await?;
        let hold = reservation.inventory_hold();
        let output = apply(&mut reservation, self.clock.now()).inspect_err(|err| {
            tracing::warn!(reservation_id = %id, operation, error = %err, "Reservation operation rejected");
        })?;

        let adjustments = Adjustment::for_range(
            &hold.room_type_id,
            &hold.date_range,
            InventoryAction::Release,
            hold.room_count,
        );
        let guard = self.availability.lock_keys(hold.keys()).await;
        let updated = self.availability.adjust_locked(&guard, &adjustments).await?;

        if let Err(err) = self.repository.save(&reservation).await {
            tracing::error!(reservation_id = %id, operation, error = %err, "Reservation save failed, restoring rooms");
            return Err(self
                .availability
                .undo_locked(&guard, &adjustments, err.into())
                .await);
        }
        drop(guard);
        drop(reservation_guard);

        self.availability.announce_changes(&adjustments, &updated).await;
        ReservationMetrics::record_operation(operation, started.elapsed());
        tracing::info!(
            reservation_id = %id,
            operation,
            status = %reservation.status(),
            rooms_released = hold.room_count,
            "Reservation closed, rooms released"
        );
        Ok((reservation, output))
    }

    async fn notify_waitlist(&self, reservation: &Reservation) -> Vec<WaitlistId> {
        self.waitlist
            .notify_for_release(reservation.room_type_id(), reservation.date_range())
            .await
    }
}

/// Net inventory change per night when a reservation moves from `from` to `to`.
fn inventory_delta(from: &InventoryHold, to: &InventoryHold) -> Result<Vec<Adjustment>, ServiceError> {
    let mut delta: BTreeMap<AvailabilityKey, i64> = BTreeMap::new();
    for key in from.keys() {
        *delta.entry(key).or_default() -= i64::from(from.room_count);
    }
    for key in to.keys() {
        *delta.entry(key).or_default() += i64::from(to.room_count);
    }

    delta
        .into_iter()
        .filter(|(_, change)| *change != 0)
        .map(|(key, change)| {
            let action = if change > 0 {
                InventoryAction::Reserve
            } else {
                InventoryAction::Release
            };
            let count = u32::try_from(change.unsigned_abs())
                .map_err(|_| ServiceError::validation("room count out of range"))?;
            Ok(Adjustment::new(key, action, count))
        })
        .collect()
}

fn rooms_unavailable(hold: &InventoryHold) -> ServiceError {
    ServiceError::RoomsUnavailable {
        room_type_id: hold.room_type_id.clone(),
        check_in: hold.date_range.check_in(),
        check_out: hold.date_range.check_out(),
        requested: hold.room_count,
    }
}

fn capacity_to_unavailable(err: ServiceError, hold: &InventoryHold) -> ServiceError {
    match err {
        ServiceError::Domain(DomainError::InsufficientCapacity { .. }) => {
            ReservationMetrics::record_rejected("rooms_unavailable");
            rooms_unavailable(hold)
        }
        other => other,
    }
}
