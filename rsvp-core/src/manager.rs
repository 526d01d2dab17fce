use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::{Booking, BookingDetails, BookingStatus, Event};
use crate::repository::{BookingStore, EventStore, Ledger, StoreError, StoreTransaction};
use crate::schedule::CalendarEntry;

/// How many times enroll re-reads an event whose slot increment was refused.
const MAX_SLOT_ATTEMPTS: usize = 3;

pub const DEFAULT_CANCELLATION_WINDOW_HOURS: i64 = 10;

/// Minimum lead time before an event start for a booking to be cancellable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CancellationPolicy {
    pub window: Duration,
}

impl CancellationPolicy {
    pub fn from_hours(hours: i64) -> Self {
        Self { window: Duration::hours(hours) }
    }

    pub fn allows(&self, starts_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        starts_at - now >= self.window
    }
}

impl Default for CancellationPolicy {
    fn default() -> Self {
        Self::from_hours(DEFAULT_CANCELLATION_WINDOW_HOURS)
    }
}

/// The booking together with the event counters it left behind.
#[derive(Debug, Clone)]
pub struct BookingOutcome {
    pub booking: Booking,
    pub event: Event,
}

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("No available slots for event {event_id}")]
    CapacityExceeded { event_id: Uuid },

    #[error("Booking {0} is already cancelled")]
    AlreadyCancelled(Uuid),

    #[error("Bookings can only be cancelled at least {window_hours} hours before the event starts ({starts_at})")]
    CancellationWindowClosed {
        starts_at: DateTime<Utc>,
        window_hours: i64,
    },

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
}

impl From<StoreError> for BookingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => BookingError::NotFound(what),
            StoreError::Conflict(msg) | StoreError::Duplicate(msg) => BookingError::Conflict(msg),
            StoreError::Unavailable(msg) => BookingError::StoreUnavailable(msg),
        }
    }
}

/// Owns event capacity and the enrollment state of bookings.
///
/// Each operation runs inside a single ledger transaction, so a failure at
/// any step leaves both the booking table and the event counters untouched.
pub struct BookingManager {
    ledger: Arc<dyn Ledger>,
    policy: CancellationPolicy,
}

impl BookingManager {
    pub fn new(ledger: Arc<dyn Ledger>, policy: CancellationPolicy) -> Self {
        Self { ledger, policy }
    }

    pub fn policy(&self) -> CancellationPolicy {
        self.policy
    }

    /// All events, earliest first.
    pub async fn list_events(&self) -> Result<Vec<Event>, BookingError> {
        let mut tx = self.ledger.begin().await?;
        let events = tx.list_events().await?;
        tx.commit().await?;
        Ok(events)
    }

    pub async fn get_event(&self, event_id: Uuid) -> Result<Event, BookingError> {
        let mut tx = self.ledger.begin().await?;
        let event = tx
            .get_event(event_id)
            .await?
            .ok_or_else(|| BookingError::NotFound(format!("Event {}", event_id)))?;
        tx.commit().await?;
        Ok(event)
    }

    /// Reserve one slot of `event_id` for `user_id`.
    pub async fn enroll(&self, user_id: Uuid, event_id: Uuid) -> Result<BookingOutcome, BookingError> {
        let mut tx = self.ledger.begin().await?;

        let mut event = tx
            .get_event(event_id)
            .await?
            .ok_or_else(|| BookingError::NotFound(format!("Event {}", event_id)))?;

        if tx.find_confirmed_booking(user_id, event_id).await?.is_some() {
            warn!(%user_id, %event_id, "Rejected duplicate enrollment");
            return Err(BookingError::Conflict(
                "You are already enrolled in this event".to_string(),
            ));
        }

        // The bounded increment only refuses a full event. A refusal after a
        // stale read is re-checked in case a cancellation freed a slot since.
        let mut attempt = 1;
        let event = loop {
            if event.is_full() {
                info!(%event_id, slots_booked = event.slots_booked, "Enrollment rejected, event full");
                return Err(BookingError::CapacityExceeded { event_id });
            }

            match tx.adjust_slots(event_id, 1).await {
                Ok(updated) => break updated,
                Err(StoreError::Conflict(reason)) if attempt < MAX_SLOT_ATTEMPTS => {
                    debug!(%event_id, attempt, "Slot increment refused, re-reading: {}", reason);
                    attempt += 1;
                    event = tx
                        .get_event(event_id)
                        .await?
                        .ok_or_else(|| BookingError::NotFound(format!("Event {}", event_id)))?;
                }
                Err(StoreError::Conflict(_)) => {
                    info!(%event_id, "Enrollment rejected, event filled concurrently");
                    return Err(BookingError::CapacityExceeded { event_id });
                }
                Err(err) => return Err(err.into()),
            }
        };

        let booking = match tx.insert_booking(user_id, event_id).await {
            Ok(booking) => booking,
            Err(StoreError::Duplicate(_)) => {
                return Err(BookingError::Conflict(
                    "You are already enrolled in this event".to_string(),
                ))
            }
            Err(err) => return Err(err.into()),
        };

        tx.commit().await?;

        info!(
            booking_id = %booking.booking_id,
            %event_id,
            %user_id,
            slots_booked = event.slots_booked,
            available_slots = event.available_slots,
            "Enrollment confirmed"
        );
        Ok(BookingOutcome { booking, event })
    }

    pub async fn cancel(&self, user_id: Uuid, booking_id: Uuid) -> Result<BookingOutcome, BookingError> {
        self.cancel_at(user_id, booking_id, Utc::now()).await
    }

    /// Cancel `booking_id` as observed at `now`.
    pub async fn cancel_at(
        &self,
        user_id: Uuid,
        booking_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<BookingOutcome, BookingError> {
        let mut tx = self.ledger.begin().await?;

        // Someone else's booking is reported exactly like a missing one.
        let booking = tx
            .get_booking(booking_id)
            .await?
            .filter(|b| b.user_id == user_id)
            .ok_or_else(|| BookingError::NotFound(format!("Booking {}", booking_id)))?;

        if !booking.is_confirmed() {
            return Err(BookingError::AlreadyCancelled(booking_id));
        }

        let event = tx
            .get_event(booking.event_id)
            .await?
            .ok_or_else(|| BookingError::NotFound(format!("Event {}", booking.event_id)))?;

        let starts_at = event.starts_at();
        if !self.policy.allows(starts_at, now) {
            info!(%booking_id, %starts_at, "Cancellation rejected, window closed");
            return Err(BookingError::CancellationWindowClosed {
                starts_at,
                window_hours: self.policy.window.num_hours(),
            });
        }

        let booking = match tx.set_status(booking_id, BookingStatus::Cancelled).await {
            Ok(booking) => booking,
            Err(StoreError::Conflict(_)) => return Err(BookingError::AlreadyCancelled(booking_id)),
            Err(err) => return Err(err.into()),
        };
        let event = tx.adjust_slots(event.id, -1).await?;

        tx.commit().await?;

        info!(
            %booking_id,
            event_id = %event.id,
            %user_id,
            slots_booked = event.slots_booked,
            "Booking cancelled"
        );
        Ok(BookingOutcome { booking, event })
    }

    /// The user's confirmed bookings with event details, earliest event first.
    pub async fn list_bookings(&self, user_id: Uuid) -> Result<Vec<BookingDetails>, BookingError> {
        let mut tx = self.ledger.begin().await?;
        let bookings = tx.list_confirmed_by_user(user_id).await?;
        tx.commit().await?;
        Ok(bookings)
    }

    pub async fn schedule(&self, user_id: Uuid) -> Result<Vec<CalendarEntry>, BookingError> {
        let bookings = self.list_bookings(user_id).await?;
        Ok(bookings.iter().map(CalendarEntry::from).collect())
    }
}
