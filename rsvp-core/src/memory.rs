//! Embedded store used by tests and single-process deployments.
//!
//! Every transaction owns the state mutex for its whole lifetime and edits a
//! private copy, so enroll/cancel sequences are serialized and a dropped
//! transaction leaves no trace.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::models::{Booking, BookingDetails, BookingStatus, Event, User};
use crate::repository::{
    BookingStore, EventStore, Ledger, StoreError, StoreResult, StoreTransaction, UserRepository,
};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    events: HashMap<Uuid, Event>,
    bookings: HashMap<Uuid, Booking>,
    users: HashMap<Uuid, User>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_event(&self, event: Event) {
        self.state.lock().await.events.insert(event.id, event);
    }

    pub async fn event(&self, id: Uuid) -> Option<Event> {
        self.state.lock().await.events.get(&id).cloned()
    }

    /// Every booking a user has ever made, cancelled ones included.
    pub async fn bookings_for(&self, user_id: Uuid) -> Vec<Booking> {
        let state = self.state.lock().await;
        let mut bookings: Vec<Booking> = state
            .bookings
            .values()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect();
        bookings.sort_by_key(|b| b.booking_date);
        bookings
    }
}

#[async_trait]
impl Ledger for MemoryStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>> {
        let guard = self.state.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTransaction {
            guard: Some(guard),
            working,
        }))
    }
}

pub struct MemoryTransaction {
    guard: Option<OwnedMutexGuard<MemoryState>>,
    working: MemoryState,
}

#[async_trait]
impl EventStore for MemoryTransaction {
    async fn get_event(&mut self, id: Uuid) -> StoreResult<Option<Event>> {
        Ok(self.working.events.get(&id).cloned())
    }

    async fn list_events(&mut self) -> StoreResult<Vec<Event>> {
        let mut events: Vec<Event> = self.working.events.values().cloned().collect();
        events.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.event_title.cmp(&b.event_title)));
        Ok(events)
    }

    async fn adjust_slots(&mut self, id: Uuid, delta: i32) -> StoreResult<Event> {
        let event = self
            .working
            .events
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("event {}", id)))?;

        let next = (event.slots_booked + delta).max(0);
        if delta > 0 && next > event.available_slots {
            return Err(StoreError::Conflict(format!(
                "event {} has no remaining capacity",
                id
            )));
        }

        event.slots_booked = next;
        Ok(event.clone())
    }
}

#[async_trait]
impl BookingStore for MemoryTransaction {
    async fn insert_booking(&mut self, user_id: Uuid, event_id: Uuid) -> StoreResult<Booking> {
        if !self.working.events.contains_key(&event_id) {
            return Err(StoreError::NotFound(format!("event {}", event_id)));
        }
        let duplicate = self
            .working
            .bookings
            .values()
            .any(|b| b.user_id == user_id && b.event_id == event_id && b.is_confirmed());
        if duplicate {
            return Err(StoreError::Duplicate("bookings_one_confirmed_per_user".to_string()));
        }

        let booking = Booking::new(user_id, event_id);
        self.working.bookings.insert(booking.booking_id, booking.clone());
        Ok(booking)
    }

    async fn find_confirmed_booking(
        &mut self,
        user_id: Uuid,
        event_id: Uuid,
    ) -> StoreResult<Option<Booking>> {
        Ok(self
            .working
            .bookings
            .values()
            .find(|b| b.user_id == user_id && b.event_id == event_id && b.is_confirmed())
            .cloned())
    }

    async fn get_booking(&mut self, id: Uuid) -> StoreResult<Option<Booking>> {
        Ok(self.working.bookings.get(&id).cloned())
    }

    async fn set_status(&mut self, id: Uuid, status: BookingStatus) -> StoreResult<Booking> {
        let booking = self
            .working
            .bookings
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("booking {}", id)))?;

        if booking.booking_status == status {
            return Err(StoreError::Conflict(format!("booking {} is already {}", id, status)));
        }
        booking.booking_status = status;
        Ok(booking.clone())
    }

    async fn list_confirmed_by_user(&mut self, user_id: Uuid) -> StoreResult<Vec<BookingDetails>> {
        let mut details: Vec<BookingDetails> = self
            .working
            .bookings
            .values()
            .filter(|b| b.user_id == user_id && b.is_confirmed())
            .filter_map(|b| {
                self.working.events.get(&b.event_id).map(|event| BookingDetails {
                    booking: b.clone(),
                    event: event.clone(),
                })
            })
            .collect();
        details.sort_by(|a, b| {
            a.event
                .date
                .cmp(&b.event.date)
                .then_with(|| a.booking.booking_date.cmp(&b.booking.booking_date))
        });
        Ok(details)
    }
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn commit(&mut self) -> StoreResult<()> {
        let mut guard = self
            .guard
            .take()
            .ok_or_else(|| StoreError::Unavailable("transaction already finished".to_string()))?;
        *guard = std::mem::take(&mut self.working);
        Ok(())
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create_user(&self, user: &User) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        if state.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Duplicate("email".to_string()));
        }
        if state.users.values().any(|u| u.username == user.username) {
            return Err(StoreError::Duplicate("username".to_string()));
        }
        state.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let state = self.state.lock().await;
        Ok(state.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let state = self.state.lock().await;
        Ok(state.users.values().find(|u| u.username == username).cloned())
    }

    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.state.lock().await.users.get(&id).cloned())
    }
}
