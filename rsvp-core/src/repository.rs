use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{Booking, BookingDetails, BookingStatus, Event, User};

/// Failures reported by a storage backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Record not found: {0}")]
    NotFound(String),
    #[error("Conditional update rejected: {0}")]
    Conflict(String),
    #[error("Unique constraint violated: {0}")]
    Duplicate(String),
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Event records and their capacity counters, scoped to one transaction.
#[async_trait]
pub trait EventStore: Send {
    async fn get_event(&mut self, id: Uuid) -> StoreResult<Option<Event>>;

    /// All events ordered by date ascending.
    async fn list_events(&mut self) -> StoreResult<Vec<Event>>;

    /// Adds `delta` to `slots_booked` in one atomic step, flooring at zero.
    ///
    /// Rejected with `Conflict` when a positive `delta` would push the counter
    /// past `available_slots`, judged against the latest committed value.
    /// Unknown events yield `NotFound`.
    async fn adjust_slots(&mut self, id: Uuid, delta: i32) -> StoreResult<Event>;
}

/// Booking records, scoped to one transaction.
#[async_trait]
pub trait BookingStore: Send {
    /// Inserts a `Confirmed` booking. A second confirmed booking for the same
    /// (user, event) pair is a `Duplicate`.
    async fn insert_booking(&mut self, user_id: Uuid, event_id: Uuid) -> StoreResult<Booking>;

    async fn find_confirmed_booking(
        &mut self,
        user_id: Uuid,
        event_id: Uuid,
    ) -> StoreResult<Option<Booking>>;

    async fn get_booking(&mut self, id: Uuid) -> StoreResult<Option<Booking>>;

    /// Moves a booking into `status`. `Conflict` when it is already there.
    async fn set_status(&mut self, id: Uuid, status: BookingStatus) -> StoreResult<Booking>;

    /// Confirmed bookings of `user_id` joined with their events, by event date.
    async fn list_confirmed_by_user(&mut self, user_id: Uuid) -> StoreResult<Vec<BookingDetails>>;
}

/// A unit of work over both stores. Dropping it without `commit` rolls back.
#[async_trait]
pub trait StoreTransaction: EventStore + BookingStore {
    async fn commit(&mut self) -> StoreResult<()>;
}

/// Entry point to a transactional event/booking backend.
#[async_trait]
pub trait Ledger: Send + Sync {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>>;
}

/// Repository trait for registered users
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Stores a new user. Taken usernames or emails are a `Duplicate` naming the field.
    async fn create_user(&self, user: &User) -> StoreResult<()>;

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>>;

    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>>;
}
