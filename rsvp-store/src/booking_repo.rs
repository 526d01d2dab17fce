use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rsvp_core::repository::{BookingStore, EventStore};
use rsvp_core::{
    Booking, BookingDetails, BookingStatus, Event, Ledger, StoreError, StoreResult, StoreTransaction,
};
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::database::map_sqlx_error;

const EVENT_COLUMNS: &str = "id, event_title, date, time_slot, venue, available_slots, slots_booked, \
     description, contact_mail, event_type, created_at";

const BOOKING_COLUMNS: &str = "booking_id, user_id, event_id, booking_status, booking_date";

/// Postgres-backed ledger. Each `begin` opens a database transaction.
pub struct StoreBookingLedger {
    pool: PgPool,
}

impl StoreBookingLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Ledger for StoreBookingLedger {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>> {
        let tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        Ok(Box::new(PgStoreTransaction { tx: Some(tx) }))
    }
}

// Internal structs for type-safe querying
#[derive(sqlx::FromRow)]
struct EventRow {
    id: Uuid,
    event_title: String,
    date: NaiveDate,
    time_slot: String,
    venue: String,
    available_slots: i32,
    slots_booked: i32,
    description: Option<String>,
    contact_mail: Option<String>,
    event_type: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<EventRow> for Event {
    fn from(row: EventRow) -> Self {
        Event {
            id: row.id,
            event_title: row.event_title,
            date: row.date,
            time_slot: row.time_slot,
            venue: row.venue,
            available_slots: row.available_slots,
            slots_booked: row.slots_booked,
            description: row.description,
            contact_mail: row.contact_mail,
            event_type: row.event_type,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct BookingRow {
    booking_id: Uuid,
    user_id: Uuid,
    event_id: Uuid,
    booking_status: String,
    booking_date: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = StoreError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        let booking_status = row
            .booking_status
            .parse::<BookingStatus>()
            .map_err(StoreError::Unavailable)?;
        Ok(Booking {
            booking_id: row.booking_id,
            user_id: row.user_id,
            event_id: row.event_id,
            booking_status,
            booking_date: row.booking_date,
        })
    }
}

// Booking and event columns never share a name, so the join flattens cleanly.
#[derive(sqlx::FromRow)]
struct BookingDetailsRow {
    #[sqlx(flatten)]
    booking: BookingRow,
    #[sqlx(flatten)]
    event: EventRow,
}

pub struct PgStoreTransaction {
    tx: Option<Transaction<'static, Postgres>>,
}

impl PgStoreTransaction {
    fn conn(&mut self) -> StoreResult<&mut PgConnection> {
        self.tx
            .as_deref_mut()
            .ok_or_else(|| StoreError::Unavailable("transaction already finished".to_string()))
    }

    async fn current_slots(&mut self, id: Uuid) -> StoreResult<Option<i32>> {
        sqlx::query_scalar::<_, i32>("SELECT slots_booked FROM events WHERE id = $1")
            .bind(id)
            .fetch_optional(self.conn()?)
            .await
            .map_err(map_sqlx_error)
    }

    async fn current_status(&mut self, id: Uuid) -> StoreResult<Option<String>> {
        sqlx::query_scalar::<_, String>("SELECT booking_status FROM bookings WHERE booking_id = $1")
            .bind(id)
            .fetch_optional(self.conn()?)
            .await
            .map_err(map_sqlx_error)
    }
}

#[async_trait]
impl EventStore for PgStoreTransaction {
    async fn get_event(&mut self, id: Uuid) -> StoreResult<Option<Event>> {
        let sql = format!("SELECT {} FROM events WHERE id = $1", EVENT_COLUMNS);
        let row = sqlx::query_as::<_, EventRow>(&sql)
            .bind(id)
            .fetch_optional(self.conn()?)
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(Event::from))
    }

    async fn list_events(&mut self) -> StoreResult<Vec<Event>> {
        let sql = format!("SELECT {} FROM events ORDER BY date ASC, event_title ASC", EVENT_COLUMNS);
        let rows = sqlx::query_as::<_, EventRow>(&sql)
            .fetch_all(self.conn()?)
            .await
            .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(Event::from).collect())
    }

    async fn adjust_slots(&mut self, id: Uuid, delta: i32) -> StoreResult<Event> {
        // Single conditional statement: the row lock orders concurrent writers
        // and the bound is re-checked against the committed counter.
        let sql = format!(
            r#"
            UPDATE events
            SET slots_booked = GREATEST(slots_booked + $2, 0)
            WHERE id = $1
              AND ($2 <= 0 OR slots_booked + $2 <= available_slots)
            RETURNING {}
            "#,
            EVENT_COLUMNS
        );
        let row = sqlx::query_as::<_, EventRow>(&sql)
            .bind(id)
            .bind(delta)
            .fetch_optional(self.conn()?)
            .await
            .map_err(map_sqlx_error)?;

        match row {
            Some(row) => Ok(Event::from(row)),
            None => match self.current_slots(id).await? {
                Some(current) => Err(StoreError::Conflict(format!(
                    "event {} rejected slot change {:+} at slots_booked {}",
                    id, delta, current
                ))),
                None => Err(StoreError::NotFound(format!("Event {}", id))),
            },
        }
    }
}

#[async_trait]
impl BookingStore for PgStoreTransaction {
    async fn insert_booking(&mut self, user_id: Uuid, event_id: Uuid) -> StoreResult<Booking> {
        let booking = Booking::new(user_id, event_id);
        let sql = format!(
            r#"
            INSERT INTO bookings (booking_id, user_id, event_id, booking_status, booking_date)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            BOOKING_COLUMNS
        );
        let row = sqlx::query_as::<_, BookingRow>(&sql)
            .bind(booking.booking_id)
            .bind(booking.user_id)
            .bind(booking.event_id)
            .bind(booking.booking_status.as_str())
            .bind(booking.booking_date)
            .fetch_one(self.conn()?)
            .await
            .map_err(map_sqlx_error)?;
        Booking::try_from(row)
    }

    async fn find_confirmed_booking(
        &mut self,
        user_id: Uuid,
        event_id: Uuid,
    ) -> StoreResult<Option<Booking>> {
        let sql = format!(
            "SELECT {} FROM bookings WHERE user_id = $1 AND event_id = $2 AND booking_status = $3",
            BOOKING_COLUMNS
        );
        let row = sqlx::query_as::<_, BookingRow>(&sql)
            .bind(user_id)
            .bind(event_id)
            .bind(BookingStatus::Confirmed.as_str())
            .fetch_optional(self.conn()?)
            .await
            .map_err(map_sqlx_error)?;
        row.map(Booking::try_from).transpose()
    }

    async fn get_booking(&mut self, id: Uuid) -> StoreResult<Option<Booking>> {
        let sql = format!("SELECT {} FROM bookings WHERE booking_id = $1", BOOKING_COLUMNS);
        let row = sqlx::query_as::<_, BookingRow>(&sql)
            .bind(id)
            .fetch_optional(self.conn()?)
            .await
            .map_err(map_sqlx_error)?;
        row.map(Booking::try_from).transpose()
    }

    async fn set_status(&mut self, id: Uuid, status: BookingStatus) -> StoreResult<Booking> {
        let sql = format!(
            r#"
            UPDATE bookings
            SET booking_status = $2
            WHERE booking_id = $1 AND booking_status <> $2
            RETURNING {}
            "#,
            BOOKING_COLUMNS
        );
        let row = sqlx::query_as::<_, BookingRow>(&sql)
            .bind(id)
            .bind(status.as_str())
            .fetch_optional(self.conn()?)
            .await
            .map_err(map_sqlx_error)?;

        match row {
            Some(row) => Booking::try_from(row),
            None => match self.current_status(id).await? {
                Some(current) => Err(StoreError::Conflict(format!("booking {} is already {}", id, current))),
                None => Err(StoreError::NotFound(format!("Booking {}", id))),
            },
        }
    }

    async fn list_confirmed_by_user(&mut self, user_id: Uuid) -> StoreResult<Vec<BookingDetails>> {
        let rows = sqlx::query_as::<_, BookingDetailsRow>(
            r#"
            SELECT b.booking_id, b.user_id, b.event_id, b.booking_status, b.booking_date,
                   e.id, e.event_title, e.date, e.time_slot, e.venue, e.available_slots,
                   e.slots_booked, e.description, e.contact_mail, e.event_type, e.created_at
            FROM bookings b
            JOIN events e ON e.id = b.event_id
            WHERE b.user_id = $1 AND b.booking_status = $2
            ORDER BY e.date ASC, b.booking_date ASC
            "#,
        )
        .bind(user_id)
        .bind(BookingStatus::Confirmed.as_str())
        .fetch_all(self.conn()?)
        .await
        .map_err(map_sqlx_error)?;

        rows.into_iter()
            .map(|row| {
                Ok(BookingDetails {
                    booking: Booking::try_from(row.booking)?,
                    event: Event::from(row.event),
                })
            })
            .collect()
    }
}

#[async_trait]
impl StoreTransaction for PgStoreTransaction {
    async fn commit(&mut self) -> StoreResult<()> {
        let tx = self
            .tx
            .take()
            .ok_or_else(|| StoreError::Unavailable("transaction already finished".to_string()))?;
        tx.commit().await.map_err(map_sqlx_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_booking_row_with_unknown_status_is_rejected() {
        let row = BookingRow {
            booking_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            event_id: Uuid::new_v4(),
            booking_status: "Pending".to_string(),
            booking_date: Utc::now(),
        };
        assert!(matches!(Booking::try_from(row), Err(StoreError::Unavailable(_))));
    }

    #[test]
    fn test_booking_row_maps_status() {
        let row = BookingRow {
            booking_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            event_id: Uuid::new_v4(),
            booking_status: "Cancelled".to_string(),
            booking_date: Utc::now(),
        };
        let booking = Booking::try_from(row).unwrap();
        assert_eq!(booking.booking_status, BookingStatus::Cancelled);
        assert!(!booking.is_confirmed());
    }
}
