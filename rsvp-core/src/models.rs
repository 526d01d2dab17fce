use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, NaiveDate, Utc};
use std::fmt;
use std::str::FromStr;

use rsvp_shared::pii::{MaskedEmail, REDACTED};

use crate::schedule::TimeSlot;

/// Booking status. `Confirmed` → `Cancelled` is the only transition.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum BookingStatus {
    Confirmed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Confirmed => "Confirmed",
            BookingStatus::Cancelled => "Cancelled",
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Confirmed" => Ok(BookingStatus::Confirmed),
            "Cancelled" => Ok(BookingStatus::Cancelled),
            other => Err(format!("unknown booking status: {}", other)),
        }
    }
}

/// A bookable event with its capacity counters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Event {
    pub id: Uuid,
    pub event_title: String,
    pub date: NaiveDate,
    /// Free-form window such as `"10:00 AM - 12:00 PM"`.
    pub time_slot: String,
    pub venue: String,
    pub available_slots: i32,
    pub slots_booked: i32,
    pub description: Option<String>,
    pub contact_mail: Option<String>,
    pub event_type: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Event {
    pub fn new(
        event_title: impl Into<String>,
        date: NaiveDate,
        time_slot: impl Into<String>,
        venue: impl Into<String>,
        available_slots: i32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_title: event_title.into(),
            date,
            time_slot: time_slot.into(),
            venue: venue.into(),
            available_slots,
            slots_booked: 0,
            description: None,
            contact_mail: None,
            event_type: None,
            created_at: Utc::now(),
        }
    }

    pub fn remaining_slots(&self) -> i32 {
        (self.available_slots - self.slots_booked).max(0)
    }

    pub fn is_full(&self) -> bool {
        self.slots_booked >= self.available_slots
    }

    /// Start instant used by the cancellation window.
    pub fn starts_at(&self) -> DateTime<Utc> {
        TimeSlot::parse(&self.time_slot).start_on(self.date)
    }
}

/// One user's reservation of one slot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Booking {
    pub booking_id: Uuid,
    pub user_id: Uuid,
    pub event_id: Uuid,
    pub booking_status: BookingStatus,
    pub booking_date: DateTime<Utc>,
}

impl Booking {
    pub fn new(user_id: Uuid, event_id: Uuid) -> Self {
        Self {
            booking_id: Uuid::new_v4(),
            user_id,
            event_id,
            booking_status: BookingStatus::Confirmed,
            booking_date: Utc::now(),
        }
    }

    pub fn is_confirmed(&self) -> bool {
        self.booking_status == BookingStatus::Confirmed
    }
}

/// A booking joined with the event it reserves.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookingDetails {
    #[serde(flatten)]
    pub booking: Booking,
    #[serde(rename = "events")]
    pub event: Event,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub emp_id: String,
    pub designation: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

// Keeps the email and password hash out of `{:?}` output.
impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("email", &MaskedEmail(&self.email))
            .field("emp_id", &self.emp_id)
            .field("designation", &self.designation)
            .field("password_hash", &format_args!("{}", REDACTED))
            .field("created_at", &self.created_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_event(available: i32, booked: i32) -> Event {
        let mut event = Event::new(
            "Rust Meetup",
            NaiveDate::from_ymd_opt(2030, 5, 17).unwrap(),
            "10:00 AM - 12:00 PM",
            "Hall B",
            available,
        );
        event.slots_booked = booked;
        event
    }

    #[test]
    fn test_capacity_helpers() {
        assert!(!sample_event(2, 1).is_full());
        assert_eq!(sample_event(2, 1).remaining_slots(), 1);
        assert!(sample_event(2, 2).is_full());
        assert_eq!(sample_event(2, 2).remaining_slots(), 0);
        assert!(sample_event(0, 0).is_full());
    }

    #[test]
    fn test_status_round_trips_through_text() {
        assert_eq!("Confirmed".parse::<BookingStatus>().unwrap(), BookingStatus::Confirmed);
        assert_eq!(BookingStatus::Cancelled.to_string(), "Cancelled");
        assert!("CANCELLED".parse::<BookingStatus>().is_err());
    }

    #[test]
    fn test_booking_details_json_nests_event() {
        let event = sample_event(5, 1);
        let booking = Booking::new(Uuid::new_v4(), event.id);
        let details = BookingDetails { booking: booking.clone(), event };

        let value = serde_json::to_value(&details).unwrap();
        assert_eq!(value["booking_id"], serde_json::json!(booking.booking_id));
        assert_eq!(value["booking_status"], "Confirmed");
        assert_eq!(value["events"]["event_title"], "Rust Meetup");
        assert_eq!(value["events"]["venue"], "Hall B");
    }

    #[test]
    fn test_user_never_serializes_password_hash() {
        let user = User {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            emp_id: "E-100".to_string(),
            designation: "Engineer".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            created_at: Utc::now(),
        };
        let value = serde_json::to_value(&user).unwrap();
        assert!(value.get("password_hash").is_none());
        assert_eq!(value["username"], "alice");
    }

    #[test]
    fn test_user_debug_hides_email_and_hash() {
        let user = User {
            id: Uuid::nil(),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            emp_id: "E-7".to_string(),
            designation: "Engineer".to_string(),
            password_hash: "$argon2id$v=19$secret".to_string(),
            created_at: Utc::now(),
        };
        let debug = format!("{:?}", user);
        assert!(debug.contains("a***@example.com"));
        assert!(debug.contains("[redacted]"));
        assert!(!debug.contains("alice@example.com"));
        assert!(!debug.contains("argon2id"));
    }
}
