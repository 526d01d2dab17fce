use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::BookingDetails;

const TIME_FORMATS: [&str; 3] = ["%I:%M %p", "%I:%M%p", "%H:%M"];

/// Length assumed for a slot that has a start but no parseable end.
pub const DEFAULT_SLOT_LENGTH_MINUTES: i64 = 60;

/// Parsed form of an event's `time_slot` text, e.g. `"10:00 AM - 12:00 PM"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeSlot {
    pub start: Option<NaiveTime>,
    pub end: Option<NaiveTime>,
}

impl TimeSlot {
    pub fn parse(raw: &str) -> Self {
        let normalized = raw.replace('\u{2013}', "-");
        let (start, end) = match normalized.split_once('-') {
            Some((start, end)) => (start, Some(end)),
            None => (normalized.as_str(), None),
        };

        Self {
            start: parse_time(start),
            end: end.and_then(parse_time),
        }
    }

    /// Start of the slot on `date`. Falls back to midnight when the slot has no
    /// readable start, which keeps the cancellation window conservative.
    pub fn start_on(&self, date: NaiveDate) -> DateTime<Utc> {
        let time = self.start.unwrap_or_default();
        Utc.from_utc_datetime(&date.and_time(time))
    }

    pub fn end_on(&self, date: NaiveDate) -> DateTime<Utc> {
        let start = self.start_on(date);
        match self.end {
            Some(end) => {
                let end = Utc.from_utc_datetime(&date.and_time(end));
                if end > start {
                    end
                } else {
                    start + Duration::minutes(DEFAULT_SLOT_LENGTH_MINUTES)
                }
            }
            None => start + Duration::minutes(DEFAULT_SLOT_LENGTH_MINUTES),
        }
    }
}

fn parse_time(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    TIME_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(raw, format).ok())
}

/// One confirmed booking laid out on the user's calendar.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CalendarEntry {
    pub booking_id: Uuid,
    pub event_id: Uuid,
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub venue: String,
    pub description: String,
    pub event_type: Option<String>,
}

impl From<&BookingDetails> for CalendarEntry {
    fn from(details: &BookingDetails) -> Self {
        let event = &details.event;
        let slot = TimeSlot::parse(&event.time_slot);
        Self {
            booking_id: details.booking.booking_id,
            event_id: event.id,
            title: event.event_title.clone(),
            start: slot.start_on(event.date),
            end: slot.end_on(event.date),
            venue: event.venue.clone(),
            description: event.description.clone().unwrap_or_default(),
            event_type: event.event_type.clone(),
        }
    }
}
