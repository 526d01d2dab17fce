use uuid::Uuid;

pub const BOOKING_CONFIRMED_TOPIC: &str = "booking.confirmed";
pub const BOOKING_CANCELLED_TOPIC: &str = "booking.cancelled";

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct BookingConfirmedEvent {
    pub booking_id: Uuid,
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub slots_booked: i32,
    pub available_slots: i32,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct BookingCancelledEvent {
    pub booking_id: Uuid,
    pub event_id: Uuid,
    pub user_id: Uuid,
    pub slots_booked: i32,
    pub available_slots: i32,
    pub timestamp: i64,
}

/// Live capacity update pushed to subscribers of an event's stream.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone, PartialEq)]
pub struct SlotsChangedEvent {
    pub event_id: Uuid,
    pub slots_booked: i32,
    pub available_slots: i32,
    pub remaining_slots: i32,
    pub timestamp: i64,
}

impl SlotsChangedEvent {
    pub fn new(event_id: Uuid, slots_booked: i32, available_slots: i32, timestamp: i64) -> Self {
        Self {
            event_id,
            slots_booked,
            available_slots,
            remaining_slots: (available_slots - slots_booked).max(0),
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remaining_slots_never_negative() {
        let event_id = Uuid::new_v4();
        assert_eq!(SlotsChangedEvent::new(event_id, 3, 5, 0).remaining_slots, 2);
        assert_eq!(SlotsChangedEvent::new(event_id, 5, 5, 0).remaining_slots, 0);
        assert_eq!(SlotsChangedEvent::new(event_id, 7, 5, 0).remaining_slots, 0);
    }

    #[test]
    fn test_confirmed_event_payload_shape() {
        let event = BookingConfirmedEvent {
            booking_id: Uuid::nil(),
            event_id: Uuid::nil(),
            user_id: Uuid::nil(),
            slots_booked: 2,
            available_slots: 10,
            timestamp: 1_700_000_000,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["slots_booked"], 2);
        assert_eq!(value["available_slots"], 10);
        assert!(value.get("booking_id").is_some());
    }
}
