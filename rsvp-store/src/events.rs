use rdkafka::config::ClientConfig;
use rdkafka::error::KafkaError;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::util::Timeout;
use rsvp_shared::models::events::{BOOKING_CANCELLED_TOPIC, BOOKING_CONFIRMED_TOPIC};
use rsvp_shared::{BookingCancelledEvent, BookingConfirmedEvent};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

/// Kafka producer for booking notifications, keyed by event id so every
/// change to one event lands on the same partition in commit order.
#[derive(Clone)]
pub struct EventProducer {
    producer: FutureProducer,
}

impl EventProducer {
    pub fn new(brokers: &str) -> Result<Self, KafkaError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("message.timeout.ms", "5000")
            .create()?;

        Ok(Self { producer })
    }

    pub async fn publish(&self, topic: &str, key: &str, payload: &str) -> Result<(), KafkaError> {
        let record = FutureRecord::to(topic).key(key).payload(payload);

        match self.producer.send(record, Timeout::After(Duration::from_secs(0))).await {
            Ok(delivery) => {
                debug!(topic, key, partition = delivery.partition, offset = delivery.offset, "Published booking notification");
                Ok(())
            }
            Err((e, _msg)) => Err(e),
        }
    }

    pub async fn booking_confirmed(&self, event: &BookingConfirmedEvent) {
        self.publish_best_effort(BOOKING_CONFIRMED_TOPIC, event.event_id, event).await;
    }

    pub async fn booking_cancelled(&self, event: &BookingCancelledEvent) {
        self.publish_best_effort(BOOKING_CANCELLED_TOPIC, event.event_id, event).await;
    }

    // The booking is already committed; a lost notification is logged, never surfaced.
    async fn publish_best_effort<T: Serialize>(&self, topic: &str, event_id: Uuid, event: &T) {
        let (key, payload) = match encode(event_id, event) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!(topic, %event_id, "Failed to encode booking notification: {}", e);
                return;
            }
        };

        if let Err(e) = self.publish(topic, &key, &payload).await {
            warn!(topic, %event_id, "Failed to publish booking notification: {}", e);
        }
    }
}

fn encode<T: Serialize>(event_id: Uuid, event: &T) -> Result<(String, String), serde_json::Error> {
    Ok((event_id.to_string(), serde_json::to_string(event)?))
}
