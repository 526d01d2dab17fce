use std::sync::Arc;
use rsvp_core::{AccountService, BookingManager};
use rsvp_shared::SlotsChangedEvent;
use rsvp_store::{RedisClient, EventProducer};
use tokio::sync::broadcast;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub expiration: u64,
    pub secure_cookies: bool,
}

#[derive(Clone)]
pub struct AppState {
    pub bookings: Arc<BookingManager>,
    pub accounts: Arc<AccountService>,
    pub redis: Option<Arc<RedisClient>>,
    pub kafka: Option<Arc<EventProducer>>,
    pub sse_tx: broadcast::Sender<SlotsChangedEvent>,
    pub auth: AuthConfig,
    pub allowed_origin: String,
}
