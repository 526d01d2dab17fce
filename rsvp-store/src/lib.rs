pub mod app_config;
pub mod database;
pub mod booking_repo;
pub mod user_repo;
pub mod redis_repo;
pub mod events;

pub use database::DbClient;
pub use booking_repo::StoreBookingLedger;
pub use user_repo::StoreUserRepository;
pub use redis_repo::RedisClient;
pub use events::EventProducer;
