use std::sync::Arc;
use std::net::SocketAddr;
use anyhow::Context;
use rsvp_api::{app, state::{AppState, AuthConfig}};
use rsvp_core::{AccountService, BookingManager, CancellationPolicy};
use rsvp_store::{app_config::Config, DbClient, EventProducer, RedisClient, StoreBookingLedger, StoreUserRepository};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rsvp_api=debug,rsvp_core=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting RSVP API on port {}", config.server.port);

    // Database Connection
    let db = DbClient::new(&config.database.url, config.database.max_connections)
        .await
        .context("Failed to connect to Postgres")?;
    db.migrate().await.context("Failed to run migrations")?;

    let ledger = Arc::new(StoreBookingLedger::new(db.pool.clone()));
    let users = Arc::new(StoreUserRepository::new(db.pool.clone()));
    let policy = CancellationPolicy::from_hours(config.business_rules.cancellation_window_hours);

    // Redis Connection (optional)
    let redis = match &config.redis {
        Some(redis) => Some(Arc::new(
            RedisClient::new(&redis.url).context("Invalid Redis URL")?,
        )),
        None => None,
    };

    // Kafka Connection (optional)
    let kafka = match &config.kafka {
        Some(kafka) => Some(Arc::new(
            EventProducer::new(&kafka.brokers).context("Failed to create Kafka producer")?,
        )),
        None => None,
    };

    // SSE Broadcast Channel
    let (sse_tx, _) = tokio::sync::broadcast::channel(100);

    let app_state = AppState {
        bookings: Arc::new(BookingManager::new(ledger, policy)),
        accounts: Arc::new(AccountService::new(users)),
        redis,
        kafka,
        sse_tx,
        auth: AuthConfig {
            secret: config.auth.jwt_secret.clone(),
            expiration: config.auth.jwt_expiration_seconds,
            secure_cookies: config.auth.secure_cookies,
        },
        allowed_origin: config.cors.allowed_origin.clone(),
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>()
    ).await?;

    Ok(())
}
