use axum::{
    Router,
    http::{header, HeaderValue, Method, StatusCode},
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use std::net::SocketAddr;

pub mod auth;
pub mod error;
pub mod events;
pub mod middleware;
pub mod state;
pub mod user;

pub use state::AppState;

const RATE_LIMIT_REQUESTS: i64 = 100;
const RATE_LIMIT_WINDOW_SECONDS: u64 = 60;

pub fn app(state: AppState) -> Router {
    // Cookies cross origins only with credentials allowed, which rules out `Any`.
    let mut cors = CorsLayer::new()
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::USER_AGENT,
        ]);
    match state.allowed_origin.parse::<HeaderValue>() {
        Ok(origin) => cors = cors.allow_origin(origin),
        Err(_) => tracing::warn!("Ignoring invalid CORS origin {:?}", state.allowed_origin),
    }

    let mut router = Router::new()
        .merge(auth::routes())
        .merge(events::routes(state.clone()))
        .merge(user::routes(state.clone()));

    // Needs peer addresses, so only installed when serving with connect info.
    if state.redis.is_some() {
        router = router.layer(axum::middleware::from_fn_with_state(state.clone(), rate_limit_middleware));
    }

    router
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn rate_limit_middleware(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    req: Request,
    next: Next,
) -> Response {
    let Some(redis) = state.redis.as_ref() else {
        return next.run(req).await;
    };

    let ip = addr.ip().to_string();
    match redis.allow_request(&ip, RATE_LIMIT_REQUESTS, RATE_LIMIT_WINDOW_SECONDS).await {
        Ok(true) => next.run(req).await,
        Ok(false) => (StatusCode::TOO_MANY_REQUESTS, "Rate limit exceeded").into_response(),
        Err(e) => {
            // Fail open
            tracing::warn!("Rate limiter unavailable: {}", e);
            next.run(req).await
        }
    }
}
