use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::{
    cookie::{Cookie, CookieJar, SameSite},
    WithRejection,
};
use rsvp_core::Registration;
use rsvp_shared::pii::MaskedEmail;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    error::AppError,
    events::list_events,
    middleware::{issue_token, TOKEN_COOKIE},
    state::AppState,
};

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Debug, Serialize)]
struct AuthResponse {
    token: String,
}

#[derive(Debug, Serialize)]
struct MessageResponse {
    message: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/getevents", get(list_events))
}

async fn register(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<Registration>, AppError>,
) -> Result<(StatusCode, Json<MessageResponse>), AppError> {
    state.accounts.register(req).await?;

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse { message: "User registered successfully".to_string() }),
    ))
}

async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    WithRejection(Json(req), _): WithRejection<Json<LoginRequest>, AppError>,
) -> Result<(CookieJar, Json<AuthResponse>), AppError> {
    let user = state.accounts.authenticate(&req.email, &req.password).await?;
    let token = issue_token(&state.auth, &user)?;

    let cookie = Cookie::build((TOKEN_COOKIE, token.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(state.auth.secure_cookies)
        .build();

    info!(user_id = %user.id, email = %MaskedEmail(&user.email), "User logged in");
    Ok((jar.add(cookie), Json(AuthResponse { token })))
}

async fn logout(jar: CookieJar) -> (CookieJar, Json<MessageResponse>) {
    let jar = jar.remove(Cookie::build(TOKEN_COOKIE).path("/"));
    (jar, Json(MessageResponse { message: "Logged out successfully".to_string() }))
}
