use axum::{
    extract::State,
    routing::get,
    Extension, Json, Router,
};
use rsvp_core::User;
use serde::Serialize;

use crate::{
    error::AppError,
    middleware::{session_middleware, SessionClaims},
    state::AppState,
};

#[derive(Debug, Serialize)]
struct ProfileResponse {
    user: User,
}

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/api/user/me", get(me))
        .route_layer(axum::middleware::from_fn_with_state(state, session_middleware))
}

async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
) -> Result<Json<ProfileResponse>, AppError> {
    let user = state.accounts.profile(claims.user_id()?).await?;
    Ok(Json(ProfileResponse { user }))
}
