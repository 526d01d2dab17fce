use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
    http::{header, HeaderMap},
};
use axum_extra::extract::cookie::CookieJar;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rsvp_core::User;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::state::{AppState, AuthConfig};

/// Name of the cookie carrying the session JWT.
pub const TOKEN_COOKIE: &str = "token";

// ============================================================================
// JWT Claims
// ============================================================================

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionClaims {
    pub sub: String,
    pub email: String,
    pub exp: usize,
}

impl SessionClaims {
    pub fn user_id(&self) -> Result<Uuid, AppError> {
        Uuid::parse_str(&self.sub)
            .map_err(|_| AppError::AuthorizationError("Invalid token subject".to_string()))
    }
}

pub fn issue_token(auth: &AuthConfig, user: &User) -> Result<String, AppError> {
    let claims = SessionClaims {
        sub: user.id.to_string(),
        email: user.email.clone(),
        exp: (Utc::now() + Duration::seconds(auth.expiration as i64)).timestamp() as usize,
    };

    encode(&Header::default(), &claims, &EncodingKey::from_secret(auth.secret.as_bytes()))
        .map_err(|e| AppError::InternalServerError(format!("Token encoding failed: {}", e)))
}

// ============================================================================
// Session Middleware
// ============================================================================

/// Accepts the session from the `token` cookie or `Authorization: Bearer`,
/// whichever verifies first. No credential is 401, only bad ones 403.
pub async fn session_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let candidates = session_tokens(req.headers());
    if candidates.is_empty() {
        return Err(AppError::AuthenticationError("Access denied. No token provided.".to_string()));
    }

    let claims = candidates
        .iter()
        .find_map(|token| verify_token(&state.auth.secret, token))
        .ok_or_else(|| AppError::AuthorizationError("Invalid or expired token".to_string()))?;

    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

fn session_tokens(headers: &HeaderMap) -> Vec<String> {
    let cookie = CookieJar::from_headers(headers)
        .get(TOKEN_COOKIE)
        .map(|cookie| cookie.value().to_string());
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::to_string);

    cookie.into_iter().chain(bearer).filter(|t| !t.is_empty()).collect()
}

fn verify_token(secret: &str, token: &str) -> Option<SessionClaims> {
    decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| tracing::debug!("Rejected session token: {}", e))
    .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth() -> AuthConfig {
        AuthConfig {
            secret: "unit-secret".to_string(),
            expiration: 60,
            secure_cookies: false,
        }
    }

    fn user() -> User {
        User {
            id: Uuid::new_v4(),
            username: "carol".to_string(),
            email: "carol@example.com".to_string(),
            emp_id: "E-3".to_string(),
            designation: "Engineer".to_string(),
            password_hash: String::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_issued_token_round_trips_user_id() {
        let user = user();
        let token = issue_token(&auth(), &user).unwrap();
        let data = decode::<SessionClaims>(
            &token,
            &DecodingKey::from_secret(b"unit-secret"),
            &Validation::default(),
        )
        .unwrap();
        assert_eq!(data.claims.user_id().unwrap(), user.id);
        assert_eq!(data.claims.email, "carol@example.com");
    }

    #[test]
    fn test_non_uuid_subject_is_rejected() {
        let claims = SessionClaims { sub: "guest-1".to_string(), email: String::new(), exp: 0 };
        assert!(matches!(claims.user_id(), Err(AppError::AuthorizationError(_))));
    }

    #[test]
    fn test_cookie_and_bearer_are_both_candidates() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, "theme=dark; token=stale".parse().unwrap());
        headers.insert(header::AUTHORIZATION, "Bearer fresh".parse().unwrap());
        assert_eq!(session_tokens(&headers), vec!["stale".to_string(), "fresh".to_string()]);

        assert!(session_tokens(&HeaderMap::new()).is_empty());
    }

    #[test]
    fn test_verify_token_rejects_wrong_secret() {
        let token = issue_token(&auth(), &user()).unwrap();
        assert!(verify_token("unit-secret", &token).is_some());
        assert!(verify_token("other-secret", &token).is_none());
    }
}
