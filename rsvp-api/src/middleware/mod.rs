pub mod auth;

pub use auth::{issue_token, session_middleware, SessionClaims, TOKEN_COOKIE};
