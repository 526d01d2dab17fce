use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rsvp_core::{AccountError, BookingError};
use serde_json::json;

#[derive(Debug)]
pub enum AppError {
    AuthenticationError(String),
    AuthorizationError(String),
    ValidationError(String),
    NotFoundError(String),
    ConflictError(String),
    UnprocessableError(String),
    UnavailableError(String),
    InternalServerError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::AuthenticationError(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::AuthorizationError(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFoundError(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::ConflictError(msg) => (StatusCode::CONFLICT, msg),
            AppError::UnprocessableError(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            AppError::UnavailableError(msg) => {
                tracing::error!("Store unavailable: {}", msg);
                (StatusCode::SERVICE_UNAVAILABLE, "Service temporarily unavailable".to_string())
            }
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error".to_string())
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Malformed request bodies answer in the same `{"error"}` shape as everything else.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::ValidationError(rejection.body_text())
    }
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        let msg = err.to_string();
        match err {
            BookingError::NotFound(_) => AppError::NotFoundError(msg),
            BookingError::Conflict(_)
            | BookingError::CapacityExceeded { .. }
            | BookingError::AlreadyCancelled(_) => AppError::ConflictError(msg),
            BookingError::CancellationWindowClosed { .. } => AppError::UnprocessableError(msg),
            BookingError::StoreUnavailable(_) => AppError::UnavailableError(msg),
        }
    }
}

impl From<AccountError> for AppError {
    fn from(err: AccountError) -> Self {
        let msg = err.to_string();
        match err {
            AccountError::MissingFields => AppError::ValidationError(msg),
            AccountError::EmailTaken | AccountError::UsernameTaken => AppError::ConflictError(msg),
            AccountError::InvalidCredentials => AppError::AuthenticationError(msg),
            AccountError::NotFound => AppError::NotFoundError(msg),
            AccountError::StoreUnavailable(_) => AppError::UnavailableError(msg),
            AccountError::Hashing(_) => AppError::InternalServerError(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_booking_errors_map_to_statuses() {
        let event_id = Uuid::new_v4();
        assert_eq!(status_of(BookingError::NotFound("Event".into()).into()), StatusCode::NOT_FOUND);
        assert_eq!(
            status_of(BookingError::CapacityExceeded { event_id }.into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(BookingError::AlreadyCancelled(event_id).into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(
                BookingError::CancellationWindowClosed { starts_at: Utc::now(), window_hours: 10 }.into()
            ),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_of(BookingError::StoreUnavailable("pool timed out".into()).into()),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_account_errors_map_to_statuses() {
        assert_eq!(status_of(AccountError::MissingFields.into()), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(AccountError::UsernameTaken.into()), StatusCode::CONFLICT);
        assert_eq!(status_of(AccountError::InvalidCredentials.into()), StatusCode::UNAUTHORIZED);
        assert_eq!(
            status_of(AccountError::Hashing("bad salt".into()).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
