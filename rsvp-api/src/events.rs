use axum::{
    extract::{Path, State},
    response::sse::{Event as SseEvent, KeepAlive, Sse},
    routing::{delete, get, post},
    Extension, Json, Router,
};
use axum_extra::extract::WithRejection;
use chrono::Utc;
use futures_util::{stream, Stream, StreamExt};
use rsvp_core::{
    schedule::CalendarEntry, Booking, BookingDetails, BookingOutcome, Event,
};
use rsvp_shared::{BookingCancelledEvent, BookingConfirmedEvent, SlotsChangedEvent};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::{
    error::AppError,
    middleware::{session_middleware, SessionClaims},
    state::AppState,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnrollRequest {
    event_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
struct EnrollResponse {
    success: bool,
    message: String,
    booking: Booking,
}

#[derive(Debug, Serialize)]
struct CancelResponse {
    success: bool,
    message: String,
}

pub fn routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/api/events/enroll", post(enroll))
        .route("/api/events/my-bookings", get(my_bookings))
        .route("/api/events/cancel-booking/{id}", delete(cancel_booking))
        .route("/api/events/schedule", get(schedule))
        .route_layer(axum::middleware::from_fn_with_state(state, session_middleware));

    Router::new()
        .route("/api/events/getevents", get(list_events))
        .route("/api/events/{id}/stream", get(stream_slots))
        .merge(protected)
}

pub(crate) async fn list_events(State(state): State<AppState>) -> Result<Json<Vec<Event>>, AppError> {
    let events = state.bookings.list_events().await?;
    Ok(Json(events))
}

async fn enroll(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    WithRejection(Json(req), _): WithRejection<Json<EnrollRequest>, AppError>,
) -> Result<Json<EnrollResponse>, AppError> {
    let user_id = claims.user_id()?;
    let event_id = req
        .event_id
        .ok_or_else(|| AppError::ValidationError("Event ID is required".to_string()))?;

    let outcome = state.bookings.enroll(user_id, event_id).await?;
    announce_confirmed(&state, &outcome);

    Ok(Json(EnrollResponse {
        success: true,
        message: "Enrollment successful".to_string(),
        booking: outcome.booking,
    }))
}

async fn my_bookings(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
) -> Result<Json<Vec<BookingDetails>>, AppError> {
    let bookings = state.bookings.list_bookings(claims.user_id()?).await?;
    Ok(Json(bookings))
}

async fn cancel_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<CancelResponse>, AppError> {
    let outcome = state.bookings.cancel(claims.user_id()?, booking_id).await?;
    announce_cancelled(&state, &outcome);

    Ok(Json(CancelResponse {
        success: true,
        message: "Booking cancelled successfully".to_string(),
    }))
}

async fn schedule(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
) -> Result<Json<Vec<CalendarEntry>>, AppError> {
    let entries = state.bookings.schedule(claims.user_id()?).await?;
    Ok(Json(entries))
}

/// Server-sent capacity updates for one event, starting with its current counters.
async fn stream_slots(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = Result<SseEvent, axum::Error>>>, AppError> {
    // Subscribe before reading the snapshot so no update falls in between.
    let rx = state.sse_tx.subscribe();
    let event = state.bookings.get_event(event_id).await?;

    let snapshot = SlotsChangedEvent::new(
        event.id,
        event.slots_booked,
        event.available_slots,
        Utc::now().timestamp(),
    );

    let updates = tokio_stream::wrappers::BroadcastStream::new(rx).filter_map(move |result| async move {
        match result {
            Ok(update) if update.event_id == event_id => Some(update),
            Ok(_) => None,
            Err(e) => {
                debug!(%event_id, "SSE subscriber lagged: {}", e);
                None
            }
        }
    });

    let stream = stream::once(async move { snapshot })
        .chain(updates)
        .map(|update| SseEvent::default().event("slots_changed").json_data(&update));

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

fn broadcast_slots(state: &AppState, event: &Event, timestamp: i64) {
    let update = SlotsChangedEvent::new(event.id, event.slots_booked, event.available_slots, timestamp);
    // No receivers is fine.
    let _ = state.sse_tx.send(update);
}

fn announce_confirmed(state: &AppState, outcome: &BookingOutcome) {
    let timestamp = Utc::now().timestamp();
    broadcast_slots(state, &outcome.event, timestamp);

    if let Some(kafka) = state.kafka.clone() {
        let message = BookingConfirmedEvent {
            booking_id: outcome.booking.booking_id,
            event_id: outcome.event.id,
            user_id: outcome.booking.user_id,
            slots_booked: outcome.event.slots_booked,
            available_slots: outcome.event.available_slots,
            timestamp,
        };
        tokio::spawn(async move {
            kafka.booking_confirmed(&message).await;
        });
    }
}

fn announce_cancelled(state: &AppState, outcome: &BookingOutcome) {
    let timestamp = Utc::now().timestamp();
    broadcast_slots(state, &outcome.event, timestamp);

    if let Some(kafka) = state.kafka.clone() {
        let message = BookingCancelledEvent {
            booking_id: outcome.booking.booking_id,
            event_id: outcome.event.id,
            user_id: outcome.booking.user_id,
            slots_booked: outcome.event.slots_booked,
            available_slots: outcome.event.available_slots,
            timestamp,
        };
        tokio::spawn(async move {
            kafka.booking_cancelled(&message).await;
        });
    }
}
