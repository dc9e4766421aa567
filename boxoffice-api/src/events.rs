use std::convert::Infallible;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::sse::{Event as SseEvent, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use futures_util::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::BroadcastStream;
use tracing::warn;
use uuid::Uuid;
use boxoffice_core::EventOverview;
use boxoffice_shared::Event;
use crate::error::AppError;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateEventRequest {
    pub total_tickets: i64,
}

#[derive(Debug, Serialize)]
pub struct CreateEventResponse {
    pub message: String,
    pub event: Event,
}

#[derive(Debug, Serialize)]
pub struct WaitlistResponse {
    pub event_id: Uuid,
    pub waitlist_size: usize,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/events", post(create_event))
        .route("/v1/events/{id}", get(get_event).delete(delete_event))
        .route("/v1/events/{id}/waitlist", get(get_waitlist))
        .route("/v1/events/{id}/stream", get(stream_event))
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /v1/events
pub async fn create_event(
    State(state): State<AppState>,
    payload: Result<Json<CreateEventRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreateEventResponse>), AppError> {
    let Json(req) = payload?;
    let event = state.orchestrator.create_event(req.total_tickets).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateEventResponse {
            message: "Event created successfully".to_string(),
            event,
        }),
    ))
}

/// GET /v1/events/{id}
pub async fn get_event(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
) -> Result<Json<EventOverview>, AppError> {
    Ok(Json(state.orchestrator.get_event(event_id).await?))
}

/// DELETE /v1/events/{id}
/// Soft delete; waiting users of the event are dropped
pub async fn delete_event(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.orchestrator.delete_event(event_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /v1/events/{id}/waitlist
pub async fn get_waitlist(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
) -> Result<Json<WaitlistResponse>, AppError> {
    let waitlist_size = state.orchestrator.waitlist_size(event_id).await?;
    Ok(Json(WaitlistResponse {
        event_id,
        waitlist_size,
    }))
}

/// GET /v1/events/{id}/stream
/// Server-sent booking activity for one event
pub async fn stream_event(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
) -> Result<Sse<impl Stream<Item = Result<SseEvent, Infallible>>>, AppError> {
    // Subscribe before the lookup so nothing between the two is missed
    let rx = state.orchestrator.subscribe();
    state.orchestrator.get_event(event_id).await?;

    let stream = BroadcastStream::new(rx).filter_map(move |result| async move {
        match result {
            Ok(activity) if activity.event_id() == event_id => {
                match SseEvent::default().event(activity.kind()).json_data(&activity) {
                    Ok(event) => Some(Ok(event)),
                    Err(e) => {
                        warn!("Failed to encode activity for event {}: {}", event_id, e);
                        None
                    }
                }
            }
            Ok(_) => None,
            Err(e) => {
                warn!("Activity stream for event {} lagged: {}", event_id, e);
                None
            }
        }
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
