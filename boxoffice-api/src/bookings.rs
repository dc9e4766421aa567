use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use boxoffice_core::BookingOutcome;
use boxoffice_shared::{Booking, BookingDetails, BookingFilter};
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct BookTicketRequest {
    pub event_id: Uuid,
    pub user_id: String,
}

#[derive(Debug, Serialize)]
pub struct BookedResponse {
    pub message: String,
    pub booking: Booking,
}

#[derive(Debug, Serialize)]
pub struct WaitlistedResponse {
    pub message: String,
    pub event_id: Uuid,
    pub user_id: String,
    pub position: usize,
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub message: String,
    pub canceled: Booking,
    pub promoted: Option<Booking>,
}

#[derive(Debug, Serialize)]
pub struct BookingListResponse {
    pub message: String,
    pub bookings: Vec<BookingDetails>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/bookings", post(book_ticket).get(list_bookings))
        .route("/v1/bookings/{id}/cancel", post(cancel_booking))
}

/// POST /v1/bookings
/// 201 with the booking, or 202 with the waiting-list position
pub async fn book_ticket(
    State(state): State<AppState>,
    payload: Result<Json<BookTicketRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(req) = payload?;

    let response = match state.orchestrator.book_ticket(req.event_id, &req.user_id).await? {
        BookingOutcome::Booked { booking } => (
            StatusCode::CREATED,
            Json(BookedResponse {
                message: "Ticket booked successfully".to_string(),
                booking,
            }),
        )
            .into_response(),
        BookingOutcome::Waitlisted {
            event_id,
            user_id,
            position,
        } => (
            StatusCode::ACCEPTED,
            Json(WaitlistedResponse {
                message: "Event is sold out, added to the waiting list".to_string(),
                event_id,
                user_id,
                position,
            }),
        )
            .into_response(),
    };

    Ok(response)
}

/// POST /v1/bookings/{id}/cancel
pub async fn cancel_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
) -> Result<Json<CancelResponse>, AppError> {
    let outcome = state.orchestrator.cancel_booking(booking_id).await?;

    let message = match &outcome.promoted {
        Some(_) => "Booking canceled, ticket reassigned to the next waiting user",
        None => "Booking canceled successfully",
    };

    Ok(Json(CancelResponse {
        message: message.to_string(),
        canceled: outcome.canceled,
        promoted: outcome.promoted,
    }))
}

/// GET /v1/bookings?event_id=&include_canceled=
pub async fn list_bookings(
    State(state): State<AppState>,
    query: Result<Query<BookingFilter>, QueryRejection>,
) -> Result<Json<BookingListResponse>, AppError> {
    let Query(filter) = query?;
    let bookings = state.orchestrator.list_bookings(&filter).await?;

    Ok(Json(BookingListResponse {
        message: "Bookings retrieved successfully".to_string(),
        bookings,
    }))
}
