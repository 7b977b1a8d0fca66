use axum::{
    extract::{Path, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use futures_util::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use tracing::info;
use uuid::Uuid;

use cinebook_core::booking::{Booking, BookingStatus};
use cinebook_core::events::{BookingConfirmedEvent, SeatsClaimedEvent};
use cinebook_core::seat::SeatId;
use cinebook_reserve::ReservationRequest;

use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub user_id: Uuid,
    pub movie_id: Uuid,
    pub showtime: String,
    pub seats: Vec<String>,
    pub total_amount: f64,
    pub email: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateBookingResponse {
    success: bool,
    booking_id: Uuid,
    confirmation_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BookedSeatsResponse {
    booked_seats: Vec<SeatId>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UserBookingsResponse {
    bookings: Vec<BookingView>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BookingView {
    id: Uuid,
    movie_id: Uuid,
    showtime: String,
    seats: Vec<SeatId>,
    total_amount: f64,
    status: BookingStatus,
    confirmation_id: String,
    created_at: chrono::DateTime<Utc>,
}

impl From<Booking> for BookingView {
    fn from(booking: Booking) -> Self {
        let confirmation_id = booking.confirmation_id();
        Self {
            id: booking.id,
            movie_id: booking.movie_id,
            showtime: booking.showtime,
            seats: booking.seats,
            total_amount: booking.total_amount,
            status: booking.status,
            confirmation_id,
            created_at: booking.created_at,
        }
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/bookings/create", post(create_booking))
        .route(
            "/api/bookings/booked-seats/{movie_id}/{showtime}",
            get(booked_seats),
        )
        .route("/api/bookings/user/{user_id}", get(user_bookings))
        .route("/api/movies/{movie_id}/seat-stream", get(seat_stream))
}

/// POST /api/bookings/create
/// Atomically claim the requested seats and persist the booking.
async fn create_booking(
    State(state): State<AppState>,
    Json(req): Json<CreateBookingRequest>,
) -> Result<Json<CreateBookingResponse>, AppError> {
    info!(
        user_id = %req.user_id,
        movie_id = %req.movie_id,
        showtime = %req.showtime,
        "booking request"
    );

    let reserved = state
        .engine
        .reserve(ReservationRequest {
            user_id: req.user_id,
            movie_id: req.movie_id,
            showtime: req.showtime,
            seats: req.seats,
            total_amount: req.total_amount,
            email: req.email,
            name: req.name,
        })
        .await
        .map_err(AppError::reservation)?;

    let booking = &reserved.booking;

    let claimed = SeatsClaimedEvent {
        movie_id: booking.movie_id,
        showtime: booking.showtime.clone(),
        seats: booking.seats.clone(),
        booking_id: booking.id,
        claimed_at: Utc::now().timestamp(),
    };
    let _ = state.sse_tx.send(claimed);

    let confirmed = BookingConfirmedEvent {
        booking_id: booking.id,
        confirmation_id: booking.confirmation_id(),
        movie_id: booking.movie_id,
        showtime: booking.showtime.clone(),
        seats: booking.seats.clone(),
        email: reserved.contact_email.clone(),
        total_amount: booking.total_amount,
    };
    if let Ok(payload) = serde_json::to_string(&confirmed) {
        let _ = state
            .events
            .publish("booking.confirmed", &booking.id.to_string(), &payload)
            .await;
    }

    Ok(Json(CreateBookingResponse {
        success: true,
        booking_id: booking.id,
        confirmation_id: booking.confirmation_id(),
    }))
}

/// GET /api/bookings/booked-seats/:movie_id/:showtime
/// Advisory snapshot of the seat map; `create` is the final arbiter.
async fn booked_seats(
    State(state): State<AppState>,
    Path((movie_id, showtime)): Path<(Uuid, String)>,
) -> Result<Json<BookedSeatsResponse>, AppError> {
    let seats = state
        .engine
        .booked_seats(movie_id, &showtime)
        .await
        .map_err(AppError::reservation)?;

    Ok(Json(BookedSeatsResponse {
        booked_seats: seats,
    }))
}

/// GET /api/bookings/user/:user_id
async fn user_bookings(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<UserBookingsResponse>, AppError> {
    let bookings = state
        .engine
        .user_bookings(user_id)
        .await
        .map_err(AppError::reservation)?;

    Ok(Json(UserBookingsResponse {
        bookings: bookings.into_iter().map(BookingView::from).collect(),
    }))
}

/// GET /api/movies/:movie_id/seat-stream
/// SSE feed of committed seat claims for one movie, so open seat maps can
/// refresh without polling.
async fn seat_stream(
    State(state): State<AppState>,
    Path(movie_id): Path<Uuid>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.sse_tx.subscribe();

    let stream = tokio_stream::wrappers::BroadcastStream::new(rx).filter_map(move |result| {
        async move {
            match result {
                Ok(event) if event.movie_id == movie_id => {
                    let data = serde_json::to_string(&event).ok()?;
                    Some(Ok(Event::default().event("seats_claimed").data(data)))
                }
                _ => None,
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
