use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use cinebook_core::seat::SeatId;
use cinebook_reserve::ReservationError;

#[derive(Debug)]
pub enum AppError {
    ValidationError(String),
    NotFoundError {
        message: String,
        available_showtimes: Option<Vec<String>>,
    },
    // 400 by contract, not 409: conflicts are the expected client loop of
    // re-query and reselect.
    ConflictError {
        conflicting_seats: Vec<SeatId>,
    },
    InternalServerError(String),
    Anyhow(anyhow::Error),
}

impl AppError {
    pub fn reservation(err: ReservationError) -> Self {
        match err {
            ReservationError::Validation(msg) => AppError::ValidationError(msg),
            ReservationError::UnknownUser => AppError::ValidationError(
                "User not found and missing email/name for creation".to_string(),
            ),
            ReservationError::MovieNotFound => AppError::NotFoundError {
                message: "Movie not found".to_string(),
                available_showtimes: None,
            },
            ReservationError::ShowtimeNotFound { available } => AppError::NotFoundError {
                message: "Showtime not found for this movie".to_string(),
                available_showtimes: Some(available),
            },
            ReservationError::SeatConflict { conflicting } => AppError::ConflictError {
                conflicting_seats: conflicting,
            },
            ReservationError::Storage(msg) => AppError::InternalServerError(msg),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::ValidationError(msg) => {
                (StatusCode::BAD_REQUEST, Json(json!({ "error": msg }))).into_response()
            }
            AppError::NotFoundError {
                message,
                available_showtimes,
            } => {
                let mut body = json!({ "error": message });
                if let Some(labels) = available_showtimes {
                    body["availableShowtimes"] = json!(labels);
                }
                (StatusCode::NOT_FOUND, Json(body)).into_response()
            }
            AppError::ConflictError { conflicting_seats } => (
                StatusCode::BAD_REQUEST,
                Json(json!({
                    "error": "Seat already booked",
                    "conflictingSeats": conflicting_seats,
                })),
            )
                .into_response(),
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Internal Server Error" })),
                )
                    .into_response()
            }
            AppError::Anyhow(err) => {
                tracing::error!("Internal Server Error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Internal Server Error" })),
                )
                    .into_response()
            }
        }
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::Anyhow(err.into())
    }
}
