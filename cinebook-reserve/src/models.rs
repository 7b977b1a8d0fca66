use serde::{Deserialize, Serialize};
use uuid::Uuid;

use cinebook_core::booking::Booking;
use cinebook_core::seat::SeatId;

/// A candidate seat claim as submitted by a client. Seats arrive as raw
/// tokens; the engine normalizes them before any comparison.
#[derive(Debug, Clone, Deserialize)]
pub struct ReservationRequest {
    pub user_id: Uuid,
    pub movie_id: Uuid,
    pub showtime: String,
    pub seats: Vec<String>,
    pub total_amount: f64,
    pub email: Option<String>,
    pub name: Option<String>,
}

/// A successful reservation: the durable booking plus the contact address
/// the confirmation notification goes to.
#[derive(Debug, Clone, Serialize)]
pub struct Reserved {
    pub booking: Booking,
    pub contact_email: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ReservationError {
    /// Malformed request, rejected before any shared state is touched.
    #[error("invalid reservation request: {0}")]
    Validation(String),

    #[error("movie not found")]
    MovieNotFound,

    /// The token matched none of the movie's showtimes; `available` lets
    /// the client self-correct.
    #[error("showtime not found for this movie")]
    ShowtimeNotFound { available: Vec<String> },

    /// Expected and frequent: one or more requested seats were already
    /// booked at the time of the atomic check. Nothing was written.
    #[error("seat already booked")]
    SeatConflict { conflicting: Vec<SeatId> },

    /// The supplied user id resolves to nothing and the request carried no
    /// contact details to mint a guest from. Discovered after the claim,
    /// so it triggers compensation.
    #[error("user not found and missing email/name for creation")]
    UnknownUser,

    /// Storage unavailable or a write failed. Compensation has already run
    /// by the time the caller sees this.
    #[error("storage failure: {0}")]
    Storage(String),
}
