use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::seat::SeatId;

/// Booking status. `Cancelled` is a defined value with no operation
/// producing it yet; cancellation is an extension point.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Confirmed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "confirmed" => Some(BookingStatus::Confirmed),
            "cancelled" => Some(BookingStatus::Cancelled),
            _ => None,
        }
    }
}

/// One confirmed reservation: the durable record written only after the
/// seats were claimed, never speculatively.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub user_id: Uuid,
    pub movie_id: Uuid,
    /// The exact stored label of the showtime the seats were matched
    /// against, so later reads resolve the same way the claim did.
    pub showtime: String,
    pub seats: Vec<SeatId>,
    pub total_amount: f64,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
}

impl Booking {
    pub fn new(
        user_id: Uuid,
        movie_id: Uuid,
        showtime: String,
        seats: Vec<SeatId>,
        total_amount: f64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            movie_id,
            showtime,
            seats,
            total_amount,
            status: BookingStatus::Confirmed,
            created_at: Utc::now(),
        }
    }

    /// Confirmation identifier handed back to the client.
    pub fn confirmation_id(&self) -> String {
        format!("CINE-{}", self.id)
    }
}
