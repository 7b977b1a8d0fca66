use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::repository::RepoError;
use crate::seat::SeatId;

/// Pushed on the live seat feed whenever a claim commits, so open seat
/// maps can refresh without polling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeatsClaimedEvent {
    pub movie_id: Uuid,
    pub showtime: String,
    pub seats: Vec<SeatId>,
    pub booking_id: Uuid,
    pub claimed_at: i64,
}

/// Outward notification payload consumed by the confirmation-email
/// component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingConfirmedEvent {
    pub booking_id: Uuid,
    pub confirmation_id: String,
    pub movie_id: Uuid,
    pub showtime: String,
    pub seats: Vec<SeatId>,
    pub email: String,
    pub total_amount: f64,
}

/// Best-effort sink for outward events. Delivery failures are logged by
/// implementations, never surfaced to the booking caller.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn publish(&self, topic: &str, key: &str, payload: &str) -> Result<(), RepoError>;
}
