use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::seat::SeatId;

/// A scheduled screening of a movie, identified by a time label, with its
/// own independent seat-booking state.
///
/// `booked_seats` holds no duplicates and grows monotonically; the only
/// shrink path is the engine's compensating rollback after a failed
/// booking write.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Showtime {
    pub label: String,
    pub booked_seats: Vec<SeatId>,
}

impl Showtime {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            booked_seats: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Movie {
    pub id: Uuid,
    pub title: String,
    pub genre: String,
    pub rating: f64,
    pub duration_minutes: i32,
    pub image_url: Option<String>,
    pub description: Option<String>,
    pub release_date: Option<DateTime<Utc>>,
    pub showtimes: Vec<Showtime>,
    pub created_at: DateTime<Utc>,
}

impl Movie {
    pub fn showtime_labels(&self) -> Vec<String> {
        self.showtimes.iter().map(|st| st.label.clone()).collect()
    }
}
