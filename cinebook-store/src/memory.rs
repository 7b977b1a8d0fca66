use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use cinebook_core::booking::Booking;
use cinebook_core::events::EventSink;
use cinebook_core::movie::{Movie, Showtime};
use cinebook_core::repository::{
    BookingRepository, ClaimOutcome, MovieRepository, RepoError, UserRepository,
};
use cinebook_core::seat::SeatId;
use cinebook_core::user::User;

/// In-memory store: the whole cinema behind one lock.
///
/// The check-and-append in `claim_seats` is atomic because both halves run
/// under the mutex; there is no window for a second claim to interleave.
/// Used by the test suites and for running the API without Postgres.
pub struct MemoryCinema {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    movies: HashMap<Uuid, Movie>,
    bookings: HashMap<Uuid, Booking>,
    users: HashMap<Uuid, User>,
}

impl MemoryCinema {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }

    pub async fn add_movie(&self, movie: Movie) {
        self.inner.lock().await.movies.insert(movie.id, movie);
    }

    pub async fn add_user(&self, user: User) {
        self.inner.lock().await.users.insert(user.id, user);
    }

    /// Seed a movie with empty showtimes and default metadata.
    pub async fn seed_movie(&self, title: &str, showtime_labels: &[&str]) -> Uuid {
        let movie = Movie {
            id: Uuid::new_v4(),
            title: title.to_string(),
            genre: "Drama".to_string(),
            rating: 8.0,
            duration_minutes: 120,
            image_url: None,
            description: None,
            release_date: None,
            showtimes: showtime_labels.iter().map(|l| Showtime::new(*l)).collect(),
            created_at: Utc::now(),
        };
        let id = movie.id;
        self.add_movie(movie).await;
        id
    }
}

impl Default for MemoryCinema {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MovieRepository for MemoryCinema {
    async fn find_movie(&self, id: Uuid) -> Result<Option<Movie>, RepoError> {
        Ok(self.inner.lock().await.movies.get(&id).cloned())
    }

    async fn claim_seats(
        &self,
        movie_id: Uuid,
        showtime_label: &str,
        seats: &[SeatId],
    ) -> Result<ClaimOutcome, RepoError> {
        let mut inner = self.inner.lock().await;
        let movie = inner
            .movies
            .get_mut(&movie_id)
            .ok_or("movie missing during seat claim")?;
        let showtime = movie
            .showtimes
            .iter_mut()
            .find(|st| st.label == showtime_label)
            .ok_or("showtime missing during seat claim")?;

        let conflicting: Vec<SeatId> = seats
            .iter()
            .filter(|seat| showtime.booked_seats.contains(seat))
            .cloned()
            .collect();
        if !conflicting.is_empty() {
            return Ok(ClaimOutcome::Conflict { conflicting });
        }

        showtime.booked_seats.extend_from_slice(seats);
        Ok(ClaimOutcome::Claimed)
    }

    async fn release_seats(
        &self,
        movie_id: Uuid,
        showtime_label: &str,
        seats: &[SeatId],
    ) -> Result<(), RepoError> {
        let mut inner = self.inner.lock().await;
        let movie = inner
            .movies
            .get_mut(&movie_id)
            .ok_or("movie missing during seat release")?;
        let showtime = movie
            .showtimes
            .iter_mut()
            .find(|st| st.label == showtime_label)
            .ok_or("showtime missing during seat release")?;

        showtime.booked_seats.retain(|seat| !seats.contains(seat));
        Ok(())
    }
}

#[async_trait]
impl BookingRepository for MemoryCinema {
    async fn create_booking(&self, booking: &Booking) -> Result<(), RepoError> {
        self.inner
            .lock()
            .await
            .bookings
            .insert(booking.id, booking.clone());
        Ok(())
    }

    async fn find_booking(&self, id: Uuid) -> Result<Option<Booking>, RepoError> {
        Ok(self.inner.lock().await.bookings.get(&id).cloned())
    }

    async fn list_bookings(&self, user_id: Uuid) -> Result<Vec<Booking>, RepoError> {
        let inner = self.inner.lock().await;
        let mut bookings: Vec<Booking> = inner
            .bookings
            .values()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect();
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(bookings)
    }
}

#[async_trait]
impl UserRepository for MemoryCinema {
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        Ok(self.inner.lock().await.users.get(&id).cloned())
    }

    async fn create_user(&self, user: &User) -> Result<(), RepoError> {
        self.inner.lock().await.users.insert(user.id, user.clone());
        Ok(())
    }
}

/// Event sink that records instead of publishing, for tests without a
/// broker.
#[derive(Default)]
pub struct RecordingEvents {
    records: Mutex<Vec<(String, String, String)>>,
}

impl RecordingEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn recorded(&self) -> Vec<(String, String, String)> {
        self.records.lock().await.clone()
    }
}

#[async_trait]
impl EventSink for RecordingEvents {
    async fn publish(&self, topic: &str, key: &str, payload: &str) -> Result<(), RepoError> {
        self.records.lock().await.push((
            topic.to_string(),
            key.to_string(),
            payload.to_string(),
        ));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seat(s: &str) -> SeatId {
        SeatId::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_claim_then_conflict_then_release() {
        let store = MemoryCinema::new();
        let movie_id = store.seed_movie("Arrival", &["7:30 PM"]).await;

        let outcome = store
            .claim_seats(movie_id, "7:30 PM", &[seat("A1"), seat("A2")])
            .await
            .unwrap();
        assert_eq!(outcome, ClaimOutcome::Claimed);

        let outcome = store
            .claim_seats(movie_id, "7:30 PM", &[seat("A2"), seat("A3")])
            .await
            .unwrap();
        assert_eq!(
            outcome,
            ClaimOutcome::Conflict {
                conflicting: vec![seat("A2")]
            }
        );

        // Conflict wrote nothing.
        let movie = store.find_movie(movie_id).await.unwrap().unwrap();
        assert_eq!(movie.showtimes[0].booked_seats, vec![seat("A1"), seat("A2")]);

        store
            .release_seats(movie_id, "7:30 PM", &[seat("A1")])
            .await
            .unwrap();
        let movie = store.find_movie(movie_id).await.unwrap().unwrap();
        assert_eq!(movie.showtimes[0].booked_seats, vec![seat("A2")]);
    }

    #[tokio::test]
    async fn test_claim_unknown_showtime_is_an_error() {
        let store = MemoryCinema::new();
        let movie_id = store.seed_movie("Arrival", &["7:30 PM"]).await;

        assert!(store
            .claim_seats(movie_id, "9:00 PM", &[seat("A1")])
            .await
            .is_err());
    }
}
