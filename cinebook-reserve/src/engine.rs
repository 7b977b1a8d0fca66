use std::sync::Arc;

use tracing::{error, info, warn};
use uuid::Uuid;

use cinebook_core::booking::Booking;
use cinebook_core::repository::{
    BookingRepository, ClaimOutcome, MovieRepository, RepoError, UserRepository,
};
use cinebook_core::schedule::{resolve_showtime, MatchTolerance};
use cinebook_core::seat::SeatId;
use cinebook_core::user::User;

use crate::metrics::ReservationMetrics;
use crate::models::{ReservationError, ReservationRequest, Reserved};

/// The sole authority that moves seats from free to booked.
///
/// All writes to a showtime's booked-seat set go through `reserve`. The
/// check-and-append itself is delegated to `MovieRepository::claim_seats`,
/// which implementations make atomic per showtime, so no two overlapping
/// requests can both observe an empty intersection and both append.
///
/// The booking record is written after the claim as a second storage
/// operation; if that write fails the engine releases exactly the seats it
/// just claimed. A failed release is the one state this design cannot
/// repair on its own, and it is raised as an integrity alarm.
pub struct ReservationEngine {
    movies: Arc<dyn MovieRepository>,
    bookings: Arc<dyn BookingRepository>,
    users: Arc<dyn UserRepository>,
    tolerance: MatchTolerance,
    metrics: ReservationMetrics,
}

impl ReservationEngine {
    pub fn new(
        movies: Arc<dyn MovieRepository>,
        bookings: Arc<dyn BookingRepository>,
        users: Arc<dyn UserRepository>,
        tolerance: MatchTolerance,
        metrics: ReservationMetrics,
    ) -> Self {
        Self {
            movies,
            bookings,
            users,
            tolerance,
            metrics,
        }
    }

    pub fn metrics(&self) -> &ReservationMetrics {
        &self.metrics
    }

    /// Atomically validate and commit a seat claim for a booking request.
    ///
    /// Either all requested seats become booked and a booking record
    /// exists for them, or the showtime is left exactly as it was.
    pub async fn reserve(&self, req: ReservationRequest) -> Result<Reserved, ReservationError> {
        let seats = validate(&req)?;
        self.metrics.attempts.inc();

        let movie = self
            .movies
            .find_movie(req.movie_id)
            .await
            .map_err(storage)?
            .ok_or(ReservationError::MovieNotFound)?;

        let showtime = resolve_showtime(&movie.showtimes, &req.showtime, self.tolerance)
            .ok_or_else(|| ReservationError::ShowtimeNotFound {
                available: movie.showtime_labels(),
            })?;
        // Claims and bookings carry the stored label, not the client token.
        let label = showtime.label.clone();

        info!(
            movie_id = %req.movie_id,
            showtime = %label,
            seats = ?seats,
            "reservation attempt"
        );

        match self
            .movies
            .claim_seats(req.movie_id, &label, &seats)
            .await
            .map_err(storage)?
        {
            ClaimOutcome::Conflict { conflicting } => {
                self.metrics.conflicts.inc();
                info!(
                    movie_id = %req.movie_id,
                    showtime = %label,
                    conflicting = ?conflicting,
                    "seat conflict"
                );
                return Err(ReservationError::SeatConflict { conflicting });
            }
            ClaimOutcome::Claimed => {}
        }

        // Seats are durably claimed. Any failure past this point must
        // release exactly what was claimed.
        match self.finish_booking(&req, &label, &seats).await {
            Ok(reserved) => {
                self.metrics.confirmed.inc();
                info!(
                    booking_id = %reserved.booking.id,
                    confirmation = %reserved.booking.confirmation_id(),
                    "reservation confirmed"
                );
                Ok(reserved)
            }
            Err(err) => {
                self.compensate(req.movie_id, &label, &seats).await;
                Err(err)
            }
        }
    }

    /// Read-only snapshot of a showtime's booked seats, for seat-map
    /// rendering. Not synchronized with in-flight reservations; `reserve`
    /// is the final arbiter.
    pub async fn booked_seats(
        &self,
        movie_id: Uuid,
        token: &str,
    ) -> Result<Vec<SeatId>, ReservationError> {
        let movie = self
            .movies
            .find_movie(movie_id)
            .await
            .map_err(storage)?
            .ok_or(ReservationError::MovieNotFound)?;

        let showtime = resolve_showtime(&movie.showtimes, token, self.tolerance).ok_or_else(|| {
            ReservationError::ShowtimeNotFound {
                available: movie.showtime_labels(),
            }
        })?;

        Ok(showtime.booked_seats.clone())
    }

    /// Booking audit trail for one user, newest first.
    pub async fn user_bookings(&self, user_id: Uuid) -> Result<Vec<Booking>, ReservationError> {
        self.bookings.list_bookings(user_id).await.map_err(storage)
    }

    async fn finish_booking(
        &self,
        req: &ReservationRequest,
        label: &str,
        seats: &[SeatId],
    ) -> Result<Reserved, ReservationError> {
        let user = self.ensure_user(req).await?;

        let booking = Booking::new(
            user.id,
            req.movie_id,
            label.to_string(),
            seats.to_vec(),
            req.total_amount,
        );
        self.bookings
            .create_booking(&booking)
            .await
            .map_err(storage)?;

        Ok(Reserved {
            booking,
            contact_email: user.email,
        })
    }

    async fn ensure_user(&self, req: &ReservationRequest) -> Result<User, ReservationError> {
        if let Some(user) = self.users.find_user(req.user_id).await.map_err(storage)? {
            return Ok(user);
        }

        let (Some(email), Some(name)) = (req.email.as_deref(), req.name.as_deref()) else {
            return Err(ReservationError::UnknownUser);
        };

        let user = User::guest(name, email);
        self.users.create_user(&user).await.map_err(storage)?;
        info!(user_id = %user.id, "guest user created for booking");
        Ok(user)
    }

    /// Roll back a seat claim whose follow-up booking write failed. A
    /// failed release leaves a claimed seat with no booking record; that
    /// needs an operator, so it is alarmed distinctly and never swallowed.
    async fn compensate(&self, movie_id: Uuid, label: &str, seats: &[SeatId]) {
        match self.movies.release_seats(movie_id, label, seats).await {
            Ok(()) => {
                self.metrics.rollbacks.inc();
                warn!(
                    movie_id = %movie_id,
                    showtime = %label,
                    seats = ?seats,
                    "seat claim rolled back after booking failure"
                );
            }
            Err(release_err) => {
                self.metrics.integrity_alarms.inc();
                error!(
                    target: "cinebook::integrity",
                    movie_id = %movie_id,
                    showtime = %label,
                    seats = ?seats,
                    error = %release_err,
                    "failed to roll back seat claim; seats are stuck without a booking"
                );
            }
        }
    }
}

fn storage(err: RepoError) -> ReservationError {
    ReservationError::Storage(err.to_string())
}

/// Reject malformed requests before any shared state is touched, and
/// normalize the seat set. Tokens that normalize to the same seat collapse
/// to one entry.
fn validate(req: &ReservationRequest) -> Result<Vec<SeatId>, ReservationError> {
    if req.seats.is_empty() {
        return Err(ReservationError::Validation(
            "no seats selected".to_string(),
        ));
    }
    if !req.total_amount.is_finite() || req.total_amount <= 0.0 {
        return Err(ReservationError::Validation(
            "invalid total amount".to_string(),
        ));
    }

    let mut seats: Vec<SeatId> = Vec::with_capacity(req.seats.len());
    for raw in &req.seats {
        let seat =
            SeatId::parse(raw).map_err(|e| ReservationError::Validation(e.to_string()))?;
        if !seats.contains(&seat) {
            seats.push(seat);
        }
    }
    Ok(seats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use cinebook_core::movie::Movie;
    use cinebook_store::memory::MemoryCinema;

    fn seat(s: &str) -> SeatId {
        SeatId::parse(s).unwrap()
    }

    fn request(
        user_id: Uuid,
        movie_id: Uuid,
        showtime: &str,
        seats: &[&str],
    ) -> ReservationRequest {
        ReservationRequest {
            user_id,
            movie_id,
            showtime: showtime.to_string(),
            seats: seats.iter().map(|s| s.to_string()).collect(),
            total_amount: 24.0,
            email: None,
            name: None,
        }
    }

    async fn seeded() -> (Arc<MemoryCinema>, Uuid, Uuid) {
        let store = Arc::new(MemoryCinema::new());
        let movie_id = store
            .seed_movie("Interstellar", &["7:30 PM", "2025-10-28T13:30:00"])
            .await;
        let user = User::guest("Ada", "ada@example.com");
        let user_id = user.id;
        store.add_user(user).await;
        (store, movie_id, user_id)
    }

    fn engine(store: &Arc<MemoryCinema>) -> ReservationEngine {
        ReservationEngine::new(
            store.clone(),
            store.clone(),
            store.clone(),
            MatchTolerance::default(),
            ReservationMetrics::new().unwrap(),
        )
    }

    /// Booking store that refuses every write.
    struct FailingBookings;

    #[async_trait]
    impl BookingRepository for FailingBookings {
        async fn create_booking(&self, _booking: &Booking) -> Result<(), RepoError> {
            Err("booking store down".into())
        }

        async fn find_booking(&self, _id: Uuid) -> Result<Option<Booking>, RepoError> {
            Ok(None)
        }

        async fn list_bookings(&self, _user_id: Uuid) -> Result<Vec<Booking>, RepoError> {
            Ok(Vec::new())
        }
    }

    /// Movie store whose compensating release always fails.
    struct StuckRelease(Arc<MemoryCinema>);

    #[async_trait]
    impl MovieRepository for StuckRelease {
        async fn find_movie(&self, id: Uuid) -> Result<Option<Movie>, RepoError> {
            self.0.find_movie(id).await
        }

        async fn claim_seats(
            &self,
            movie_id: Uuid,
            showtime_label: &str,
            seats: &[SeatId],
        ) -> Result<ClaimOutcome, RepoError> {
            self.0.claim_seats(movie_id, showtime_label, seats).await
        }

        async fn release_seats(
            &self,
            _movie_id: Uuid,
            _showtime_label: &str,
            _seats: &[SeatId],
        ) -> Result<(), RepoError> {
            Err("release failed".into())
        }
    }

    #[tokio::test]
    async fn test_reserve_claims_seats_and_creates_booking() {
        let (store, movie_id, user_id) = seeded().await;
        let engine = engine(&store);

        let reserved = engine
            .reserve(request(user_id, movie_id, "7:30 PM", &["A1", "A2"]))
            .await
            .unwrap();

        assert_eq!(reserved.booking.seats, vec![seat("A1"), seat("A2")]);
        assert_eq!(reserved.booking.showtime, "7:30 PM");
        assert_eq!(reserved.contact_email, "ada@example.com");
        assert!(reserved
            .booking
            .confirmation_id()
            .starts_with("CINE-"));

        let booked = engine.booked_seats(movie_id, "7:30 PM").await.unwrap();
        assert_eq!(booked, vec![seat("A1"), seat("A2")]);

        let stored = store.find_booking(reserved.booking.id).await.unwrap();
        assert!(stored.is_some());
        assert_eq!(engine.metrics().confirmed.get(), 1);
    }

    #[tokio::test]
    async fn test_conflict_names_colliding_seats_and_mutates_nothing() {
        let (store, movie_id, user_id) = seeded().await;
        let engine = engine(&store);

        engine
            .reserve(request(user_id, movie_id, "7:30 PM", &["A1", "A2"]))
            .await
            .unwrap();

        let err = engine
            .reserve(request(user_id, movie_id, "7:30 PM", &["A2", "A3"]))
            .await
            .unwrap_err();

        match err {
            ReservationError::SeatConflict { conflicting } => {
                assert_eq!(conflicting, vec![seat("A2")]);
            }
            other => panic!("expected conflict, got {other:?}"),
        }

        // No partial commit: A3 was not added.
        let booked = engine.booked_seats(movie_id, "7:30 PM").await.unwrap();
        assert_eq!(booked, vec![seat("A1"), seat("A2")]);
        assert_eq!(engine.metrics().conflicts.get(), 1);
    }

    #[tokio::test]
    async fn test_booking_scenario_a_b_c() {
        let (store, movie_id, user_id) = seeded().await;
        let engine = Arc::new(engine(&store));

        engine
            .reserve(request(user_id, movie_id, "7:30 PM", &["A1", "A2"]))
            .await
            .unwrap();

        let err = engine
            .reserve(request(user_id, movie_id, "7:30 PM", &["A2", "A3"]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ReservationError::SeatConflict { ref conflicting } if *conflicting == vec![seat("A2")]
        ));
        assert_eq!(
            engine.booked_seats(movie_id, "7:30 PM").await.unwrap(),
            vec![seat("A1"), seat("A2")]
        );

        engine
            .reserve(request(user_id, movie_id, "7:30 PM", &["A3", "A4"]))
            .await
            .unwrap();
        assert_eq!(
            engine.booked_seats(movie_id, "7:30 PM").await.unwrap(),
            vec![seat("A1"), seat("A2"), seat("A3"), seat("A4")]
        );
    }

    #[tokio::test]
    async fn test_concurrent_overlapping_reserves_admit_one_winner() {
        let (store, movie_id, user_id) = seeded().await;
        let engine = Arc::new(engine(&store));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let engine = engine.clone();
            handles.push(tokio::spawn(async move {
                engine
                    .reserve(request(user_id, movie_id, "7:30 PM", &["C1", "C2"]))
                    .await
            }));
        }

        let mut successes = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                Err(ReservationError::SeatConflict { conflicting }) => {
                    assert!(!conflicting.is_empty());
                }
                Err(other) => panic!("unexpected error: {other:?}"),
            }
        }

        assert_eq!(successes, 1);
        assert_eq!(
            engine.booked_seats(movie_id, "7:30 PM").await.unwrap(),
            vec![seat("C1"), seat("C2")]
        );
    }

    #[tokio::test]
    async fn test_concurrent_disjoint_reserves_both_succeed() {
        let (store, movie_id, user_id) = seeded().await;
        let engine = Arc::new(engine(&store));

        let (a, b) = tokio::join!(
            engine.reserve(request(user_id, movie_id, "7:30 PM", &["A1", "A2"])),
            engine.reserve(request(user_id, movie_id, "7:30 PM", &["B1", "B2"])),
        );
        a.unwrap();
        b.unwrap();

        // No lost update: the result is the union of both sets.
        let mut booked = engine.booked_seats(movie_id, "7:30 PM").await.unwrap();
        booked.sort();
        assert_eq!(booked, vec![seat("A1"), seat("A2"), seat("B1"), seat("B2")]);
    }

    #[tokio::test]
    async fn test_duplicate_tokens_collapse_to_one_seat() {
        let (store, movie_id, user_id) = seeded().await;
        let engine = engine(&store);

        let reserved = engine
            .reserve(request(user_id, movie_id, "7:30 PM", &[" a1 ", "A1"]))
            .await
            .unwrap();

        assert_eq!(reserved.booking.seats, vec![seat("A1")]);
        assert_eq!(
            engine.booked_seats(movie_id, "7:30 PM").await.unwrap(),
            vec![seat("A1")]
        );
    }

    #[tokio::test]
    async fn test_conflict_detection_is_case_insensitive() {
        let (store, movie_id, user_id) = seeded().await;
        let engine = engine(&store);

        engine
            .reserve(request(user_id, movie_id, "7:30 PM", &["A1"]))
            .await
            .unwrap();

        let err = engine
            .reserve(request(user_id, movie_id, "7:30 PM", &[" a1 "]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ReservationError::SeatConflict { ref conflicting } if *conflicting == vec![seat("A1")]
        ));
    }

    #[tokio::test]
    async fn test_validation_rejects_before_touching_state() {
        let (store, movie_id, user_id) = seeded().await;
        let engine = engine(&store);

        let empty = engine
            .reserve(request(user_id, movie_id, "7:30 PM", &[]))
            .await
            .unwrap_err();
        assert!(matches!(empty, ReservationError::Validation(_)));

        let mut bad_amount = request(user_id, movie_id, "7:30 PM", &["A1"]);
        bad_amount.total_amount = 0.0;
        let err = engine.reserve(bad_amount).await.unwrap_err();
        assert!(matches!(err, ReservationError::Validation(_)));

        let malformed = engine
            .reserve(request(user_id, movie_id, "7:30 PM", &["not a seat"]))
            .await
            .unwrap_err();
        assert!(matches!(malformed, ReservationError::Validation(_)));

        assert!(engine
            .booked_seats(movie_id, "7:30 PM")
            .await
            .unwrap()
            .is_empty());
        assert_eq!(engine.metrics().attempts.get(), 0);
    }

    #[tokio::test]
    async fn test_unknown_movie_and_showtime() {
        let (store, movie_id, user_id) = seeded().await;
        let engine = engine(&store);

        let err = engine
            .reserve(request(user_id, Uuid::new_v4(), "7:30 PM", &["A1"]))
            .await
            .unwrap_err();
        assert!(matches!(err, ReservationError::MovieNotFound));

        let err = engine
            .reserve(request(user_id, movie_id, "11:00 AM", &["A1"]))
            .await
            .unwrap_err();
        match err {
            ReservationError::ShowtimeNotFound { available } => {
                assert_eq!(available, vec!["7:30 PM", "2025-10-28T13:30:00"]);
            }
            other => panic!("expected showtime not found, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_showtime_token_matched_within_tolerance() {
        let (store, movie_id, user_id) = seeded().await;
        let engine = engine(&store);

        let reserved = engine
            .reserve(request(
                user_id,
                movie_id,
                "2025-10-28T13:30:30Z",
                &["D4"],
            ))
            .await
            .unwrap();

        // The booking carries the stored label, not the skewed token.
        assert_eq!(reserved.booking.showtime, "2025-10-28T13:30:00");
    }

    #[tokio::test]
    async fn test_guest_user_created_from_contact_details() {
        let (store, movie_id, _) = seeded().await;
        let engine = engine(&store);

        let mut req = request(Uuid::new_v4(), movie_id, "7:30 PM", &["E5"]);
        req.email = Some("guest@example.com".to_string());
        req.name = Some("Guest".to_string());

        let reserved = engine.reserve(req).await.unwrap();
        assert_eq!(reserved.contact_email, "guest@example.com");

        let user = store.find_user(reserved.booking.user_id).await.unwrap();
        assert_eq!(user.unwrap().email, "guest@example.com");
    }

    #[tokio::test]
    async fn test_unknown_user_without_contact_rolls_back_claim() {
        let (store, movie_id, _) = seeded().await;
        let engine = engine(&store);

        let err = engine
            .reserve(request(Uuid::new_v4(), movie_id, "7:30 PM", &["A1"]))
            .await
            .unwrap_err();
        assert!(matches!(err, ReservationError::UnknownUser));

        assert!(engine
            .booked_seats(movie_id, "7:30 PM")
            .await
            .unwrap()
            .is_empty());
        assert_eq!(engine.metrics().rollbacks.get(), 1);
    }

    #[tokio::test]
    async fn test_booking_failure_releases_claimed_seats() {
        let (store, movie_id, user_id) = seeded().await;
        let engine = ReservationEngine::new(
            store.clone(),
            Arc::new(FailingBookings),
            store.clone(),
            MatchTolerance::default(),
            ReservationMetrics::new().unwrap(),
        );

        let err = engine
            .reserve(request(user_id, movie_id, "7:30 PM", &["A1", "A2"]))
            .await
            .unwrap_err();
        assert!(matches!(err, ReservationError::Storage(_)));

        // No leaked holds.
        assert!(engine
            .booked_seats(movie_id, "7:30 PM")
            .await
            .unwrap()
            .is_empty());
        assert_eq!(engine.metrics().rollbacks.get(), 1);
        assert_eq!(engine.metrics().integrity_alarms.get(), 0);
    }

    #[tokio::test]
    async fn test_failed_rollback_raises_integrity_alarm() {
        let (store, movie_id, user_id) = seeded().await;
        let engine = ReservationEngine::new(
            Arc::new(StuckRelease(store.clone())),
            Arc::new(FailingBookings),
            store.clone(),
            MatchTolerance::default(),
            ReservationMetrics::new().unwrap(),
        );

        let err = engine
            .reserve(request(user_id, movie_id, "7:30 PM", &["A1"]))
            .await
            .unwrap_err();
        assert!(matches!(err, ReservationError::Storage(_)));

        assert_eq!(engine.metrics().integrity_alarms.get(), 1);
        // The seat is stuck claimed with no booking: exactly the condition
        // the alarm exists for.
        assert_eq!(
            engine.booked_seats(movie_id, "7:30 PM").await.unwrap(),
            vec![seat("A1")]
        );
    }

    #[tokio::test]
    async fn test_user_bookings_lists_audit_trail() {
        let (store, movie_id, user_id) = seeded().await;
        let engine = engine(&store);

        engine
            .reserve(request(user_id, movie_id, "7:30 PM", &["A1"]))
            .await
            .unwrap();
        engine
            .reserve(request(user_id, movie_id, "7:30 PM", &["A2"]))
            .await
            .unwrap();

        let bookings = engine.user_bookings(user_id).await.unwrap();
        assert_eq!(bookings.len(), 2);
    }
}
