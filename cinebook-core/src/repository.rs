use async_trait::async_trait;
use uuid::Uuid;

use crate::booking::Booking;
use crate::movie::Movie;
use crate::seat::SeatId;
use crate::user::User;

pub type RepoError = Box<dyn std::error::Error + Send + Sync>;

/// Outcome of an atomic seat claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimOutcome {
    /// All requested seats were appended to the showtime.
    Claimed,
    /// Nothing was written; these requested seats were already booked.
    Conflict { conflicting: Vec<SeatId> },
}

/// Repository trait for movie and seat-map access.
///
/// `claim_seats` is the only write path for a showtime's booked-seat set.
/// Implementations must make the check that none of the requested seats
/// are present and the append one indivisible operation with respect to
/// concurrent claims on the same showtime; no check-then-act window is
/// allowed through this interface.
#[async_trait]
pub trait MovieRepository: Send + Sync {
    async fn find_movie(&self, id: Uuid) -> Result<Option<Movie>, RepoError>;

    async fn claim_seats(
        &self,
        movie_id: Uuid,
        showtime_label: &str,
        seats: &[SeatId],
    ) -> Result<ClaimOutcome, RepoError>;

    /// Compensating rollback: remove exactly `seats` from the showtime's
    /// booked set. Other bookings' seats must be untouched.
    async fn release_seats(
        &self,
        movie_id: Uuid,
        showtime_label: &str,
        seats: &[SeatId],
    ) -> Result<(), RepoError>;
}

/// Repository trait for the booking audit trail.
#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn create_booking(&self, booking: &Booking) -> Result<(), RepoError>;

    async fn find_booking(&self, id: Uuid) -> Result<Option<Booking>, RepoError>;

    async fn list_bookings(&self, user_id: Uuid) -> Result<Vec<Booking>, RepoError>;
}

/// Repository trait for user lookup and guest creation.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, RepoError>;

    async fn create_user(&self, user: &User) -> Result<(), RepoError>;
}
