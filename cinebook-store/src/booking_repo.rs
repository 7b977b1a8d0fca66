use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use cinebook_core::booking::{Booking, BookingStatus};
use cinebook_core::repository::{BookingRepository, RepoError};
use cinebook_core::seat::SeatId;

pub struct PgBookingRepository {
    pool: PgPool,
}

impl PgBookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    user_id: Uuid,
    movie_id: Uuid,
    showtime: String,
    seats: Vec<String>,
    total_amount: f64,
    status: String,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl BookingRow {
    fn into_booking(self) -> Result<Booking, RepoError> {
        let mut seats = Vec::with_capacity(self.seats.len());
        for token in self.seats {
            seats.push(SeatId::parse(&token)?);
        }
        let status = BookingStatus::parse(&self.status)
            .ok_or_else(|| format!("unknown booking status: {}", self.status))?;

        Ok(Booking {
            id: self.id,
            user_id: self.user_id,
            movie_id: self.movie_id,
            showtime: self.showtime,
            seats,
            total_amount: self.total_amount,
            status,
            created_at: self.created_at,
        })
    }
}

#[async_trait]
impl BookingRepository for PgBookingRepository {
    async fn create_booking(&self, booking: &Booking) -> Result<(), RepoError> {
        let seats: Vec<String> = booking.seats.iter().map(|s| s.as_str().to_string()).collect();

        let result = sqlx::query(
            "INSERT INTO bookings (id, user_id, movie_id, showtime, seats, total_amount, status, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(booking.id)
        .bind(booking.user_id)
        .bind(booking.movie_id)
        .bind(&booking.showtime)
        .bind(&seats)
        .bind(booking.total_amount)
        .bind(booking.status.as_str())
        .bind(booking.created_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() < 1 {
            return Err("no booking record was created".into());
        }

        Ok(())
    }

    async fn find_booking(&self, id: Uuid) -> Result<Option<Booking>, RepoError> {
        let row = sqlx::query_as::<_, BookingRow>(
            "SELECT id, user_id, movie_id, showtime, seats, total_amount, status, created_at
             FROM bookings WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(BookingRow::into_booking).transpose()
    }

    async fn list_bookings(&self, user_id: Uuid) -> Result<Vec<Booking>, RepoError> {
        let rows = sqlx::query_as::<_, BookingRow>(
            "SELECT id, user_id, movie_id, showtime, seats, total_amount, status, created_at
             FROM bookings WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(BookingRow::into_booking).collect()
    }
}
