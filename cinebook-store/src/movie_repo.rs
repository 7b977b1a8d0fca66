use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use cinebook_core::movie::{Movie, Showtime};
use cinebook_core::repository::{ClaimOutcome, MovieRepository, RepoError};
use cinebook_core::seat::SeatId;

pub struct PgMovieRepository {
    pool: PgPool,
}

impl PgMovieRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct MovieRow {
    id: Uuid,
    title: String,
    genre: String,
    rating: f64,
    duration_minutes: i32,
    image_url: Option<String>,
    description: Option<String>,
    release_date: Option<chrono::DateTime<chrono::Utc>>,
    created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(sqlx::FromRow)]
struct ShowtimeRow {
    label: String,
    booked_seats: Vec<String>,
}

fn seats_from_rows(raw: Vec<String>) -> Result<Vec<SeatId>, RepoError> {
    let mut seats = Vec::with_capacity(raw.len());
    for token in raw {
        seats.push(SeatId::parse(&token)?);
    }
    Ok(seats)
}

fn seats_to_text(seats: &[SeatId]) -> Vec<String> {
    seats.iter().map(|s| s.as_str().to_string()).collect()
}

#[async_trait]
impl MovieRepository for PgMovieRepository {
    async fn find_movie(&self, id: Uuid) -> Result<Option<Movie>, RepoError> {
        let row = sqlx::query_as::<_, MovieRow>(
            "SELECT id, title, genre, rating, duration_minutes, image_url, description, release_date, created_at
             FROM movies WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let shows = sqlx::query_as::<_, ShowtimeRow>(
            "SELECT label, booked_seats FROM showtimes WHERE movie_id = $1 ORDER BY id",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let mut showtimes = Vec::with_capacity(shows.len());
        for show in shows {
            showtimes.push(Showtime {
                label: show.label,
                booked_seats: seats_from_rows(show.booked_seats)?,
            });
        }

        Ok(Some(Movie {
            id: row.id,
            title: row.title,
            genre: row.genre,
            rating: row.rating,
            duration_minutes: row.duration_minutes,
            image_url: row.image_url,
            description: row.description,
            release_date: row.release_date,
            showtimes,
            created_at: row.created_at,
        }))
    }

    async fn claim_seats(
        &self,
        movie_id: Uuid,
        showtime_label: &str,
        seats: &[SeatId],
    ) -> Result<ClaimOutcome, RepoError> {
        let requested = seats_to_text(seats);

        // One conditional write: append only when none of the requested
        // seats are already present (`&&` is array overlap). Concurrent
        // claims on the same row serialize on the row lock, so no two
        // overlapping requests can both pass the predicate.
        let result = sqlx::query(
            "UPDATE showtimes
             SET booked_seats = booked_seats || $3
             WHERE movie_id = $1 AND label = $2 AND NOT (booked_seats && $3)",
        )
        .bind(movie_id)
        .bind(showtime_label)
        .bind(&requested)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(ClaimOutcome::Claimed);
        }

        // The write was refused: the showtime row is gone or at least one
        // seat overlaps. Re-read to name the colliding seats.
        let row = sqlx::query_as::<_, ShowtimeRow>(
            "SELECT label, booked_seats FROM showtimes WHERE movie_id = $1 AND label = $2",
        )
        .bind(movie_id)
        .bind(showtime_label)
        .fetch_optional(&self.pool)
        .await?
        .ok_or("showtime row disappeared during seat claim")?;

        let conflicting: Vec<SeatId> = seats
            .iter()
            .filter(|seat| row.booked_seats.iter().any(|b| b == seat.as_str()))
            .cloned()
            .collect();

        Ok(ClaimOutcome::Conflict { conflicting })
    }

    async fn release_seats(
        &self,
        movie_id: Uuid,
        showtime_label: &str,
        seats: &[SeatId],
    ) -> Result<(), RepoError> {
        let released = seats_to_text(seats);

        let result = sqlx::query(
            "UPDATE showtimes
             SET booked_seats = (
                 SELECT COALESCE(array_agg(seat ORDER BY ord), ARRAY[]::text[])
                 FROM unnest(booked_seats) WITH ORDINALITY AS t(seat, ord)
                 WHERE seat <> ALL($3)
             )
             WHERE movie_id = $1 AND label = $2",
        )
        .bind(movie_id)
        .bind(showtime_label)
        .bind(&released)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err("showtime row missing during seat release".into());
        }

        Ok(())
    }
}
