pub mod booking;
pub mod events;
pub mod movie;
pub mod repository;
pub mod schedule;
pub mod seat;
pub mod user;

pub use booking::{Booking, BookingStatus};
pub use movie::{Movie, Showtime};
pub use seat::SeatId;
pub use user::User;
