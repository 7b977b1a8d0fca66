pub mod app_config;
pub mod booking_repo;
pub mod database;
pub mod events;
pub mod memory;
pub mod movie_repo;
pub mod redis_repo;
pub mod user_repo;

pub use booking_repo::PgBookingRepository;
pub use database::DbClient;
pub use events::EventProducer;
pub use memory::MemoryCinema;
pub use movie_repo::PgMovieRepository;
pub use redis_repo::RedisClient;
pub use user_repo::PgUserRepository;
