pub mod engine;
pub mod metrics;
pub mod models;

pub use engine::ReservationEngine;
pub use metrics::ReservationMetrics;
pub use models::{ReservationError, ReservationRequest, Reserved};
