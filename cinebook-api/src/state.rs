use std::sync::Arc;

use tokio::sync::broadcast;

use cinebook_core::events::{EventSink, SeatsClaimedEvent};
use cinebook_reserve::ReservationEngine;
use cinebook_store::app_config::BookingRules;
use cinebook_store::RedisClient;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ReservationEngine>,
    pub events: Arc<dyn EventSink>,
    pub sse_tx: broadcast::Sender<SeatsClaimedEvent>,
    /// Absent in tests; the rate-limit middleware is skipped without it.
    pub redis: Option<Arc<RedisClient>>,
    pub rules: BookingRules,
}
