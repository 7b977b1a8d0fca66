use std::net::SocketAddr;
use std::sync::Arc;

use cinebook_api::{app, AppState};
use cinebook_core::schedule::MatchTolerance;
use cinebook_reserve::{ReservationEngine, ReservationMetrics};
use cinebook_store::{
    DbClient, EventProducer, PgBookingRepository, PgMovieRepository, PgUserRepository, RedisClient,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "cinebook_api=debug,cinebook_reserve=debug,tower_http=debug,axum::rejection=trace"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = cinebook_store::app_config::Config::load().expect("Failed to load config");
    tracing::info!("Starting Cinebook API on port {}", config.server.port);

    let db = DbClient::new(&config.database.url)
        .await
        .expect("Failed to connect to Postgres");
    db.migrate().await.expect("Failed to run migrations");

    let redis = RedisClient::new(&config.redis.url)
        .await
        .expect("Failed to connect to Redis");

    let kafka = EventProducer::new(&config.kafka.brokers).expect("Failed to create Kafka producer");

    let (sse_tx, _) = tokio::sync::broadcast::channel(100);

    let metrics = ReservationMetrics::new().expect("Failed to register metrics");
    let engine = ReservationEngine::new(
        Arc::new(PgMovieRepository::new(db.pool.clone())),
        Arc::new(PgBookingRepository::new(db.pool.clone())),
        Arc::new(PgUserRepository::new(db.pool.clone())),
        MatchTolerance::from_seconds(config.booking_rules.showtime_match_tolerance_seconds),
        metrics,
    );

    let app_state = AppState {
        engine: Arc::new(engine),
        events: Arc::new(kafka),
        sse_tx,
        redis: Some(Arc::new(redis)),
        rules: config.booking_rules.clone(),
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .unwrap();
}
