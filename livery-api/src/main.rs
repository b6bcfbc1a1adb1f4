use std::net::SocketAddr;
use std::sync::Arc;

use livery_api::state::{AuthConfig, RateLimits};
use livery_api::{app, worker, AppState};
use livery_core::repository::{
    LocationRepository, RosterRepository, TripEventRepository, TripRepository, UserRepository,
    VehicleRepository,
};
use livery_store::location_repo::PgLocationRepository;
use livery_store::trip_repo::{PgTripEventRepository, PgTripRepository};
use livery_store::user_repo::{PgRosterRepository, PgUserRepository};
use livery_store::vehicle_repo::PgVehicleRepository;
use livery_store::{DbClient, EventProducer, RedisClient};
use livery_sync::SyncEngine;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "livery_api=debug,livery_sync=debug,livery_store=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = livery_store::app_config::Config::load().expect("Failed to load config");
    tracing::info!("Starting Livery API on port {}", config.server.port);

    // Postgres
    let db = DbClient::new(&config.database.url)
        .await
        .expect("Failed to connect to Postgres");
    db.migrate().await.expect("Failed to run migrations");

    // Redis Connection
    let redis = Arc::new(
        RedisClient::new(&config.redis.url)
            .await
            .expect("Failed to connect to Redis"),
    );

    // Kafka Connection
    let kafka = Arc::new(
        EventProducer::new(&config.kafka.brokers).expect("Failed to create Kafka producer"),
    );

    // Repositories
    let trips: Arc<dyn TripRepository> = Arc::new(PgTripRepository::new(db.pool.clone()));
    let trip_events: Arc<dyn TripEventRepository> =
        Arc::new(PgTripEventRepository::new(db.pool.clone()));
    let users: Arc<dyn UserRepository> = Arc::new(PgUserRepository::new(db.pool.clone()));
    let vehicles: Arc<dyn VehicleRepository> = Arc::new(PgVehicleRepository::new(db.pool.clone()));
    let roster: Arc<dyn RosterRepository> = Arc::new(PgRosterRepository::new(db.pool.clone()));
    let locations: Arc<dyn LocationRepository> =
        Arc::new(PgLocationRepository::new(db.pool.clone()));

    // Sync engine + change-feed pump
    let sync = Arc::new(SyncEngine::new(
        trips.clone(),
        trip_events.clone(),
        users.clone(),
        vehicles.clone(),
        locations.clone(),
    ));
    tokio::spawn(worker::start_sync_worker(
        sync.clone(),
        db.clone(),
        config.tracking.poll_seconds,
    ));

    let metrics = Arc::new(livery_api::metrics::ApiMetrics::new().expect("Failed to build metrics"));

    let app_state = AppState {
        trips,
        trip_events,
        users,
        vehicles,
        roster,
        locations,
        sync,
        redis,
        kafka,
        metrics,
        auth: AuthConfig {
            secret: config.auth.jwt_secret.clone(),
            expiration: config.auth.jwt_expiration_seconds,
        },
        limits: RateLimits {
            requests: config.limits.rate_limit_requests,
            window_seconds: config.limits.rate_limit_window_seconds,
        },
        location_stale_minutes: config.tracking.location_stale_minutes,
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Server error");
}
