use std::sync::Arc;

use livery_core::repository::{
    LocationRepository, RosterRepository, TripEventRepository, TripRepository, UserRepository,
    VehicleRepository,
};
use livery_store::{EventProducer, RedisClient};
use livery_sync::SyncEngine;

use crate::metrics::ApiMetrics;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub expiration: u64,
}

#[derive(Clone)]
pub struct RateLimits {
    pub requests: i64,
    pub window_seconds: i64,
}

/// How long a driver's active-trip hint stays cached in Redis. Long
/// enough for any real trip; completing or cancelling clears it early.
pub const ACTIVE_TRIP_TTL_SECONDS: u64 = 12 * 60 * 60;

#[derive(Clone)]
pub struct AppState {
    pub trips: Arc<dyn TripRepository>,
    pub trip_events: Arc<dyn TripEventRepository>,
    pub users: Arc<dyn UserRepository>,
    pub vehicles: Arc<dyn VehicleRepository>,
    pub roster: Arc<dyn RosterRepository>,
    pub locations: Arc<dyn LocationRepository>,
    pub sync: Arc<SyncEngine>,
    pub redis: Arc<RedisClient>,
    pub kafka: Arc<EventProducer>,
    pub metrics: Arc<ApiMetrics>,
    pub auth: AuthConfig,
    pub limits: RateLimits,
    /// Map rows older than this many minutes are flagged stale.
    pub location_stale_minutes: i64,
}
