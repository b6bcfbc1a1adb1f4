use axum::{
    extract::State,
    middleware,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Duration, Utc};
use livery_fleet::LocationUpdate;
use livery_shared::models::events::LocationUpdatedEvent;
use livery_store::events::LOCATION_TOPIC;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::auth::{boss_auth_middleware, driver_auth_middleware, Claims};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct PingRequest {
    pub latitude: f64,
    pub longitude: f64,
}

/// One row of the dispatcher map feed.
#[derive(Debug, Serialize)]
pub struct DriverLocationRow {
    pub driver_id: Uuid,
    pub driver_name: String,
    pub trip_id: Option<Uuid>,
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: DateTime<Utc>,
    pub stale: bool,
}

pub fn routes(state: AppState) -> Router<AppState> {
    let driver = Router::new()
        .route("/ping", post(report_location))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            driver_auth_middleware,
        ));

    let boss = Router::new()
        .route("/", get(list_locations))
        .route_layer(middleware::from_fn_with_state(state, boss_auth_middleware));

    Router::new().merge(driver).merge(boss)
}

/// POST /v1/locations/ping
/// Driver position report. Replaces the driver's previous row and tags
/// the sample with the active En Route trip, if any.
async fn report_location(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<PingRequest>,
) -> Result<Json<LocationUpdate>, AppError> {
    let driver_id = claims.user_id()?;

    if !(-90.0..=90.0).contains(&req.latitude) || !(-180.0..=180.0).contains(&req.longitude) {
        return Err(AppError::ValidationError(
            "Coordinates out of range".to_string(),
        ));
    }

    // 1. Resolve the active trip: Redis fast path, snapshot fallback
    let trip_id = match state.redis.get_active_trip(driver_id).await {
        Ok(Some(trip_id)) => Some(trip_id),
        _ => state
            .sync
            .snapshot()
            .await
            .active_trip_for_driver(driver_id)
            .map(|t| t.id),
    };

    // 2. Upsert the row
    let location = LocationUpdate::new(driver_id, trip_id, req.latitude, req.longitude);
    state
        .locations
        .upsert_location(&location)
        .await
        .map_err(AppError::from_repo)?;

    state.metrics.location_pings_total.inc();

    // 3. Fire-and-forget downstream event
    let payload = LocationUpdatedEvent {
        driver_id,
        trip_id,
        latitude: location.latitude,
        longitude: location.longitude,
        timestamp: location.timestamp.timestamp(),
    };
    let kafka = state.kafka.clone();
    tokio::spawn(async move {
        let _ = kafka
            .publish_event(LOCATION_TOPIC, &payload.driver_id.to_string(), &payload)
            .await;
    });

    Ok(Json(location))
}

/// GET /v1/locations
/// Live map feed: one row per driver, newest first, flagged when the
/// last report is older than the staleness cutoff.
async fn list_locations(
    State(state): State<AppState>,
) -> Result<Json<Vec<DriverLocationRow>>, AppError> {
    let rows = state
        .locations
        .list_locations()
        .await
        .map_err(AppError::from_repo)?;

    let snap = state.sync.snapshot().await;
    let now = Utc::now();
    let cutoff = Duration::minutes(state.location_stale_minutes);

    let feed = rows
        .into_iter()
        .map(|loc| DriverLocationRow {
            driver_id: loc.driver_id,
            driver_name: snap
                .users_by_id
                .get(&loc.driver_id)
                .map(|u| u.name.clone())
                .unwrap_or_else(|| "Unknown Driver".to_string()),
            trip_id: loc.trip_id,
            latitude: loc.latitude,
            longitude: loc.longitude,
            stale: loc.is_stale(now, cutoff),
            timestamp: loc.timestamp,
        })
        .collect();

    Ok(Json(feed))
}
