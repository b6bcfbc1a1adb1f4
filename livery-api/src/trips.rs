use axum::{
    extract::{Path, State},
    http::StatusCode,
    middleware,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::Utc;
use livery_fleet::User;
use livery_shared::models::events::{
    DriverPayoutEvent, TripEventRecordedEvent, TripStatusChangedEvent,
};
use livery_store::events::{DRIVER_PAYOUT_TOPIC, TRIP_EVENTS_TOPIC, TRIP_STATUS_TOPIC};
use livery_trip::{earnings, views, Trip, TripAction, TripDraft, TripEvent};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::auth::{
    auth_middleware, boss_auth_middleware, driver_auth_middleware, Claims,
};
use crate::state::{AppState, ACTIVE_TRIP_TTL_SECONDS};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateTripRequest {
    /// Known rider, or leave unset and supply a phone number.
    pub rider_id: Option<Uuid>,
    pub rider_name: Option<String>,
    pub rider_email: Option<String>,
    pub rider_phone: Option<String>,
    #[serde(flatten)]
    pub draft: TripDraft,
}

#[derive(Debug, Deserialize)]
pub struct AssignDriverRequest {
    pub driver_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct TripDetailResponse {
    pub trip: Trip,
    pub events: Vec<TripEvent>,
    pub duration: String,
}

// ============================================================================
// Routes
// ============================================================================

pub fn routes(state: AppState) -> Router<AppState> {
    let boss = Router::new()
        .route("/{id}/confirm", post(confirm_trip))
        .route("/{id}/assign-driver", post(assign_driver))
        .route("/{id}/cancel", post(cancel_trip))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            boss_auth_middleware,
        ));

    let driver = Router::new()
        .route("/{id}/start", post(start_trip))
        .route("/{id}/pickup", post(record_pickup))
        .route("/{id}/complete", post(complete_trip))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            driver_auth_middleware,
        ));

    let shared = Router::new()
        .route("/", get(list_trips).post(create_trip))
        .route("/{id}", get(get_trip))
        .route("/views/pending", get(pending_view))
        .route("/views/next", get(next_view))
        .route("/views/current", get(current_view))
        .route("/views/past", get(past_view))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new().merge(boss).merge(driver).merge(shared)
}

// ============================================================================
// Booking & Reads
// ============================================================================

/// POST /v1/trips
/// Book a trip. Unknown rider phones get a Normal Rider account created
/// inline.
async fn create_trip(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateTripRequest>,
) -> Result<(StatusCode, Json<Trip>), AppError> {
    // 1. Validate the booking payload
    req.draft
        .validate()
        .map_err(|e| AppError::ValidationError(e.to_string()))?;

    // 2. Resolve the rider
    let rider_id = resolve_rider(&state, &req).await?;

    // 3. Persist the Pending trip
    let trip = req.draft.into_trip(rider_id);
    state
        .trips
        .create_trip(&trip)
        .await
        .map_err(AppError::from_repo)?;

    state.metrics.trips_created_total.inc();
    info!(trip_id = %trip.id, booked_by = %claims.sub, "Trip booked");

    Ok((StatusCode::CREATED, Json(trip)))
}

async fn resolve_rider(state: &AppState, req: &CreateTripRequest) -> Result<Uuid, AppError> {
    if let Some(rider_id) = req.rider_id {
        let rider = state
            .users
            .get_user(rider_id)
            .await
            .map_err(AppError::from_repo)?
            .ok_or_else(|| AppError::NotFoundError(format!("Rider {} not found", rider_id)))?;
        return Ok(rider.id);
    }

    let Some(phone) = req.rider_phone.as_deref().filter(|p| !p.trim().is_empty()) else {
        return Err(AppError::ValidationError(
            "Rider id or phone is required".to_string(),
        ));
    };

    if let Some(existing) = state
        .users
        .find_by_phone(phone)
        .await
        .map_err(AppError::from_repo)?
    {
        return Ok(existing.id);
    }

    // Unknown phone: create the rider inline
    let name = req
        .rider_name
        .clone()
        .unwrap_or_else(|| "Guest Rider".to_string());
    let email = req.rider_email.clone().unwrap_or_default();
    let rider = User::new_rider(name, email, phone.to_string());
    state
        .users
        .create_user(&rider)
        .await
        .map_err(AppError::from_repo)?;
    info!(rider_id = %rider.id, phone = %rider.phone.hint(), "Created rider while booking");
    Ok(rider.id)
}

/// GET /v1/trips
async fn list_trips(State(state): State<AppState>) -> Result<Json<Vec<Trip>>, AppError> {
    let trips = state.trips.list_trips().await.map_err(AppError::from_repo)?;
    Ok(Json(trips))
}

/// GET /v1/trips/{id}
/// Trip detail with its event log and the derived billable duration
async fn get_trip(
    State(state): State<AppState>,
    Path(trip_id): Path<Uuid>,
) -> Result<Json<TripDetailResponse>, AppError> {
    let trip = state
        .trips
        .get_trip(trip_id)
        .await
        .map_err(AppError::from_repo)?
        .ok_or_else(|| AppError::NotFoundError(format!("Trip {} not found", trip_id)))?;
    let events = state
        .trip_events
        .list_events_for_trip(trip_id)
        .await
        .map_err(AppError::from_repo)?;
    let duration = earnings::format_duration(earnings::trip_duration_hours(trip_id, &events));

    Ok(Json(TripDetailResponse {
        trip,
        events,
        duration,
    }))
}

// ============================================================================
// Dispatcher Transitions
// ============================================================================

/// POST /v1/trips/{id}/confirm
async fn confirm_trip(
    State(state): State<AppState>,
    Path(trip_id): Path<Uuid>,
) -> Result<Json<Trip>, AppError> {
    apply(&state, trip_id, TripAction::Confirm, "confirm").await
}

/// POST /v1/trips/{id}/assign-driver
async fn assign_driver(
    State(state): State<AppState>,
    Path(trip_id): Path<Uuid>,
    Json(req): Json<AssignDriverRequest>,
) -> Result<Json<Trip>, AppError> {
    // Assignment must point at an actual Driver account
    let driver = state
        .users
        .get_user(req.driver_id)
        .await
        .map_err(AppError::from_repo)?
        .ok_or_else(|| AppError::NotFoundError(format!("Driver {} not found", req.driver_id)))?;
    if !driver.is_driver() {
        return Err(AppError::ValidationError(format!(
            "User {} is not a driver",
            driver.id
        )));
    }

    apply(
        &state,
        trip_id,
        TripAction::AssignDriver(req.driver_id),
        "assign_driver",
    )
    .await
}

/// POST /v1/trips/{id}/cancel
async fn cancel_trip(
    State(state): State<AppState>,
    Path(trip_id): Path<Uuid>,
) -> Result<Json<Trip>, AppError> {
    apply(&state, trip_id, TripAction::Cancel, "cancel").await
}

// ============================================================================
// Driver Transitions
// ============================================================================

/// POST /v1/trips/{id}/start
async fn start_trip(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(trip_id): Path<Uuid>,
) -> Result<Json<Trip>, AppError> {
    let driver_id = claims.user_id()?;
    apply(&state, trip_id, TripAction::Start { driver_id }, "start").await
}

/// POST /v1/trips/{id}/pickup
async fn record_pickup(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(trip_id): Path<Uuid>,
) -> Result<Json<Trip>, AppError> {
    let driver_id = claims.user_id()?;
    apply(
        &state,
        trip_id,
        TripAction::RecordPickup { driver_id },
        "pickup",
    )
    .await
}

/// POST /v1/trips/{id}/complete
async fn complete_trip(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(trip_id): Path<Uuid>,
) -> Result<Json<Trip>, AppError> {
    let driver_id = claims.user_id()?;
    apply(&state, trip_id, TripAction::Complete { driver_id }, "complete").await
}

/// Shared transition path: legality is checked against the freshly loaded
/// row inside the repository and the status update + event append commit
/// together or not at all.
async fn apply(
    state: &AppState,
    trip_id: Uuid,
    action: TripAction,
    label: &'static str,
) -> Result<Json<Trip>, AppError> {
    // 1. Load for the telemetry baseline; unknown trips 404 here
    let before = state
        .trips
        .get_trip(trip_id)
        .await
        .map_err(AppError::from_repo)?
        .ok_or_else(|| AppError::NotFoundError(format!("Trip {} not found", trip_id)))?;

    // 2. Check and persist atomically
    let (trip, event) = state
        .trips
        .apply_transition(trip_id, &action)
        .await
        .map_err(AppError::from_repo)?;

    state
        .metrics
        .trip_transitions_total
        .with_label_values(&[label])
        .inc();
    info!(trip_id = %trip.id, action = label, status = %trip.status, "Trip transition applied");

    // 3. Fire-and-forget downstream events
    publish_transition(state, &before, &trip, event.as_ref());
    if let TripAction::Complete { driver_id } = action {
        publish_payout(state, trip.id, driver_id);
    }

    // 4. Keep the active-trip cache in step with the lifecycle
    maintain_active_trip(state, &trip, &action).await;

    Ok(Json(trip))
}

fn publish_transition(state: &AppState, before: &Trip, after: &Trip, event: Option<&TripEvent>) {
    if before.status != after.status {
        let payload = TripStatusChangedEvent {
            trip_id: after.id,
            from_status: before.status.as_str().to_string(),
            to_status: after.status.as_str().to_string(),
            actor_id: event.and_then(|e| e.driver_id),
            timestamp: Utc::now().timestamp(),
        };
        let kafka = state.kafka.clone();
        tokio::spawn(async move {
            let _ = kafka
                .publish_event(TRIP_STATUS_TOPIC, &payload.trip_id.to_string(), &payload)
                .await;
        });
    }

    if let Some(event) = event {
        let payload = TripEventRecordedEvent {
            event_id: event.id,
            trip_id: event.trip_id,
            event_type: event.event_type.as_str().to_string(),
            driver_id: event.driver_id,
            timestamp: event.timestamp.timestamp(),
        };
        let kafka = state.kafka.clone();
        tokio::spawn(async move {
            let _ = kafka
                .publish_event(TRIP_EVENTS_TOPIC, &payload.trip_id.to_string(), &payload)
                .await;
        });
    }
}

/// Completed trips settle the driver payout downstream. Computed off the
/// authoritative event log, not the snapshot, which may not have caught
/// up yet.
fn publish_payout(state: &AppState, trip_id: Uuid, driver_id: Uuid) {
    let events_repo = state.trip_events.clone();
    let users = state.users.clone();
    let kafka = state.kafka.clone();
    tokio::spawn(async move {
        let events = match events_repo.list_events_for_trip(trip_id).await {
            Ok(events) => events,
            Err(e) => {
                warn!("Payout event skipped, event log unavailable: {}", e);
                return;
            }
        };
        let rate = match users.get_user(driver_id).await {
            Ok(Some(user)) => user.rate(),
            _ => 0.0,
        };
        let duration_hours = earnings::trip_duration_hours(trip_id, &events);
        let payload = DriverPayoutEvent {
            trip_id,
            driver_id,
            duration_hours,
            payout: duration_hours * rate,
            timestamp: Utc::now().timestamp(),
        };
        let _ = kafka
            .publish_event(DRIVER_PAYOUT_TOPIC, &driver_id.to_string(), &payload)
            .await;
    });
}

async fn maintain_active_trip(state: &AppState, trip: &Trip, action: &TripAction) {
    match action {
        TripAction::Start { driver_id } => {
            if let Err(e) = state
                .redis
                .set_active_trip(*driver_id, trip.id, ACTIVE_TRIP_TTL_SECONDS)
                .await
            {
                warn!("Active trip cache write failed: {}", e);
            }
        }
        TripAction::Complete { driver_id } => {
            if let Err(e) = state.redis.clear_active_trip(*driver_id).await {
                warn!("Active trip cache clear failed: {}", e);
            }
        }
        TripAction::Cancel => {
            if let Some(driver_id) = trip.driver_id {
                if let Err(e) = state.redis.clear_active_trip(driver_id).await {
                    warn!("Active trip cache clear failed: {}", e);
                }
            }
        }
        _ => {}
    }
}

// ============================================================================
// Trip Views
// ============================================================================

/// GET /v1/trips/views/pending
/// Dispatcher inbox: future trips still waiting on a decision or a driver
async fn pending_view(State(state): State<AppState>) -> Result<Json<Vec<Trip>>, AppError> {
    let snap = state.sync.snapshot().await;
    Ok(Json(views::pending_for_dispatch(&snap.trips, Utc::now())))
}

/// GET /v1/trips/views/next
async fn next_view(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<Trip>>, AppError> {
    let driver_id = claims.user_id()?;
    let snap = state.sync.snapshot().await;
    Ok(Json(views::next_for_driver(
        &snap.trips,
        driver_id,
        Utc::now(),
    )))
}

/// GET /v1/trips/views/current
async fn current_view(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<Trip>>, AppError> {
    let driver_id = claims.user_id()?;
    let snap = state.sync.snapshot().await;
    Ok(Json(views::current_for_driver(&snap.trips, driver_id)))
}

/// GET /v1/trips/views/past
async fn past_view(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<Trip>>, AppError> {
    let driver_id = claims.user_id()?;
    let snap = state.sync.snapshot().await;
    Ok(Json(views::past_for_driver(&snap.trips, driver_id)))
}
