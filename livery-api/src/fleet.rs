use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    routing::{get, put},
    Extension, Json, Router,
};
use livery_fleet::{DriverProfile, DriverUpdate, NewDriver, RosterEntry, User, Vehicle};
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::auth::{boss_auth_middleware, Claims};
use crate::state::AppState;

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct VehicleDraft {
    pub name: String,
    #[serde(rename = "type")]
    pub vehicle_type: String,
    pub capacity: i32,
    pub price_per_mile: f64,
    #[serde(default)]
    pub amenities: Vec<String>,
    pub image_url: Option<String>,
}

impl VehicleDraft {
    fn into_vehicle(self) -> Vehicle {
        Vehicle::new(
            self.name,
            self.vehicle_type,
            self.capacity,
            self.price_per_mile,
            self.amenities,
            self.image_url,
        )
    }
}

#[derive(Debug, Deserialize)]
pub struct RiderSearchQuery {
    pub phone: String,
}

// ============================================================================
// Routes
// ============================================================================

/// Everything under /v1/fleet is dispatcher-only.
pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/vehicles", get(list_vehicles).post(create_vehicle))
        .route(
            "/vehicles/{id}",
            put(update_vehicle).delete(delete_vehicle),
        )
        .route("/drivers", get(list_drivers).post(add_driver))
        .route("/drivers/{id}", put(update_driver).delete(remove_driver))
        .route_layer(middleware::from_fn_with_state(state, boss_auth_middleware))
}

pub fn rider_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/search", get(search_rider))
        .route_layer(middleware::from_fn_with_state(state, boss_auth_middleware))
}

// ============================================================================
// Vehicle Catalog
// ============================================================================

/// GET /v1/fleet/vehicles
async fn list_vehicles(State(state): State<AppState>) -> Result<Json<Vec<Vehicle>>, AppError> {
    let vehicles = state
        .vehicles
        .list_vehicles()
        .await
        .map_err(AppError::from_repo)?;
    Ok(Json(vehicles))
}

/// POST /v1/fleet/vehicles
async fn create_vehicle(
    State(state): State<AppState>,
    Json(draft): Json<VehicleDraft>,
) -> Result<(StatusCode, Json<Vehicle>), AppError> {
    let vehicle = draft.into_vehicle();
    vehicle
        .validate()
        .map_err(|e| AppError::ValidationError(e.to_string()))?;

    state
        .vehicles
        .create_vehicle(&vehicle)
        .await
        .map_err(AppError::from_repo)?;
    info!(vehicle_id = %vehicle.id, name = %vehicle.name, "Vehicle added");

    Ok((StatusCode::CREATED, Json(vehicle)))
}

/// PUT /v1/fleet/vehicles/{id}
async fn update_vehicle(
    State(state): State<AppState>,
    Path(vehicle_id): Path<Uuid>,
    Json(draft): Json<VehicleDraft>,
) -> Result<Json<Vehicle>, AppError> {
    state
        .vehicles
        .get_vehicle(vehicle_id)
        .await
        .map_err(AppError::from_repo)?
        .ok_or_else(|| AppError::NotFoundError(format!("Vehicle {} not found", vehicle_id)))?;

    let mut vehicle = draft.into_vehicle();
    vehicle.id = vehicle_id;
    vehicle
        .validate()
        .map_err(|e| AppError::ValidationError(e.to_string()))?;

    state
        .vehicles
        .update_vehicle(vehicle_id, &vehicle)
        .await
        .map_err(AppError::from_repo)?;

    Ok(Json(vehicle))
}

/// DELETE /v1/fleet/vehicles/{id}
async fn delete_vehicle(
    State(state): State<AppState>,
    Path(vehicle_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state
        .vehicles
        .get_vehicle(vehicle_id)
        .await
        .map_err(AppError::from_repo)?
        .ok_or_else(|| AppError::NotFoundError(format!("Vehicle {} not found", vehicle_id)))?;

    state
        .vehicles
        .delete_vehicle(vehicle_id)
        .await
        .map_err(AppError::from_repo)?;

    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Driver Roster
// ============================================================================

/// GET /v1/fleet/drivers
/// The boss's roster joined with each driver's user record
async fn list_drivers(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<DriverProfile>>, AppError> {
    let boss_id = claims.user_id()?;
    let entries = state
        .roster
        .list_for_boss(boss_id)
        .await
        .map_err(AppError::from_repo)?;

    let mut profiles = Vec::with_capacity(entries.len());
    for entry in entries {
        match state
            .users
            .get_user(entry.driver_user_id)
            .await
            .map_err(AppError::from_repo)?
        {
            Some(user) => profiles.push(DriverProfile {
                roster_id: entry.id,
                user,
            }),
            None => {
                warn!(driver_user_id = %entry.driver_user_id, "Roster entry without user row");
            }
        }
    }

    Ok(Json(profiles))
}

/// POST /v1/fleet/drivers
/// Creates the Driver account and links it to the boss's roster
async fn add_driver(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<NewDriver>,
) -> Result<(StatusCode, Json<DriverProfile>), AppError> {
    let boss_id = claims.user_id()?;

    // 1. Validate the payload
    req.validate()
        .map_err(|e| AppError::ValidationError(e.to_string()))?;

    // 2. Reject duplicate accounts up front
    if state
        .users
        .find_by_email(req.email.trim())
        .await
        .map_err(AppError::from_repo)?
        .is_some()
    {
        return Err(AppError::ValidationError(
            "Email already in use".to_string(),
        ));
    }

    // 3. Create the user and the roster link
    let user = req.into_user();
    state
        .users
        .create_user(&user)
        .await
        .map_err(AppError::from_repo)?;

    let entry = RosterEntry::new(user.id, boss_id);
    state
        .roster
        .add_entry(&entry)
        .await
        .map_err(AppError::from_repo)?;

    info!(driver_id = %user.id, boss_id = %boss_id, "Driver added to roster");

    Ok((
        StatusCode::CREATED,
        Json(DriverProfile {
            roster_id: entry.id,
            user,
        }),
    ))
}

/// PUT /v1/fleet/drivers/{id}
/// {id} is the driver's user id; updates are scoped to the caller's roster
async fn update_driver(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(driver_id): Path<Uuid>,
    Json(update): Json<DriverUpdate>,
) -> Result<Json<User>, AppError> {
    let boss_id = claims.user_id()?;

    state
        .roster
        .entry_for_driver(boss_id, driver_id)
        .await
        .map_err(AppError::from_repo)?
        .ok_or_else(|| AppError::NotFoundError(format!("Driver {} not on roster", driver_id)))?;

    update
        .validate()
        .map_err(|e| AppError::ValidationError(e.to_string()))?;

    state
        .users
        .update_user(driver_id, &update)
        .await
        .map_err(AppError::from_repo)?;

    let user = state
        .users
        .get_user(driver_id)
        .await
        .map_err(AppError::from_repo)?
        .ok_or_else(|| AppError::NotFoundError(format!("Driver {} not found", driver_id)))?;

    Ok(Json(user))
}

/// DELETE /v1/fleet/drivers/{id}
/// Unlinks the driver from the roster; the user record stays
async fn remove_driver(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(driver_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let boss_id = claims.user_id()?;

    let entry = state
        .roster
        .entry_for_driver(boss_id, driver_id)
        .await
        .map_err(AppError::from_repo)?
        .ok_or_else(|| AppError::NotFoundError(format!("Driver {} not on roster", driver_id)))?;

    state
        .roster
        .remove_entry(entry.id)
        .await
        .map_err(AppError::from_repo)?;

    info!(driver_id = %driver_id, boss_id = %boss_id, "Driver removed from roster");

    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Rider Lookup
// ============================================================================

/// GET /v1/riders/search?phone=
/// Booking-screen autofill; a null body means no account with that phone
async fn search_rider(
    State(state): State<AppState>,
    Query(query): Query<RiderSearchQuery>,
) -> Result<Json<Option<User>>, AppError> {
    let user = state
        .users
        .find_by_phone(query.phone.trim())
        .await
        .map_err(AppError::from_repo)?;
    Ok(Json(user))
}
