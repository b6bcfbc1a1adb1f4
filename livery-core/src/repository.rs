use async_trait::async_trait;
use livery_fleet::{DriverUpdate, LocationUpdate, RosterEntry, User, Vehicle};
use livery_trip::{Trip, TripAction, TripEvent};
use uuid::Uuid;

/// Repository trait for trip data access. `apply_transition` is the only
/// write path for status changes: it checks legality against the freshly
/// loaded row and persists the status update together with the appended
/// event atomically.
#[async_trait]
pub trait TripRepository: Send + Sync {
    async fn create_trip(
        &self,
        trip: &Trip,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    async fn get_trip(
        &self,
        id: Uuid,
    ) -> Result<Option<Trip>, Box<dyn std::error::Error + Send + Sync>>;

    async fn list_trips(
        &self,
    ) -> Result<Vec<Trip>, Box<dyn std::error::Error + Send + Sync>>;

    async fn apply_transition(
        &self,
        trip_id: Uuid,
        action: &TripAction,
    ) -> Result<(Trip, Option<TripEvent>), Box<dyn std::error::Error + Send + Sync>>;
}

/// Repository trait for the append-only trip event log. Reads only:
/// writes happen inside [`TripRepository::apply_transition`].
#[async_trait]
pub trait TripEventRepository: Send + Sync {
    async fn list_events(
        &self,
    ) -> Result<Vec<TripEvent>, Box<dyn std::error::Error + Send + Sync>>;

    async fn list_events_for_trip(
        &self,
        trip_id: Uuid,
    ) -> Result<Vec<TripEvent>, Box<dyn std::error::Error + Send + Sync>>;
}

/// Repository trait for user accounts
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create_user(
        &self,
        user: &User,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    async fn get_user(
        &self,
        id: Uuid,
    ) -> Result<Option<User>, Box<dyn std::error::Error + Send + Sync>>;

    async fn find_by_email(
        &self,
        email: &str,
    ) -> Result<Option<User>, Box<dyn std::error::Error + Send + Sync>>;

    async fn find_by_phone(
        &self,
        phone: &str,
    ) -> Result<Option<User>, Box<dyn std::error::Error + Send + Sync>>;

    async fn list_users(
        &self,
    ) -> Result<Vec<User>, Box<dyn std::error::Error + Send + Sync>>;

    async fn update_user(
        &self,
        id: Uuid,
        update: &DriverUpdate,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Repository trait for the vehicle catalog
#[async_trait]
pub trait VehicleRepository: Send + Sync {
    async fn create_vehicle(
        &self,
        vehicle: &Vehicle,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    async fn get_vehicle(
        &self,
        id: Uuid,
    ) -> Result<Option<Vehicle>, Box<dyn std::error::Error + Send + Sync>>;

    async fn list_vehicles(
        &self,
    ) -> Result<Vec<Vehicle>, Box<dyn std::error::Error + Send + Sync>>;

    async fn update_vehicle(
        &self,
        id: Uuid,
        vehicle: &Vehicle,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    async fn delete_vehicle(
        &self,
        id: Uuid,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Repository trait for boss → driver roster links
#[async_trait]
pub trait RosterRepository: Send + Sync {
    async fn add_entry(
        &self,
        entry: &RosterEntry,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    async fn list_for_boss(
        &self,
        boss_user_id: Uuid,
    ) -> Result<Vec<RosterEntry>, Box<dyn std::error::Error + Send + Sync>>;

    async fn entry_for_driver(
        &self,
        boss_user_id: Uuid,
        driver_user_id: Uuid,
    ) -> Result<Option<RosterEntry>, Box<dyn std::error::Error + Send + Sync>>;

    async fn remove_entry(
        &self,
        id: Uuid,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Repository trait for live driver positions. One row per driver,
/// replaced on every report.
#[async_trait]
pub trait LocationRepository: Send + Sync {
    async fn upsert_location(
        &self,
        location: &LocationUpdate,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    async fn list_locations(
        &self,
    ) -> Result<Vec<LocationUpdate>, Box<dyn std::error::Error + Send + Sync>>;
}
