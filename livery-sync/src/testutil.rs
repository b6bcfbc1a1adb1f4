//! Stub repositories and fixtures shared by the engine, snapshot and
//! reporter tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use livery_core::feed::{ChangeFeed, ChangeNotice};
use livery_core::repository::{
    LocationRepository, TripEventRepository, TripRepository, UserRepository, VehicleRepository,
};
use livery_core::CoreError;
use livery_fleet::{DriverUpdate, LocationUpdate, User, Vehicle};
use livery_trip::{Trip, TripAction, TripDraft, TripEvent, TripEventType, TripStatus};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::Notify;
use uuid::Uuid;

pub fn driver_user(rate: f64) -> User {
    User::new_driver(
        "Sam Ortiz".to_string(),
        "sam@example.com".to_string(),
        "5550002222".to_string(),
        rate,
    )
}

pub fn completed_trip(driver_id: Uuid) -> Trip {
    let draft = TripDraft {
        pickup_address: "123 Airport Terminal".to_string(),
        dropoff_address: "456 Hotel Dr".to_string(),
        stop_address: None,
        pickup_latitude: None,
        pickup_longitude: None,
        dropoff_latitude: None,
        dropoff_longitude: None,
        pickup_time: Utc::now(),
        arrival_time: None,
        passenger_count: 1,
        child_seats: 0,
        luggage_count: 0,
        has_pets: false,
        vehicle_id: None,
        driver_id: Some(driver_id),
        total_price: 100.0,
        driver_notes: None,
        airline: None,
        flight_number: None,
    };
    let mut trip = draft.into_trip(Uuid::new_v4());
    trip.status = TripStatus::Completed;
    trip
}

pub fn event_at(trip_id: Uuid, kind: TripEventType, driver_id: Uuid, ts: &str) -> TripEvent {
    let timestamp: DateTime<Utc> = ts.parse().unwrap();
    TripEvent::at(trip_id, kind, Some(driver_id), timestamp)
}

/// Two-phase latch for forcing a refetch to linger inside the repository.
#[derive(Clone)]
pub struct Gate {
    pub entered: Arc<Notify>,
    pub release: Arc<Notify>,
}

impl Gate {
    pub fn new() -> Self {
        Self {
            entered: Arc::new(Notify::new()),
            release: Arc::new(Notify::new()),
        }
    }
}

#[derive(Default)]
pub struct StubTrips {
    rows: Mutex<Vec<Trip>>,
    fail: AtomicBool,
    gate: Mutex<Option<Gate>>,
}

impl StubTrips {
    pub fn with(rows: Vec<Trip>) -> Self {
        Self {
            rows: Mutex::new(rows),
            ..Default::default()
        }
    }

    /// Next list call returns an error.
    pub fn fail_next(&self) {
        self.fail.store(true, Ordering::SeqCst);
    }

    /// Next list call signals `entered` and waits on `release`.
    pub fn block_next(&self, gate: Gate) {
        *self.gate.lock().unwrap() = Some(gate);
    }
}

#[async_trait]
impl TripRepository for StubTrips {
    async fn create_trip(
        &self,
        trip: &Trip,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.rows.lock().unwrap().push(trip.clone());
        Ok(())
    }

    async fn get_trip(
        &self,
        id: Uuid,
    ) -> Result<Option<Trip>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.rows.lock().unwrap().iter().find(|t| t.id == id).cloned())
    }

    async fn list_trips(&self) -> Result<Vec<Trip>, Box<dyn std::error::Error + Send + Sync>> {
        let gate = self.gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
        if self.fail.swap(false, Ordering::SeqCst) {
            return Err(CoreError::InternalError("stub trip fetch failed".to_string()).into());
        }
        Ok(self.rows.lock().unwrap().clone())
    }

    async fn apply_transition(
        &self,
        _trip_id: Uuid,
        _action: &TripAction,
    ) -> Result<(Trip, Option<TripEvent>), Box<dyn std::error::Error + Send + Sync>> {
        Err(CoreError::InternalError("transitions unsupported in stub".to_string()).into())
    }
}

#[derive(Default)]
pub struct StubEvents {
    rows: Mutex<Vec<TripEvent>>,
}

#[async_trait]
impl TripEventRepository for StubEvents {
    async fn list_events(
        &self,
    ) -> Result<Vec<TripEvent>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.rows.lock().unwrap().clone())
    }

    async fn list_events_for_trip(
        &self,
        trip_id: Uuid,
    ) -> Result<Vec<TripEvent>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.trip_id == trip_id)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct StubUsers {
    rows: Mutex<Vec<User>>,
}

#[async_trait]
impl UserRepository for StubUsers {
    async fn create_user(
        &self,
        user: &User,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.rows.lock().unwrap().push(user.clone());
        Ok(())
    }

    async fn get_user(
        &self,
        id: Uuid,
    ) -> Result<Option<User>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.rows.lock().unwrap().iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_email(
        &self,
        email: &str,
    ) -> Result<Option<User>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.email.inner() == email)
            .cloned())
    }

    async fn find_by_phone(
        &self,
        phone: &str,
    ) -> Result<Option<User>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.phone.inner() == phone)
            .cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.rows.lock().unwrap().clone())
    }

    async fn update_user(
        &self,
        id: Uuid,
        update: &DriverUpdate,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut rows = self.rows.lock().unwrap();
        let user = rows
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| CoreError::NotFound(id.to_string()))?;
        update.apply_to(user);
        Ok(())
    }
}

#[derive(Default)]
pub struct StubVehicles {
    rows: Mutex<Vec<Vehicle>>,
}

#[async_trait]
impl VehicleRepository for StubVehicles {
    async fn create_vehicle(
        &self,
        vehicle: &Vehicle,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.rows.lock().unwrap().push(vehicle.clone());
        Ok(())
    }

    async fn get_vehicle(
        &self,
        id: Uuid,
    ) -> Result<Option<Vehicle>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.rows.lock().unwrap().iter().find(|v| v.id == id).cloned())
    }

    async fn list_vehicles(
        &self,
    ) -> Result<Vec<Vehicle>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.rows.lock().unwrap().clone())
    }

    async fn update_vehicle(
        &self,
        id: Uuid,
        vehicle: &Vehicle,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut rows = self.rows.lock().unwrap();
        let slot = rows
            .iter_mut()
            .find(|v| v.id == id)
            .ok_or_else(|| CoreError::NotFound(id.to_string()))?;
        *slot = vehicle.clone();
        Ok(())
    }

    async fn delete_vehicle(
        &self,
        id: Uuid,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.rows.lock().unwrap().retain(|v| v.id != id);
        Ok(())
    }
}

#[derive(Default)]
pub struct StubLocations {
    rows: Mutex<HashMap<Uuid, LocationUpdate>>,
    upserts: AtomicUsize,
}

impl StubLocations {
    pub fn upsert_count(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }

    pub fn get(&self, driver_id: Uuid) -> Option<LocationUpdate> {
        self.rows.lock().unwrap().get(&driver_id).cloned()
    }
}

#[async_trait]
impl LocationRepository for StubLocations {
    async fn upsert_location(
        &self,
        location: &LocationUpdate,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.upserts.fetch_add(1, Ordering::SeqCst);
        self.rows
            .lock()
            .unwrap()
            .insert(location.driver_id, location.clone());
        Ok(())
    }

    async fn list_locations(
        &self,
    ) -> Result<Vec<LocationUpdate>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.rows.lock().unwrap().values().cloned().collect())
    }
}

/// Feed backed by an mpsc channel; dropping the sender closes it.
pub struct ChannelFeed {
    rx: mpsc::Receiver<ChangeNotice>,
}

impl ChannelFeed {
    pub fn pair() -> (Self, mpsc::Sender<ChangeNotice>) {
        let (tx, rx) = mpsc::channel(16);
        (Self { rx }, tx)
    }
}

#[async_trait]
impl ChangeFeed for ChannelFeed {
    async fn next_change(
        &mut self,
    ) -> Result<ChangeNotice, Box<dyn std::error::Error + Send + Sync>> {
        self.rx
            .recv()
            .await
            .ok_or_else(|| CoreError::InternalError("feed closed".to_string()).into())
    }
}
