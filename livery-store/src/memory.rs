use async_trait::async_trait;
use livery_core::feed::{ChangeFeed, ChangeNotice};
use livery_core::repository::{
    LocationRepository, RosterRepository, TripEventRepository, TripRepository, UserRepository,
    VehicleRepository,
};
use livery_core::CoreError;
use livery_fleet::{DriverUpdate, LocationUpdate, RosterEntry, User, Vehicle};
use livery_trip::lifecycle;
use livery_trip::{Trip, TripAction, TripError, TripEvent, TripEventType};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    trips: Vec<Trip>,
    trip_events: Vec<TripEvent>,
    users: Vec<User>,
    vehicles: Vec<Vehicle>,
    roster: Vec<RosterEntry>,
    locations: HashMap<Uuid, LocationUpdate>,
}

/// In-memory store with the same transition semantics as the Postgres
/// repositories. Backs the integration tests so they run without a
/// database; every write emits the same change notices the LISTEN/NOTIFY
/// triggers would.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
    changes: broadcast::Sender<ChangeNotice>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(64);
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            changes,
        }
    }

    pub fn feed(&self) -> MemoryFeed {
        MemoryFeed {
            rx: self.changes.subscribe(),
        }
    }

    fn notify(&self, table: &str, op: &str) {
        let _ = self.changes.send(ChangeNotice {
            table: table.to_string(),
            op: op.to_string(),
        });
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl TripRepository for MemoryStore {
    async fn create_trip(
        &self,
        trip: &Trip,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.lock().trips.push(trip.clone());
        self.notify("trips", "INSERT");
        Ok(())
    }

    async fn get_trip(
        &self,
        id: Uuid,
    ) -> Result<Option<Trip>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.lock().trips.iter().find(|t| t.id == id).cloned())
    }

    async fn list_trips(&self) -> Result<Vec<Trip>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.lock().trips.clone())
    }

    async fn apply_transition(
        &self,
        trip_id: Uuid,
        action: &TripAction,
    ) -> Result<(Trip, Option<TripEvent>), Box<dyn std::error::Error + Send + Sync>> {
        let (updated, event) = {
            let mut inner = self.lock();

            let pickup_recorded = matches!(action, TripAction::RecordPickup { .. })
                && inner.trip_events.iter().any(|e| {
                    e.trip_id == trip_id && e.event_type == TripEventType::PassengerPicked
                });

            let trip = inner
                .trips
                .iter_mut()
                .find(|t| t.id == trip_id)
                .ok_or_else(|| TripError::NotFound(trip_id.to_string()))?;

            let outcome = lifecycle::check(trip, action, pickup_recorded)?;

            if let Some(status) = outcome.new_status {
                trip.update_status(status);
            }
            if let Some(driver_id) = outcome.assign_driver_id {
                trip.assign_driver(driver_id);
            }

            let actor = match action {
                TripAction::Start { driver_id }
                | TripAction::RecordPickup { driver_id }
                | TripAction::Complete { driver_id } => Some(*driver_id),
                _ => None,
            };

            let updated = trip.clone();
            let event = outcome
                .event_type
                .map(|kind| TripEvent::new(trip_id, kind, actor));
            if let Some(event) = &event {
                inner.trip_events.push(event.clone());
            }
            (updated, event)
        };

        self.notify("trips", "UPDATE");
        if event.is_some() {
            self.notify("trip_events", "INSERT");
        }
        Ok((updated, event))
    }
}

#[async_trait]
impl TripEventRepository for MemoryStore {
    async fn list_events(
        &self,
    ) -> Result<Vec<TripEvent>, Box<dyn std::error::Error + Send + Sync>> {
        let mut events = self.lock().trip_events.clone();
        events.sort_by_key(|e| e.timestamp);
        Ok(events)
    }

    async fn list_events_for_trip(
        &self,
        trip_id: Uuid,
    ) -> Result<Vec<TripEvent>, Box<dyn std::error::Error + Send + Sync>> {
        let mut events: Vec<TripEvent> = self
            .lock()
            .trip_events
            .iter()
            .filter(|e| e.trip_id == trip_id)
            .cloned()
            .collect();
        events.sort_by_key(|e| e.timestamp);
        Ok(events)
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create_user(
        &self,
        user: &User,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.lock().users.push(user.clone());
        self.notify("users", "INSERT");
        Ok(())
    }

    async fn get_user(
        &self,
        id: Uuid,
    ) -> Result<Option<User>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.lock().users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_email(
        &self,
        email: &str,
    ) -> Result<Option<User>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self
            .lock()
            .users
            .iter()
            .find(|u| u.email.inner() == email)
            .cloned())
    }

    async fn find_by_phone(
        &self,
        phone: &str,
    ) -> Result<Option<User>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self
            .lock()
            .users
            .iter()
            .find(|u| u.phone.inner() == phone)
            .cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.lock().users.clone())
    }

    async fn update_user(
        &self,
        id: Uuid,
        update: &DriverUpdate,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        {
            let mut inner = self.lock();
            let user = inner
                .users
                .iter_mut()
                .find(|u| u.id == id)
                .ok_or_else(|| CoreError::NotFound(format!("user {} not found", id)))?;
            update.apply_to(user);
        }
        self.notify("users", "UPDATE");
        Ok(())
    }
}

#[async_trait]
impl VehicleRepository for MemoryStore {
    async fn create_vehicle(
        &self,
        vehicle: &Vehicle,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.lock().vehicles.push(vehicle.clone());
        self.notify("vehicles", "INSERT");
        Ok(())
    }

    async fn get_vehicle(
        &self,
        id: Uuid,
    ) -> Result<Option<Vehicle>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.lock().vehicles.iter().find(|v| v.id == id).cloned())
    }

    async fn list_vehicles(
        &self,
    ) -> Result<Vec<Vehicle>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.lock().vehicles.clone())
    }

    async fn update_vehicle(
        &self,
        id: Uuid,
        vehicle: &Vehicle,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        {
            let mut inner = self.lock();
            let row = inner
                .vehicles
                .iter_mut()
                .find(|v| v.id == id)
                .ok_or_else(|| CoreError::NotFound(format!("vehicle {} not found", id)))?;
            *row = Vehicle {
                id,
                ..vehicle.clone()
            };
        }
        self.notify("vehicles", "UPDATE");
        Ok(())
    }

    async fn delete_vehicle(
        &self,
        id: Uuid,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.lock().vehicles.retain(|v| v.id != id);
        self.notify("vehicles", "DELETE");
        Ok(())
    }
}

#[async_trait]
impl RosterRepository for MemoryStore {
    async fn add_entry(
        &self,
        entry: &RosterEntry,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.lock().roster.push(entry.clone());
        self.notify("drivers", "INSERT");
        Ok(())
    }

    async fn list_for_boss(
        &self,
        boss_user_id: Uuid,
    ) -> Result<Vec<RosterEntry>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self
            .lock()
            .roster
            .iter()
            .filter(|e| e.boss_user_id == boss_user_id)
            .cloned()
            .collect())
    }

    async fn entry_for_driver(
        &self,
        boss_user_id: Uuid,
        driver_user_id: Uuid,
    ) -> Result<Option<RosterEntry>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self
            .lock()
            .roster
            .iter()
            .find(|e| e.boss_user_id == boss_user_id && e.driver_user_id == driver_user_id)
            .cloned())
    }

    async fn remove_entry(
        &self,
        id: Uuid,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.lock().roster.retain(|e| e.id != id);
        self.notify("drivers", "DELETE");
        Ok(())
    }
}

#[async_trait]
impl LocationRepository for MemoryStore {
    async fn upsert_location(
        &self,
        location: &LocationUpdate,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.lock()
            .locations
            .insert(location.driver_id, location.clone());
        self.notify("location_updates", "UPSERT");
        Ok(())
    }

    async fn list_locations(
        &self,
    ) -> Result<Vec<LocationUpdate>, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.lock().locations.values().cloned().collect())
    }
}

/// Change feed over the memory store's broadcast channel.
pub struct MemoryFeed {
    rx: broadcast::Receiver<ChangeNotice>,
}

#[async_trait]
impl ChangeFeed for MemoryFeed {
    async fn next_change(
        &mut self,
    ) -> Result<ChangeNotice, Box<dyn std::error::Error + Send + Sync>> {
        loop {
            match self.rx.recv().await {
                Ok(notice) => return Ok(notice),
                // Missed notices collapse into whatever comes next; the
                // consumer refetches everything either way
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => {
                    return Err(Box::new(CoreError::InternalError(
                        "change feed closed".to_string(),
                    )))
                }
            }
        }
    }
}
