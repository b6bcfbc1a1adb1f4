use chrono::{DateTime, Utc};
use livery_fleet::{LocationUpdate, User, Vehicle};
use livery_trip::{Trip, TripEvent, TripStatus};
use std::collections::HashMap;
use uuid::Uuid;

/// Immutable view of every synced collection, rebuilt wholesale on each
/// refetch. Indexes are built once here so readers get O(1) lookups and
/// never pay per-request join costs.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub version: u64,
    pub fetched_at: DateTime<Utc>,
    pub trips: Vec<Trip>,
    pub trip_events: Vec<TripEvent>,
    pub users: Vec<User>,
    pub vehicles: Vec<Vehicle>,
    pub users_by_id: HashMap<Uuid, User>,
    pub vehicles_by_id: HashMap<Uuid, Vehicle>,
    pub events_by_trip: HashMap<Uuid, Vec<TripEvent>>,
    pub locations_by_driver: HashMap<Uuid, LocationUpdate>,
}

impl Snapshot {
    /// The pre-first-fetch state: nothing known yet, version zero.
    pub fn empty() -> Self {
        Self {
            version: 0,
            fetched_at: Utc::now(),
            trips: Vec::new(),
            trip_events: Vec::new(),
            users: Vec::new(),
            vehicles: Vec::new(),
            users_by_id: HashMap::new(),
            vehicles_by_id: HashMap::new(),
            events_by_trip: HashMap::new(),
            locations_by_driver: HashMap::new(),
        }
    }

    pub fn build(
        version: u64,
        trips: Vec<Trip>,
        trip_events: Vec<TripEvent>,
        users: Vec<User>,
        vehicles: Vec<Vehicle>,
        locations: Vec<LocationUpdate>,
    ) -> Self {
        let users_by_id = users.iter().map(|u| (u.id, u.clone())).collect();
        let vehicles_by_id = vehicles.iter().map(|v| (v.id, v.clone())).collect();

        let mut events_by_trip: HashMap<Uuid, Vec<TripEvent>> = HashMap::new();
        for event in &trip_events {
            events_by_trip
                .entry(event.trip_id)
                .or_default()
                .push(event.clone());
        }
        for events in events_by_trip.values_mut() {
            events.sort_by_key(|e| e.timestamp);
        }

        let locations_by_driver = locations.into_iter().map(|l| (l.driver_id, l)).collect();

        Self {
            version,
            fetched_at: Utc::now(),
            trips,
            trip_events,
            users,
            vehicles,
            users_by_id,
            vehicles_by_id,
            events_by_trip,
            locations_by_driver,
        }
    }

    /// Events for one trip, oldest first. Empty slice when the trip has
    /// no log yet.
    pub fn events_for(&self, trip_id: Uuid) -> &[TripEvent] {
        self.events_by_trip
            .get(&trip_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The driver's active En Route trip, if one exists.
    pub fn active_trip_for_driver(&self, driver_id: Uuid) -> Option<&Trip> {
        self.trips
            .iter()
            .find(|t| t.driver_id == Some(driver_id) && t.status == TripStatus::EnRoute)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{completed_trip, driver_user, event_at};
    use livery_trip::TripEventType;

    #[test]
    fn build_indexes_collections() {
        let driver = driver_user(25.0);
        let trip = completed_trip(driver.id);
        let e1 = event_at(
            trip.id,
            TripEventType::PassengerPicked,
            driver.id,
            "2025-03-01T10:00:00Z",
        );
        let e2 = event_at(
            trip.id,
            TripEventType::Completed,
            driver.id,
            "2025-03-01T11:00:00Z",
        );

        let location = LocationUpdate::new(driver.id, Some(trip.id), 40.7, -74.0);

        let snap = Snapshot::build(
            1,
            vec![trip.clone()],
            // Deliberately out of order; the index sorts per trip
            vec![e2, e1],
            vec![driver.clone()],
            vec![],
            vec![location],
        );

        assert_eq!(snap.version, 1);
        assert!(snap.users_by_id.contains_key(&driver.id));
        assert_eq!(snap.events_for(trip.id).len(), 2);
        assert_eq!(
            snap.events_for(trip.id)[0].event_type,
            TripEventType::PassengerPicked
        );
        assert!(snap.locations_by_driver.contains_key(&driver.id));
        assert!(snap.events_for(Uuid::new_v4()).is_empty());
    }

    #[test]
    fn active_trip_lookup_matches_en_route_only() {
        let driver = driver_user(25.0);
        let mut trip = completed_trip(driver.id);
        trip.status = TripStatus::EnRoute;

        let snap = Snapshot::build(1, vec![trip.clone()], vec![], vec![], vec![], vec![]);
        assert_eq!(
            snap.active_trip_for_driver(driver.id).map(|t| t.id),
            Some(trip.id)
        );
        assert!(snap.active_trip_for_driver(Uuid::new_v4()).is_none());
    }
}
