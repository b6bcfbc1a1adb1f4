use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::lifecycle::TripError;

/// Trip status in the lifecycle, persisted as these exact strings
/// (note the space in "En Route").
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TripStatus {
    Pending,
    Confirmed,
    #[serde(rename = "En Route")]
    EnRoute,
    Completed,
    Cancelled,
}

impl TripStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TripStatus::Pending => "Pending",
            TripStatus::Confirmed => "Confirmed",
            TripStatus::EnRoute => "En Route",
            TripStatus::Completed => "Completed",
            TripStatus::Cancelled => "Cancelled",
        }
    }

    /// Completed and Cancelled accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TripStatus::Completed | TripStatus::Cancelled)
    }
}

impl std::str::FromStr for TripStatus {
    type Err = TripError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(TripStatus::Pending),
            "Confirmed" => Ok(TripStatus::Confirmed),
            "En Route" => Ok(TripStatus::EnRoute),
            "Completed" => Ok(TripStatus::Completed),
            "Cancelled" => Ok(TripStatus::Cancelled),
            other => Err(TripError::UnknownStatus(other.to_string())),
        }
    }
}

impl std::fmt::Display for TripStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event kinds in the append-only trip log, persisted snake_case.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TripEventType {
    EnRoute,
    PassengerPicked,
    Completed,
    Cancelled,
    Confirmed,
    Pending,
}

impl TripEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TripEventType::EnRoute => "en_route",
            TripEventType::PassengerPicked => "passenger_picked",
            TripEventType::Completed => "completed",
            TripEventType::Cancelled => "cancelled",
            TripEventType::Confirmed => "confirmed",
            TripEventType::Pending => "pending",
        }
    }
}

impl std::str::FromStr for TripEventType {
    type Err = TripError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "en_route" => Ok(TripEventType::EnRoute),
            "passenger_picked" => Ok(TripEventType::PassengerPicked),
            "completed" => Ok(TripEventType::Completed),
            "cancelled" => Ok(TripEventType::Cancelled),
            "confirmed" => Ok(TripEventType::Confirmed),
            "pending" => Ok(TripEventType::Pending),
            other => Err(TripError::UnknownEventType(other.to_string())),
        }
    }
}

impl std::fmt::Display for TripEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A booked ride. `driver_id` may be null only while the trip is still
/// Pending or Confirmed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trip {
    pub id: Uuid,
    pub rider_id: Uuid,
    pub driver_id: Option<Uuid>,
    pub vehicle_id: Option<Uuid>,
    pub pickup_address: String,
    pub dropoff_address: String,
    pub stop_address: Option<String>,
    pub pickup_latitude: Option<f64>,
    pub pickup_longitude: Option<f64>,
    pub dropoff_latitude: Option<f64>,
    pub dropoff_longitude: Option<f64>,
    pub pickup_time: DateTime<Utc>,
    /// Flight arrival for airport pickups.
    pub arrival_time: Option<DateTime<Utc>>,
    pub passenger_count: i32,
    pub child_seats: i32,
    pub luggage_count: i32,
    pub has_pets: bool,
    pub total_price: f64,
    pub status: TripStatus,
    pub driver_notes: Option<String>,
    pub airline: Option<String>,
    pub flight_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Trip {
    /// Update trip status
    pub fn update_status(&mut self, new_status: TripStatus) {
        self.status = new_status;
        self.updated_at = Utc::now();
    }

    pub fn assign_driver(&mut self, driver_id: Uuid) {
        self.driver_id = Some(driver_id);
        self.updated_at = Utc::now();
    }
}

/// Booking payload a dispatcher submits. Becomes a Pending [`Trip`]
/// once the rider is resolved.
#[derive(Debug, Clone, Deserialize)]
pub struct TripDraft {
    pub pickup_address: String,
    pub dropoff_address: String,
    pub stop_address: Option<String>,
    pub pickup_latitude: Option<f64>,
    pub pickup_longitude: Option<f64>,
    pub dropoff_latitude: Option<f64>,
    pub dropoff_longitude: Option<f64>,
    pub pickup_time: DateTime<Utc>,
    pub arrival_time: Option<DateTime<Utc>>,
    pub passenger_count: i32,
    #[serde(default)]
    pub child_seats: i32,
    #[serde(default)]
    pub luggage_count: i32,
    #[serde(default)]
    pub has_pets: bool,
    pub vehicle_id: Option<Uuid>,
    pub driver_id: Option<Uuid>,
    pub total_price: f64,
    pub driver_notes: Option<String>,
    pub airline: Option<String>,
    pub flight_number: Option<String>,
}

impl TripDraft {
    pub fn validate(&self) -> Result<(), TripError> {
        if self.pickup_address.trim().is_empty() {
            return Err(TripError::InvalidDraft(
                "Pickup address is required".to_string(),
            ));
        }
        if self.dropoff_address.trim().is_empty() {
            return Err(TripError::InvalidDraft(
                "Dropoff address is required".to_string(),
            ));
        }
        if self.passenger_count < 1 {
            return Err(TripError::InvalidDraft(
                "Passenger count must be at least 1".to_string(),
            ));
        }
        if self.child_seats < 0 || self.luggage_count < 0 {
            return Err(TripError::InvalidDraft(
                "Counts cannot be negative".to_string(),
            ));
        }
        if self.total_price < 0.0 {
            return Err(TripError::InvalidDraft(
                "Total price cannot be negative".to_string(),
            ));
        }
        Ok(())
    }

    pub fn into_trip(self, rider_id: Uuid) -> Trip {
        let now = Utc::now();
        Trip {
            id: Uuid::new_v4(),
            rider_id,
            driver_id: self.driver_id,
            vehicle_id: self.vehicle_id,
            pickup_address: self.pickup_address,
            dropoff_address: self.dropoff_address,
            stop_address: self.stop_address,
            pickup_latitude: self.pickup_latitude,
            pickup_longitude: self.pickup_longitude,
            dropoff_latitude: self.dropoff_latitude,
            dropoff_longitude: self.dropoff_longitude,
            pickup_time: self.pickup_time,
            arrival_time: self.arrival_time,
            passenger_count: self.passenger_count,
            child_seats: self.child_seats,
            luggage_count: self.luggage_count,
            has_pets: self.has_pets,
            total_price: self.total_price,
            status: TripStatus::Pending,
            driver_notes: self.driver_notes,
            airline: self.airline,
            flight_number: self.flight_number,
            created_at: now,
            updated_at: now,
        }
    }
}

/// One row of the append-only event log. Never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TripEvent {
    pub id: Uuid,
    pub trip_id: Uuid,
    pub event_type: TripEventType,
    pub driver_id: Option<Uuid>,
    pub timestamp: DateTime<Utc>,
}

impl TripEvent {
    pub fn new(trip_id: Uuid, event_type: TripEventType, driver_id: Option<Uuid>) -> Self {
        Self {
            id: Uuid::new_v4(),
            trip_id,
            event_type,
            driver_id,
            timestamp: Utc::now(),
        }
    }

    pub fn at(
        trip_id: Uuid,
        event_type: TripEventType,
        driver_id: Option<Uuid>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            trip_id,
            event_type,
            driver_id,
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn status_strings_match_store() {
        assert_eq!(TripStatus::EnRoute.as_str(), "En Route");
        assert_eq!(
            serde_json::to_string(&TripStatus::EnRoute).unwrap(),
            "\"En Route\""
        );
        for s in ["Pending", "Confirmed", "En Route", "Completed", "Cancelled"] {
            assert_eq!(TripStatus::from_str(s).unwrap().as_str(), s);
        }
        assert!(TripStatus::from_str("Accepted").is_err());
    }

    #[test]
    fn event_type_strings_are_snake_case() {
        assert_eq!(
            serde_json::to_string(&TripEventType::PassengerPicked).unwrap(),
            "\"passenger_picked\""
        );
        for s in [
            "en_route",
            "passenger_picked",
            "completed",
            "cancelled",
            "confirmed",
            "pending",
        ] {
            assert_eq!(TripEventType::from_str(s).unwrap().as_str(), s);
        }
    }

    #[test]
    fn terminal_statuses() {
        assert!(TripStatus::Completed.is_terminal());
        assert!(TripStatus::Cancelled.is_terminal());
        assert!(!TripStatus::EnRoute.is_terminal());
    }

    #[test]
    fn draft_validation_bounds() {
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
            passenger_count: 2,
            child_seats: 0,
            luggage_count: 3,
            has_pets: false,
            vehicle_id: None,
            driver_id: None,
            total_price: 125.0,
            driver_notes: None,
            airline: None,
            flight_number: None,
        };
        assert!(draft.validate().is_ok());

        let mut bad = draft.clone();
        bad.passenger_count = 0;
        assert!(bad.validate().is_err());

        let mut bad = draft.clone();
        bad.pickup_address = " ".to_string();
        assert!(bad.validate().is_err());

        let trip = draft.into_trip(Uuid::new_v4());
        assert_eq!(trip.status, TripStatus::Pending);
    }
}
