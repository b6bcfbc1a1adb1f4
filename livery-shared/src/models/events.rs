use uuid::Uuid;

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct TripStatusChangedEvent {
    pub trip_id: Uuid,
    pub from_status: String,
    pub to_status: String,
    pub actor_id: Option<Uuid>,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct TripEventRecordedEvent {
    pub event_id: Uuid,
    pub trip_id: Uuid,
    pub event_type: String,
    pub driver_id: Option<Uuid>,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct LocationUpdatedEvent {
    pub driver_id: Uuid,
    pub trip_id: Option<Uuid>,
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct DriverPayoutEvent {
    pub trip_id: Uuid,
    pub driver_id: Uuid,
    pub duration_hours: f64,
    pub payout: f64,
    pub timestamp: i64,
}
