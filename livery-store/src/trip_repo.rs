use async_trait::async_trait;
use chrono::{DateTime, Utc};
use livery_core::repository::{TripEventRepository, TripRepository};
use livery_trip::lifecycle;
use livery_trip::{Trip, TripAction, TripError, TripEvent, TripEventType, TripStatus};
use sqlx::PgPool;
use std::str::FromStr;
use uuid::Uuid;

const INSERT_TRIP: &str = r#"
INSERT INTO trips (id, rider_id, driver_id, vehicle_id, pickup_address, dropoff_address,
                   stop_address, pickup_latitude, pickup_longitude, dropoff_latitude,
                   dropoff_longitude, pickup_time, arrival_time, passenger_count, child_seats,
                   luggage_count, has_pets, total_price, status, driver_notes, airline,
                   flight_number, created_at, updated_at)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19,
        $20, $21, $22, $23, $24);
"#;

const SELECT_TRIP: &str = "SELECT * FROM trips WHERE id = $1;";

const SELECT_TRIP_FOR_UPDATE: &str = "SELECT * FROM trips WHERE id = $1 FOR UPDATE;";

const SELECT_ALL_TRIPS: &str = "SELECT * FROM trips ORDER BY pickup_time ASC;";

const UPDATE_TRIP_STATUS: &str =
    "UPDATE trips SET status = $2, updated_at = now() WHERE id = $1;";

const UPDATE_TRIP_DRIVER: &str =
    "UPDATE trips SET driver_id = $2, updated_at = now() WHERE id = $1;";

const SELECT_PICKUP_EXISTS: &str = r#"
SELECT EXISTS (
    SELECT 1 FROM trip_events WHERE trip_id = $1 AND event_type = 'passenger_picked'
);
"#;

const INSERT_TRIP_EVENT: &str = r#"
INSERT INTO trip_events (id, trip_id, event_type, driver_id, timestamp)
VALUES ($1, $2, $3, $4, $5);
"#;

const SELECT_ALL_EVENTS: &str = "SELECT * FROM trip_events ORDER BY timestamp ASC;";

const SELECT_EVENTS_FOR_TRIP: &str =
    "SELECT * FROM trip_events WHERE trip_id = $1 ORDER BY timestamp ASC;";

pub struct PgTripRepository {
    pool: PgPool,
}

impl PgTripRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Internal structs for type-safe querying
#[derive(sqlx::FromRow)]
struct TripRow {
    id: Uuid,
    rider_id: Uuid,
    driver_id: Option<Uuid>,
    vehicle_id: Option<Uuid>,
    pickup_address: String,
    dropoff_address: String,
    stop_address: Option<String>,
    pickup_latitude: Option<f64>,
    pickup_longitude: Option<f64>,
    dropoff_latitude: Option<f64>,
    dropoff_longitude: Option<f64>,
    pickup_time: DateTime<Utc>,
    arrival_time: Option<DateTime<Utc>>,
    passenger_count: i32,
    child_seats: i32,
    luggage_count: i32,
    has_pets: bool,
    total_price: f64,
    status: String,
    driver_notes: Option<String>,
    airline: Option<String>,
    flight_number: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TripRow {
    fn into_trip(self) -> Result<Trip, TripError> {
        Ok(Trip {
            id: self.id,
            rider_id: self.rider_id,
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
            status: TripStatus::from_str(&self.status)?,
            driver_notes: self.driver_notes,
            airline: self.airline,
            flight_number: self.flight_number,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct TripEventRow {
    id: Uuid,
    trip_id: Uuid,
    event_type: String,
    driver_id: Option<Uuid>,
    timestamp: DateTime<Utc>,
}

impl TripEventRow {
    fn into_event(self) -> Result<TripEvent, TripError> {
        Ok(TripEvent {
            id: self.id,
            trip_id: self.trip_id,
            event_type: TripEventType::from_str(&self.event_type)?,
            driver_id: self.driver_id,
            timestamp: self.timestamp,
        })
    }
}

#[async_trait]
impl TripRepository for PgTripRepository {
    async fn create_trip(
        &self,
        trip: &Trip,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        sqlx::query(INSERT_TRIP)
            .bind(trip.id)
            .bind(trip.rider_id)
            .bind(trip.driver_id)
            .bind(trip.vehicle_id)
            .bind(&trip.pickup_address)
            .bind(&trip.dropoff_address)
            .bind(&trip.stop_address)
            .bind(trip.pickup_latitude)
            .bind(trip.pickup_longitude)
            .bind(trip.dropoff_latitude)
            .bind(trip.dropoff_longitude)
            .bind(trip.pickup_time)
            .bind(trip.arrival_time)
            .bind(trip.passenger_count)
            .bind(trip.child_seats)
            .bind(trip.luggage_count)
            .bind(trip.has_pets)
            .bind(trip.total_price)
            .bind(trip.status.as_str())
            .bind(&trip.driver_notes)
            .bind(&trip.airline)
            .bind(&trip.flight_number)
            .bind(trip.created_at)
            .bind(trip.updated_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_trip(
        &self,
        id: Uuid,
    ) -> Result<Option<Trip>, Box<dyn std::error::Error + Send + Sync>> {
        let row = sqlx::query_as::<_, TripRow>(SELECT_TRIP)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(TripRow::into_trip).transpose()?)
    }

    async fn list_trips(&self) -> Result<Vec<Trip>, Box<dyn std::error::Error + Send + Sync>> {
        let rows = sqlx::query_as::<_, TripRow>(SELECT_ALL_TRIPS)
            .fetch_all(&self.pool)
            .await?;
        let trips = rows
            .into_iter()
            .map(TripRow::into_trip)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(trips)
    }

    async fn apply_transition(
        &self,
        trip_id: Uuid,
        action: &TripAction,
    ) -> Result<(Trip, Option<TripEvent>), Box<dyn std::error::Error + Send + Sync>> {
        let mut tx = self.pool.begin().await?;

        // Lock the row so concurrent driver taps serialize here
        let row = sqlx::query_as::<_, TripRow>(SELECT_TRIP_FOR_UPDATE)
            .bind(trip_id)
            .fetch_optional(&mut *tx)
            .await?;
        let trip = row
            .ok_or_else(|| TripError::NotFound(trip_id.to_string()))?
            .into_trip()?;

        let pickup_recorded = if matches!(action, TripAction::RecordPickup { .. }) {
            let (exists,): (bool,) = sqlx::query_as(SELECT_PICKUP_EXISTS)
                .bind(trip_id)
                .fetch_one(&mut *tx)
                .await?;
            exists
        } else {
            false
        };

        let outcome = lifecycle::check(&trip, action, pickup_recorded)?;

        if let Some(status) = outcome.new_status {
            sqlx::query(UPDATE_TRIP_STATUS)
                .bind(trip_id)
                .bind(status.as_str())
                .execute(&mut *tx)
                .await?;
        }
        if let Some(driver_id) = outcome.assign_driver_id {
            sqlx::query(UPDATE_TRIP_DRIVER)
                .bind(trip_id)
                .bind(driver_id)
                .execute(&mut *tx)
                .await?;
        }

        let actor = match action {
            TripAction::Start { driver_id }
            | TripAction::RecordPickup { driver_id }
            | TripAction::Complete { driver_id } => Some(*driver_id),
            _ => None,
        };

        let event = if let Some(kind) = outcome.event_type {
            let event = TripEvent::new(trip_id, kind, actor);
            sqlx::query(INSERT_TRIP_EVENT)
                .bind(event.id)
                .bind(event.trip_id)
                .bind(event.event_type.as_str())
                .bind(event.driver_id)
                .bind(event.timestamp)
                .execute(&mut *tx)
                .await?;
            Some(event)
        } else {
            None
        };

        // Re-read inside the transaction so the returned trip carries the
        // store's own timestamps
        let updated = sqlx::query_as::<_, TripRow>(SELECT_TRIP)
            .bind(trip_id)
            .fetch_one(&mut *tx)
            .await?
            .into_trip()?;

        tx.commit().await?;
        Ok((updated, event))
    }
}

pub struct PgTripEventRepository {
    pool: PgPool,
}

impl PgTripEventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TripEventRepository for PgTripEventRepository {
    async fn list_events(
        &self,
    ) -> Result<Vec<TripEvent>, Box<dyn std::error::Error + Send + Sync>> {
        let rows = sqlx::query_as::<_, TripEventRow>(SELECT_ALL_EVENTS)
            .fetch_all(&self.pool)
            .await?;
        let events = rows
            .into_iter()
            .map(TripEventRow::into_event)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(events)
    }

    async fn list_events_for_trip(
        &self,
        trip_id: Uuid,
    ) -> Result<Vec<TripEvent>, Box<dyn std::error::Error + Send + Sync>> {
        let rows = sqlx::query_as::<_, TripEventRow>(SELECT_EVENTS_FOR_TRIP)
            .bind(trip_id)
            .fetch_all(&self.pool)
            .await?;
        let events = rows
            .into_iter()
            .map(TripEventRow::into_event)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(events)
    }
}
