use async_trait::async_trait;
use chrono::{DateTime, Utc};
use livery_core::repository::LocationRepository;
use livery_fleet::LocationUpdate;
use sqlx::PgPool;
use uuid::Uuid;

const UPSERT_LOCATION: &str = r#"
INSERT INTO location_updates (driver_id, trip_id, latitude, longitude, timestamp)
VALUES ($1, $2, $3, $4, $5)
ON CONFLICT (driver_id) DO UPDATE
SET trip_id = EXCLUDED.trip_id,
    latitude = EXCLUDED.latitude,
    longitude = EXCLUDED.longitude,
    timestamp = EXCLUDED.timestamp;
"#;

const SELECT_ALL_LOCATIONS: &str =
    "SELECT * FROM location_updates ORDER BY timestamp DESC;";

pub struct PgLocationRepository {
    pool: PgPool,
}

impl PgLocationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct LocationRow {
    driver_id: Uuid,
    trip_id: Option<Uuid>,
    latitude: f64,
    longitude: f64,
    timestamp: DateTime<Utc>,
}

impl LocationRow {
    fn into_update(self) -> LocationUpdate {
        LocationUpdate {
            driver_id: self.driver_id,
            trip_id: self.trip_id,
            latitude: self.latitude,
            longitude: self.longitude,
            timestamp: self.timestamp,
        }
    }
}

#[async_trait]
impl LocationRepository for PgLocationRepository {
    async fn upsert_location(
        &self,
        location: &LocationUpdate,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        sqlx::query(UPSERT_LOCATION)
            .bind(location.driver_id)
            .bind(location.trip_id)
            .bind(location.latitude)
            .bind(location.longitude)
            .bind(location.timestamp)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_locations(
        &self,
    ) -> Result<Vec<LocationUpdate>, Box<dyn std::error::Error + Send + Sync>> {
        let rows = sqlx::query_as::<_, LocationRow>(SELECT_ALL_LOCATIONS)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(LocationRow::into_update).collect())
    }
}
