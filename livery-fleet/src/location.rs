use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Live position of a driver. One row per driver; every report replaces
/// the previous one, this is not a movement log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationUpdate {
    pub driver_id: Uuid,
    /// The driver's active En Route trip at report time, if any.
    pub trip_id: Option<Uuid>,
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: DateTime<Utc>,
}

impl LocationUpdate {
    pub fn new(driver_id: Uuid, trip_id: Option<Uuid>, latitude: f64, longitude: f64) -> Self {
        Self {
            driver_id,
            trip_id,
            latitude,
            longitude,
            timestamp: Utc::now(),
        }
    }

    /// Whether the row is older than the map's staleness cutoff.
    pub fn is_stale(&self, now: DateTime<Utc>, cutoff: Duration) -> bool {
        now - self.timestamp > cutoff
    }
}
