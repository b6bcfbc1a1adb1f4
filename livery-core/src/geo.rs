use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Browser-style geolocation permission states, handled explicitly by
/// the reporter: prompt is treated as "try and see", denied disables
/// tracking.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PermissionState {
    Granted,
    Prompt,
    Denied,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPosition {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, thiserror::Error)]
pub enum GeoError {
    #[error("Location permission denied")]
    PermissionDenied,
    #[error("Position unavailable: {0}")]
    Unavailable(String),
}

/// Source of device positions for the location reporter.
#[async_trait]
pub trait GeolocationProvider: Send + Sync {
    async fn permission(&self) -> PermissionState;

    /// Single-shot position read.
    async fn current_position(&self) -> Result<GeoPosition, GeoError>;
}

/// Provider that always reports the same position. Stands in for real
/// hardware in tests and local runs.
pub struct FixedPositionProvider {
    position: GeoPosition,
    permission: PermissionState,
}

impl FixedPositionProvider {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            position: GeoPosition {
                latitude,
                longitude,
            },
            permission: PermissionState::Granted,
        }
    }

    pub fn denied() -> Self {
        Self {
            position: GeoPosition {
                latitude: 0.0,
                longitude: 0.0,
            },
            permission: PermissionState::Denied,
        }
    }
}

#[async_trait]
impl GeolocationProvider for FixedPositionProvider {
    async fn permission(&self) -> PermissionState {
        self.permission
    }

    async fn current_position(&self) -> Result<GeoPosition, GeoError> {
        if self.permission == PermissionState::Denied {
            return Err(GeoError::PermissionDenied);
        }
        tracing::debug!(
            latitude = self.position.latitude,
            longitude = self.position.longitude,
            "Serving fixed position"
        );
        Ok(self.position)
    }
}
