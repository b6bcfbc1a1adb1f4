use livery_core::geo::{GeoError, GeolocationProvider, PermissionState};
use livery_core::repository::{LocationRepository, TripRepository};
use livery_fleet::LocationUpdate;
use livery_trip::views;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// How often a driver's position is re-sampled once tracking starts.
pub const REPORT_INTERVAL: Duration = Duration::from_secs(30);

/// Periodic position reporter for one driver. Samples immediately on
/// start, then on a fixed interval; every sample is upserted so the
/// store keeps exactly one row per driver.
pub struct LocationReporter {
    driver_id: Uuid,
    provider: Arc<dyn GeolocationProvider>,
    trips: Arc<dyn TripRepository>,
    locations: Arc<dyn LocationRepository>,
    interval: Duration,
}

impl LocationReporter {
    pub fn new(
        driver_id: Uuid,
        provider: Arc<dyn GeolocationProvider>,
        trips: Arc<dyn TripRepository>,
        locations: Arc<dyn LocationRepository>,
    ) -> Self {
        Self {
            driver_id,
            provider,
            trips,
            locations,
            interval: REPORT_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Start tracking. Denied permission is surfaced immediately and no
    /// task is spawned; prompt is treated as "try and see", matching how
    /// a device prompt resolves on first use.
    pub async fn spawn(self) -> Result<ReporterHandle, GeoError> {
        match self.provider.permission().await {
            PermissionState::Denied => {
                tracing::warn!(driver_id = %self.driver_id, "Location permission denied, tracking disabled");
                return Err(GeoError::PermissionDenied);
            }
            PermissionState::Granted | PermissionState::Prompt => {}
        }

        let (stop_tx, mut stop_rx) = watch::channel(false);
        let driver_id = self.driver_id;

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            loop {
                tokio::select! {
                    changed = stop_rx.changed() => {
                        // Either an explicit stop or the handle was dropped
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                    }
                    _ = ticker.tick() => {
                        if let Err(e) = self.report_once().await {
                            // Skip this tick, keep the loop alive
                            tracing::warn!(driver_id = %driver_id, "Location sample failed: {}", e);
                        }
                    }
                }
            }
            tracing::debug!(driver_id = %driver_id, "Location reporter stopped");
        });

        Ok(ReporterHandle { stop_tx, task })
    }

    async fn report_once(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let position = self.provider.current_position().await?;

        // Attach the driver's active trip, if one is running
        let trips = self.trips.list_trips().await?;
        let active_trip_id = views::current_for_driver(&trips, self.driver_id)
            .first()
            .map(|t| t.id);

        let update = LocationUpdate::new(
            self.driver_id,
            active_trip_id,
            position.latitude,
            position.longitude,
        );
        self.locations.upsert_location(&update).await?;
        Ok(())
    }
}

/// Handle to a running reporter. `stop` resolves only after the loop
/// has exited, so no timer outlives its owner.
pub struct ReporterHandle {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ReporterHandle {
    pub async fn stop(self) {
        let _ = self.stop_tx.send(true);
        let _ = self.task.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{completed_trip, StubLocations, StubTrips};
    use async_trait::async_trait;
    use livery_core::geo::{FixedPositionProvider, GeoPosition};
    use livery_trip::TripStatus;
    use std::sync::atomic::{AtomicBool, Ordering};

    async fn wait_for_upserts(locations: &StubLocations, at_least: usize) {
        for _ in 0..200 {
            if locations.upsert_count() >= at_least {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!(
            "expected at least {} upserts, saw {}",
            at_least,
            locations.upsert_count()
        );
    }

    #[tokio::test]
    async fn denied_permission_disables_tracking() {
        let provider = Arc::new(FixedPositionProvider::denied());
        let reporter = LocationReporter::new(
            Uuid::new_v4(),
            provider,
            Arc::new(StubTrips::default()),
            Arc::new(StubLocations::default()),
        );

        assert!(matches!(
            reporter.spawn().await,
            Err(GeoError::PermissionDenied)
        ));
    }

    #[tokio::test]
    async fn samples_immediately_then_on_interval_and_stops_cleanly() {
        let driver_id = Uuid::new_v4();
        let locations = Arc::new(StubLocations::default());
        let reporter = LocationReporter::new(
            driver_id,
            Arc::new(FixedPositionProvider::new(40.7128, -74.0060)),
            Arc::new(StubTrips::default()),
            locations.clone(),
        )
        .with_interval(Duration::from_millis(20));

        let handle = reporter.spawn().await.unwrap();
        wait_for_upserts(&locations, 2).await;

        let row = locations.get(driver_id).unwrap();
        assert_eq!(row.latitude, 40.7128);
        assert_eq!(row.trip_id, None);

        handle.stop().await;
        let frozen = locations.upsert_count();
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(locations.upsert_count(), frozen);
    }

    #[tokio::test]
    async fn attaches_active_trip_to_the_sample() {
        let driver_id = Uuid::new_v4();
        let mut trip = completed_trip(driver_id);
        trip.status = TripStatus::EnRoute;
        let trip_id = trip.id;

        let locations = Arc::new(StubLocations::default());
        let reporter = LocationReporter::new(
            driver_id,
            Arc::new(FixedPositionProvider::new(40.7128, -74.0060)),
            Arc::new(StubTrips::with(vec![trip])),
            locations.clone(),
        )
        .with_interval(Duration::from_millis(20));

        let handle = reporter.spawn().await.unwrap();
        wait_for_upserts(&locations, 1).await;

        let row = locations.get(driver_id).unwrap();
        assert_eq!(row.trip_id, Some(trip_id));

        handle.stop().await;
    }

    struct FlakyProvider {
        failed_once: AtomicBool,
    }

    #[async_trait]
    impl GeolocationProvider for FlakyProvider {
        async fn permission(&self) -> PermissionState {
            PermissionState::Prompt
        }

        async fn current_position(&self) -> Result<GeoPosition, GeoError> {
            if !self.failed_once.swap(true, Ordering::SeqCst) {
                return Err(GeoError::Unavailable("no fix yet".to_string()));
            }
            Ok(GeoPosition {
                latitude: 40.7128,
                longitude: -74.0060,
            })
        }
    }

    #[tokio::test]
    async fn failed_sample_skips_tick_but_keeps_reporting() {
        let driver_id = Uuid::new_v4();
        let locations = Arc::new(StubLocations::default());
        let reporter = LocationReporter::new(
            driver_id,
            Arc::new(FlakyProvider {
                failed_once: AtomicBool::new(false),
            }),
            Arc::new(StubTrips::default()),
            locations.clone(),
        )
        .with_interval(Duration::from_millis(20));

        // First sample fails, the loop survives and the second lands
        let handle = reporter.spawn().await.unwrap();
        wait_for_upserts(&locations, 1).await;
        handle.stop().await;
    }
}
