use chrono::{DateTime, Utc};
use livery_core::feed::ChangeFeed;
use livery_core::repository::{
    LocationRepository, TripEventRepository, TripRepository, UserRepository, VehicleRepository,
};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

use crate::snapshot::Snapshot;

/// Notice sent to subscribers after a refetch installs a new snapshot.
/// Carries no data: observers refetch through the snapshot accessor,
/// mirroring the subscribe-then-refetch contract end to end.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotUpdate {
    pub version: u64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Refetch failed: {0}")]
    Fetch(String),
}

/// Holds the current snapshot and refreshes it wholesale. Any change
/// notification, poll tick or manual request funnels into
/// [`SyncEngine::refetch_all`]; overlapping refetches are serialized by
/// a monotonic token so only the newest result is ever installed.
pub struct SyncEngine {
    trips: Arc<dyn TripRepository>,
    events: Arc<dyn TripEventRepository>,
    users: Arc<dyn UserRepository>,
    vehicles: Arc<dyn VehicleRepository>,
    locations: Arc<dyn LocationRepository>,
    snapshot: RwLock<Arc<Snapshot>>,
    refetch_seq: AtomicU64,
    discarded: AtomicU64,
    failed: AtomicU64,
    updates_tx: broadcast::Sender<SnapshotUpdate>,
}

impl SyncEngine {
    pub fn new(
        trips: Arc<dyn TripRepository>,
        events: Arc<dyn TripEventRepository>,
        users: Arc<dyn UserRepository>,
        vehicles: Arc<dyn VehicleRepository>,
        locations: Arc<dyn LocationRepository>,
    ) -> Self {
        // Capacity 16: subscribers only care about the latest version,
        // laggards re-read the snapshot anyway
        let (updates_tx, _) = broadcast::channel(16);
        Self {
            trips,
            events,
            users,
            vehicles,
            locations,
            snapshot: RwLock::new(Arc::new(Snapshot::empty())),
            refetch_seq: AtomicU64::new(0),
            discarded: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            updates_tx,
        }
    }

    /// Cheap handle to the current snapshot.
    pub async fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot.read().await.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SnapshotUpdate> {
        self.updates_tx.subscribe()
    }

    /// Refetches seen to finish after a newer one started.
    pub fn discarded_refetches(&self) -> u64 {
        self.discarded.load(Ordering::Relaxed)
    }

    /// Refetches that failed mid-flight (previous snapshot kept).
    pub fn failed_refetches(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// Re-read every collection and replace the snapshot atomically.
    /// Returns the version the engine holds afterwards.
    ///
    /// A failure keeps the previously installed snapshot; a result that
    /// lost the race against a newer refetch is dropped on the floor and
    /// counted, never installed.
    pub async fn refetch_all(&self) -> Result<u64, SyncError> {
        let token = self.refetch_seq.fetch_add(1, Ordering::SeqCst) + 1;

        let fetched = match self.fetch_collections().await {
            Ok(fetched) => fetched,
            Err(e) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                return Err(e);
            }
        };
        let (trips, trip_events, users, vehicles, locations) = fetched;

        let mut current = self.snapshot.write().await;
        if token != self.refetch_seq.load(Ordering::SeqCst) {
            // A newer refetch started while this one was in flight
            self.discarded.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(token, "Discarding superseded refetch result");
            return Ok(current.version);
        }

        let version = current.version + 1;
        *current = Arc::new(Snapshot::build(
            version,
            trips,
            trip_events,
            users,
            vehicles,
            locations,
        ));
        tracing::debug!(
            version,
            trips = current.trips.len(),
            events = current.trip_events.len(),
            "Installed snapshot"
        );

        let _ = self.updates_tx.send(SnapshotUpdate {
            version,
            timestamp: Utc::now(),
        });
        Ok(version)
    }

    #[allow(clippy::type_complexity)]
    async fn fetch_collections(
        &self,
    ) -> Result<
        (
            Vec<livery_trip::Trip>,
            Vec<livery_trip::TripEvent>,
            Vec<livery_fleet::User>,
            Vec<livery_fleet::Vehicle>,
            Vec<livery_fleet::LocationUpdate>,
        ),
        SyncError,
    > {
        let trips = self
            .trips
            .list_trips()
            .await
            .map_err(|e| SyncError::Fetch(e.to_string()))?;
        let trip_events = self
            .events
            .list_events()
            .await
            .map_err(|e| SyncError::Fetch(e.to_string()))?;
        let users = self
            .users
            .list_users()
            .await
            .map_err(|e| SyncError::Fetch(e.to_string()))?;
        let vehicles = self
            .vehicles
            .list_vehicles()
            .await
            .map_err(|e| SyncError::Fetch(e.to_string()))?;
        let locations = self
            .locations
            .list_locations()
            .await
            .map_err(|e| SyncError::Fetch(e.to_string()))?;
        Ok((trips, trip_events, users, vehicles, locations))
    }
}

/// Long-lived pump: change notifications and poll ticks both funnel into
/// the same refetch entry point. If the feed dies the worker degrades to
/// polling only.
pub async fn run_sync_worker(
    engine: Arc<SyncEngine>,
    mut feed: Box<dyn ChangeFeed>,
    poll_interval: std::time::Duration,
) {
    tracing::info!(poll_secs = poll_interval.as_secs(), "Starting sync worker");

    if let Err(e) = engine.refetch_all().await {
        tracing::error!("Initial refetch failed: {}", e);
    }

    let mut ticker = tokio::time::interval(poll_interval);
    // Skip the first tick which fires immediately (we already fetched above)
    ticker.tick().await;

    loop {
        tokio::select! {
            notice = feed.next_change() => match notice {
                Ok(notice) => {
                    tracing::debug!(table = %notice.table, op = %notice.op, "Change notice");
                    if let Err(e) = engine.refetch_all().await {
                        tracing::error!("Refetch after change notice failed: {}", e);
                    }
                }
                Err(e) => {
                    tracing::error!("Change feed closed, falling back to polling: {}", e);
                    break;
                }
            },
            _ = ticker.tick() => {
                if let Err(e) = engine.refetch_all().await {
                    tracing::error!("Poll refetch failed: {}", e);
                }
            }
        }
    }

    loop {
        ticker.tick().await;
        if let Err(e) = engine.refetch_all().await {
            tracing::error!("Poll refetch failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{
        completed_trip, driver_user, ChannelFeed, Gate, StubEvents, StubLocations, StubTrips,
        StubUsers, StubVehicles,
    };
    use livery_core::feed::ChangeNotice;

    fn engine_with(trips: Arc<StubTrips>) -> SyncEngine {
        SyncEngine::new(
            trips,
            Arc::new(StubEvents::default()),
            Arc::new(StubUsers::default()),
            Arc::new(StubVehicles::default()),
            Arc::new(StubLocations::default()),
        )
    }

    #[tokio::test]
    async fn refetch_installs_snapshot_and_notifies() {
        let driver = driver_user(30.0);
        let trips = Arc::new(StubTrips::with(vec![completed_trip(driver.id)]));
        let engine = engine_with(trips);
        let mut updates = engine.subscribe();

        let version = engine.refetch_all().await.unwrap();
        assert_eq!(version, 1);

        let snap = engine.snapshot().await;
        assert_eq!(snap.version, 1);
        assert_eq!(snap.trips.len(), 1);

        let update = updates.recv().await.unwrap();
        assert_eq!(update.version, 1);
    }

    #[tokio::test]
    async fn failed_refetch_keeps_previous_snapshot() {
        let driver = driver_user(30.0);
        let trips = Arc::new(StubTrips::with(vec![completed_trip(driver.id)]));
        let engine = engine_with(trips.clone());

        engine.refetch_all().await.unwrap();
        assert_eq!(engine.snapshot().await.version, 1);

        trips.fail_next();
        let err = engine.refetch_all().await;
        assert!(err.is_err());

        // Stale data survives the failure
        let snap = engine.snapshot().await;
        assert_eq!(snap.version, 1);
        assert_eq!(snap.trips.len(), 1);
        assert_eq!(engine.failed_refetches(), 1);
    }

    #[tokio::test]
    async fn stale_refetch_result_is_discarded() {
        let trips = Arc::new(StubTrips::default());
        let engine = Arc::new(engine_with(trips.clone()));

        // First refetch blocks inside the repository until released
        let gate = Gate::new();
        trips.block_next(gate.clone());

        let slow_engine = engine.clone();
        let slow = tokio::spawn(async move { slow_engine.refetch_all().await });

        // Wait until the slow refetch holds its token and sits in the fetch
        gate.entered.notified().await;

        // A newer refetch completes while the first is still in flight
        let fast_version = engine.refetch_all().await.unwrap();
        assert_eq!(fast_version, 1);

        gate.release.notify_one();
        let slow_version = slow.await.unwrap().unwrap();

        // The slow result was dropped, not installed over the fresh one
        assert_eq!(slow_version, 1);
        assert_eq!(engine.snapshot().await.version, 1);
        assert_eq!(engine.discarded_refetches(), 1);
    }

    #[tokio::test]
    async fn worker_refetches_on_change_notice() {
        let trips = Arc::new(StubTrips::default());
        let engine = Arc::new(engine_with(trips));

        let (feed, notices) = ChannelFeed::pair();
        let mut updates = engine.subscribe();
        let worker = tokio::spawn(run_sync_worker(
            engine.clone(),
            Box::new(feed),
            std::time::Duration::from_secs(600),
        ));

        // Initial refetch
        let first = updates.recv().await.unwrap();
        assert_eq!(first.version, 1);

        notices
            .send(ChangeNotice {
                table: "trips".to_string(),
                op: "UPDATE".to_string(),
            })
            .await
            .unwrap();

        let second = updates.recv().await.unwrap();
        assert_eq!(second.version, 2);

        worker.abort();
    }
}
