use std::sync::Arc;
use std::time::Duration;

use livery_store::{DbClient, PgChangeFeed};
use livery_sync::{run_sync_worker, SyncEngine};
use tracing::error;

/// Attach the Postgres change feed to the sync engine and keep the
/// snapshot fresh for the lifetime of the process. If the feed cannot
/// be established the worker degrades to polling instead of taking the
/// process down.
pub async fn start_sync_worker(engine: Arc<SyncEngine>, db: DbClient, poll_seconds: u64) {
    let poll_interval = Duration::from_secs(poll_seconds);

    match PgChangeFeed::connect(&db.pool).await {
        Ok(feed) => run_sync_worker(engine, Box::new(feed), poll_interval).await,
        Err(e) => {
            error!("Change feed unavailable, polling only: {}", e);
            poll_only(engine, poll_interval).await;
        }
    }
}

async fn poll_only(engine: Arc<SyncEngine>, poll_interval: Duration) {
    let mut ticker = tokio::time::interval(poll_interval);
    loop {
        ticker.tick().await;
        if let Err(e) = engine.refetch_all().await {
            error!("Poll refetch failed: {}", e);
        }
    }
}
