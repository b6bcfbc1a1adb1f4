pub mod engine;
pub mod reporter;
pub mod snapshot;

pub use engine::{run_sync_worker, SnapshotUpdate, SyncEngine, SyncError};
pub use reporter::{LocationReporter, ReporterHandle};
pub use snapshot::Snapshot;

#[cfg(test)]
mod testutil;
