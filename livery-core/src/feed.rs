use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One change notification from the store. The sync layer treats every
/// notice the same way (full refetch); table and op exist for logging.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChangeNotice {
    pub table: String,
    pub op: String,
}

/// Stream of change notifications scoped to the tables the snapshot
/// depends on (trips, trip_events, users, vehicles, location_updates).
#[async_trait]
pub trait ChangeFeed: Send {
    /// Wait for the next change notice. Implementations reconnect
    /// internally; an Err means the feed is gone for good.
    async fn next_change(
        &mut self,
    ) -> Result<ChangeNotice, Box<dyn std::error::Error + Send + Sync>>;
}
