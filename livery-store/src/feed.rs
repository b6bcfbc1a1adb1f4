use async_trait::async_trait;
use livery_core::feed::{ChangeFeed, ChangeNotice};
use serde::Deserialize;
use sqlx::postgres::PgListener;
use sqlx::PgPool;
use tracing::{debug, warn};

/// Channel the store's triggers notify on. Every insert, update or
/// delete against a snapshot table lands here as a JSON payload.
pub const CHANGE_CHANNEL: &str = "livery_changes";

#[derive(Deserialize)]
struct ChangePayload {
    table: String,
    op: String,
}

/// Change feed backed by Postgres LISTEN/NOTIFY. `PgListener` reconnects
/// on its own after connection loss; notifications raised while the
/// connection is down are lost, which the sync engine's poll ticker
/// covers.
pub struct PgChangeFeed {
    listener: PgListener,
}

impl PgChangeFeed {
    pub async fn connect(pool: &PgPool) -> Result<Self, sqlx::Error> {
        let mut listener = PgListener::connect_with(pool).await?;
        listener.listen(CHANGE_CHANNEL).await?;
        debug!(channel = CHANGE_CHANNEL, "listening for store changes");
        Ok(Self { listener })
    }
}

#[async_trait]
impl ChangeFeed for PgChangeFeed {
    async fn next_change(
        &mut self,
    ) -> Result<ChangeNotice, Box<dyn std::error::Error + Send + Sync>> {
        let notification = self.listener.recv().await?;
        match serde_json::from_str::<ChangePayload>(notification.payload()) {
            Ok(payload) => Ok(ChangeNotice {
                table: payload.table,
                op: payload.op,
            }),
            Err(e) => {
                // A malformed payload still means something changed
                warn!("Unparseable change payload ({}), refetching anyway", e);
                Ok(ChangeNotice {
                    table: "unknown".to_string(),
                    op: "unknown".to_string(),
                })
            }
        }
    }
}
