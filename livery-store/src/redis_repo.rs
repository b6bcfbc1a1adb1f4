use redis::{AsyncCommands, RedisResult};
use tracing::info;
use uuid::Uuid;

#[derive(Clone)]
pub struct RedisClient {
    client: redis::Client,
}

fn active_trip_key(driver_id: Uuid) -> String {
    format!("driver:{}:active_trip", driver_id)
}

impl RedisClient {
    pub async fn new(connection_string: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        Ok(Self { client })
    }

    /// Cache the trip a driver is currently running so location pings can
    /// tag samples without scanning the trip table. The TTL is a safety
    /// net; completing or cancelling the trip clears the key explicitly.
    pub async fn set_active_trip(
        &self,
        driver_id: Uuid,
        trip_id: Uuid,
        ttl_seconds: u64,
    ) -> Result<(), redis::RedisError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.set_ex::<_, _, ()>(active_trip_key(driver_id), trip_id.to_string(), ttl_seconds)
            .await?;
        info!("Active trip cached: {} -> {}", driver_id, trip_id);
        Ok(())
    }

    pub async fn get_active_trip(&self, driver_id: Uuid) -> RedisResult<Option<Uuid>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let raw: Option<String> = conn.get(active_trip_key(driver_id)).await?;
        Ok(raw.and_then(|s| Uuid::parse_str(&s).ok()))
    }

    pub async fn clear_active_trip(&self, driver_id: Uuid) -> RedisResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.del(active_trip_key(driver_id)).await
    }

    pub async fn check_rate_limit(
        &self,
        key: &str,
        limit: i64,
        window_seconds: i64,
    ) -> RedisResult<bool> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let (count,): (i64,) = redis::pipe()
            .atomic()
            .incr(key, 1)
            .expire(key, window_seconds)
            .ignore()
            .query_async(&mut conn)
            .await?;

        Ok(count <= limit)
    }
}
