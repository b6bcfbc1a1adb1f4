pub mod app_config;
pub mod database;
pub mod events;
pub mod feed;
pub mod location_repo;
pub mod memory;
pub mod redis_repo;
pub mod trip_repo;
pub mod user_repo;
pub mod vehicle_repo;

pub use database::DbClient;
pub use events::EventProducer;
pub use feed::PgChangeFeed;
pub use memory::MemoryStore;
pub use redis_repo::RedisClient;
