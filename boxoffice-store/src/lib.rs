pub mod app_config;
pub mod database;
pub mod booking_repo;
pub mod redis_repo;

pub use booking_repo::StoreBookingRepository;
pub use database::DbClient;
pub use redis_repo::RedisClient;
