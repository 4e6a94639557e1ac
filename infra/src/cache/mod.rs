//! Cache module - Redis client and operations

pub mod redis_client;

pub use redis_client::RedisClient;
