//! # Infrastructure Layer
//!
//! Concrete implementations of the core's external-state traits:
//! - **Cache**: a retrying Redis client over a multiplexed connection
//! - **Store**: the Redis-backed session store (token families, revocation
//!   markers, one-time tokens)
//! - **Services**: the Redis sliding-window rate limiter
//!
//! Everything here maps store-level failures to `StoreError::Unavailable`;
//! policy (fail open vs fail closed) stays in the core and the API layer.

pub mod cache;
pub mod error;
pub mod services;
pub mod store;

pub use cache::redis_client::RedisClient;
pub use error::InfrastructureError;
pub use services::rate_limiter::RedisRateLimiter;
pub use store::session_store::RedisSessionStore;
