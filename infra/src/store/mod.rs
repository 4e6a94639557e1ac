//! Store module - Redis-backed session state

pub mod session_store;

pub use session_store::RedisSessionStore;
