//! Shared configuration and wire types for the CourseHub auth server
//!
//! This crate provides common functionality used across all server modules:
//! - Configuration types (loaded from the environment)
//! - Error response structures shared by every API endpoint

pub mod config;
pub mod errors;

// Re-export commonly used items at crate root
pub use config::{
    AppConfig, AuthConfig, CacheConfig, CookieConfig, CorsConfig, Environment, JwtConfig,
    LoggingConfig, RateLimitConfig, ServerConfig, TierQuota,
};
pub use errors::{error_codes, ErrorResponse};
