//! Configuration module with business-specific sub-modules
//!
//! This module organizes configuration into logical areas:
//! - `auth` - JWT secrets, token lifetimes, and cookie handling
//! - `cache` - Redis connection configuration
//! - `environment` - Environment detection and logging configuration
//! - `rate_limit` - Per-tier sliding-window quotas
//! - `server` - HTTP server and CORS configuration

pub mod auth;
pub mod cache;
pub mod environment;
pub mod rate_limit;
pub mod server;

use serde::{Deserialize, Serialize};

// Re-export commonly used types
pub use auth::{AuthConfig, CookieConfig, JwtConfig};
pub use cache::CacheConfig;
pub use environment::{Environment, LoggingConfig};
pub use rate_limit::{RateLimitConfig, TierQuota};
pub use server::{CorsConfig, ServerConfig};

/// Complete application configuration combining all sub-configurations
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Environment configuration
    pub environment: Environment,

    /// Server configuration
    pub server: ServerConfig,

    /// Authentication configuration
    pub auth: AuthConfig,

    /// Cache configuration
    pub cache: CacheConfig,

    /// Rate limiting configuration
    pub rate_limit: RateLimitConfig,

    /// CORS configuration
    #[serde(default)]
    pub cors: CorsConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        let env = Environment::default();
        Self {
            environment: env,
            server: ServerConfig::default(),
            auth: AuthConfig::default(),
            cache: CacheConfig::default(),
            rate_limit: RateLimitConfig::default(),
            cors: CorsConfig::default(),
            logging: LoggingConfig::for_environment(env),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// Environment-independent settings fall back to their defaults; the
    /// JWT secrets are the one thing production refuses to default.
    pub fn from_env() -> Result<Self, String> {
        let environment = Environment::from_env();
        let auth = AuthConfig::from_env(environment)?;

        Ok(Self {
            environment,
            server: ServerConfig::from_env(),
            auth,
            cache: CacheConfig::from_env(),
            rate_limit: if environment.is_production() {
                RateLimitConfig::production()
            } else {
                RateLimitConfig::development()
            },
            cors: if environment.is_production() {
                CorsConfig::default()
            } else {
                CorsConfig::development()
            },
            logging: LoggingConfig::for_environment(environment),
        })
    }
}
