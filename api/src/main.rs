//! CourseHub auth server entrypoint
//!
//! Wires the Redis-backed session store and rate limiter to the core
//! services and serves the HTTP surface. The user and tenant directories
//! are served from the in-memory implementations until the directory
//! service client lands; in development a seed account is provisioned so
//! the login flow can be exercised end to end.

use std::sync::Arc;
use std::time::Duration;

use actix_web::{web, HttpServer};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ch_core::domain::entities::user::{User, UserRole};
use ch_core::repositories::{MockTenantDirectory, MockUserDirectory, TenantDirectory};
use ch_core::services::auth::{AuthService, AuthServiceConfig};
use ch_core::services::email::MockEmailDispatcher;
use ch_core::services::rate_limit::RateLimiter;
use ch_core::services::token::{TokenService, TokenServiceConfig};
use ch_infra::{RedisClient, RedisRateLimiter, RedisSessionStore};
use ch_shared::config::AppConfig;

use ch_api::app::{create_app, AppComponents, HealthCheck};
use ch_api::middleware::auth::Authenticator;
use ch_api::routes::auth::AppState;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone())),
        )
        .init();

    info!(environment = %config.environment, "starting CourseHub auth server");

    if config.auth.jwt.is_using_default_secret() {
        warn!("running with development JWT secrets");
    }

    // Redis-backed session state and rate limiting.
    let redis = RedisClient::new(&config.cache)
        .await
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::ConnectionRefused, e.to_string()))?;
    let refresh_ttl =
        Duration::from_secs(config.auth.jwt.refresh_token_expiry_days as u64 * 24 * 60 * 60);
    let session_store = Arc::new(RedisSessionStore::new(redis.clone(), refresh_ttl));
    let limiter: Arc<dyn RateLimiter> = Arc::new(RedisRateLimiter::new(redis.clone()));
    let health: Arc<dyn HealthCheck> = Arc::new(redis);

    // Token service from the JWT configuration.
    let token_config = TokenServiceConfig {
        access_secret: config.auth.jwt.access_secret.clone(),
        refresh_secret: config.auth.jwt.refresh_secret.clone(),
        access_token_expiry_minutes: config.auth.jwt.access_token_expiry_minutes,
        refresh_token_expiry_days: config.auth.jwt.refresh_token_expiry_days,
        issuer: config.auth.jwt.issuer.clone(),
        audience: config.auth.jwt.audience.clone(),
    };
    let token_service = Arc::new(TokenService::new(token_config));

    // Directories are in-memory until the directory service client lands.
    let user_directory = Arc::new(MockUserDirectory::new());
    let tenant_directory = Arc::new(MockTenantDirectory::new());
    if config.environment.is_development() {
        let seed = User::new("dev@coursehub.dev".to_string(), UserRole::Admin, None);
        info!(email = %seed.email, "seeding development login account");
        user_directory.add_user(seed, "devpassword").await;
    }

    let auth_service = Arc::new(AuthService::new(
        session_store,
        user_directory,
        tenant_directory.clone(),
        Arc::new(MockEmailDispatcher::new()),
        token_service.clone(),
        AuthServiceConfig::default(),
    ));

    let app_state = web::Data::new(AppState {
        auth_service: auth_service.clone(),
        cookie: config.auth.cookie.clone(),
    });
    let components = AppComponents {
        authenticator: auth_service as Arc<dyn Authenticator>,
        limiter,
        token_service,
        tenant_directory: tenant_directory as Arc<dyn TenantDirectory>,
        health,
        rate_limit: config.rate_limit.clone(),
        cors: config.cors.clone(),
    };

    let bind_address = config.server.bind_address();
    info!(%bind_address, "binding HTTP server");

    let workers = config.server.workers;
    let mut server = HttpServer::new(move || create_app(app_state.clone(), components.clone()));
    if workers > 0 {
        server = server.workers(workers);
    }
    server.bind(bind_address)?.run().await
}
