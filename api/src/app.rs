//! Application factory
//!
//! Builds the Actix application with all middleware and routes. The
//! factory is generic over the capability traits so tests can run it over
//! in-memory mocks and production over the Redis-backed implementations.

use actix_web::{
    middleware::{Compat, Logger},
    web, App, HttpResponse,
};
use async_trait::async_trait;
use std::sync::Arc;

use ch_core::repositories::{SessionStore, TenantDirectory, UserDirectory};
use ch_core::services::email::EmailDispatcher;
use ch_core::services::rate_limit::RateLimiter;
use ch_core::services::token::TokenService;
use ch_infra::RedisClient;
use ch_shared::config::{CorsConfig, RateLimitConfig};
use ch_shared::errors::ErrorResponse;

use crate::middleware::auth::{AuthGateway, Authenticator};
use crate::middleware::cors::create_cors;
use crate::middleware::rate_limit::RateLimitGuard;
use crate::routes::auth::login::login;
use crate::routes::auth::logout::{logout, logout_all};
use crate::routes::auth::refresh::refresh;
use crate::routes::auth::AppState;

/// Liveness probe for the backing session store
#[async_trait]
pub trait HealthCheck: Send + Sync {
    /// True when the store answers
    async fn healthy(&self) -> bool;
}

#[async_trait]
impl HealthCheck for RedisClient {
    async fn healthy(&self) -> bool {
        self.health_check().await.unwrap_or(false)
    }
}

/// Everything the app factory needs besides the typed state
///
/// All fields are cheaply cloneable handles; the factory runs once per
/// server worker.
#[derive(Clone)]
pub struct AppComponents {
    pub authenticator: Arc<dyn Authenticator>,
    pub limiter: Arc<dyn RateLimiter>,
    pub token_service: Arc<TokenService>,
    pub tenant_directory: Arc<dyn TenantDirectory>,
    pub health: Arc<dyn HealthCheck>,
    pub rate_limit: RateLimitConfig,
    pub cors: CorsConfig,
}

/// Create and configure the application with all dependencies
pub fn create_app<S, U, T, E>(
    app_state: web::Data<AppState<S, U, T, E>>,
    components: AppComponents,
) -> App<
    impl actix_web::dev::ServiceFactory<
        actix_web::dev::ServiceRequest,
        Config = (),
        Response = actix_web::dev::ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
>
where
    S: SessionStore + 'static,
    U: UserDirectory + 'static,
    T: TenantDirectory + 'static,
    E: EmailDispatcher + 'static,
{
    let cors = create_cors(&components.cors);
    let rate_limit = RateLimitGuard::new(
        components.limiter,
        components.token_service,
        components.tenant_directory,
        components.rate_limit,
    );
    let gateway = AuthGateway::new(components.authenticator);

    App::new()
        .app_data(app_state)
        .app_data(web::Data::new(components.health))
        // Order matters: the last wrap runs first. CORS stays outermost so
        // rate-limit rejections still carry CORS headers for browsers;
        // Compat normalizes the body types the wrapped middleware produce.
        .wrap(Compat::new(Logger::default()))
        .wrap(rate_limit)
        .wrap(Compat::new(cors))
        // Health check endpoint
        .route("/health", web::get().to(health_check))
        // API v1 routes
        .service(
            web::scope("/api/v1").service(
                web::scope("/auth")
                    .route("/login", web::post().to(login::<S, U, T, E>))
                    .route("/refresh", web::post().to(refresh::<S, U, T, E>))
                    .service(
                        web::scope("")
                            .wrap(gateway)
                            .route("/logout", web::post().to(logout::<S, U, T, E>))
                            .route("/logout-all", web::post().to(logout_all::<S, U, T, E>)),
                    ),
            ),
        )
        // Default 404 handler
        .default_service(web::route().to(not_found))
}

/// Health check endpoint handler
///
/// Reports degraded with a 503 when the session store stops answering.
async fn health_check(probe: web::Data<Arc<dyn HealthCheck>>) -> HttpResponse {
    let cache_up = probe.healthy().await;
    let body = serde_json::json!({
        "status": if cache_up { "healthy" } else { "degraded" },
        "cache": if cache_up { "up" } else { "down" },
        "service": "coursehub-auth",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });
    if cache_up {
        HttpResponse::Ok().json(body)
    } else {
        HttpResponse::ServiceUnavailable().json(body)
    }
}

/// Default handler for unknown routes
async fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(ErrorResponse::new("NOT_FOUND", "Resource not found"))
}
