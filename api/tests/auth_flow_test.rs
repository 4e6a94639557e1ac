//! End-to-end authentication flow tests over in-memory implementations
//!
//! These drive the real app factory (routes, middleware, error mapping)
//! with the mock session store and directories, so the whole
//! login → refresh → replay → revocation story is exercised without Redis.

use std::sync::Arc;
use std::time::Duration;

use actix_web::{http::StatusCode, test, web};
use async_trait::async_trait;
use serde_json::Value;

use ch_api::app::{create_app, AppComponents, HealthCheck};
use ch_api::middleware::auth::Authenticator;
use ch_api::routes::auth::AppState;
use ch_core::domain::entities::user::{User, UserRole};
use ch_core::repositories::{MockSessionStore, MockTenantDirectory, MockUserDirectory, TenantDirectory};
use ch_core::services::auth::{AuthService, AuthServiceConfig};
use ch_core::services::email::MockEmailDispatcher;
use ch_core::services::rate_limit::{MemoryRateLimiter, RateLimiter};
use ch_core::services::token::{TokenService, TokenServiceConfig};
use ch_shared::config::{CookieConfig, CorsConfig, RateLimitConfig, TierQuota};

struct AlwaysHealthy;

#[async_trait]
impl HealthCheck for AlwaysHealthy {
    async fn healthy(&self) -> bool {
        true
    }
}

struct TestEnv {
    state: web::Data<AppState<MockSessionStore, MockUserDirectory, MockTenantDirectory, MockEmailDispatcher>>,
    components: AppComponents,
}

async fn setup(rate_limit: RateLimitConfig) -> TestEnv {
    let store = MockSessionStore::new();
    let users = MockUserDirectory::new();
    let tenants = Arc::new(MockTenantDirectory::new());
    let token_service = Arc::new(TokenService::new(TokenServiceConfig::new(
        "itest-access-secret",
        "itest-refresh-secret",
    )));

    users
        .add_user(
            User::new("alice@example.com".to_string(), UserRole::Student, None),
            "Correct-Horse-9",
        )
        .await;

    let auth_service = Arc::new(AuthService::new(
        Arc::new(store),
        Arc::new(users),
        tenants.clone(),
        Arc::new(MockEmailDispatcher::new()),
        token_service.clone(),
        AuthServiceConfig::default(),
    ));

    let mut cookie = CookieConfig::default();
    cookie.secure = false;

    TestEnv {
        state: web::Data::new(AppState {
            auth_service: auth_service.clone(),
            cookie,
        }),
        components: AppComponents {
            authenticator: auth_service as Arc<dyn Authenticator>,
            limiter: Arc::new(MemoryRateLimiter::new()) as Arc<dyn RateLimiter>,
            token_service,
            tenant_directory: tenants as Arc<dyn TenantDirectory>,
            health: Arc::new(AlwaysHealthy),
            rate_limit,
            cors: CorsConfig::development(),
        },
    }
}

macro_rules! login {
    ($app:expr) => {{
        let req = test::TestRequest::post()
            .uri("/api/v1/auth/login")
            .set_json(serde_json::json!({
                "email": "alice@example.com",
                "password": "Correct-Horse-9"
            }))
            .to_request();
        let resp = test::call_service($app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        body
    }};
}

#[actix_web::test]
async fn test_login_refresh_replay_reuse_cascade() {
    let env = setup(RateLimitConfig::disabled()).await;
    let app = test::init_service(create_app(env.state.clone(), env.components.clone())).await;

    // Wrong password is a generic 401.
    let req = test::TestRequest::post()
        .uri("/api/v1/auth/login")
        .set_json(serde_json::json!({
            "email": "alice@example.com",
            "password": "wrong"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    // Login, then rotate once.
    let body = login!(&app);
    let first_refresh = body["refresh_token"].as_str().unwrap().to_string();
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["user"]["email"], "alice@example.com");

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/refresh")
        .set_json(serde_json::json!({ "refresh_token": first_refresh }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let rotated: Value = test::read_body_json(resp).await;
    let second_refresh = rotated["refresh_token"].as_str().unwrap().to_string();
    assert_ne!(second_refresh, first_refresh);

    // Replaying the superseded token trips reuse detection.
    let req = test::TestRequest::post()
        .uri("/api/v1/auth/refresh")
        .set_json(serde_json::json!({ "refresh_token": first_refresh }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let error: Value = test::read_body_json(resp).await;
    assert_eq!(error["error"], "TOKEN_REUSE");

    // The cascade killed the rotated token too.
    let req = test::TestRequest::post()
        .uri("/api/v1/auth/refresh")
        .set_json(serde_json::json!({ "refresh_token": second_refresh }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let error: Value = test::read_body_json(resp).await;
    assert_eq!(error["error"], "INVALID_REFRESH_TOKEN");

    // A fresh login still works.
    login!(&app);
}

#[actix_web::test]
async fn test_logout_all_revokes_outstanding_access_tokens() {
    let env = setup(RateLimitConfig::disabled()).await;
    let app = test::init_service(create_app(env.state.clone(), env.components.clone())).await;

    let body = login!(&app);
    let access = body["access_token"].as_str().unwrap().to_string();

    // The revocation marker has second granularity; keep the token's
    // issue time strictly before it.
    tokio::time::sleep(Duration::from_millis(1100)).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/logout-all")
        .insert_header(("Authorization", format!("Bearer {access}")))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["revoked_sessions"], 1);

    // The same access token is now rejected at the gateway.
    let req = test::TestRequest::post()
        .uri("/api/v1/auth/logout-all")
        .insert_header(("Authorization", format!("Bearer {access}")))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let error: Value = test::read_body_json(resp).await;
    assert_eq!(error["error"], "TOKEN_REVOKED");
}

#[actix_web::test]
async fn test_protected_routes_require_authentication() {
    let env = setup(RateLimitConfig::disabled()).await;
    let app = test::init_service(create_app(env.state.clone(), env.components.clone())).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/logout-all")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let error: Value = test::read_body_json(resp).await;
    assert_eq!(error["error"], "AUTH_REQUIRED");
}

#[actix_web::test]
async fn test_logout_clears_cookies_even_for_garbage_tokens() {
    let env = setup(RateLimitConfig::disabled()).await;
    let app = test::init_service(create_app(env.state.clone(), env.components.clone())).await;

    let body = login!(&app);
    let access = body["access_token"].as_str().unwrap().to_string();

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/logout")
        .insert_header(("Authorization", format!("Bearer {access}")))
        .set_json(serde_json::json!({ "refresh_token": "not-a-jwt" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let cleared: Vec<_> = resp.response().cookies().collect();
    assert!(cleared.iter().any(|c| c.name() == "access_token"));
    assert!(cleared.iter().any(|c| c.name() == "refresh_token"));
}

#[actix_web::test]
async fn test_auth_endpoints_rate_limit_returns_429() {
    let mut rate_limit = RateLimitConfig::disabled();
    rate_limit.enabled = true;
    rate_limit.auth_endpoints = TierQuota::new(60, 2);
    let env = setup(rate_limit).await;
    let app = test::init_service(create_app(env.state.clone(), env.components.clone())).await;

    for _ in 0..2 {
        let req = test::TestRequest::post()
            .uri("/api/v1/auth/login")
            .set_json(serde_json::json!({
                "email": "alice@example.com",
                "password": "Correct-Horse-9"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.headers().contains_key("x-ratelimit-limit"));
        assert!(resp.headers().contains_key("x-ratelimit-remaining"));
    }

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/login")
        .insert_header(("Origin", "http://localhost:3000"))
        .set_json(serde_json::json!({
            "email": "alice@example.com",
            "password": "Correct-Horse-9"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(resp.headers().contains_key("retry-after"));
    assert!(resp.headers().contains_key("x-ratelimit-limit"));
    // The rejection is a real response, so a browser on a listed origin
    // can still read the quota headers.
    assert_eq!(
        resp.headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("http://localhost:3000")
    );
    let error: Value = test::read_body_json(resp).await;
    assert_eq!(error["error"], "RATE_LIMIT_EXCEEDED");
}

#[actix_web::test]
async fn test_health_endpoint() {
    let env = setup(RateLimitConfig::disabled()).await;
    let app = test::init_service(create_app(env.state.clone(), env.components.clone())).await;

    let req = test::TestRequest::get().uri("/health").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["cache"], "up");
}
