//! Tiered rate limiting middleware
//!
//! Resolves each request to a quota tier, bills it against the shared
//! sliding-window limiter, and annotates responses with `X-RateLimit-*`
//! headers. Auth endpoints are always billed per IP with their own tight
//! budget; other traffic is billed per tenant when the caller presents a
//! valid access token, per IP otherwise.
//!
//! The limiter FAILS OPEN: if the store is unreachable the request goes
//! through and we log loudly. Availability wins over quota enforcement;
//! the security-critical paths (rotation, revocation) fail closed in the
//! core instead.

use actix_web::{
    body::EitherBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    http::header::{HeaderName, HeaderValue, AUTHORIZATION, RETRY_AFTER},
    Error, HttpResponse,
};
use futures_util::future::LocalBoxFuture;
use std::{
    future::{ready, Ready},
    rc::Rc,
    sync::Arc,
    task::{Context, Poll},
    time::Duration,
};
use tracing::{debug, error};

use ch_core::domain::entities::user::TenantPlan;
use ch_core::repositories::TenantDirectory;
use ch_core::services::rate_limit::{RateLimitDecision, RateLimitTier, RateLimiter};
use ch_core::services::token::TokenService;
use ch_shared::config::{RateLimitConfig, TierQuota};
use ch_shared::errors::ErrorResponse;

use super::auth::ACCESS_TOKEN_COOKIE;

const HEADER_LIMIT: &str = "x-ratelimit-limit";
const HEADER_REMAINING: &str = "x-ratelimit-remaining";
const HEADER_RESET: &str = "x-ratelimit-reset";

/// Rate limiting middleware factory
pub struct RateLimitGuard {
    limiter: Arc<dyn RateLimiter>,
    token_service: Arc<TokenService>,
    tenant_directory: Arc<dyn TenantDirectory>,
    config: RateLimitConfig,
}

impl RateLimitGuard {
    /// Create a new guard
    ///
    /// The token service is used only to read the tenant claim for tier
    /// resolution; full authentication (revocation check included) stays
    /// with the auth gateway.
    pub fn new(
        limiter: Arc<dyn RateLimiter>,
        token_service: Arc<TokenService>,
        tenant_directory: Arc<dyn TenantDirectory>,
        config: RateLimitConfig,
    ) -> Self {
        Self {
            limiter,
            token_service,
            tenant_directory,
            config,
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimitGuard
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = RateLimitGuardMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimitGuardMiddleware {
            service: Rc::new(service),
            limiter: self.limiter.clone(),
            token_service: self.token_service.clone(),
            tenant_directory: self.tenant_directory.clone(),
            config: self.config.clone(),
        }))
    }
}

/// Rate limiting middleware service
pub struct RateLimitGuardMiddleware<S> {
    service: Rc<S>,
    limiter: Arc<dyn RateLimiter>,
    token_service: Arc<TokenService>,
    tenant_directory: Arc<dyn TenantDirectory>,
    config: RateLimitConfig,
}

impl<S, B> Service<ServiceRequest> for RateLimitGuardMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let limiter = self.limiter.clone();
        let token_service = self.token_service.clone();
        let tenant_directory = self.tenant_directory.clone();
        let config = self.config.clone();

        Box::pin(async move {
            if !config.enabled {
                let res = service.call(req).await?;
                return Ok(res.map_into_left_body());
            }

            let ip = client_ip(&req);
            let tier = resolve_tier(&req, ip, &token_service, tenant_directory.as_ref()).await;
            let quota = quota_for(&config, &tier);

            let decision = match limiter
                .check(
                    &tier.key(),
                    Duration::from_secs(quota.window_seconds),
                    quota.max_requests,
                )
                .await
            {
                Ok(decision) => decision,
                Err(e) => {
                    // Fail open. This must be unmissable in the logs.
                    error!(error = %e, key = tier.key(), "rate limit store unavailable, admitting request unchecked");
                    let res = service.call(req).await?;
                    return Ok(res.map_into_left_body());
                }
            };

            if !decision.allowed {
                debug!(key = tier.key(), "request rejected by rate limit");
                // A real response, not an actix error: outer middleware
                // (CORS) must still get to decorate the rejection.
                return Ok(req
                    .into_response(too_many_requests(&decision))
                    .map_into_right_body());
            }

            let mut res = service.call(req).await?;
            apply_headers(res.headers_mut(), &decision);
            Ok(res.map_into_left_body())
        })
    }
}

/// Resolve the quota tier for a request
async fn resolve_tier(
    req: &ServiceRequest,
    ip: String,
    token_service: &TokenService,
    tenant_directory: &dyn TenantDirectory,
) -> RateLimitTier {
    if req.path().starts_with("/api/v1/auth") {
        return RateLimitTier::AuthEndpoints { ip };
    }

    let Some(token) = peek_access_token(req) else {
        return RateLimitTier::Anonymous { ip };
    };
    let Ok(claims) = token_service.verify_access(&token) else {
        return RateLimitTier::Anonymous { ip };
    };
    let Some(tenant_id) = claims.tenant_id() else {
        return RateLimitTier::Anonymous { ip };
    };

    // A directory hiccup bills the tenant at the standard tier rather than
    // letting the request skip tenant accounting entirely.
    match tenant_directory.find_tenant(tenant_id).await {
        Ok(Some(tenant)) if tenant.plan == TenantPlan::Premium => {
            RateLimitTier::BusinessPremium { tenant_id }
        }
        _ => RateLimitTier::Business { tenant_id },
    }
}

fn quota_for(config: &RateLimitConfig, tier: &RateLimitTier) -> TierQuota {
    match tier {
        RateLimitTier::Anonymous { .. } => config.anonymous,
        RateLimitTier::Business { .. } => config.business,
        RateLimitTier::BusinessPremium { .. } => config.business_premium,
        RateLimitTier::AuthEndpoints { .. } => config.auth_endpoints,
    }
}

fn client_ip(req: &ServiceRequest) -> String {
    req.connection_info()
        .realip_remote_addr()
        .unwrap_or("unknown")
        .to_string()
}

fn peek_access_token(req: &ServiceRequest) -> Option<String> {
    req.headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|s| s.to_string())
        .or_else(|| req.cookie(ACCESS_TOKEN_COOKIE).map(|c| c.value().to_string()))
}

fn apply_headers(headers: &mut actix_web::http::header::HeaderMap, decision: &RateLimitDecision) {
    let pairs = [
        (HEADER_LIMIT, decision.limit.to_string()),
        (HEADER_REMAINING, decision.remaining.to_string()),
        (HEADER_RESET, decision.reset_at.to_string()),
    ];
    for (name, value) in pairs {
        if let Ok(value) = HeaderValue::from_str(&value) {
            headers.insert(HeaderName::from_static(name), value);
        }
    }
}

fn too_many_requests(decision: &RateLimitDecision) -> HttpResponse {
    let retry_after = decision.retry_after_seconds.unwrap_or(1);
    let mut builder = HttpResponse::TooManyRequests();
    builder.insert_header((RETRY_AFTER, retry_after.to_string()));
    builder.insert_header((HEADER_LIMIT, decision.limit.to_string()));
    builder.insert_header((HEADER_REMAINING, "0"));
    builder.insert_header((HEADER_RESET, decision.reset_at.to_string()));
    builder.json(
        ErrorResponse::new("RATE_LIMIT_EXCEEDED", "Too many requests")
            .add_detail("retry_after_seconds", retry_after),
    )
}
