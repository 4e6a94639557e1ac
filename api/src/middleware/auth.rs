//! Authentication gateway middleware
//!
//! Extracts the access token (Authorization bearer header first, access
//! cookie as fallback), runs it through the full authentication pipeline
//! (signature, expiry, revocation marker), and injects an `AuthContext`
//! into request extensions for handlers and extractors downstream.

use actix_web::{
    body::EitherBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    http::header::AUTHORIZATION,
    Error, FromRequest, HttpMessage, HttpRequest,
};
use async_trait::async_trait;
use futures_util::future::LocalBoxFuture;
use std::{
    future::{ready, Ready},
    rc::Rc,
    sync::Arc,
    task::{Context, Poll},
};
use tracing::debug;
use uuid::Uuid;

use ch_core::domain::entities::token::Claims;
use ch_core::errors::{AuthError, DomainError, DomainResult, TokenError};
use ch_core::repositories::{SessionStore, TenantDirectory, UserDirectory};
use ch_core::services::auth::AuthService;
use ch_core::services::email::EmailDispatcher;

use crate::handlers::error::domain_error_response;

/// Cookie carrying the access token for browser clients
pub const ACCESS_TOKEN_COOKIE: &str = "access_token";

/// Dyn-safe access-token verification seam
///
/// The gateway only needs `authenticate`; hiding the service's generics
/// behind this trait keeps the middleware free of type parameters.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Verify an access token against signature, expiry, and revocation
    async fn authenticate(&self, access_token: &str) -> DomainResult<Claims>;
}

#[async_trait]
impl<S, U, T, E> Authenticator for AuthService<S, U, T, E>
where
    S: SessionStore + 'static,
    U: UserDirectory + 'static,
    T: TenantDirectory + 'static,
    E: EmailDispatcher + 'static,
{
    async fn authenticate(&self, access_token: &str) -> DomainResult<Claims> {
        AuthService::authenticate(self, access_token).await
    }
}

/// Authenticated caller context injected into requests
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// Subject the token was issued for
    pub user_id: Uuid,
    /// Email from the access-token claims
    pub email: Option<String>,
    /// Role from the access-token claims
    pub role: Option<String>,
    /// Tenant the caller belongs to, if any
    pub tenant_id: Option<Uuid>,
    /// JWT ID for request correlation
    pub jti: String,
}

impl AuthContext {
    /// Build a context from verified claims
    pub fn from_claims(claims: &Claims) -> Result<Self, DomainError> {
        let user_id = claims
            .user_id()
            .map_err(|_| DomainError::Token(TokenError::InvalidTokenFormat))?;
        Ok(Self {
            user_id,
            email: claims.email.clone(),
            role: claims.role.clone(),
            tenant_id: claims.tenant_id(),
            jti: claims.jti.clone(),
        })
    }

    /// Reject callers without the given role
    pub fn require_role(&self, role: &str) -> Result<(), DomainError> {
        if self.role.as_deref() == Some(role) {
            Ok(())
        } else {
            Err(DomainError::Auth(AuthError::UserInvalid))
        }
    }

    /// Reject callers outside the given tenant
    pub fn require_tenant(&self, tenant_id: Uuid) -> Result<(), DomainError> {
        if self.tenant_id == Some(tenant_id) {
            Ok(())
        } else {
            Err(DomainError::Auth(AuthError::UserInvalid))
        }
    }
}

/// Authentication gateway middleware factory
pub struct AuthGateway {
    authenticator: Arc<dyn Authenticator>,
    required: bool,
}

impl AuthGateway {
    /// Create a gateway backed by the given authenticator
    pub fn new(authenticator: Arc<dyn Authenticator>) -> Self {
        Self {
            authenticator,
            required: true,
        }
    }

    /// Create a gateway that runs the same verification pipeline but lets
    /// the request through unauthenticated when it fails
    ///
    /// Handlers behind it read the outcome through [`OptionalAuth`].
    pub fn optional(authenticator: Arc<dyn Authenticator>) -> Self {
        Self {
            authenticator,
            required: false,
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthGateway
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthGatewayMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthGatewayMiddleware {
            service: Rc::new(service),
            authenticator: self.authenticator.clone(),
            required: self.required,
        }))
    }
}

/// Authentication gateway middleware service
pub struct AuthGatewayMiddleware<S> {
    service: Rc<S>,
    authenticator: Arc<dyn Authenticator>,
    required: bool,
}

impl<S, B> Service<ServiceRequest> for AuthGatewayMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, ctx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let authenticator = self.authenticator.clone();
        let required = self.required;

        Box::pin(async move {
            let outcome = match extract_access_token(&req) {
                Some(token) => match authenticator.authenticate(&token).await {
                    Ok(claims) => AuthContext::from_claims(&claims),
                    Err(e) => {
                        debug!(code = e.code(), "access token rejected");
                        Err(e)
                    }
                },
                None => Err(DomainError::Auth(AuthError::AuthRequired)),
            };

            match outcome {
                Ok(context) => {
                    req.extensions_mut().insert(context);
                }
                Err(e) if required => {
                    return Ok(rejection(req, e));
                }
                // Optional mode proceeds unauthenticated.
                Err(_) => {}
            }

            let res = service.call(req).await?;
            Ok(res.map_into_left_body())
        })
    }
}

/// Bearer header first, access cookie as fallback
fn extract_access_token(req: &ServiceRequest) -> Option<String> {
    let bearer = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|s| s.to_string());

    bearer.or_else(|| req.cookie(ACCESS_TOKEN_COOKIE).map(|c| c.value().to_string()))
}

/// Turn the request around with the mapped error response
///
/// The rejection is a real response rather than an actix error so outer
/// middleware (CORS in particular) still decorates it.
fn rejection<B>(req: ServiceRequest, error: DomainError) -> ServiceResponse<EitherBody<B>> {
    req.into_response(domain_error_response(error))
        .map_into_right_body()
}

/// Extractor for required authentication
///
/// Only succeeds behind `AuthGateway`; elsewhere it rejects with 401.
impl FromRequest for AuthContext {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut actix_web::dev::Payload) -> Self::Future {
        let result = req.extensions().get::<AuthContext>().cloned().ok_or_else(|| {
            actix_web::error::InternalError::from_response(
                "authentication required",
                domain_error_response(DomainError::Auth(AuthError::AuthRequired)),
            )
            .into()
        });
        ready(result)
    }
}

/// Extractor for optional authentication
///
/// Swallows the absence of a context instead of rejecting. Routes that
/// want the pipeline to run without mandating a credential mount
/// [`AuthGateway::optional`] and read the outcome through this.
pub struct OptionalAuth(pub Option<AuthContext>);

impl FromRequest for OptionalAuth {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut actix_web::dev::Payload) -> Self::Future {
        let auth = req.extensions().get::<AuthContext>().cloned();
        ready(Ok(OptionalAuth(auth)))
    }
}
