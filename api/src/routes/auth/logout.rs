//! Logout endpoints

use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::json;
use tracing::info;

use ch_core::repositories::{SessionStore, TenantDirectory, UserDirectory};
use ch_core::services::email::EmailDispatcher;

use crate::dto::auth::LogoutRequest;
use crate::handlers::error::domain_error_response;
use crate::middleware::auth::AuthContext;

use super::{clearing_cookies, AppState};

/// Handler for POST /api/v1/auth/logout
///
/// Closes the session behind the presented refresh token (body or cookie)
/// and clears both token cookies. Deliberately never fails on an invalid
/// token: the client is leaving either way.
pub async fn logout<S, U, T, E>(
    state: web::Data<AppState<S, U, T, E>>,
    http_request: HttpRequest,
    request: Option<web::Json<LogoutRequest>>,
) -> HttpResponse
where
    S: SessionStore + 'static,
    U: UserDirectory + 'static,
    T: TenantDirectory + 'static,
    E: EmailDispatcher + 'static,
{
    let token = request
        .and_then(|r| r.refresh_token.clone())
        .or_else(|| {
            http_request
                .cookie(&state.cookie.refresh_name)
                .map(|c| c.value().to_string())
        });

    if let Some(token) = token {
        // Best effort by contract; the service swallows failures.
        let _ = state.auth_service.logout(&token).await;
    }

    let [access, refresh] = clearing_cookies(&state.cookie);
    HttpResponse::NoContent().cookie(access).cookie(refresh).finish()
}

/// Handler for POST /api/v1/auth/logout-all
///
/// Revokes every session of the authenticated caller: all refresh families
/// are dropped and outstanding access tokens die at the revocation marker.
pub async fn logout_all<S, U, T, E>(
    state: web::Data<AppState<S, U, T, E>>,
    context: AuthContext,
) -> HttpResponse
where
    S: SessionStore + 'static,
    U: UserDirectory + 'static,
    T: TenantDirectory + 'static,
    E: EmailDispatcher + 'static,
{
    match state.auth_service.logout_all(context.user_id).await {
        Ok(dropped) => {
            info!(user_id = %context.user_id, dropped, "logout-all requested");
            let [access, refresh] = clearing_cookies(&state.cookie);
            HttpResponse::Ok()
                .cookie(access)
                .cookie(refresh)
                .json(json!({ "revoked_sessions": dropped }))
        }
        Err(error) => domain_error_response(error),
    }
}
