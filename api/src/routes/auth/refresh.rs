//! Refresh endpoint

use actix_web::{web, HttpRequest, HttpResponse};

use ch_core::errors::{DomainError, TokenError};
use ch_core::repositories::{SessionStore, TenantDirectory, UserDirectory};
use ch_core::services::email::EmailDispatcher;

use crate::dto::auth::{AuthResponse, RefreshRequest};
use crate::handlers::error::domain_error_response;

use super::{session_cookies, AppState};

/// Handler for POST /api/v1/auth/refresh
///
/// Rotates a refresh token. The token is taken from the JSON body when
/// present, from the refresh cookie otherwise. On success both cookies are
/// replaced with the new pair.
///
/// # Errors
/// - 401 `INVALID_REFRESH_TOKEN`: missing, malformed, expired, or revoked
/// - 401 `TOKEN_REUSE`: a superseded token was replayed; every session of
///   the subject has been revoked
/// - 403 `USER_INVALID`: the subject is no longer welcome
pub async fn refresh<S, U, T, E>(
    state: web::Data<AppState<S, U, T, E>>,
    http_request: HttpRequest,
    request: Option<web::Json<RefreshRequest>>,
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

    let Some(token) = token else {
        return domain_error_response(DomainError::Token(TokenError::InvalidRefreshToken));
    };

    match state.auth_service.refresh(&token).await {
        Ok(session) => {
            let [access, refresh] = session_cookies(&state.cookie, &session);
            HttpResponse::Ok()
                .cookie(access)
                .cookie(refresh)
                .json(AuthResponse::from(&session))
        }
        Err(error) => domain_error_response(error),
    }
}
