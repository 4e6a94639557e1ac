//! Login endpoint

use actix_web::{web, HttpResponse};

use ch_core::repositories::{SessionStore, TenantDirectory, UserDirectory};
use ch_core::services::email::EmailDispatcher;

use crate::dto::auth::{AuthResponse, LoginRequest};
use crate::handlers::error::domain_error_response;

use super::{session_cookies, AppState};

/// Handler for POST /api/v1/auth/login
///
/// Authenticates with email and password and opens a new session. The
/// tokens are returned in the body for native clients and set as HttpOnly
/// cookies for browsers.
///
/// # Errors
/// - 401 `AUTHENTICATION_FAILED`: wrong email or password
/// - 403 `USER_INVALID`: account or tenant is not active
/// - 429: too many attempts from this address
pub async fn login<S, U, T, E>(
    state: web::Data<AppState<S, U, T, E>>,
    request: web::Json<LoginRequest>,
) -> HttpResponse
where
    S: SessionStore + 'static,
    U: UserDirectory + 'static,
    T: TenantDirectory + 'static,
    E: EmailDispatcher + 'static,
{
    match state
        .auth_service
        .login(&request.email, &request.password)
        .await
    {
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
