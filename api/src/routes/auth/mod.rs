//! Authentication route handlers
//!
//! - `POST /api/v1/auth/login` - credential login, opens a session
//! - `POST /api/v1/auth/refresh` - refresh-token rotation
//! - `POST /api/v1/auth/logout` - close one session (gateway-protected)
//! - `POST /api/v1/auth/logout-all` - revoke every session (gateway-protected)

pub mod login;
pub mod logout;
pub mod refresh;

use std::sync::Arc;

use actix_web::cookie::{time::Duration as CookieDuration, Cookie, SameSite};

use ch_core::domain::value_objects::AuthSession;
use ch_core::repositories::{SessionStore, TenantDirectory, UserDirectory};
use ch_core::services::auth::AuthService;
use ch_core::services::email::EmailDispatcher;
use ch_shared::config::CookieConfig;

/// Shared application state for auth handlers
pub struct AppState<S, U, T, E>
where
    S: SessionStore,
    U: UserDirectory,
    T: TenantDirectory,
    E: EmailDispatcher,
{
    pub auth_service: Arc<AuthService<S, U, T, E>>,
    pub cookie: CookieConfig,
}

fn same_site(config: &CookieConfig) -> SameSite {
    match config.same_site.as_str() {
        "Lax" => SameSite::Lax,
        "None" => SameSite::None,
        _ => SameSite::Strict,
    }
}

/// Cookies carrying the freshly issued token pair
pub(crate) fn session_cookies(config: &CookieConfig, session: &AuthSession) -> [Cookie<'static>; 2] {
    let access = Cookie::build(config.access_name.clone(), session.tokens.access_token.clone())
        .path("/")
        .http_only(true)
        .secure(config.secure)
        .same_site(same_site(config))
        .max_age(CookieDuration::seconds(session.tokens.access_expires_in))
        .finish();

    // The refresh cookie is scoped to the auth endpoints so it never rides
    // along on ordinary API calls.
    let refresh = Cookie::build(config.refresh_name.clone(), session.tokens.refresh_token.clone())
        .path(config.refresh_path.clone())
        .http_only(true)
        .secure(config.secure)
        .same_site(same_site(config))
        .max_age(CookieDuration::seconds(session.tokens.refresh_expires_in))
        .finish();

    [access, refresh]
}

/// Expired cookies that clear any stored tokens
pub(crate) fn clearing_cookies(config: &CookieConfig) -> [Cookie<'static>; 2] {
    let access = Cookie::build(config.access_name.clone(), "")
        .path("/")
        .http_only(true)
        .secure(config.secure)
        .same_site(same_site(config))
        .max_age(CookieDuration::ZERO)
        .finish();

    let refresh = Cookie::build(config.refresh_name.clone(), "")
        .path(config.refresh_path.clone())
        .http_only(true)
        .secure(config.secure)
        .same_site(same_site(config))
        .max_age(CookieDuration::ZERO)
        .finish();

    [access, refresh]
}
