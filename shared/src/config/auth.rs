//! Authentication and authorization configuration

use serde::{Deserialize, Serialize};

use super::environment::Environment;

const DEV_ACCESS_SECRET: &str = "dev-access-secret-change-in-production";
const DEV_REFRESH_SECRET: &str = "dev-refresh-secret-change-in-production";

/// JWT authentication configuration
///
/// Access and refresh tokens are signed with separate secrets so that one
/// kind can never verify as the other.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JwtConfig {
    /// Secret for signing access tokens
    pub access_secret: String,

    /// Secret for signing refresh tokens
    pub refresh_secret: String,

    /// Access token expiry time in minutes
    pub access_token_expiry_minutes: i64,

    /// Refresh token expiry time in days
    pub refresh_token_expiry_days: i64,

    /// JWT issuer claim
    pub issuer: String,

    /// JWT audience claim
    pub audience: String,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            access_secret: String::from(DEV_ACCESS_SECRET),
            refresh_secret: String::from(DEV_REFRESH_SECRET),
            access_token_expiry_minutes: 15,
            refresh_token_expiry_days: 7,
            issuer: String::from("coursehub"),
            audience: String::from("coursehub-api"),
        }
    }
}

impl JwtConfig {
    /// Create a new JWT configuration with both secrets
    pub fn new(access_secret: impl Into<String>, refresh_secret: impl Into<String>) -> Self {
        Self {
            access_secret: access_secret.into(),
            refresh_secret: refresh_secret.into(),
            ..Default::default()
        }
    }

    /// Check if either secret is still a development default
    pub fn is_using_default_secret(&self) -> bool {
        self.access_secret == DEV_ACCESS_SECRET || self.refresh_secret == DEV_REFRESH_SECRET
    }
}

/// Refresh token cookie configuration
///
/// The refresh token travels in an HttpOnly cookie for browser clients;
/// native clients send it in the request body instead.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CookieConfig {
    /// Cookie name carrying the access token
    pub access_name: String,

    /// Cookie name carrying the refresh token
    pub refresh_name: String,

    /// Path the refresh cookie is scoped to
    pub refresh_path: String,

    /// Require HTTPS for the cookies
    pub secure: bool,

    /// SameSite attribute (Strict, Lax, None)
    pub same_site: String,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            access_name: String::from("access_token"),
            refresh_name: String::from("refresh_token"),
            refresh_path: String::from("/api/v1/auth"),
            secure: true,
            same_site: String::from("Strict"),
        }
    }
}

/// Combined authentication configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AuthConfig {
    /// JWT configuration
    pub jwt: JwtConfig,

    /// Refresh cookie configuration
    #[serde(default)]
    pub cookie: CookieConfig,
}

impl AuthConfig {
    /// Load from environment variables
    ///
    /// `JWT_ACCESS_SECRET` and `JWT_REFRESH_SECRET` are mandatory in
    /// production; development falls back to well-known defaults.
    pub fn from_env(environment: Environment) -> Result<Self, String> {
        let access_secret = std::env::var("JWT_ACCESS_SECRET").ok();
        let refresh_secret = std::env::var("JWT_REFRESH_SECRET").ok();

        let jwt = match (access_secret, refresh_secret) {
            (Some(a), Some(r)) => JwtConfig::new(a, r),
            (None, None) if !environment.is_production() => JwtConfig::default(),
            _ => {
                return Err(String::from(
                    "JWT_ACCESS_SECRET and JWT_REFRESH_SECRET must both be set",
                ))
            }
        };

        let mut cookie = CookieConfig::default();
        if !environment.is_production() {
            cookie.secure = false;
        }

        Ok(Self { jwt, cookie })
    }
}
