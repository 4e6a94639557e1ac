//! Authentication request/response DTOs

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use ch_core::domain::entities::user::User;
use ch_core::domain::value_objects::AuthSession;

/// Request body for POST /api/v1/auth/login
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoginRequest {
    /// Account email
    pub email: String,
    /// Account password
    pub password: String,
}

/// Request body for POST /api/v1/auth/refresh
///
/// The token is optional here; browser clients carry it in the refresh
/// cookie instead.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Request body for POST /api/v1/auth/logout
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LogoutRequest {
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// User summary embedded in auth responses
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UserDto {
    pub id: Uuid,
    pub email: String,
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<Uuid>,
}

impl From<&User> for UserDto {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            role: user.role.to_string(),
            tenant_id: user.tenant_id,
        }
    }
}

/// Response body for successful login/refresh
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthResponse {
    /// JWT access token
    pub access_token: String,
    /// JWT refresh token (also set as an HttpOnly cookie)
    pub refresh_token: String,
    /// Token scheme for the Authorization header
    pub token_type: String,
    /// Access token lifetime in seconds
    pub expires_in: i64,
    /// Authenticated user
    pub user: UserDto,
}

impl From<&AuthSession> for AuthResponse {
    fn from(session: &AuthSession) -> Self {
        Self {
            access_token: session.tokens.access_token.clone(),
            refresh_token: session.tokens.refresh_token.clone(),
            token_type: "Bearer".to_string(),
            expires_in: session.tokens.access_expires_in,
            user: UserDto::from(&session.user),
        }
    }
}
