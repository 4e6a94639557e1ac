//! Error type definitions for authentication, token management, and the
//! session store. Messages stay generic on the wire; the specific variant is
//! what handlers and logs branch on.

use thiserror::Error;

/// Authentication-related errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Authentication required")]
    AuthRequired,

    #[error("Authentication failed")]
    AuthenticationFailed,

    #[error("User account is inactive or unknown")]
    UserInvalid,

    #[error("Rate limit exceeded, retry after {retry_after_seconds}s")]
    RateLimitExceeded { retry_after_seconds: u64 },
}

impl AuthError {
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::AuthRequired => "AUTH_REQUIRED",
            AuthError::AuthenticationFailed => "AUTHENTICATION_FAILED",
            AuthError::UserInvalid => "USER_INVALID",
            AuthError::RateLimitExceeded { .. } => "RATE_LIMIT_EXCEEDED",
        }
    }
}

/// Token-related errors
///
/// `TokenReuse` is terminal: the rotation protocol raises it after it has
/// already revoked every session of the subject.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    #[error("Token expired")]
    TokenExpired,

    #[error("Token not yet valid")]
    TokenNotYetValid,

    #[error("Invalid token format")]
    InvalidTokenFormat,

    #[error("Wrong token type")]
    WrongTokenType,

    #[error("Token revoked")]
    TokenRevoked,

    #[error("Refresh token reuse detected")]
    TokenReuse,

    #[error("Invalid refresh token")]
    InvalidRefreshToken,

    #[error("Token generation failed")]
    TokenGenerationFailed,
}

impl TokenError {
    pub fn code(&self) -> &'static str {
        match self {
            TokenError::TokenExpired => "TOKEN_EXPIRED",
            TokenError::TokenNotYetValid => "TOKEN_NOT_YET_VALID",
            TokenError::InvalidTokenFormat => "TOKEN_INVALID",
            TokenError::WrongTokenType => "WRONG_TOKEN_TYPE",
            TokenError::TokenRevoked => "TOKEN_REVOKED",
            TokenError::TokenReuse => "TOKEN_REUSE",
            TokenError::InvalidRefreshToken => "INVALID_REFRESH_TOKEN",
            TokenError::TokenGenerationFailed => "TOKEN_GENERATION_FAILED",
        }
    }
}

/// Session store errors
///
/// Unavailability is deliberately distinct from "not found": the rotation
/// protocol fails closed on it while the rate limiter fails open, so the two
/// must never be conflated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Session store unavailable: {message}")]
    Unavailable { message: String },

    #[error("Session store serialization error: {message}")]
    Serialization { message: String },
}

impl StoreError {
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::Unavailable { .. } => "STORE_UNAVAILABLE",
            StoreError::Serialization { .. } => "STORE_SERIALIZATION",
        }
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        StoreError::Unavailable {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::DomainError;

    #[test]
    fn test_error_codes_are_stable() {
        assert_eq!(TokenError::TokenReuse.code(), "TOKEN_REUSE");
        assert_eq!(TokenError::TokenExpired.code(), "TOKEN_EXPIRED");
        assert_eq!(AuthError::AuthRequired.code(), "AUTH_REQUIRED");
        assert_eq!(
            StoreError::unavailable("down").code(),
            "STORE_UNAVAILABLE"
        );
    }

    #[test]
    fn test_domain_error_bridges() {
        let err: DomainError = TokenError::WrongTokenType.into();
        assert_eq!(err.code(), "WRONG_TOKEN_TYPE");

        let err: DomainError = AuthError::RateLimitExceeded {
            retry_after_seconds: 30,
        }
        .into();
        assert_eq!(err.code(), "RATE_LIMIT_EXCEEDED");
        assert!(err.to_string().contains("30"));
    }
}
