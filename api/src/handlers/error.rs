//! Domain error to HTTP response mapping
//!
//! Every token failure maps to 401 with the same generic message so the
//! response does not tell an attacker whether reuse detection fired; the
//! specific code still lands in the body for legitimate clients and in the
//! logs for us.

use actix_web::{http::header, HttpResponse};
use tracing::{error, warn};

use ch_core::errors::{AuthError, DomainError, TokenError};
use ch_shared::errors::ErrorResponse;

/// Convert a domain error into the HTTP response the client sees
pub fn domain_error_response(error: DomainError) -> HttpResponse {
    match error {
        DomainError::Auth(auth_error) => match auth_error {
            AuthError::AuthRequired => HttpResponse::Unauthorized()
                .json(ErrorResponse::new(auth_error.code(), "Authentication required")),
            AuthError::AuthenticationFailed => HttpResponse::Unauthorized().json(
                ErrorResponse::new(auth_error.code(), "Invalid email or password"),
            ),
            AuthError::UserInvalid => HttpResponse::Forbidden()
                .json(ErrorResponse::new(auth_error.code(), "Account is not active")),
            AuthError::RateLimitExceeded {
                retry_after_seconds,
            } => HttpResponse::TooManyRequests()
                .insert_header((header::RETRY_AFTER, retry_after_seconds.to_string()))
                .json(
                    ErrorResponse::new(auth_error.code(), "Too many requests")
                        .add_detail("retry_after_seconds", retry_after_seconds),
                ),
        },
        DomainError::Token(token_error) => {
            if matches!(token_error, TokenError::TokenReuse) {
                warn!(code = token_error.code(), "rejected reused refresh token");
            }
            HttpResponse::Unauthorized().json(ErrorResponse::new(
                token_error.code(),
                "Authentication token is invalid or expired",
            ))
        }
        DomainError::Store(store_error) => {
            error!(error = %store_error, "session store failure surfaced to client");
            HttpResponse::ServiceUnavailable().json(ErrorResponse::new(
                "SERVICE_UNAVAILABLE",
                "Service temporarily unavailable",
            ))
        }
        DomainError::Internal { message } => {
            error!(message, "internal error");
            HttpResponse::InternalServerError().json(ErrorResponse::new(
                "INTERNAL_ERROR",
                "An internal error occurred",
            ))
        }
    }
}
