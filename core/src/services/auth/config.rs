//! Configuration for the authentication service

use std::time::Duration;

use crate::domain::entities::token::ONE_TIME_TOKEN_EXPIRY_MINUTES;

/// Configuration for the authentication service
#[derive(Debug, Clone)]
pub struct AuthServiceConfig {
    /// Lifetime of password-reset and email-verification tokens
    pub one_time_token_ttl: Duration,

    /// Base URL the password-reset token is embedded into
    pub password_reset_url: String,

    /// Base URL the email-verification token is embedded into
    pub email_verify_url: String,
}

impl Default for AuthServiceConfig {
    fn default() -> Self {
        Self {
            one_time_token_ttl: Duration::from_secs(ONE_TIME_TOKEN_EXPIRY_MINUTES as u64 * 60),
            password_reset_url: "https://app.coursehub.dev/reset-password".to_string(),
            email_verify_url: "https://app.coursehub.dev/verify-email".to_string(),
        }
    }
}
