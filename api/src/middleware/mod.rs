//! HTTP middleware: authentication gateway, rate limiting, CORS

pub mod auth;
pub mod cors;
pub mod rate_limit;

pub use auth::{AuthContext, AuthGateway, Authenticator, OptionalAuth};
pub use rate_limit::RateLimitGuard;
