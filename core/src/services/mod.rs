//! Business services of the session-security core.

pub mod auth;
pub mod email;
pub mod rate_limit;
pub mod token;

pub use auth::AuthService;
pub use email::{EmailDispatcher, MockEmailDispatcher};
pub use rate_limit::{
    MemoryRateLimiter, RateLimitDecision, RateLimitTier, RateLimiter,
};
pub use token::TokenService;
