//! Authentication service module
//!
//! The rotation protocol lives here: login and SSO hand-off, the refresh
//! state machine with reuse detection and its cascading revocation, logout
//! in both single-session and all-sessions form, and one-time token
//! issuance for password reset and email verification.

mod config;
mod service;

#[cfg(test)]
mod tests;

pub use config::AuthServiceConfig;
pub use service::AuthService;
