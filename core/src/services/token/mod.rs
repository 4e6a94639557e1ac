//! Stateless JWT signing and verification.

pub mod config;
pub mod service;

pub use config::TokenServiceConfig;
pub use service::TokenService;
