//! Value objects shared between services and the API layer.

pub mod auth_session;

pub use auth_session::AuthSession;
