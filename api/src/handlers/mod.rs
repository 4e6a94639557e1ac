//! HTTP error handling

pub mod error;

pub use error::domain_error_response;
