//! # CourseHub Core
//!
//! Core session-security logic for the CourseHub backend. This crate contains
//! the domain entities, the token and rotation services, the capability traits
//! for the external session store and directories, and the error taxonomy that
//! every other layer builds on. It has no HTTP or Redis dependencies; those
//! live in `ch_api` and `ch_infra`.

pub mod domain;
pub mod errors;
pub mod repositories;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::*;
pub use errors::*;
pub use repositories::*;
pub use services::*;
