//! Capability traits for external state and collaborators.
//!
//! The session store owns all mutable shared state (token families, the
//! revocation marker, one-time tokens); the directories are read-only
//! upstream collaborators. Every trait ships with an in-memory mock so the
//! whole core can be exercised without Redis or a database.

pub mod directory;
pub mod session;

pub use directory::{MockTenantDirectory, MockUserDirectory, TenantDirectory, UserDirectory};
pub use session::{MockSessionStore, SessionStore};
