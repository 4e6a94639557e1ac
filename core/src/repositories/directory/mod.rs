//! Read-only directory traits for upstream user and tenant data.

pub mod r#trait {
    pub use super::trait_::*;
}
#[path = "trait.rs"]
mod trait_;

pub mod mock;

pub use mock::{MockTenantDirectory, MockUserDirectory};
pub use r#trait::{TenantDirectory, UserDirectory};
