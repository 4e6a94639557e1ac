//! Directory traits for the external user and tenant stores.
//!
//! These collaborators are consumed read-only. Password verification is
//! delegated behind `UserDirectory` because the hashing scheme belongs to
//! the user store, not to this core.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::entities::user::{Tenant, User};
use crate::errors::StoreError;

/// Read-only access to the user store
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Look up a user by id
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    /// Look up a user by email
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Verify a password and return the user on success
    ///
    /// # Returns
    /// * `Ok(Some(User))` - credentials valid
    /// * `Ok(None)` - unknown email or wrong password; callers must not
    ///   distinguish the two
    async fn verify_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<User>, StoreError>;
}

/// Read-only access to the tenant store
#[async_trait]
pub trait TenantDirectory: Send + Sync {
    /// Look up a tenant by id
    async fn find_tenant(&self, id: Uuid) -> Result<Option<Tenant>, StoreError>;
}
