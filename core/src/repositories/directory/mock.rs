//! In-memory directory implementations for tests and local wiring.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::entities::user::{Tenant, User};
use crate::errors::StoreError;

use super::r#trait::{TenantDirectory, UserDirectory};

/// Mock user directory holding users and their plaintext test passwords
#[derive(Clone, Default)]
pub struct MockUserDirectory {
    users: Arc<RwLock<HashMap<Uuid, (User, String)>>>,
}

impl MockUserDirectory {
    /// Create a new empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a user with the password it will authenticate with
    pub async fn add_user(&self, user: User, password: impl Into<String>) {
        let mut users = self.users.write().await;
        users.insert(user.id, (user, password.into()));
    }

    /// Replace a stored user record (e.g. to flip its status in a test)
    pub async fn update_user(&self, user: User) {
        let mut users = self.users.write().await;
        if let Some(entry) = users.get_mut(&user.id) {
            entry.0 = user;
        }
    }
}

#[async_trait]
impl UserDirectory for MockUserDirectory {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users.get(&id).map(|(u, _)| u.clone()))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|(u, _)| u.email == email)
            .map(|(u, _)| u.clone()))
    }

    async fn verify_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<User>, StoreError> {
        let users = self.users.read().await;
        Ok(users
            .values()
            .find(|(u, p)| u.email == email && p == password)
            .map(|(u, _)| u.clone()))
    }
}

/// Mock tenant directory
#[derive(Clone, Default)]
pub struct MockTenantDirectory {
    tenants: Arc<RwLock<HashMap<Uuid, Tenant>>>,
}

impl MockTenantDirectory {
    /// Create a new empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tenant record
    pub async fn add_tenant(&self, tenant: Tenant) {
        let mut tenants = self.tenants.write().await;
        tenants.insert(tenant.id, tenant);
    }
}

#[async_trait]
impl TenantDirectory for MockTenantDirectory {
    async fn find_tenant(&self, id: Uuid) -> Result<Option<Tenant>, StoreError> {
        let tenants = self.tenants.read().await;
        Ok(tenants.get(&id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::user::{TenantPlan, UserRole, UserStatus};

    #[tokio::test]
    async fn test_verify_credentials() {
        let dir = MockUserDirectory::new();
        let user = User::new("a@b.com".to_string(), UserRole::Student, None);
        dir.add_user(user.clone(), "Secret123!").await;

        let found = dir.verify_credentials("a@b.com", "Secret123!").await.unwrap();
        assert_eq!(found.map(|u| u.id), Some(user.id));

        assert!(dir
            .verify_credentials("a@b.com", "wrong")
            .await
            .unwrap()
            .is_none());
        assert!(dir
            .verify_credentials("nobody@b.com", "Secret123!")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_update_user_status() {
        let dir = MockUserDirectory::new();
        let mut user = User::new("a@b.com".to_string(), UserRole::Instructor, None);
        dir.add_user(user.clone(), "pw").await;

        user.status = UserStatus::Suspended;
        dir.update_user(user.clone()).await;

        let found = dir.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(found.status, UserStatus::Suspended);
    }

    #[tokio::test]
    async fn test_tenant_lookup() {
        let dir = MockTenantDirectory::new();
        let tenant = Tenant::new(TenantPlan::Standard, 10);
        dir.add_tenant(tenant.clone()).await;

        assert_eq!(dir.find_tenant(tenant.id).await.unwrap(), Some(tenant));
        assert!(dir.find_tenant(Uuid::new_v4()).await.unwrap().is_none());
    }
}
