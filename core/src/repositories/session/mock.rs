//! In-memory implementation of `SessionStore` for tests and local wiring.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::entities::token::{OneTimeToken, TokenFamily};
use crate::errors::StoreError;

use super::r#trait::SessionStore;

#[derive(Default)]
struct Inner {
    families: HashMap<Uuid, TokenFamily>,
    revoked: HashMap<Uuid, i64>,
    one_time: HashMap<String, (OneTimeToken, DateTime<Utc>)>,
}

/// Mock session store backed by in-process maps
///
/// TTLs are honored for one-time tokens (checked on take); family TTLs are
/// not simulated since no test runs for days.
#[derive(Clone, Default)]
pub struct MockSessionStore {
    inner: Arc<RwLock<Inner>>,
}

impl MockSessionStore {
    /// Create a new empty mock store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live families for a subject, for test assertions
    pub async fn family_count(&self, subject_id: Uuid) -> usize {
        let inner = self.inner.read().await;
        inner
            .families
            .values()
            .filter(|f| f.subject_id == subject_id)
            .count()
    }
}

#[async_trait]
impl SessionStore for MockSessionStore {
    async fn put_family(&self, family: &TokenFamily) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner.families.insert(family.family_id, family.clone());
        Ok(())
    }

    async fn get_family(&self, family_id: Uuid) -> Result<Option<TokenFamily>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.families.get(&family_id).cloned())
    }

    async fn drop_family(&self, family_id: Uuid) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        Ok(inner.families.remove(&family_id).is_some())
    }

    async fn drop_all_families(&self, subject_id: Uuid) -> Result<usize, StoreError> {
        let mut inner = self.inner.write().await;
        let before = inner.families.len();
        inner.families.retain(|_, f| f.subject_id != subject_id);
        Ok(before - inner.families.len())
    }

    async fn mark_revoked(&self, subject_id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        inner.revoked.insert(subject_id, at.timestamp());
        Ok(())
    }

    async fn is_revoked_since(
        &self,
        subject_id: Uuid,
        issued_at: i64,
    ) -> Result<bool, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .revoked
            .get(&subject_id)
            .map(|marker| issued_at < *marker)
            .unwrap_or(false))
    }

    async fn put_one_time(
        &self,
        token: &str,
        payload: &OneTimeToken,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let expires_at = Utc::now()
            + chrono::Duration::from_std(ttl).map_err(|e| StoreError::Serialization {
                message: e.to_string(),
            })?;
        let mut inner = self.inner.write().await;
        inner
            .one_time
            .insert(token.to_string(), (payload.clone(), expires_at));
        Ok(())
    }

    async fn take_one_time(&self, token: &str) -> Result<Option<OneTimeToken>, StoreError> {
        let mut inner = self.inner.write().await;
        match inner.one_time.remove(token) {
            Some((payload, expires_at)) if expires_at > Utc::now() => Ok(Some(payload)),
            _ => Ok(None),
        }
    }
}
