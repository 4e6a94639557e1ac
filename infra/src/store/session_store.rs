//! Redis-backed implementation of the session store
//!
//! Key layout:
//! - `auth:family:{family_id}` - JSON family record, TTL = refresh lifetime
//! - `auth:subject_families:{subject_id}` - set of family ids per subject
//! - `auth:revoked:{subject_id}` - revocation marker (unix seconds)
//! - `auth:otp:{token}` - one-time token payload, consumed via GETDEL
//!
//! The subject index makes "drop everything for this subject" a bounded
//! multi-key delete instead of a keyspace scan. Index entries may outlive
//! their family records (the family key expires first); dropping tolerates
//! that by counting only keys actually deleted.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::AsyncCommands;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

use ch_core::domain::entities::token::{OneTimeToken, TokenFamily};
use ch_core::errors::StoreError;
use ch_core::repositories::SessionStore;

use crate::cache::redis_client::RedisClient;
use crate::error::InfrastructureError;

/// Redis session store
#[derive(Clone)]
pub struct RedisSessionStore {
    client: RedisClient,
    /// TTL applied to family records and revocation markers
    refresh_ttl: Duration,
}

impl RedisSessionStore {
    /// Create a new store
    ///
    /// `refresh_ttl` must equal the refresh-token lifetime: a family record
    /// outliving its tokens is wasted memory, one expiring earlier logs
    /// users out prematurely.
    pub fn new(client: RedisClient, refresh_ttl: Duration) -> Self {
        Self {
            client,
            refresh_ttl,
        }
    }

    fn family_key(family_id: Uuid) -> String {
        format!("auth:family:{family_id}")
    }

    fn subject_index_key(subject_id: Uuid) -> String {
        format!("auth:subject_families:{subject_id}")
    }

    fn revoked_key(subject_id: Uuid) -> String {
        format!("auth:revoked:{subject_id}")
    }

    fn otp_key(token: &str) -> String {
        format!("auth:otp:{token}")
    }
}

fn store_err(e: redis::RedisError) -> StoreError {
    StoreError::from(InfrastructureError::Cache(e))
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn put_family(&self, family: &TokenFamily) -> Result<(), StoreError> {
        let json = serde_json::to_string(family)
            .map_err(|e| StoreError::from(InfrastructureError::Serialization(e)))?;
        let ttl = self.refresh_ttl.as_secs();
        let family_key = Self::family_key(family.family_id);
        let index_key = Self::subject_index_key(family.subject_id);
        let member = family.family_id.to_string();

        self.client
            .execute_with_retry(move |mut conn| {
                let json = json.clone();
                let family_key = family_key.clone();
                let index_key = index_key.clone();
                let member = member.clone();
                Box::pin(async move {
                    redis::pipe()
                        .atomic()
                        .set_ex(&family_key, json, ttl)
                        .ignore()
                        .sadd(&index_key, member)
                        .ignore()
                        .expire(&index_key, ttl as i64)
                        .ignore()
                        .query_async::<_, ()>(&mut conn)
                        .await
                })
            })
            .await
            .map_err(store_err)
    }

    async fn get_family(&self, family_id: Uuid) -> Result<Option<TokenFamily>, StoreError> {
        let key = Self::family_key(family_id);
        let json: Option<String> = self
            .client
            .execute_with_retry(move |mut conn| {
                let key = key.clone();
                Box::pin(async move { conn.get(key).await })
            })
            .await
            .map_err(store_err)?;

        match json {
            Some(json) => {
                let family = serde_json::from_str(&json)
                    .map_err(|e| StoreError::from(InfrastructureError::Serialization(e)))?;
                Ok(Some(family))
            }
            None => Ok(None),
        }
    }

    async fn drop_family(&self, family_id: Uuid) -> Result<bool, StoreError> {
        // The index entry is cleaned up too when the record still names its
        // subject; an expired record leaves the entry to age out on its own.
        let subject = self.get_family(family_id).await?.map(|f| f.subject_id);
        let family_key = Self::family_key(family_id);

        let deleted: u32 = match subject {
            Some(subject_id) => {
                let index_key = Self::subject_index_key(subject_id);
                let member = family_id.to_string();
                self.client
                    .execute_with_retry(move |mut conn| {
                        let family_key = family_key.clone();
                        let index_key = index_key.clone();
                        let member = member.clone();
                        Box::pin(async move {
                            let (deleted,): (u32,) = redis::pipe()
                                .atomic()
                                .del(&family_key)
                                .srem(&index_key, member)
                                .ignore()
                                .query_async(&mut conn)
                                .await?;
                            Ok(deleted)
                        })
                    })
                    .await
                    .map_err(store_err)?
            }
            None => self
                .client
                .execute_with_retry(move |mut conn| {
                    let family_key = family_key.clone();
                    Box::pin(async move { conn.del(family_key).await })
                })
                .await
                .map_err(store_err)?,
        };

        Ok(deleted > 0)
    }

    async fn drop_all_families(&self, subject_id: Uuid) -> Result<usize, StoreError> {
        let index_key = Self::subject_index_key(subject_id);
        let members: Vec<String> = self
            .client
            .execute_with_retry(move |mut conn| {
                let index_key = index_key.clone();
                Box::pin(async move { conn.smembers(index_key).await })
            })
            .await
            .map_err(store_err)?;

        if members.is_empty() {
            return Ok(0);
        }

        let mut keys: Vec<String> = members
            .iter()
            .filter_map(|m| m.parse::<Uuid>().ok())
            .map(Self::family_key)
            .collect();
        keys.push(Self::subject_index_key(subject_id));
        let family_count = keys.len() - 1;

        let deleted: usize = self
            .client
            .execute_with_retry(move |mut conn| {
                let keys = keys.clone();
                Box::pin(async move { conn.del(keys).await })
            })
            .await
            .map_err(store_err)?;

        debug!(%subject_id, "dropped {} of {} indexed families", deleted.saturating_sub(1), family_count);
        // The index key itself is part of the delete count.
        Ok(deleted.saturating_sub(1).min(family_count))
    }

    async fn mark_revoked(&self, subject_id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError> {
        self.client
            .set_with_expiry(
                &Self::revoked_key(subject_id),
                &at.timestamp().to_string(),
                self.refresh_ttl.as_secs(),
            )
            .await
            .map_err(StoreError::from)
    }

    async fn is_revoked_since(
        &self,
        subject_id: Uuid,
        issued_at: i64,
    ) -> Result<bool, StoreError> {
        let marker = self
            .client
            .get(&Self::revoked_key(subject_id))
            .await
            .map_err(StoreError::from)?;

        Ok(marker
            .and_then(|m| m.parse::<i64>().ok())
            .map(|marker| issued_at < marker)
            .unwrap_or(false))
    }

    async fn put_one_time(
        &self,
        token: &str,
        payload: &OneTimeToken,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let json = serde_json::to_string(payload)
            .map_err(|e| StoreError::from(InfrastructureError::Serialization(e)))?;

        self.client
            .set_with_expiry(&Self::otp_key(token), &json, ttl.as_secs())
            .await
            .map_err(StoreError::from)
    }

    async fn take_one_time(&self, token: &str) -> Result<Option<OneTimeToken>, StoreError> {
        // GETDEL is the atomicity guarantee: exactly one caller sees the
        // payload.
        let json = self
            .client
            .get_del(&Self::otp_key(token))
            .await
            .map_err(StoreError::from)?;

        match json {
            Some(json) => {
                let payload = serde_json::from_str(&json)
                    .map_err(|e| StoreError::from(InfrastructureError::Serialization(e)))?;
                Ok(Some(payload))
            }
            None => Ok(None),
        }
    }
}
