//! Session store trait defining the interface for all mutable shared
//! authentication state.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;
use uuid::Uuid;

use crate::domain::entities::token::{OneTimeToken, TokenFamily};
use crate::errors::StoreError;

/// Store for token families, the per-subject revocation marker, and
/// one-time tokens.
///
/// This trait is the single owner of those keys; no other component writes
/// them. Implementations back onto an external key/value store and must
/// surface unavailability as `StoreError::Unavailable`, never as a missing
/// record — callers apply opposite default policies to the two cases.
///
/// # Security Considerations
/// - Only hashes of refresh values are ever stored
/// - `take_one_time` must be atomic: two concurrent consumers of the same
///   token must never both receive the payload
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Upsert a token family with TTL equal to the refresh-token lifetime
    ///
    /// Used both at login (create) and on rotation (overwrite value, reset
    /// TTL).
    async fn put_family(&self, family: &TokenFamily) -> Result<(), StoreError>;

    /// Fetch a family record by id
    ///
    /// # Returns
    /// * `Ok(Some(TokenFamily))` - family exists
    /// * `Ok(None)` - family unknown, expired, or already revoked
    /// * `Err(StoreError)` - store unreachable
    async fn get_family(&self, family_id: Uuid) -> Result<Option<TokenFamily>, StoreError>;

    /// Delete one family (single-session logout)
    ///
    /// # Returns
    /// * `Ok(true)` - family existed and was deleted
    /// * `Ok(false)` - family was already gone
    async fn drop_family(&self, family_id: Uuid) -> Result<bool, StoreError>;

    /// Delete every family belonging to a subject
    ///
    /// Used for logout-all, password change, and the reuse-detection
    /// cascade. Returns the number of families removed.
    async fn drop_all_families(&self, subject_id: Uuid) -> Result<usize, StoreError>;

    /// Record that all access tokens issued before `at` are invalid
    async fn mark_revoked(&self, subject_id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError>;

    /// Check a token's issued-at against the subject's revocation marker
    ///
    /// # Returns
    /// * `Ok(true)` - a marker exists and `issued_at` precedes it
    /// * `Ok(false)` - no marker, or the token was issued at/after it
    async fn is_revoked_since(&self, subject_id: Uuid, issued_at: i64)
        -> Result<bool, StoreError>;

    /// Store a one-time token payload with the given TTL
    async fn put_one_time(
        &self,
        token: &str,
        payload: &OneTimeToken,
        ttl: Duration,
    ) -> Result<(), StoreError>;

    /// Atomically fetch and delete a one-time token payload
    ///
    /// # Returns
    /// * `Ok(Some(OneTimeToken))` - this caller consumed the token
    /// * `Ok(None)` - unknown, expired, or already consumed
    async fn take_one_time(&self, token: &str) -> Result<Option<OneTimeToken>, StoreError>;
}
