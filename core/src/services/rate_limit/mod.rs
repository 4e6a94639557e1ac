//! Sliding-window rate limiting: trait, tiering, and an in-memory
//! implementation.
//!
//! The Redis-backed implementation lives in `ch_infra`; both count requests
//! over a trailing window ending at now, so a burst straddling a fixed
//! window boundary cannot double its quota.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::errors::StoreError;

/// Outcome of a rate-limit check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitDecision {
    /// Whether the request may proceed
    pub allowed: bool,
    /// Configured maximum for the window
    pub limit: u32,
    /// Requests left in the current window (0 when rejected)
    pub remaining: u32,
    /// Unix timestamp (seconds) when the window frees up
    pub reset_at: i64,
    /// Seconds to wait before retrying, set on rejection
    pub retry_after_seconds: Option<u64>,
}

/// Sliding-window rate limiter over a shared store
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Count the request against `key` and decide whether it may proceed
    ///
    /// The entry is recorded whether or not the request is allowed, so a
    /// client hammering a full window keeps pushing its reset time out.
    /// Store unavailability surfaces as `Err`; the failure policy (this
    /// limiter fails open) belongs to the caller.
    async fn check(
        &self,
        key: &str,
        window: Duration,
        max_requests: u32,
    ) -> Result<RateLimitDecision, StoreError>;
}

/// Quota tier a request is billed against
///
/// B2B traffic shares one window per tenant; everything else is keyed by
/// network identity. Authentication endpoints get their own, much tighter
/// tier regardless of who is calling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitTier {
    /// Unauthenticated or B2C traffic, keyed by client IP
    Anonymous { ip: String },
    /// Tenant members on a standard plan, quota shared across the tenant
    Business { tenant_id: Uuid },
    /// Tenant members on a premium plan
    BusinessPremium { tenant_id: Uuid },
    /// Login/refresh/logout endpoints, keyed by client IP
    AuthEndpoints { ip: String },
}

impl RateLimitTier {
    /// Store key for this tier's window
    pub fn key(&self) -> String {
        match self {
            RateLimitTier::Anonymous { ip } => format!("rate_limit:anon:{ip}"),
            RateLimitTier::Business { tenant_id } => format!("rate_limit:tenant:{tenant_id}"),
            RateLimitTier::BusinessPremium { tenant_id } => {
                format!("rate_limit:tenant_premium:{tenant_id}")
            }
            RateLimitTier::AuthEndpoints { ip } => format!("rate_limit:auth:{ip}"),
        }
    }
}

/// In-memory sliding-window limiter
///
/// Keeps a timestamp log per key behind one mutex. Suitable for tests and
/// single-process deployments; the Redis implementation is the production
/// path.
#[derive(Clone, Default)]
pub struct MemoryRateLimiter {
    windows: Arc<Mutex<HashMap<String, VecDeque<i64>>>>,
}

impl MemoryRateLimiter {
    /// Create a new limiter with no recorded requests
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RateLimiter for MemoryRateLimiter {
    async fn check(
        &self,
        key: &str,
        window: Duration,
        max_requests: u32,
    ) -> Result<RateLimitDecision, StoreError> {
        let now_ms = Utc::now().timestamp_millis();
        let window_ms = window.as_millis() as i64;
        let window_start = now_ms - window_ms;

        let mut windows = self.windows.lock().await;
        let entries = windows.entry(key.to_string()).or_default();

        while entries.front().is_some_and(|t| *t <= window_start) {
            entries.pop_front();
        }

        let count_before = entries.len() as u32;
        entries.push_back(now_ms);

        let allowed = count_before < max_requests;
        let oldest = entries.front().copied().unwrap_or(now_ms);
        let reset_at = (oldest + window_ms) / 1000;
        let retry_after_seconds = if allowed {
            None
        } else {
            Some((((oldest + window_ms - now_ms) / 1000).max(1)) as u64)
        };

        Ok(RateLimitDecision {
            allowed,
            limit: max_requests,
            remaining: max_requests.saturating_sub(count_before + 1),
            reset_at,
            retry_after_seconds,
        })
    }
}
