//! Redis-based sliding-window rate limiter
//!
//! Each key holds a sorted set of request timestamps (milliseconds). A
//! check prunes entries older than the window, counts what remains, and
//! records the current request in one atomic pipeline, so concurrent
//! checks against the same key cannot both slip under the limit.

use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use std::time::Duration;
use tracing::debug;

use ch_core::errors::StoreError;
use ch_core::services::rate_limit::{RateLimitDecision, RateLimiter};

use crate::cache::redis_client::RedisClient;
use crate::error::InfrastructureError;

/// Redis implementation of the sliding-window rate limiter
#[derive(Clone)]
pub struct RedisRateLimiter {
    client: RedisClient,
}

impl RedisRateLimiter {
    /// Create a new Redis-based rate limiter
    pub fn new(client: RedisClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RateLimiter for RedisRateLimiter {
    async fn check(
        &self,
        key: &str,
        window: Duration,
        max_requests: u32,
    ) -> Result<RateLimitDecision, StoreError> {
        let now_ms = Utc::now().timestamp_millis();
        let window_ms = window.as_millis() as i64;
        let window_start = now_ms - window_ms;

        // The member carries a random suffix so two requests in the same
        // millisecond both count.
        let member = format!("{}-{}", now_ms, rand::thread_rng().gen::<u32>());
        let key_owned = key.to_string();

        // Prune, count, record, refresh expiry; all or nothing. The request
        // is recorded even when rejected, so hammering a full window keeps
        // pushing the reset time out.
        let (count_before, oldest): (u32, Vec<(String, i64)>) = self
            .client
            .execute_with_retry(move |mut conn| {
                let key = key_owned.clone();
                let member = member.clone();
                Box::pin(async move {
                    let (_, count_before, _, _, oldest): (i64, u32, i64, bool, Vec<(String, i64)>) =
                        redis::pipe()
                            .atomic()
                            .cmd("ZREMRANGEBYSCORE")
                            .arg(&key)
                            .arg("-inf")
                            .arg(window_start)
                            .cmd("ZCARD")
                            .arg(&key)
                            .cmd("ZADD")
                            .arg(&key)
                            .arg(now_ms)
                            .arg(&member)
                            .cmd("PEXPIRE")
                            .arg(&key)
                            .arg(window_ms)
                            .cmd("ZRANGE")
                            .arg(&key)
                            .arg(0)
                            .arg(0)
                            .arg("WITHSCORES")
                            .query_async(&mut conn)
                            .await?;
                    Ok((count_before, oldest))
                })
            })
            .await
            .map_err(|e| StoreError::from(InfrastructureError::Cache(e)))?;

        let allowed = count_before < max_requests;
        let oldest_ms = oldest.first().map(|(_, ts)| *ts).unwrap_or(now_ms);
        let reset_at = (oldest_ms + window_ms) / 1000;
        let retry_after_seconds = if allowed {
            None
        } else {
            Some((((oldest_ms + window_ms - now_ms) / 1000).max(1)) as u64)
        };

        if !allowed {
            debug!(
                key,
                count = count_before,
                limit = max_requests,
                "rate limit window is full"
            );
        }

        Ok(RateLimitDecision {
            allowed,
            limit: max_requests,
            remaining: max_requests.saturating_sub(count_before + 1),
            reset_at,
            retry_after_seconds,
        })
    }
}
