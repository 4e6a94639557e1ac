//! Rate limiting configuration module

use serde::{Deserialize, Serialize};

/// A sliding-window quota: at most `max_requests` within `window_seconds`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct TierQuota {
    /// Window length in seconds
    pub window_seconds: u64,

    /// Maximum requests within the window
    pub max_requests: u32,
}

impl TierQuota {
    /// Create a new quota
    pub fn new(window_seconds: u64, max_requests: u32) -> Self {
        Self {
            window_seconds,
            max_requests,
        }
    }
}

/// Rate limiting configuration
///
/// One quota per caller tier. Auth endpoints get their own deliberately
/// tight per-IP budget independent of the caller's tier.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    /// Enable rate limiting
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Unauthenticated callers, keyed by IP
    pub anonymous: TierQuota,

    /// Authenticated tenant members
    pub business: TierQuota,

    /// Members of premium-plan tenants
    pub business_premium: TierQuota,

    /// Login, refresh and password endpoints, keyed by IP
    pub auth_endpoints: TierQuota,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            anonymous: TierQuota::new(60, 30),
            business: TierQuota::new(60, 300),
            business_premium: TierQuota::new(60, 1000),
            auth_endpoints: TierQuota::new(300, 10),
        }
    }
}

impl RateLimitConfig {
    /// Loose limits for local development
    pub fn development() -> Self {
        Self {
            anonymous: TierQuota::new(60, 1000),
            business: TierQuota::new(60, 5000),
            business_premium: TierQuota::new(60, 10000),
            auth_endpoints: TierQuota::new(60, 100),
            ..Default::default()
        }
    }

    /// Production limits
    pub fn production() -> Self {
        Self::default()
    }

    /// Disable rate limiting entirely (tests)
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }
}

fn default_enabled() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_production_auth_budget_is_tightest() {
        let config = RateLimitConfig::production();
        assert!(config.auth_endpoints.max_requests < config.anonymous.max_requests);
        assert!(config.anonymous.max_requests < config.business.max_requests);
        assert!(config.business.max_requests < config.business_premium.max_requests);
    }
}
