//! Email dispatch seam. Delivery is entirely out of scope; this core only
//! hands over URLs embedding one-time tokens.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Downstream collaborator that delivers one-time-token URLs
#[async_trait]
pub trait EmailDispatcher: Send + Sync {
    /// Send a password-reset email containing the given URL
    async fn send_password_reset(&self, email: &str, reset_url: &str) -> Result<(), String>;

    /// Send an email-verification email containing the given URL
    async fn send_email_verification(&self, email: &str, verify_url: &str) -> Result<(), String>;
}

/// Mock dispatcher that records every message instead of sending it
#[derive(Clone, Default)]
pub struct MockEmailDispatcher {
    sent: Arc<RwLock<Vec<(String, String)>>>,
}

impl MockEmailDispatcher {
    /// Create a new mock dispatcher
    pub fn new() -> Self {
        Self::default()
    }

    /// All `(recipient, url)` pairs captured so far
    pub async fn sent(&self) -> Vec<(String, String)> {
        self.sent.read().await.clone()
    }
}

#[async_trait]
impl EmailDispatcher for MockEmailDispatcher {
    async fn send_password_reset(&self, email: &str, reset_url: &str) -> Result<(), String> {
        let mut sent = self.sent.write().await;
        sent.push((email.to_string(), reset_url.to_string()));
        Ok(())
    }

    async fn send_email_verification(&self, email: &str, verify_url: &str) -> Result<(), String> {
        let mut sent = self.sent.write().await;
        sent.push((email.to_string(), verify_url.to_string()));
        Ok(())
    }
}
