//! Cache invalidation collaborators for the server.
//!
//! With `CLAIMDESK_REVALIDATE_URL` set, each invalidated path is POSTed to
//! that webhook as `{"path": ...}`; otherwise invalidations are only logged.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use claimdesk_core::error::SideEffectError;
use claimdesk_core::ports::CacheInvalidator;

pub struct RevalidateWebhook {
    client: reqwest::Client,
    url: String,
}

impl RevalidateWebhook {
    pub fn new(url: impl Into<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl CacheInvalidator for RevalidateWebhook {
    async fn invalidate(&self, path: &str) -> Result<(), SideEffectError> {
        let failed = |reason: String| SideEffectError::CacheInvalidation {
            path: path.to_string(),
            reason,
        };
        self.client
            .post(&self.url)
            .json(&json!({ "path": path }))
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| failed(e.to_string()))?;
        tracing::debug!(path, "cache path revalidated");
        Ok(())
    }
}

pub struct LogInvalidator;

#[async_trait]
impl CacheInvalidator for LogInvalidator {
    async fn invalidate(&self, path: &str) -> Result<(), SideEffectError> {
        tracing::debug!(path, "cache invalidation (no revalidation hook configured)");
        Ok(())
    }
}
