//! Public announcements made on behalf of shelters.

use std::sync::Arc;

use async_trait::async_trait;
use haven_config::AnnouncementsConfig;
use haven_core::{HavenError, Result};
use parking_lot::Mutex;
use serde_json::json;
use tracing::{info, warn};

/// Somewhere a shelter can post a short public message.
#[async_trait]
pub trait Announcer: Send + Sync {
    fn name(&self) -> &str;

    async fn post(&self, shelter_name: &str, text: &str) -> Result<()>;
}

/// Pick the announcer the configuration asks for.
pub fn from_config(config: &AnnouncementsConfig) -> Arc<dyn Announcer> {
    match config.webhook_url.as_deref().filter(|u| !u.trim().is_empty()) {
        Some(url) => Arc::new(WebhookAnnouncer::new(url)),
        None => Arc::new(LogAnnouncer),
    }
}

/// POSTs `{"shelter": ..., "text": ...}` as JSON to a webhook.
pub struct WebhookAnnouncer {
    client: reqwest::Client,
    url: String,
}

impl WebhookAnnouncer {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl Announcer for WebhookAnnouncer {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn post(&self, shelter_name: &str, text: &str) -> Result<()> {
        let resp = self
            .client
            .post(&self.url)
            .json(&json!({ "shelter": shelter_name, "text": text }))
            .send()
            .await
            .map_err(|e| HavenError::Agent(format!("announcement webhook: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            warn!(%status, %body, "announcement webhook rejected post");
            return Err(HavenError::Agent(format!(
                "announcement webhook returned {status}"
            )));
        }
        info!(shelter = shelter_name, "announcement posted");
        Ok(())
    }
}

/// Writes announcements to the log only.
pub struct LogAnnouncer;

#[async_trait]
impl Announcer for LogAnnouncer {
    fn name(&self) -> &str {
        "log"
    }

    async fn post(&self, shelter_name: &str, text: &str) -> Result<()> {
        info!(shelter = shelter_name, %text, "announcement");
        Ok(())
    }
}

/// Keeps announcements in memory, for tests.
#[derive(Default)]
pub struct MemoryAnnouncer {
    posts: Mutex<Vec<(String, String)>>,
}

impl MemoryAnnouncer {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(shelter name, text)` pairs in posting order.
    pub fn posts(&self) -> Vec<(String, String)> {
        self.posts.lock().clone()
    }
}

#[async_trait]
impl Announcer for MemoryAnnouncer {
    fn name(&self) -> &str {
        "memory"
    }

    async fn post(&self, shelter_name: &str, text: &str) -> Result<()> {
        self.posts
            .lock()
            .push((shelter_name.to_string(), text.to_string()));
        Ok(())
    }
}
