use anyhow::{anyhow, Result};
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use crate::reply::BackendReply;
use crate::state::WebsiteRecord;

/// Body of `POST /api/chat`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub website_id: Option<i64>,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>, website_id: Option<i64>) -> Self {
        Self {
            message: message.into(),
            website_id,
        }
    }
}

#[derive(Serialize)]
struct RegisterRequest<'a> {
    url: &'a str,
}

/// HTTP client for the support backend
#[derive(Clone)]
pub struct SupportClient {
    client: Client,
    base_url: String,
}

impl SupportClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send one chat message.
    ///
    /// The body is decoded as a reply whatever the status code; only
    /// transport failures and bodies that are not JSON are errors.
    pub async fn chat(&self, request: &ChatRequest) -> Result<BackendReply> {
        let url = format!("{}/api/chat", self.base_url);
        debug!(website_id = ?request.website_id, "sending chat message");

        let response = self.client.post(&url).json(request).send().await?;
        let status = response.status();
        let body: Value = response.json().await?;
        let reply = BackendReply::from_value(body);

        info!(%status, "chat reply received");
        Ok(reply)
    }

    pub async fn list_websites(&self) -> Result<Vec<WebsiteRecord>> {
        let url = format!("{}/api/websites/", self.base_url);

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(anyhow!("Failed to fetch websites: {}", response.status()));
        }

        let websites: Vec<WebsiteRecord> = response.json().await?;
        debug!(count = websites.len(), "websites loaded");
        Ok(websites)
    }

    pub async fn register_website(&self, site_url: &str) -> Result<WebsiteRecord> {
        let url = format!("{}/api/websites/", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&RegisterRequest { url: site_url })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Failed to fetch website details {}: {}", status, text));
        }

        let record: WebsiteRecord = response.json().await?;
        info!(id = ?record.id, url = site_url, "website registered");
        Ok(record)
    }
}
