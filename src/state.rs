//! UI-agnostic session types
//!
//! Data structures shared by the terminal front end and the one-shot CLI
//! commands. Nothing here depends on ratatui.

use serde::{Deserialize, Serialize};

/// Who wrote a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Agent,
}

/// A chat bubble in the transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub text: String,
    pub sender: Sender,
    pub timestamp: String,
}

/// A website registered with the support backend
///
/// Every field is optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebsiteRecord {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl WebsiteRecord {
    /// Url if present and non-empty.
    pub fn url(&self) -> Option<&str> {
        non_empty(&self.url)
    }

    pub fn name(&self) -> Option<&str> {
        non_empty(&self.name)
    }

    pub fn description(&self) -> Option<&str> {
        non_empty(&self.description)
    }

    pub fn icon(&self) -> Option<&str> {
        non_empty(&self.icon)
    }
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}

/// Per-session context that scopes chat requests
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    pub selected_website_id: Option<i64>,
}

impl SessionContext {
    pub fn select(&mut self, id: Option<i64>) {
        self.selected_website_id = id;
    }

    pub fn clear(&mut self) {
        self.selected_website_id = None;
    }
}
