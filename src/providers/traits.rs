//! Provider capability traits and chat message types.

use async_trait::async_trait;
use serde::Serialize;

/// A single chat turn sent to a model backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

/// Model inference backend.
///
/// Implementations own their HTTP client and credentials. Failures are
/// returned as-is; retry and rate-limit handling belong to the implementation.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Send a full conversation and return the model's text reply.
    async fn chat_with_history(
        &self,
        messages: &[ChatMessage],
        model: &str,
        temperature: f64,
    ) -> anyhow::Result<String>;

    fn name(&self) -> &str;
}
