//! Responder session: picks live or mock mode once and answers messages.

use super::error::AgentError;
use super::intents;
use super::memory::{BufferMemory, ConversationMemory, NoopMemory};
use crate::config::AgentConfig;
use crate::providers::{self, ChatMessage, Provider};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponderMode {
    Live,
    Mock,
}

impl fmt::Display for ResponderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Live => f.write_str("live"),
            Self::Mock => f.write_str("mock"),
        }
    }
}

enum Backend {
    Mock,
    Live(Box<dyn Provider>),
}

/// One responder for the lifetime of the process.
///
/// The mode is decided at construction and never changes. Share across
/// request handlers behind an `Arc`; `respond` takes `&self`.
pub struct Session {
    id: String,
    backend: Backend,
    memory: Box<dyn ConversationMemory>,
    model: String,
    temperature: f64,
    system_prompt: String,
    max_history_messages: usize,
}

impl Session {
    /// Mock when `credential` is absent or blank, live otherwise.
    pub fn from_credential(
        credential: Option<&str>,
        api_url: Option<&str>,
        settings: &AgentConfig,
    ) -> Result<Self, AgentError> {
        match providers::normalize_credential(credential) {
            None => {
                tracing::info!("No API key configured; running in mock mode");
                Ok(Self::mock(settings))
            }
            Some(key) => {
                let provider = providers::create_provider(&settings.provider, Some(key), api_url)
                    .map_err(|e| AgentError::ProviderInit(e.to_string()))?;
                Ok(Self::with_provider(provider, settings))
            }
        }
    }

    pub fn from_config(config: &crate::Config) -> Result<Self, AgentError> {
        Self::from_credential(
            config.api_key.as_deref(),
            config.api_url.as_deref(),
            &config.agent,
        )
    }

    pub fn mock(settings: &AgentConfig) -> Self {
        Self::build(Backend::Mock, Box::new(NoopMemory), settings)
    }

    /// Live session around an already-constructed provider.
    pub fn with_provider(provider: Box<dyn Provider>, settings: &AgentConfig) -> Self {
        tracing::info!(
            provider = provider.name(),
            model = %settings.model,
            "API key configured; running in live mode"
        );
        let memory = BufferMemory::new(settings.max_history_messages);
        Self::build(Backend::Live(provider), Box::new(memory), settings)
    }

    fn build(
        backend: Backend,
        memory: Box<dyn ConversationMemory>,
        settings: &AgentConfig,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            backend,
            memory,
            model: settings.model.clone(),
            temperature: settings.temperature,
            system_prompt: settings.system_prompt.clone(),
            max_history_messages: settings.max_history_messages,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn mode(&self) -> ResponderMode {
        match self.backend {
            Backend::Mock => ResponderMode::Mock,
            Backend::Live(_) => ResponderMode::Live,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn memory_backend(&self) -> &str {
        self.memory.name()
    }

    /// Answer one message with no conversation context.
    ///
    /// Mock mode never fails. Live mode fails with
    /// [`AgentError::ProcessingFailed`] when the provider call does; the
    /// failure is not retried.
    pub async fn respond(&self, message: &str) -> Result<String, AgentError> {
        self.respond_in(None, message).await
    }

    /// Answer one message, replaying earlier turns of `conversation_id` in
    /// live mode. Without a conversation id nothing is replayed or stored.
    pub async fn respond_in(
        &self,
        conversation_id: Option<&str>,
        message: &str,
    ) -> Result<String, AgentError> {
        match &self.backend {
            Backend::Mock => {
                let intent = intents::classify(message);
                tracing::debug!(session_id = %self.id, %intent, "mock reply");
                Ok(intents::mock_reply(message))
            }
            Backend::Live(provider) => {
                self.respond_live(provider.as_ref(), conversation_id, message)
                    .await
            }
        }
    }

    /// Forget the stored turns of one conversation.
    pub fn end_conversation(&self, conversation_id: &str) -> bool {
        let removed = self.memory.clear(conversation_id);
        tracing::debug!(session_id = %self.id, conversation_id, removed, "conversation cleared");
        removed
    }

    async fn respond_live(
        &self,
        provider: &dyn Provider,
        conversation_id: Option<&str>,
        message: &str,
    ) -> Result<String, AgentError> {
        let history = conversation_id
            .map(|id| self.memory.history(id, self.max_history_messages))
            .unwrap_or_default();

        let mut messages = Vec::with_capacity(history.len() + 2);
        if !self.system_prompt.trim().is_empty() {
            messages.push(ChatMessage::system(self.system_prompt.as_str()));
        }
        messages.extend(history.into_iter().map(|entry| ChatMessage {
            role: entry.role,
            content: entry.content,
        }));
        messages.push(ChatMessage::user(message));

        let reply = provider
            .chat_with_history(&messages, &self.model, self.temperature)
            .await
            .map_err(|e| {
                let detail = providers::sanitize_api_error(&e.to_string());
                tracing::warn!(
                    session_id = %self.id,
                    provider = provider.name(),
                    error = %detail,
                    "live reply failed"
                );
                AgentError::ProcessingFailed(detail)
            })?;

        if let Some(id) = conversation_id {
            self.memory.record_exchange(id, message, &reply);
        }
        tracing::debug!(
            session_id = %self.id,
            provider = provider.name(),
            turns = messages.len(),
            "live reply"
        );
        Ok(reply)
    }
}
