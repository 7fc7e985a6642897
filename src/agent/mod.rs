pub mod error;
pub mod intents;
pub mod memory;
pub mod session;

pub use error::AgentError;
pub use intents::{classify, mock_reply, Intent, IntentRule};
pub use memory::{BufferMemory, ConversationMemory, MemoryEntry, NoopMemory};
pub use session::{ResponderMode, Session};

use crate::config::Config;
use anyhow::{Context, Result};

/// Answer a single message from the command line and print the reply.
pub async fn run_once(config: &Config, message: &str) -> Result<String> {
    let session = Session::from_config(config).context("Failed to initialize responder")?;
    tracing::info!(mode = %session.mode(), "Answering single message");
    let reply = session.respond(message).await?;
    Ok(reply)
}
