use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    /// The live model call failed. Carries the sanitized upstream description.
    #[error("processing failed: {0}")]
    ProcessingFailed(String),

    #[error("failed to initialize provider: {0}")]
    ProviderInit(String),
}

impl AgentError {
    /// Short description suitable for callers outside the process.
    pub fn description(&self) -> &str {
        match self {
            Self::ProcessingFailed(detail) | Self::ProviderInit(detail) => detail,
        }
    }
}
