use thiserror::Error;

pub const NOT_CONFIGURED_MESSAGE: &str =
    "AI Service is not configured. Please ensure the GEMINI_API_KEY (or API_KEY) environment variable is set correctly.";

/// Errors raised by the LLM transport, before they are mapped to what the user sees.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("API key is not set")]
    MissingApiKey,
    #[error("transport error: {0}")]
    Transport(reqwest::Error),
    #[error("status {0}: {1}")]
    Status(reqwest::StatusCode, String),
    #[error("unexpected provider output: {0}")]
    Invariant(String),
}

impl From<reqwest::Error> for ProviderError {
    /// Request URLs are dropped so nothing that identifies the caller ends up in logs or artifacts.
    fn from(e: reqwest::Error) -> Self {
        ProviderError::Transport(e.without_url())
    }
}

/// The operation an LLM failure happened in; picks the retry-later wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Generate,
    Edit,
    Enhance,
}

impl Operation {
    fn busy_message(self) -> &'static str {
        match self {
            Operation::Generate => {
                "Failed to generate the project. The AI model might be busy. Please try again later."
            }
            Operation::Edit => "Failed to get response from AI assistant. Please try again later.",
            Operation::Enhance => "Failed to enhance prompt. The AI model might be busy.",
        }
    }
}

#[derive(Error, Debug)]
pub enum BuilderError {
    #[error("{}", NOT_CONFIGURED_MESSAGE)]
    ServiceNotConfigured,
    #[error("{0}")]
    TransientService(String),
    #[error("invalid response shape: {0}")]
    InvalidResponseShape(String),
    #[error("generated project is missing required file {0}")]
    MissingRequiredFile(String),
    #[error("Prompt is too short to enhance.")]
    PromptTooShort,
    #[error("{0}")]
    DeploymentFailed(String),
    #[error("{0}")]
    InvalidCredential(String),
    #[error("{0}")]
    InvalidInput(String),
    #[error("{0}")]
    InvalidState(String),
    #[error("Daily generation limit reached. Come back tomorrow.")]
    QuotaExhausted,
    #[error("storage error: {0}")]
    Storage(String),
}

impl BuilderError {
    /// Collapse a provider failure into "not configured" or a generic retry-later message.
    pub fn from_provider(op: Operation, err: ProviderError) -> Self {
        let mentions_key = match &err {
            ProviderError::MissingApiKey => true,
            other => other.to_string().to_lowercase().contains("api key"),
        };
        if mentions_key {
            BuilderError::ServiceNotConfigured
        } else {
            BuilderError::TransientService(op.busy_message().to_string())
        }
    }

    /// Deployment failures whose message says the token was rejected evict the cached token.
    pub fn deployment(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.to_lowercase().contains("invalid token") {
            BuilderError::InvalidCredential(message)
        } else {
            BuilderError::DeploymentFailed(message)
        }
    }
}
