use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;
use std::sync::Arc;

use crate::config::Config;
use crate::errors::ProviderError;
use crate::wire::LlmRequest;

pub mod gemini;
pub mod recording;
#[cfg(test)]
pub mod scripted;

/// Text fragments of a streamed reply, in arrival order.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, ProviderError>> + Send>>;

#[async_trait]
pub trait Provider: Send + Sync {
    /// One blocking call; returns the full reply text.
    async fn generate(&self, req: &LlmRequest) -> Result<String, ProviderError>;

    /// One streaming call; the stream ends after the last fragment or the first error.
    async fn stream(&self, req: &LlmRequest) -> Result<TextStream, ProviderError>;
}

pub type DynProvider = Arc<dyn Provider>;

/// Gemini, wrapped so every stage's request/response can be saved next to the project.
pub fn make_provider(cfg: &Config, session: uuid::Uuid) -> anyhow::Result<DynProvider> {
    let gemini = gemini::GeminiProvider::new(
        cfg.model.clone(),
        cfg.api_key(),
        cfg.gemini_base_url.clone(),
        cfg.timeout_secs,
    )?;
    if cfg.save_request || cfg.save_response {
        Ok(Arc::new(recording::RecordingProvider::new(
            Arc::new(gemini),
            cfg.clone(),
            session,
        )))
    } else {
        Ok(Arc::new(gemini))
    }
}
