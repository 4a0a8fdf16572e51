use tracing::{debug, warn};

use crate::config::{Config, Sampling};
use crate::context::snapshot_project;
use crate::errors::{BuilderError, Operation};
use crate::payload;
use crate::project::Project;
use crate::prompt;
use crate::provider::DynProvider;
use crate::wire::{ChatMessage, EditorChatResponse, LlmRequest, ResponseFormat};

/// Sends one edit turn: the whole project plus conversation plus the new instruction.
pub struct EditCoordinator {
    provider: DynProvider,
    sampling: Sampling,
    max_context_bytes: usize,
}

impl EditCoordinator {
    pub fn new(provider: DynProvider, cfg: &Config) -> Self {
        Self { provider, sampling: cfg.edit, max_context_bytes: cfg.edit_context_max_bytes }
    }

    /// `history` is the conversation before this instruction. The reply is
    /// validated but not applied; merging is the caller's job.
    pub async fn request(
        &self,
        project: &Project,
        history: &[ChatMessage],
        instruction: &str,
    ) -> Result<EditorChatResponse, BuilderError> {
        let files = snapshot_project(project, self.max_context_bytes);
        let req = LlmRequest {
            stage: "edit".into(),
            system: prompt::system_prompt_edit(),
            user: prompt::user_prompt_edit(&files, history, instruction),
            image: None,
            temperature: self.sampling.temperature,
            top_p: self.sampling.top_p,
            format: ResponseFormat::Json { schema: prompt::editor_response_schema() },
        };
        debug!(files = files.len(), turns = history.len(), "sending edit turn");

        let raw = self
            .provider
            .generate(&req)
            .await
            .map_err(|e| BuilderError::from_provider(Operation::Edit, e))?;
        let (reply, warnings) = payload::parse_editor_response(&raw)?;
        for w in &warnings {
            warn!(warning = %w, "edit payload sanitized");
        }
        debug!(updated = reply.updated_files.len(), "edit turn parsed");
        Ok(reply)
    }
}
