use futures::StreamExt;
use tracing::{debug, info, warn};

use crate::cli::ProjectKind;
use crate::config::{Config, Sampling};
use crate::errors::{BuilderError, Operation};
use crate::payload;
use crate::project::Project;
use crate::prompt;
use crate::provider::{DynProvider, TextStream};
use crate::wire::{ImageFile, LlmRequest, ResponseFormat};

pub const FRONTEND_ACK: &str =
    "Here is the website I generated. Let me know if you'd like to make any changes!";
pub const BACKEND_ACK: &str = "Here is the backend project I generated. You can read the README for instructions. Let me know if you'd like to make any changes!";

const MIN_ENHANCE_CHARS: usize = 5;

pub fn acknowledgement(kind: ProjectKind) -> &'static str {
    match kind {
        ProjectKind::Frontend => FRONTEND_ACK,
        ProjectKind::Backend => BACKEND_ACK,
    }
}

/// Turns a prompt (and optional reference image) into a fresh project.
pub struct Orchestrator {
    provider: DynProvider,
    frontend: Sampling,
    backend: Sampling,
    enhance: Sampling,
}

impl Orchestrator {
    pub fn new(provider: DynProvider, cfg: &Config) -> Self {
        Self { provider, frontend: cfg.frontend, backend: cfg.backend, enhance: cfg.enhance }
    }

    /// Open the streaming call for a single-page site. Nothing is accumulated
    /// until the caller pulls fragments from the returned stream.
    pub async fn start_frontend(
        &self,
        prompt: &str,
        image: Option<&ImageFile>,
    ) -> Result<HtmlStream, BuilderError> {
        let req = request(
            "generate.frontend",
            prompt::system_prompt_generate_frontend(),
            prompt.trim().to_string(),
            image,
            self.frontend,
            ResponseFormat::Text,
        );
        info!(chars = prompt.len(), image = image.is_some(), "starting frontend generation");
        let inner = self
            .provider
            .stream(&req)
            .await
            .map_err(|e| BuilderError::from_provider(Operation::Generate, e))?;
        Ok(HtmlStream { inner, buffer: String::new(), fragments: 0 })
    }

    pub async fn generate_backend(
        &self,
        prompt: &str,
        image: Option<&ImageFile>,
    ) -> Result<Project, BuilderError> {
        let req = request(
            "generate.backend",
            prompt::system_prompt_generate_backend(),
            prompt.trim().to_string(),
            image,
            self.backend,
            ResponseFormat::Json { schema: prompt::project_files_schema() },
        );
        info!(chars = prompt.len(), image = image.is_some(), "starting backend generation");
        let raw = self
            .provider
            .generate(&req)
            .await
            .map_err(|e| BuilderError::from_provider(Operation::Generate, e))?;

        let (files, warnings) = payload::parse_project_files(&raw)?;
        for w in &warnings {
            warn!(warning = %w, "backend payload sanitized");
        }
        debug!(files = files.len(), "backend project parsed");
        Ok(Project::from_entries(files))
    }

    /// Rewrite a short idea into a detailed prompt. Plain-text reply, trimmed.
    pub async fn enhance(&self, prompt: &str, image: Option<&ImageFile>) -> Result<String, BuilderError> {
        if image.is_none() && prompt.trim().chars().count() < MIN_ENHANCE_CHARS {
            return Err(BuilderError::PromptTooShort);
        }
        let req = request(
            "enhance",
            prompt::system_prompt_enhance().to_string(),
            prompt::user_prompt_enhance(prompt),
            image,
            self.enhance,
            ResponseFormat::Text,
        );
        let text = self
            .provider
            .generate(&req)
            .await
            .map_err(|e| BuilderError::from_provider(Operation::Enhance, e))?;
        let text = text.trim();
        if text.is_empty() {
            return Err(BuilderError::InvalidResponseShape("enhanced prompt is empty".into()));
        }
        Ok(text.to_string())
    }
}

fn request(
    stage: &str,
    system: String,
    user: String,
    image: Option<&ImageFile>,
    sampling: Sampling,
    format: ResponseFormat,
) -> LlmRequest {
    LlmRequest {
        stage: stage.to_string(),
        system,
        user,
        image: image.cloned(),
        temperature: sampling.temperature,
        top_p: sampling.top_p,
        format,
    }
}

/// The in-progress `index.html`. Fragments are appended in arrival order; the
/// stream cannot be restarted.
pub struct HtmlStream {
    inner: TextStream,
    buffer: String,
    fragments: usize,
}

impl HtmlStream {
    /// Pull the next fragment, append it and hand it back. `None` once the model is done.
    pub async fn next_fragment(&mut self) -> Option<Result<String, BuilderError>> {
        match self.inner.next().await? {
            Ok(fragment) => {
                self.buffer.push_str(&fragment);
                self.fragments += 1;
                Some(Ok(fragment))
            }
            Err(e) => {
                warn!(error = %e, fragments = self.fragments, "frontend stream failed");
                Some(Err(BuilderError::from_provider(Operation::Generate, e)))
            }
        }
    }

    /// Everything received so far, unprocessed.
    pub fn partial(&self) -> &str {
        &self.buffer
    }

    pub fn fragments(&self) -> usize {
        self.fragments
    }

    /// Strip markdown fences, trim, and install the result as `index.html`.
    pub fn finish(self) -> Result<Project, BuilderError> {
        let html = payload::strip_html_fence(&self.buffer);
        if html.is_empty() {
            return Err(BuilderError::InvalidResponseShape("model returned an empty document".into()));
        }
        debug!(bytes = html.len(), fragments = self.fragments, "frontend stream finished");
        Ok(Project::single(ProjectKind::Frontend.entry_file(), html))
    }
}
