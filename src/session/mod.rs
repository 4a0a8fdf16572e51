use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::apply::{apply_updates, ApplySummary};
use crate::cli::ProjectKind;
use crate::config::Config;
use crate::edit::EditCoordinator;
use crate::errors::BuilderError;
use crate::generate::{acknowledgement, Orchestrator};
use crate::project::Project;
use crate::provider::DynProvider;
use crate::wire::{ChatMessage, ImageFile};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    Empty,
    Generating,
    Ready,
    Editing,
}

/// Identifies one generation. Results carrying an older ticket are dropped.
#[derive(Debug, PartialEq, Eq)]
pub struct GenerationTicket {
    id: u64,
    kind: ProjectKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Applied,
    Stale,
}

/// What one successful edit turn produced.
#[derive(Debug, Clone)]
pub struct EditOutcome {
    pub response: String,
    pub summary: ApplySummary,
}

/// Coalesces stream notifications to one per interval.
pub struct FrameThrottle {
    interval: Duration,
    last: Option<Instant>,
}

impl FrameThrottle {
    pub fn new(interval: Duration) -> Self {
        Self { interval, last: None }
    }

    pub fn ready(&mut self, now: Instant) -> bool {
        match self.last {
            Some(prev) if now.duration_since(prev) < self.interval => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}

/// Clears the busy flag on every exit path, including a dropped future.
struct BusyGuard(Arc<AtomicBool>);

impl BusyGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag.clone()))
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// The one place project, conversation and active file are mutated.
pub struct Session {
    orchestrator: Orchestrator,
    coordinator: EditCoordinator,
    kind: ProjectKind,
    project: Option<Project>,
    history: Vec<ChatMessage>,
    active_file: Option<String>,
    next_generation: u64,
    generating: Option<u64>,
    busy: Arc<AtomicBool>,
    last_error: Option<String>,
    refresh: Duration,
}

impl Session {
    pub fn new(provider: DynProvider, cfg: &Config) -> Self {
        Self {
            orchestrator: Orchestrator::new(provider.clone(), cfg),
            coordinator: EditCoordinator::new(provider, cfg),
            kind: ProjectKind::Frontend,
            project: None,
            history: Vec::new(),
            active_file: None,
            next_generation: 0,
            generating: None,
            busy: Arc::new(AtomicBool::new(false)),
            last_error: None,
            refresh: Duration::from_millis(cfg.stream_refresh_ms),
        }
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    pub fn state(&self) -> ViewState {
        if self.generating.is_some() {
            ViewState::Generating
        } else if self.busy.load(Ordering::Acquire) {
            ViewState::Editing
        } else if self.project.is_some() {
            ViewState::Ready
        } else {
            ViewState::Empty
        }
    }

    pub fn kind(&self) -> ProjectKind {
        self.kind
    }

    pub fn project(&self) -> Option<&Project> {
        self.project.as_ref()
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn active_file(&self) -> Option<&str> {
        self.active_file.as_deref()
    }

    pub fn active_content(&self) -> Option<&str> {
        let path = self.active_file.as_deref()?;
        self.project.as_ref()?.get(path)
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Reset everything and hand out a fresh ticket. Supersedes a running
    /// generation but not an edit turn.
    pub fn begin_generation(&mut self, kind: ProjectKind) -> Result<GenerationTicket, BuilderError> {
        if self.busy.load(Ordering::Acquire) {
            return Err(BuilderError::InvalidState(
                "Please wait for the assistant to finish before generating.".into(),
            ));
        }
        if let Some(old) = self.generating {
            debug!(superseded = old, "generation superseded");
        }
        self.next_generation += 1;
        self.generating = Some(self.next_generation);
        self.kind = kind;
        self.project = None;
        self.history.clear();
        self.active_file = None;
        self.last_error = None;
        Ok(GenerationTicket { id: self.next_generation, kind })
    }

    fn is_current(&self, ticket: &GenerationTicket) -> bool {
        self.generating == Some(ticket.id)
    }

    /// Show the in-progress document while a frontend stream is running.
    pub fn apply_partial(&mut self, ticket: &GenerationTicket, partial: &str) {
        if self.is_current(ticket) {
            self.project = Some(Project::single(ProjectKind::Frontend.entry_file(), partial));
        }
    }

    pub fn complete_generation(
        &mut self,
        ticket: GenerationTicket,
        result: Result<Project, BuilderError>,
    ) -> Result<Completion, BuilderError> {
        if !self.is_current(&ticket) {
            debug!(ticket = ticket.id, "discarding stale generation result");
            return Ok(Completion::Stale);
        }
        self.generating = None;
        match result {
            Ok(project) => {
                let entry = ticket.kind.entry_file();
                info!(kind = ?ticket.kind, files = project.len(), "generation complete");
                self.active_file = if project.contains(entry) {
                    Some(entry.to_string())
                } else {
                    project.paths().next().map(str::to_string)
                };
                self.project = Some(project);
                self.history.push(ChatMessage::model(acknowledgement(ticket.kind)));
                Ok(Completion::Applied)
            }
            Err(e) => {
                warn!(error = %e, "generation failed");
                self.project = None;
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Run a whole generation. `on_update` sees the partial document at most
    /// once per refresh interval while a frontend streams, then once more at the end.
    pub async fn generate<F>(
        &mut self,
        kind: ProjectKind,
        prompt: &str,
        image: Option<&ImageFile>,
        mut on_update: F,
    ) -> Result<Completion, BuilderError>
    where
        F: FnMut(&str, usize),
    {
        let ticket = self.begin_generation(kind)?;
        let result = match kind {
            ProjectKind::Frontend => self.stream_frontend(&ticket, prompt, image, &mut on_update).await,
            ProjectKind::Backend => self.orchestrator.generate_backend(prompt, image).await,
        };
        self.complete_generation(ticket, result)
    }

    async fn stream_frontend<F>(
        &mut self,
        ticket: &GenerationTicket,
        prompt: &str,
        image: Option<&ImageFile>,
        on_update: &mut F,
    ) -> Result<Project, BuilderError>
    where
        F: FnMut(&str, usize),
    {
        let mut stream = self.orchestrator.start_frontend(prompt, image).await?;
        let mut throttle = FrameThrottle::new(self.refresh);
        while let Some(fragment) = stream.next_fragment().await {
            fragment?;
            self.apply_partial(ticket, stream.partial());
            if throttle.ready(Instant::now()) {
                on_update(stream.partial(), stream.fragments());
            }
        }
        on_update(stream.partial(), stream.fragments());
        stream.finish()
    }

    /// One conversational edit. The user message is recorded before the call;
    /// on failure an error message follows it and the project is untouched.
    pub async fn edit_turn(&mut self, instruction: &str) -> Result<EditOutcome, BuilderError> {
        let instruction = instruction.trim();
        if instruction.is_empty() {
            return Err(BuilderError::InvalidState("Please enter an instruction.".into()));
        }
        if self.project.is_none() {
            return Err(BuilderError::InvalidState("Generate a project before asking for changes.".into()));
        }
        if self.generating.is_some() {
            return Err(BuilderError::InvalidState("Please wait for generation to finish.".into()));
        }
        let _guard = BusyGuard::acquire(&self.busy).ok_or_else(|| {
            BuilderError::InvalidState("Please wait for the assistant to finish.".into())
        })?;

        self.history.push(ChatMessage::user(instruction));
        let prior = &self.history[..self.history.len() - 1];
        let result = match &self.project {
            Some(project) => self.coordinator.request(project, prior, instruction).await,
            None => Err(BuilderError::InvalidState("project disappeared".into())),
        };

        match result {
            Ok(reply) => {
                let summary = match self.project.as_mut() {
                    Some(project) => apply_updates(project, &reply.updated_files),
                    None => ApplySummary::new(),
                };
                info!(created = summary.created, updated = summary.updated, "edit applied");
                self.history.push(ChatMessage::model(reply.response.clone()));
                self.last_error = None;
                Ok(EditOutcome { response: reply.response, summary })
            }
            Err(e) => {
                warn!(error = %e, "edit turn failed");
                self.history.push(ChatMessage::model(format!("I encountered an error: {e}")));
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    pub fn select_file(&mut self, path: &str) -> Result<(), BuilderError> {
        match &self.project {
            Some(p) if p.contains(path) => {
                self.active_file = Some(path.to_string());
                Ok(())
            }
            _ => Err(BuilderError::InvalidInput(format!("No such file: {path}"))),
        }
    }

    /// Replace one existing file by hand, as typing into the code view would.
    pub fn set_file_content(&mut self, path: &str, content: String) -> Result<(), BuilderError> {
        if self.state() != ViewState::Ready {
            return Err(BuilderError::InvalidState("Nothing to edit right now.".into()));
        }
        match self.project.as_mut() {
            Some(p) if p.contains(path) => {
                p.insert(path, content);
                Ok(())
            }
            _ => Err(BuilderError::InvalidInput(format!("No such file: {path}"))),
        }
    }
}
