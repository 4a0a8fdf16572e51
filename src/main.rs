use anyhow::Context;
use chrono::Local;
use clap::Parser;
use fs_err as fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

mod apply;
mod auth;
mod cli;
mod composer;
mod config;
mod context;
mod edit;
mod errors;
mod export;
mod generate;
mod log;
mod payload;
mod project;
mod prompt;
mod provider;
mod publish;
mod safety;
mod session;
mod store;
mod ux;
mod wire;

#[cfg(test)]
mod test_support;

use auth::AuthState;
use cli::repl::ReplCommand;
use cli::{Command, ProjectKind, Theme};
use composer::PromptComposer;
use config::Config;
use errors::BuilderError;
use generate::Orchestrator;
use publish::{Publisher, VercelClient};
use session::Session;
use store::{DailyQuota, JsonFileStore, KeyValueStore};
use wire::ImageFile;

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("sitesmith=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sitesmith=warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::Args::parse();
    init_tracing(args.debug);

    let mut cfg = Config::load(args.config.as_deref())?;
    cfg.apply_args(&args);

    let store: Arc<dyn KeyValueStore> = Arc::new(JsonFileStore::open(cfg.store_file()?));
    let theme = store::load_theme(store.as_ref(), Theme::Dark);

    let txid = Uuid::new_v4();
    if cfg.save_request || cfg.save_response {
        debug!(dir = %crate::log::tx_dir(Path::new(&cfg.root), txid).display(), "saving model artifacts");
    }

    match args.command {
        Command::Theme { value } => {
            store::save_theme(store.as_ref(), value)?;
            println!("Theme set to {}.", ux::accent(value, &format!("{value:?}").to_lowercase()));
        }
        Command::LogoutVercel => {
            store.remove(store::VERCEL_TOKEN_KEY)?;
            println!("Vercel token removed.");
        }
        Command::Publish { file, token } => {
            let html = fs::read_to_string(&file)?;
            let mut publisher = Publisher::new(store.clone(), VercelClient::new(&cfg)?);
            let pb = ux::spinner("Publishing to Vercel…");
            let result = publisher.publish_html(&html, token.as_deref()).await;
            pb.finish_and_clear();
            println!("Published: {}", ux::accent(theme, &result?));
        }
        Command::Enhance { prompt, image } => {
            let mut composer = PromptComposer::new(prompt);
            if let Some(path) = image {
                composer.attach_image(ImageFile::from_path(Path::new(&path))?);
            }
            let orchestrator = Orchestrator::new(provider::make_provider(&cfg, txid)?, &cfg);
            let pb = ux::spinner("Enhancing prompt…");
            let result = orchestrator.enhance(composer.prompt(), composer.image()).await;
            pb.finish_and_clear();
            println!("{}", result?);
        }
        Command::New { kind, prompt, image, enhance, out, no_chat } => {
            let provider = provider::make_provider(&cfg, txid)?;
            let publisher = Publisher::new(store.clone(), VercelClient::new(&cfg)?);
            let mut app = App {
                session: Session::new(provider, &cfg),
                cfg,
                theme,
                store,
                publisher,
                auth: AuthState::default(),
            };

            let mut composer = PromptComposer::new(prompt);
            if let Some(path) = image {
                composer.attach_image(ImageFile::from_path(Path::new(&path))?);
            }
            if enhance {
                app.enhance(&mut composer).await;
            }
            if let Err(e) = app.generate(kind, &mut composer).await {
                if no_chat {
                    return Err(e);
                }
                ux::error(&format!("{e:#}"));
                ux::notice("Use :new <prompt> to try again.");
            }

            if let (Some(dir), Some(_)) = (out, app.session.project()) {
                if let Err(e) = app.save(&dir) {
                    if no_chat {
                        return Err(e);
                    }
                    ux::error(&format!("{e:#}"));
                }
            }
            if !no_chat {
                app.repl().await;
            }
        }
    }
    Ok(())
}

struct App {
    cfg: Config,
    theme: Theme,
    store: Arc<dyn KeyValueStore>,
    session: Session,
    publisher: Publisher,
    auth: AuthState,
}

impl App {
    /// Failure leaves the prompt as typed.
    async fn enhance(&self, composer: &mut PromptComposer) {
        let pb = ux::spinner("Enhancing prompt…");
        let result = self.session.orchestrator().enhance(composer.prompt(), composer.image()).await;
        pb.finish_and_clear();
        match &result {
            Ok(text) => ux::notice(&format!("Enhanced prompt: {text}")),
            Err(e) => ux::error(&e.to_string()),
        }
        composer.apply_enhanced(&result);
    }

    async fn generate(&mut self, kind: ProjectKind, composer: &mut PromptComposer) -> anyhow::Result<()> {
        let store = self.store.clone();
        let mut quota = DailyQuota::load(store.as_ref(), self.cfg.daily_generation_limit, Local::now().date_naive());
        if !quota.has_generations_left() {
            return Err(BuilderError::QuotaExhausted.into());
        }
        let (prompt, image) = composer.take_for_generation()?;

        let pb = match kind {
            ProjectKind::Frontend => ux::stream_counter(),
            ProjectKind::Backend => ux::spinner("Generating backend project…"),
        };
        let result = self
            .session
            .generate(kind, &prompt, image.as_ref(), |partial, n| ux::update_stream_counter(&pb, partial, n))
            .await;
        pb.finish_and_clear();
        result?;

        quota.decrement();
        if let Some(project) = self.session.project() {
            ux::show_files(self.theme, project, self.session.active_file());
        }
        if let Some(ack) = self.session.history().last() {
            ux::print_message(self.theme, ack);
        }
        ux::notice(&format!("{} generations left today.", quota.remaining()));
        Ok(())
    }

    fn save(&self, dir: &str) -> anyhow::Result<()> {
        let project = self.session.project().context("nothing generated yet")?;
        let sum = apply::write_project(Path::new(dir), project, false)?;
        ux::notice(&format!(
            "Wrote {} files to {} ({} created, {} updated).",
            project.len(),
            dir,
            sum.created,
            sum.updated
        ));
        Ok(())
    }

    fn preview(&self) -> anyhow::Result<()> {
        let project = self.session.project().context("nothing generated yet")?;
        match self.session.kind() {
            ProjectKind::Frontend => {
                let dir: PathBuf = Path::new(&self.cfg.root).join(".sitesmith").join("preview");
                apply::write_project(&dir, project, false)?;
                ux::notice(&format!("Open {} in a browser.", dir.join("index.html").display()));
            }
            ProjectKind::Backend => {
                let readme = project.get(payload::README).unwrap_or_default();
                ux::show_file(self.theme, payload::README, readme);
            }
        }
        Ok(())
    }

    async fn publish(&mut self, token: Option<String>) -> anyhow::Result<()> {
        let token = match token {
            Some(t) => Some(t),
            None if !self.publisher.has_token() => ux::read_line("Vercel token: "),
            None => None,
        };
        let project = self.session.project().context("nothing generated yet")?;
        let pb = ux::spinner("Publishing to Vercel…");
        let result = self.publisher.publish_project(project, self.session.kind(), token.as_deref()).await;
        pb.finish_and_clear();
        debug!(result = ?self.publisher.last_result(), "publish finished");
        match result {
            Ok(url) => ux::notice(&format!("Published: {}", ux::accent(self.theme, &url))),
            Err(BuilderError::InvalidCredential(msg)) => {
                ux::error(&format!("{msg}. The saved token was removed; run :publish <token> to try again."))
            }
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }

    async fn edit(&mut self, instruction: &str) -> anyhow::Result<()> {
        let pb = ux::spinner("Thinking…");
        let result = self.session.edit_turn(instruction).await;
        pb.finish_and_clear();
        let outcome = result?;
        if let Some(reply) = self.session.history().last() {
            ux::print_message(self.theme, reply);
        }
        if let Some(project) = self.session.project() {
            ux::print_apply_dashboard(&outcome.summary, project);
        }
        Ok(())
    }

    async fn repl(&mut self) {
        ux::print_help(self.theme);
        loop {
            let prompt = match self.auth.user() {
                Some(user) => format!("\n{}› ", user.name),
                None => "\n› ".to_string(),
            };
            let Some(line) = ux::read_line(&prompt) else { break };
            match self.dispatch(ReplCommand::parse(&line)).await {
                Ok(true) => {}
                Ok(false) => break,
                Err(e) => ux::error(&format!("{e:#}")),
            }
        }
    }

    /// `Ok(false)` ends the session.
    async fn dispatch(&mut self, cmd: ReplCommand) -> anyhow::Result<bool> {
        match cmd {
            ReplCommand::Blank => {}
            ReplCommand::Quit => return Ok(false),
            ReplCommand::Help => ux::print_help(self.theme),
            ReplCommand::Invalid(usage) => ux::error(&format!("usage: {usage}")),
            ReplCommand::Files => {
                let project = self.session.project().context("nothing generated yet")?;
                ux::show_files(self.theme, project, self.session.active_file());
            }
            ReplCommand::Open(path) => {
                self.session.select_file(&path)?;
                self.show_active();
            }
            ReplCommand::Show => self.show_active(),
            ReplCommand::Preview => self.preview()?,
            ReplCommand::History => ux::show_history(self.theme, self.session.history()),
            ReplCommand::Replace { path, local } => {
                let content = fs::read_to_string(&local)?;
                self.session.set_file_content(&path, content)?;
                ux::notice(&format!("Replaced {path}."));
            }
            ReplCommand::Save(dir) => self.save(&dir)?,
            ReplCommand::Export(dir) => {
                let project = self.session.project().context("nothing generated yet")?;
                let dir = dir.unwrap_or_else(|| self.cfg.root.clone());
                let path = export::export_zip(project, Path::new(&dir), &self.cfg.archive_name)?;
                ux::notice(&format!("Saved {}.", path.display()));
            }
            ReplCommand::Publish(token) => self.publish(token).await?,
            ReplCommand::New(prompt) => {
                if self.session.project().is_some()
                    && !ux::confirm("Start over? The current project and chat will be discarded.")
                {
                    return Ok(true);
                }
                let kind = self.session.kind();
                let mut composer = PromptComposer::new(prompt);
                self.generate(kind, &mut composer).await?;
            }
            ReplCommand::SignIn { email, password } => {
                let user = self.auth.sign_in(&email, &password)?;
                ux::notice(&format!("Signed in as {}.", user.name));
            }
            ReplCommand::SignUp { name, email, password } => {
                let user = self.auth.sign_up(&name, &email, &password)?;
                ux::notice(&format!("Welcome, {}.", user.name));
            }
            ReplCommand::SignOut => {
                self.auth.sign_out();
                ux::notice("Signed out.");
            }
            ReplCommand::Edit(instruction) => self.edit(&instruction).await?,
        }
        Ok(true)
    }

    fn show_active(&self) {
        match (self.session.active_file(), self.session.active_content()) {
            (Some(path), Some(content)) => ux::show_file(self.theme, path, content),
            _ => ux::notice("No file is open."),
        }
    }
}
