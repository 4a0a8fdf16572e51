use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

pub mod repl;

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectKind {
    /// A single self-contained `index.html`.
    #[value(alias = "web", alias = "site")]
    Frontend,
    /// A small multi-file server project documented by `README.md`.
    #[value(alias = "api", alias = "server")]
    Backend,
}

impl ProjectKind {
    /// The file shown first after generation.
    pub fn entry_file(self) -> &'static str {
        match self {
            ProjectKind::Frontend => "index.html",
            ProjectKind::Backend => "README.md",
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Dark,
    Light,
}

#[derive(Parser, Debug)]
#[command(name = "sitesmith", version, about = "Chat-driven website and backend generator on top of Gemini")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Working directory for artifacts, previews and exports.
    #[arg(long, global = true, default_value = ".")]
    pub root: String,

    #[arg(long, global = true)]
    pub model: Option<String>,

    #[arg(long, global = true)]
    pub timeout_secs: Option<u64>,

    /// Save every request sent to the model under `.sitesmith/tx/<id>/`.
    #[arg(long, global = true, default_value_t = false)]
    pub save_request: bool,

    /// Save every raw model response under `.sitesmith/tx/<id>/`.
    #[arg(long, global = true, default_value_t = false)]
    pub save_response: bool,

    #[arg(long, global = true, default_value_t = false)]
    pub debug: bool,

    /// Path to a TOML config file.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Path of the persisted key-value store (token, theme, daily quota).
    #[arg(long, global = true)]
    pub store: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate a new project and open the edit chat.
    #[command(alias = "generate")]
    New {
        #[arg(long, value_enum, default_value_t = ProjectKind::Frontend)]
        kind: ProjectKind,

        #[arg(long)]
        prompt: String,

        /// Reference image (jpeg, png or webp).
        #[arg(long)]
        image: Option<String>,

        /// Rewrite the prompt with the model before generating.
        #[arg(long, default_value_t = false)]
        enhance: bool,

        /// Write the generated files to this directory.
        #[arg(long)]
        out: Option<String>,

        /// Exit after generation instead of opening the chat.
        #[arg(long, default_value_t = false)]
        no_chat: bool,
    },
    /// Print an enhanced version of a prompt.
    Enhance {
        #[arg(long)]
        prompt: String,

        #[arg(long)]
        image: Option<String>,
    },
    /// Publish an existing HTML file to Vercel.
    Publish {
        #[arg(long, default_value = "index.html")]
        file: String,

        /// Vercel token; saved for later runs.
        #[arg(long)]
        token: Option<String>,
    },
    /// Persist the preferred terminal theme.
    Theme {
        #[arg(value_enum)]
        value: Theme,
    },
    /// Forget the saved Vercel token.
    LogoutVercel,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_new_with_aliases() {
        let args = Args::try_parse_from([
            "sitesmith", "generate", "--kind", "api", "--prompt", "todo api", "--no-chat",
        ])
        .unwrap();
        match args.command {
            Command::New { kind, prompt, no_chat, .. } => {
                assert_eq!(kind, ProjectKind::Backend);
                assert_eq!(prompt, "todo api");
                assert!(no_chat);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn entry_files_per_kind() {
        assert_eq!(ProjectKind::Frontend.entry_file(), "index.html");
        assert_eq!(ProjectKind::Backend.entry_file(), "README.md");
    }
}
