use anyhow::{Context, Result};
use fs_err as fs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::cli::Args;

/// Sampling settings for one kind of model call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sampling {
    pub temperature: f32,
    pub top_p: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub root: String,
    pub model: String,
    pub gemini_base_url: String,
    /// Environment variables checked, in order, for the Gemini key.
    pub api_key_env: Vec<String>,
    pub timeout_secs: u64,
    pub frontend: Sampling,
    pub backend: Sampling,
    pub edit: Sampling,
    pub enhance: Sampling,
    pub vercel_endpoint: String,
    pub vercel_project_name: String,
    pub archive_name: String,
    pub store_path: Option<String>,
    pub daily_generation_limit: u32,
    /// Per-file cap on what an edit turn sends as project context.
    pub edit_context_max_bytes: usize,
    pub stream_refresh_ms: u64,
    pub save_request: bool,
    pub save_response: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: ".".into(),
            model: "gemini-2.5-flash".into(),
            gemini_base_url: "https://generativelanguage.googleapis.com/v1beta".into(),
            api_key_env: vec!["GEMINI_API_KEY".into(), "API_KEY".into()],
            timeout_secs: 600,
            frontend: Sampling { temperature: 0.7, top_p: 0.95 },
            backend: Sampling { temperature: 0.7, top_p: 0.95 },
            edit: Sampling { temperature: 0.6, top_p: 0.95 },
            enhance: Sampling { temperature: 0.8, top_p: 0.9 },
            vercel_endpoint: "https://api.vercel.com/v13/deployments".into(),
            vercel_project_name: "ai-generated-site".into(),
            archive_name: "ai-generated-project.zip".into(),
            store_path: None,
            daily_generation_limit: 5,
            edit_context_max_bytes: 200_000,
            stream_refresh_ms: 16,
            save_request: false,
            save_response: false,
        }
    }
}

impl Config {
    /// Defaults, overlaid by the TOML file when one is given.
    pub fn load(path: Option<&str>) -> Result<Self> {
        match path {
            None => Ok(Self::default()),
            Some(p) => {
                let text = fs::read_to_string(p)?;
                toml::from_str(&text).with_context(|| format!("parsing config {p}"))
            }
        }
    }

    /// Command-line flags win over file values.
    pub fn apply_args(&mut self, args: &Args) {
        self.root = args.root.clone();
        if let Some(model) = &args.model {
            self.model = model.clone();
        }
        if let Some(t) = args.timeout_secs {
            self.timeout_secs = t;
        }
        if let Some(store) = &args.store {
            self.store_path = Some(store.clone());
        }
        self.save_request |= args.save_request;
        self.save_response |= args.save_response;
    }

    pub fn api_key(&self) -> Option<String> {
        self.api_key_env
            .iter()
            .filter_map(|name| std::env::var(name).ok())
            .find(|v| !v.trim().is_empty())
    }

    pub fn store_file(&self) -> Result<PathBuf> {
        if let Some(p) = &self.store_path {
            return Ok(PathBuf::from(p));
        }
        let dir = dirs::config_dir().context("could not determine config directory")?;
        Ok(dir.join("sitesmith").join("store.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg: Config = toml::from_str(
            r#"
model = "gemini-2.5-pro"
daily_generation_limit = 10
edit_context_max_bytes = 4096

[edit]
temperature = 0.2
top_p = 0.5
"#,
        )
        .unwrap();
        assert_eq!(cfg.model, "gemini-2.5-pro");
        assert_eq!(cfg.daily_generation_limit, 10);
        assert_eq!(cfg.edit_context_max_bytes, 4096);
        assert_eq!(cfg.edit, Sampling { temperature: 0.2, top_p: 0.5 });
        assert_eq!(cfg.enhance, Sampling { temperature: 0.8, top_p: 0.9 });
        assert_eq!(cfg.archive_name, "ai-generated-project.zip");
    }

    #[test]
    fn explicit_store_path_wins() {
        let cfg = Config { store_path: Some("/tmp/s.json".into()), ..Config::default() };
        assert_eq!(cfg.store_file().unwrap(), PathBuf::from("/tmp/s.json"));
    }
}
