use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::cli::ProjectKind;
use crate::config::Config;
use crate::errors::BuilderError;
use crate::project::Project;
use crate::store::{KeyValueStore, VERCEL_TOKEN_KEY};

const PUBLISH_FILE: &str = "index.html";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DeploymentRequest<'a> {
    name: &'a str,
    files: Vec<DeploymentFile<'a>>,
    project_settings: ProjectSettings,
}

#[derive(Serialize)]
struct DeploymentFile<'a> {
    file: &'a str,
    data: &'a str,
}

#[derive(Serialize)]
struct ProjectSettings {
    framework: Option<String>,
}

#[derive(Deserialize)]
struct DeploymentCreated {
    url: String,
}

/// Outcome of the latest publish attempt. Both fields are cleared when a new attempt starts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeploymentResult {
    pub url: Option<String>,
    pub error: Option<String>,
}

/// Single-file deployments through the Vercel REST API.
pub struct VercelClient {
    client: Client,
    endpoint: String,
    project_name: String,
}

impl VercelClient {
    pub fn new(cfg: &Config) -> Result<Self, BuilderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .map_err(|e| BuilderError::DeploymentFailed(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: cfg.vercel_endpoint.clone(),
            project_name: cfg.vercel_project_name.clone(),
        })
    }

    /// Deploy `html` as `index.html` and return the public `https://` URL.
    pub async fn deploy(&self, html: &str, token: &str) -> Result<String, BuilderError> {
        if html.is_empty() || token.is_empty() {
            return Err(BuilderError::DeploymentFailed(
                "HTML content and Vercel token are required.".into(),
            ));
        }
        let body = DeploymentRequest {
            name: &self.project_name,
            files: vec![DeploymentFile { file: PUBLISH_FILE, data: html }],
            project_settings: ProjectSettings { framework: None },
        };
        debug!(endpoint = %self.endpoint, bytes = html.len(), "creating deployment");

        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| BuilderError::DeploymentFailed(e.to_string()))?;
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();

        if !status.is_success() {
            let message = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
                .unwrap_or_else(|| format!("Vercel API Error: {}", status.as_u16()));
            warn!(%status, message = %message, "deployment rejected");
            return Err(BuilderError::deployment(message));
        }

        let created: DeploymentCreated = serde_json::from_str(&text).map_err(|e| {
            BuilderError::DeploymentFailed(format!("unexpected deployment response: {e}"))
        })?;
        Ok(format!("https://{}", created.url))
    }
}

/// Resolves the token from the store, publishes, and forgets a rejected token.
pub struct Publisher {
    store: Arc<dyn KeyValueStore>,
    client: VercelClient,
    last: DeploymentResult,
}

impl Publisher {
    pub fn new(store: Arc<dyn KeyValueStore>, client: VercelClient) -> Self {
        Self { store, client, last: DeploymentResult::default() }
    }

    pub fn last_result(&self) -> &DeploymentResult {
        &self.last
    }

    pub fn has_token(&self) -> bool {
        self.store.get(VERCEL_TOKEN_KEY).is_some_and(|t| !t.is_empty())
    }

    /// A `token_override` is saved before publishing, as if entered in a prompt.
    pub async fn publish_project(
        &mut self,
        project: &Project,
        kind: ProjectKind,
        token_override: Option<&str>,
    ) -> Result<String, BuilderError> {
        self.last = DeploymentResult::default();
        if kind == ProjectKind::Backend {
            return Err(BuilderError::InvalidState(
                "Only single-page frontend projects can be published.".into(),
            ));
        }
        let html = project
            .get(PUBLISH_FILE)
            .ok_or_else(|| BuilderError::InvalidState("Generate a website before publishing.".into()))?;
        self.publish_html(html, token_override).await
    }

    pub async fn publish_html(
        &mut self,
        html: &str,
        token_override: Option<&str>,
    ) -> Result<String, BuilderError> {
        if let Some(token) = token_override.map(str::trim).filter(|t| !t.is_empty()) {
            self.store.set(VERCEL_TOKEN_KEY, token)?;
        }
        let token = self.store.get(VERCEL_TOKEN_KEY).unwrap_or_default();
        self.last = DeploymentResult::default();

        match self.client.deploy(html, &token).await {
            Ok(url) => {
                info!(url = %url, "site published");
                self.last.url = Some(url.clone());
                Ok(url)
            }
            Err(e) => {
                if matches!(e, BuilderError::InvalidCredential(_)) {
                    warn!("vercel rejected the stored token; removing it");
                    self.store.remove(VERCEL_TOKEN_KEY)?;
                }
                self.last.error = Some(e.to_string());
                Err(e)
            }
        }
    }
}
