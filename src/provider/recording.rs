use async_trait::async_trait;
use futures::StreamExt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{DynProvider, Provider, TextStream};
use crate::config::Config;
use crate::errors::ProviderError;
use crate::log::{self, StageResponse};
use crate::wire::LlmRequest;

/// Saves every request and its reply under the session's artifact directory.
pub struct RecordingProvider {
    inner: DynProvider,
    cfg: Arc<Config>,
    tx: Uuid,
    counter: Arc<AtomicUsize>,
}

impl RecordingProvider {
    pub fn new(inner: DynProvider, cfg: Config, tx: Uuid) -> Self {
        Self { inner, cfg: Arc::new(cfg), tx, counter: Arc::new(AtomicUsize::new(0)) }
    }
}

fn record(cfg: &Config, tx: Uuid, ordinal: usize, req: &LlmRequest, resp: StageResponse<'_>) {
    match log::save_stage(&req.stage, ordinal, req, &resp, tx, cfg) {
        Ok(saved) => {
            if let Some(p) = &saved.request {
                debug!(stage = %req.stage, path = %p.display(), "request saved");
            }
            if let Some(p) = &saved.response {
                debug!(stage = %req.stage, path = %p.display(), "response saved");
            }
        }
        Err(e) => warn!(stage = %req.stage, error = %e, "could not save stage artifacts"),
    }
}

#[async_trait]
impl Provider for RecordingProvider {
    async fn generate(&self, req: &LlmRequest) -> Result<String, ProviderError> {
        let ordinal = self.counter.fetch_add(1, Ordering::SeqCst);
        let out = self.inner.generate(req).await;
        let (ok, text) = match &out {
            Ok(t) => (true, t.clone()),
            Err(e) => (false, e.to_string()),
        };
        record(&self.cfg, self.tx, ordinal, req, StageResponse { ok, streamed: false, text: &text });
        out
    }

    async fn stream(&self, req: &LlmRequest) -> Result<TextStream, ProviderError> {
        let ordinal = self.counter.fetch_add(1, Ordering::SeqCst);
        let mut inner = match self.inner.stream(req).await {
            Ok(s) => s,
            Err(e) => {
                let text = e.to_string();
                record(&self.cfg, self.tx, ordinal, req, StageResponse { ok: false, streamed: true, text: &text });
                return Err(e);
            }
        };

        let cfg = Arc::clone(&self.cfg);
        let tx = self.tx;
        let req = req.clone();
        let stream = async_stream::stream! {
            let mut acc = String::new();
            let mut failed = false;
            while let Some(item) = inner.next().await {
                match &item {
                    Ok(fragment) => acc.push_str(fragment),
                    Err(e) => {
                        let text = e.to_string();
                        record(&cfg, tx, ordinal, &req, StageResponse { ok: false, streamed: true, text: &text });
                        failed = true;
                    }
                }
                yield item;
                if failed {
                    break;
                }
            }
            if !failed {
                record(&cfg, tx, ordinal, &req, StageResponse { ok: true, streamed: true, text: &acc });
            }
        };
        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::gemini::GeminiProvider;
    use crate::provider::scripted::{Reply, ScriptedProvider};
    use crate::wire::ResponseFormat;

    fn req(stage: &str) -> LlmRequest {
        LlmRequest {
            stage: stage.into(),
            system: "s".into(),
            user: "u".into(),
            image: None,
            temperature: 0.7,
            top_p: 0.95,
            format: ResponseFormat::Text,
        }
    }

    #[tokio::test]
    async fn records_blocking_and_streamed_stages() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = Config {
            root: tmp.path().to_string_lossy().into_owned(),
            save_request: true,
            save_response: true,
            ..Config::default()
        };
        let inner = Arc::new(ScriptedProvider::new(vec![
            Reply::Text("plain".into()),
            Reply::Fragments(vec!["<html>".into(), "</html>".into()]),
        ]));
        let tx = Uuid::new_v4();
        let p = RecordingProvider::new(inner, cfg, tx);

        assert_eq!(p.generate(&req("enhance")).await.unwrap(), "plain");
        let parts: Vec<_> = p.stream(&req("generate.frontend")).await.unwrap().collect().await;
        assert_eq!(parts.len(), 2);

        let dir = log::tx_dir(tmp.path(), tx);
        assert!(dir.join("000.enhance.response.json").exists());
        let streamed = fs_err::read_to_string(dir.join("001.generate.frontend.response.json")).unwrap();
        assert!(streamed.contains("<html></html>"));
    }

    #[tokio::test]
    async fn failed_gemini_call_is_saved_without_the_key() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = Config {
            root: tmp.path().to_string_lossy().into_owned(),
            save_response: true,
            ..Config::default()
        };
        let gemini = GeminiProvider::new(
            "gemini-2.5-flash".into(),
            Some("SECRET_KEY_123".into()),
            "http://127.0.0.1:9".into(),
            5,
        )
        .unwrap();
        let tx = Uuid::new_v4();
        let p = RecordingProvider::new(Arc::new(gemini), cfg, tx);

        let err = p.generate(&req("generate.backend")).await.unwrap_err();
        assert!(!err.to_string().contains("SECRET_KEY_123"));
        assert!(p.stream(&req("generate.frontend")).await.is_err());

        let dir = log::tx_dir(tmp.path(), tx);
        for name in ["000.generate.backend.response.json", "001.generate.frontend.response.json"] {
            let saved = fs_err::read_to_string(dir.join(name)).unwrap();
            assert!(saved.contains("transport error"));
            assert!(!saved.contains("SECRET_KEY_123"), "api key leaked into {name}");
        }
    }
}
