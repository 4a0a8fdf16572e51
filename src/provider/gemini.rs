use async_trait::async_trait;
use eventsource_stream::{EventStreamError, Eventsource};
use futures::StreamExt;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use super::{Provider, TextStream};
use crate::errors::ProviderError;
use crate::wire::{ApiErrorBody, GenerateContentRequest, GenerateContentResponse, LlmRequest};

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Gemini `generateContent` / `streamGenerateContent` over plain HTTPS.
///
/// A missing key is not an error at construction time: every call reports
/// `MissingApiKey` instead, so the session stays usable and can say why.
pub struct GeminiProvider {
    model: String,
    api_key: Option<String>,
    base_url: String,
    client: Client,
}

impl GeminiProvider {
    pub fn new(
        model: String,
        api_key: Option<String>,
        base_url: String,
        timeout_secs: u64,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            model,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, method: &str) -> String {
        match method {
            "streamGenerateContent" => format!("{}/models/{}:{method}?alt=sse", self.base_url, self.model),
            _ => format!("{}/models/{}:{method}", self.base_url, self.model),
        }
    }

    async fn post(&self, method: &str, req: &LlmRequest) -> Result<reqwest::Response, ProviderError> {
        let key = self.api_key.as_deref().ok_or(ProviderError::MissingApiKey)?;
        let body = GenerateContentRequest::from(req);
        debug!(stage = %req.stage, model = %self.model, method, "sending gemini request");

        let resp = self
            .client
            .post(self.url(method))
            .header(API_KEY_HEADER, key)
            .json(&body)
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            debug!(%status, body = %text, "gemini request failed");
            return Err(ProviderError::Status(status, error_message(&text)));
        }
        Ok(resp)
    }
}

/// Prefer `error.message` from the JSON error body; fall back to the raw text.
fn error_message(body: &str) -> String {
    match serde_json::from_str::<ApiErrorBody>(body) {
        Ok(parsed) if !parsed.error.message.is_empty() => parsed.error.message,
        _ => body.to_string(),
    }
}

#[async_trait]
impl Provider for GeminiProvider {
    async fn generate(&self, req: &LlmRequest) -> Result<String, ProviderError> {
        let resp = self.post("generateContent", req).await?;
        let text = resp.text().await?;

        let parsed: GenerateContentResponse = serde_json::from_str(&text)
            .map_err(|e| ProviderError::Invariant(format!("failed to parse Gemini response: {e}")))?;
        let Some(first) = parsed.candidates.first() else {
            return Err(ProviderError::Invariant("no candidate in response".into()));
        };
        debug!(stage = %req.stage, finish = ?first.finish_reason, "gemini reply received");
        Ok(parsed.text())
    }

    async fn stream(&self, req: &LlmRequest) -> Result<TextStream, ProviderError> {
        let resp = self.post("streamGenerateContent", req).await?;
        let mut events = resp.bytes_stream().eventsource();

        let stream = async_stream::try_stream! {
            while let Some(event) = events.next().await {
                let event = event.map_err(|e| match e {
                    EventStreamError::Transport(e) => ProviderError::from(e),
                    other => ProviderError::Invariant(format!("invalid event stream: {other}")),
                })?;
                if event.data.is_empty() {
                    continue;
                }
                let chunk: GenerateContentResponse = serde_json::from_str(&event.data)
                    .map_err(|e| ProviderError::Invariant(format!("failed to parse stream chunk: {e}")))?;
                let text = chunk.text();
                if !text.is_empty() {
                    yield text;
                }
            }
        };

        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{serve, Recorded};
    use crate::wire::ResponseFormat;
    use axum::http::{header, HeaderMap, StatusCode, Uri};
    use axum::Router;

    fn request() -> LlmRequest {
        LlmRequest {
            stage: "generate.frontend".into(),
            system: "be a designer".into(),
            user: "A landing page for a bakery".into(),
            image: None,
            temperature: 0.7,
            top_p: 0.95,
            format: ResponseFormat::Text,
        }
    }

    fn provider(base: String, key: Option<&str>) -> GeminiProvider {
        GeminiProvider::new("gemini-2.5-flash".into(), key.map(str::to_string), base, 5).unwrap()
    }

    #[tokio::test]
    async fn missing_key_fails_every_call() {
        let p = provider("http://127.0.0.1:9".into(), None);
        assert!(matches!(p.generate(&request()).await, Err(ProviderError::MissingApiKey)));
        assert!(matches!(p.stream(&request()).await, Err(ProviderError::MissingApiKey)));
    }

    #[tokio::test]
    async fn generate_posts_to_model_endpoint() {
        let recorded = Recorded::default();
        let rec = recorded.clone();
        let router = Router::new().fallback(move |uri: Uri, headers: HeaderMap, body: String| {
            let rec = rec.clone();
            async move {
                if let Some(v) = headers.get(API_KEY_HEADER).and_then(|v| v.to_str().ok()) {
                    rec.push_auth(v.to_string());
                }
                rec.push(uri.to_string(), body);
                r#"{"candidates":[{"content":{"parts":[{"text":"hello"}]}}]}"#
            }
        });
        let base = serve(router).await;

        let out = provider(base, Some("k1")).generate(&request()).await.unwrap();
        assert_eq!(out, "hello");

        let (uri, body) = recorded.first();
        assert_eq!(uri, "/models/gemini-2.5-flash:generateContent");
        assert_eq!(recorded.first_auth(), "k1");
        let body: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(body["contents"][0]["parts"][0]["text"], "A landing page for a bakery");
    }

    #[tokio::test]
    async fn stream_yields_text_fragments_in_order() {
        let router = Router::new().fallback(|| async {
            let body = concat!(
                "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"<!DOCTYPE html>\"}]}}]}\n\n",
                "data: {\"candidates\":[{\"content\":{\"parts\":[]}}]}\n\n",
                "data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"<html></html>\"}]}}]}\n\n",
            );
            ([(header::CONTENT_TYPE, "text/event-stream")], body)
        });
        let base = serve(router).await;

        let stream = provider(base, Some("k")).stream(&request()).await.unwrap();
        let parts: Vec<String> = stream.map(|r| r.unwrap()).collect().await;
        assert_eq!(parts, vec!["<!DOCTYPE html>".to_string(), "<html></html>".to_string()]);
    }

    #[tokio::test]
    async fn error_body_message_is_surfaced() {
        let router = Router::new().fallback(|| async {
            (
                StatusCode::BAD_REQUEST,
                r#"{"error":{"code":400,"message":"API key not valid. Please pass a valid API key."}}"#,
            )
        });
        let base = serve(router).await;

        match provider(base, Some("bad")).generate(&request()).await {
            Err(ProviderError::Status(status, msg)) => {
                assert_eq!(status, reqwest::StatusCode::BAD_REQUEST);
                assert!(msg.starts_with("API key not valid"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn stream_asks_for_sse_without_key_in_url() {
        let recorded = Recorded::default();
        let rec = recorded.clone();
        let router = Router::new().fallback(move |uri: Uri| {
            let rec = rec.clone();
            async move {
                rec.push(uri.to_string(), String::new());
                ([(header::CONTENT_TYPE, "text/event-stream")], "")
            }
        });
        let base = serve(router).await;

        let stream = provider(base, Some("k2")).stream(&request()).await.unwrap();
        let _: Vec<_> = stream.collect().await;
        assert_eq!(recorded.first().0, "/models/gemini-2.5-flash:streamGenerateContent?alt=sse");
    }

    #[tokio::test]
    async fn transport_errors_do_not_carry_the_key() {
        let p = provider("http://127.0.0.1:9".into(), Some("SECRET_KEY_123"));
        let err = p.generate(&request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::Transport(_)));
        assert!(!err.to_string().contains("SECRET_KEY_123"));
        assert!(!format!("{err:?}").contains("SECRET_KEY_123"));
    }
}
