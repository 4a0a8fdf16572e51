//! In-memory provider that replays canned replies and records what it was asked.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;

use super::{Provider, TextStream};
use crate::errors::ProviderError;
use crate::wire::LlmRequest;

pub enum Reply {
    Text(String),
    Fragments(Vec<String>),
    /// Fragments followed by a mid-stream failure.
    Broken(Vec<String>, String),
    Fail(ProviderError),
}

#[derive(Default)]
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Reply>>,
    pub requests: Mutex<Vec<LlmRequest>>,
}

impl ScriptedProvider {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self { replies: Mutex::new(replies.into()), requests: Mutex::new(Vec::new()) }
    }

    pub fn text(reply: &str) -> Self {
        Self::new(vec![Reply::Text(reply.to_string())])
    }

    pub fn last_request(&self) -> LlmRequest {
        self.requests.lock().last().cloned().expect("no request made")
    }

    fn next(&self, req: &LlmRequest) -> Reply {
        self.requests.lock().push(req.clone());
        self.replies
            .lock()
            .pop_front()
            .unwrap_or_else(|| Reply::Fail(ProviderError::Invariant("script exhausted".into())))
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    async fn generate(&self, req: &LlmRequest) -> Result<String, ProviderError> {
        match self.next(req) {
            Reply::Text(t) => Ok(t),
            Reply::Fragments(parts) => Ok(parts.concat()),
            Reply::Broken(_, msg) => Err(ProviderError::Invariant(msg)),
            Reply::Fail(e) => Err(e),
        }
    }

    async fn stream(&self, req: &LlmRequest) -> Result<TextStream, ProviderError> {
        let items: Vec<Result<String, ProviderError>> = match self.next(req) {
            Reply::Text(t) => vec![Ok(t)],
            Reply::Fragments(parts) => parts.into_iter().map(Ok).collect(),
            Reply::Broken(parts, msg) => parts
                .into_iter()
                .map(Ok)
                .chain(std::iter::once(Err(ProviderError::Invariant(msg))))
                .collect(),
            Reply::Fail(e) => return Err(e),
        };
        Ok(Box::pin(futures::stream::iter(items)))
    }
}
