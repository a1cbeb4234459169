//! A scripted [`Provider`] test double: queue up responses, pop one per
//! `complete` call, and record every request seen for later assertion.

use crate::{EmbedError, FinishReason, Provider, ProviderError, Response, Usage};
use forge_types::{Message, ToolSpec};
use std::collections::VecDeque;
use std::sync::Mutex;

/// A `Provider` whose responses are scripted in advance. Panics if more
/// calls are made than responses were queued — tests should queue
/// exactly as many as the scenario requires.
pub struct ScriptedProvider {
    responses: Mutex<VecDeque<Result<Response, ProviderError>>>,
    requests: Mutex<Vec<Vec<Message>>>,
    supports_tools: bool,
}

impl ScriptedProvider {
    /// Build a provider that replays `responses` in order.
    pub fn new(responses: Vec<Result<Response, ProviderError>>) -> Self {
        Self { responses: Mutex::new(responses.into()), requests: Mutex::new(Vec::new()), supports_tools: true }
    }

    /// Convenience: queue a single successful stop response carrying
    /// `text`.
    pub fn single_text(text: impl Into<String>) -> Self {
        Self::new(vec![Ok(Response {
            content: Some(text.into()),
            tool_calls: vec![],
            finish_reason: FinishReason::Stop,
            usage: Usage { prompt_tokens: 10, completion_tokens: 5 },
        })])
    }

    /// Disable tool support on this instance.
    pub fn without_tools(mut self) -> Self {
        self.supports_tools = false;
        self
    }

    /// Every `messages` list passed to `complete`, in call order.
    pub fn captured_requests(&self) -> Vec<Vec<Message>> {
        self.requests.lock().unwrap().clone()
    }
}

impl Provider for ScriptedProvider {
    async fn complete(
        &self,
        messages: &[Message],
        _tool_schemas: Option<&[ToolSpec]>,
        _temperature: f32,
        _max_tokens: u32,
    ) -> Result<Response, ProviderError> {
        self.requests.lock().unwrap().push(messages.to_vec());
        self.responses.lock().unwrap().pop_front().expect("ScriptedProvider: no more responses queued")
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbedError> {
        Err(EmbedError::Unavailable("ScriptedProvider does not implement embeddings".to_string()))
    }

    fn supports_tools(&self) -> bool {
        self.supports_tools
    }
}
