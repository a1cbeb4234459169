#![deny(missing_docs)]
//! The LLM gateway interface (spec.md §4.2). Deliberately an interface
//! only: the wire protocol, OAuth/PKCE, SSE decoding and message-format
//! translation for any concrete backend are external collaborators (§1,
//! §6) and live outside this workspace.
//!
//! [`Provider`] uses return-position `impl Trait` and is therefore not
//! object-safe by design — callers (`forge-agent`, `forge-planner`) are
//! generic over `P: Provider`, keeping a non-object-safe backend trait
//! separate from the object-safe boundary one layer up.

pub mod testing;

use forge_types::{Message, ToolSpec};
use serde::{Deserialize, Serialize};
use std::future::Future;
use thiserror::Error;

/// Why a [`Response`] stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// The model produced a final text answer.
    Stop,
    /// The model requested one or more tool calls.
    ToolCalls,
    /// The response was truncated by `max_tokens`.
    Length,
}

/// Token accounting for one `complete` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Tokens in the prompt (system + history).
    pub prompt_tokens: u64,
    /// Tokens in the generated completion.
    pub completion_tokens: u64,
}

impl Usage {
    /// Prompt + completion tokens.
    pub fn total(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }
}

/// The result of one `complete` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Text content, when the model produced any. May be `None` (or
    /// empty) when `finish_reason == ToolCalls` and the turn is
    /// tool-calls-only.
    pub content: Option<String>,
    /// Tool calls the model requested this turn, in emission order.
    pub tool_calls: Vec<forge_types::ToolCall>,
    /// Why the response stopped.
    pub finish_reason: FinishReason,
    /// Token accounting for this call.
    pub usage: Usage,
}

/// Errors a [`Provider`] can raise, collapsed to exactly the two kinds
/// the agent loop's retry policy distinguishes (spec.md §4.2, §7):
/// transient failures are retried with backoff, permanent ones surface
/// immediately.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Network error, 5xx, or timeout — worth retrying.
    #[error("transient provider error: {0}")]
    Transient(String),
    /// 4xx, auth failure, or malformed request — retrying won't help.
    /// Carries the status code (when applicable) and a truncated body.
    #[error("permanent provider error (status {status:?}): {body}")]
    Permanent {
        /// HTTP-ish status code, when the transport has one.
        status: Option<u16>,
        /// Truncated response body or error detail.
        body: String,
    },
}

impl ProviderError {
    /// Whether the agent loop's retry policy should retry this error.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ProviderError::Transient(_))
    }
}

/// Errors specific to [`Provider::embed`].
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum EmbedError {
    /// The provider doesn't support embeddings, or its embedding backend
    /// is unreachable. Callers skip semantic storage on this error rather
    /// than treating it as fatal.
    #[error("embeddings unavailable: {0}")]
    Unavailable(String),
}

/// LLM provider interface. Implementations translate this uniform shape
/// into a specific backend's wire protocol.
pub trait Provider: Send + Sync {
    /// Send one completion request.
    fn complete(
        &self,
        messages: &[Message],
        tool_schemas: Option<&[ToolSpec]>,
        temperature: f32,
        max_tokens: u32,
    ) -> impl Future<Output = Result<Response, ProviderError>> + Send;

    /// Compute a dense embedding for `text`. Callers treat
    /// [`EmbedError::Unavailable`] as "skip semantic storage", never as
    /// fatal.
    fn embed(&self, text: &str) -> impl Future<Output = Result<Vec<f32>, EmbedError>> + Send;

    /// Whether this provider accepts `tool_schemas` in `complete`. Agents
    /// built with a provider that returns `false` should not hand it a
    /// tool registry's schemas.
    fn supports_tools(&self) -> bool;
}
