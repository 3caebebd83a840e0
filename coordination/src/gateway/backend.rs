//! Execution client seam — "a thing that can run a prompt on a model".
//!
//! The gateway never speaks a wire protocol itself. Deployments plug in a
//! [`ModelBackend`] (HTTP, gRPC, a local runtime, a test double) and the
//! gateway layers fallback, caching and accounting on top.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::roles::Role;

/// Failures an execution client can report for a single model call.
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("rate limited by provider (retry after {retry_after:?})")]
    RateLimited { retry_after: Option<Duration> },

    #[error("provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed provider response: {0}")]
    InvalidResponse(String),

    #[error("model not available: {0}")]
    Unavailable(String),
}

impl BackendError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. }) || matches!(self, Self::Status { status: 429, .. })
    }

    /// Short machine-readable tag for attempt logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Timeout(_) => "timeout",
            Self::RateLimited { .. } => "rate_limited",
            Self::Status { status: 429, .. } => "rate_limited",
            Self::Status { .. } => "http_status",
            Self::Transport(_) => "transport",
            Self::InvalidResponse(_) => "invalid_response",
            Self::Unavailable(_) => "unavailable",
        }
    }
}

/// One concrete call the gateway hands to an execution client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelCall {
    /// Concrete model identifier (e.g. `"gpt-4o-mini"`).
    pub model: String,
    /// Provider the model is served by, from the model catalog.
    pub provider: String,
    pub prompt: String,
    pub temperature: f32,
    pub role: Option<Role>,
    /// Free-form context forwarded from the logical request.
    pub context: HashMap<String, serde_json::Value>,
}

/// Token accounting reported by the backend (zeros when unknown).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl TokenUsage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
        }
    }
}

/// Successful model output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Completion {
    pub content: String,
    pub usage: TokenUsage,
}

impl Completion {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            usage: TokenUsage::default(),
        }
    }
}

/// A stream of content fragments from one model call.
pub type FragmentStream = BoxStream<'static, Result<String, BackendError>>;

/// Execution client trait.
///
/// Implementations must be safe to call concurrently; the gateway issues
/// independent calls from parallel debate rounds without locking.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Run one prompt to completion.
    async fn complete(&self, call: &ModelCall) -> Result<Completion, BackendError>;

    /// Open an incremental stream for one prompt.
    ///
    /// The default runs [`complete`](Self::complete) and yields the whole
    /// content as a single fragment.
    async fn stream(&self, call: &ModelCall) -> Result<FragmentStream, BackendError> {
        let completion = self.complete(call).await?;
        Ok(stream::once(async move { Ok(completion.content) }).boxed())
    }
}
