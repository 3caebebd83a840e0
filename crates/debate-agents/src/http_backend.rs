//! OpenAI-compatible execution client.
//!
//! Speaks `POST {endpoint}/chat/completions` for every provider; the
//! provider name on each [`ModelCall`] only selects which endpoint and key
//! to use. Streaming calls read the server-sent event form of the same API.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::{future, StreamExt};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use serde_json::{json, Value};
use tracing::{debug, warn};

use coordination::gateway::{
    BackendError, Completion, FragmentStream, ModelBackend, ModelCall, TokenUsage,
};

use crate::config::AgentsConfig;

pub struct HttpBackend {
    client: reqwest::Client,
    config: AgentsConfig,
}

impl HttpBackend {
    pub fn new(config: AgentsConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client, config })
    }

    async fn send(&self, call: &ModelCall, stream: bool) -> Result<reqwest::Response, BackendError> {
        let endpoint = self.config.endpoint(&call.provider);
        let url = format!("{}/chat/completions", endpoint.url.trim_end_matches('/'));
        debug!(model = %call.model, provider = %call.provider, %url, stream, "Sending chat completion");

        let mut request = self.client.post(&url).json(&request_body(call, stream));
        if let Some(key) = &endpoint.api_key {
            request = request.header("Authorization", format!("Bearer {}", key));
        }

        let response = request
            .send()
            .await
            .map_err(|e| send_error(e, self.config.request_timeout))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status.as_u16() == 429 {
            let retry_after = retry_after(response.headers());
            warn!(model = %call.model, ?retry_after, "Rate limited by provider");
            return Err(BackendError::RateLimited { retry_after });
        }
        let body = response.text().await.unwrap_or_default();
        Err(BackendError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl ModelBackend for HttpBackend {
    async fn complete(&self, call: &ModelCall) -> Result<Completion, BackendError> {
        let response = self.send(call, false).await?;
        let body: Value = response
            .json()
            .await
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))?;
        parse_completion(&body)
    }

    async fn stream(&self, call: &ModelCall) -> Result<FragmentStream, BackendError> {
        let response = self.send(call, true).await?;
        let events = response
            .bytes_stream()
            .map(|r| r.map_err(std::io::Error::other))
            .eventsource();

        let fragments = events
            .take_while(|event| {
                future::ready(!matches!(event, Ok(e) if e.data.trim() == "[DONE]"))
            })
            .filter_map(|event| async move {
                match event {
                    Ok(event) => parse_delta(&event.data).transpose(),
                    Err(e) => Some(Err(BackendError::Transport(e.to_string()))),
                }
            });
        Ok(fragments.boxed())
    }
}

fn request_body(call: &ModelCall, stream: bool) -> Value {
    json!({
        "model": call.model,
        "messages": [{ "role": "user", "content": call.prompt }],
        "temperature": call.temperature,
        "stream": stream,
    })
}

fn send_error(error: reqwest::Error, timeout: Duration) -> BackendError {
    if error.is_timeout() {
        BackendError::Timeout(timeout)
    } else {
        BackendError::Transport(error.to_string())
    }
}

/// `Retry-After` in its delay-seconds form; HTTP dates are ignored.
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

/// Pull `choices[0].message.content` and token usage from a chat completion body.
pub fn parse_completion(body: &Value) -> Result<Completion, BackendError> {
    let content = body["choices"][0]["message"]["content"]
        .as_str()
        .ok_or_else(|| BackendError::InvalidResponse("missing choices[0].message.content".into()))?;

    let usage = &body["usage"];
    let tokens = |field: &str| {
        usage[field]
            .as_u64()
            .map_or(0, |n| u32::try_from(n).unwrap_or(u32::MAX))
    };

    Ok(Completion {
        content: content.to_string(),
        usage: TokenUsage::new(tokens("prompt_tokens"), tokens("completion_tokens")),
    })
}

/// Content fragment of one streamed chunk; `None` for role-only or empty deltas.
pub fn parse_delta(data: &str) -> Result<Option<String>, BackendError> {
    let chunk: Value =
        serde_json::from_str(data).map_err(|e| BackendError::InvalidResponse(e.to_string()))?;
    Ok(chunk["choices"][0]["delta"]["content"]
        .as_str()
        .filter(|s| !s.is_empty())
        .map(str::to_string))
}
