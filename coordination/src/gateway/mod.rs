//! Model Execution Gateway — one logical prompt, executed reliably.
//!
//! Turns a logical request (role, pool, prompt) into concrete model calls:
//!
//! ```text
//! role ──► role_models ─┐
//!                       ├─► primary ─► [primary, pool[0], pool[1], ...][..max_attempts]
//! pool ──► pool_models ─┘                      │
//!                                              ▼
//!                          try each candidate (per-attempt timeout)
//!                              ├─ ok   → ExecutionResult (success | fallback)
//!                              └─ err  → attempt log, next candidate
//!                          exhausted → cache lookup → cached | error
//! ```
//!
//! The gateway holds no mutable state of its own: it can be cloned freely and
//! called from concurrent debate rounds without locking. Per-agent execution
//! clients (e.g. distinct credentials per parallel generator) are supplied by
//! the caller through [`ModelGateway::with_agent_client`].

pub mod backend;
pub mod cache;
pub mod config;
pub mod result;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::roles::{Pool, Role};

pub use backend::{BackendError, Completion, FragmentStream, ModelBackend, ModelCall, TokenUsage};
pub use cache::{cache_key, InMemoryResponseCache, ResponseCache};
pub use config::{GatewayConfig, ModelSpec};
pub use result::{AttemptRecord, ExecutionResult, ExecutionStatus, FALLBACK_CHAIN_EXHAUSTED};

/// Error code for a stream that failed after it started delivering content.
pub const STREAM_INTERRUPTED: &str = "STREAM_INTERRUPTED";

/// A logical request to the gateway.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionRequest {
    pub prompt: String,
    pub role: Option<Role>,
    pub pool: Pool,
    pub context: HashMap<String, serde_json::Value>,
    /// Optional routing hint (see [`GatewayConfig::task_routes`]).
    pub task_type: Option<String>,
    /// Logical agent identity; selects a caller-supplied execution client.
    pub agent_id: Option<String>,
    pub trace_id: Option<String>,
    pub session_id: Option<String>,
}

impl ExecutionRequest {
    pub fn new(prompt: impl Into<String>, pool: Pool) -> Self {
        Self {
            prompt: prompt.into(),
            pool,
            ..Default::default()
        }
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    pub fn with_context(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.context.insert(key.into(), value);
        self
    }

    pub fn with_task_type(mut self, task_type: impl Into<String>) -> Self {
        self.task_type = Some(task_type.into());
        self
    }

    pub fn with_agent(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = Some(agent_id.into());
        self
    }

    pub fn with_trace(mut self, trace_id: Option<String>, session_id: Option<String>) -> Self {
        self.trace_id = trace_id;
        self.session_id = session_id;
        self
    }
}

/// Events emitted by [`ModelGateway::execute_stream`].
///
/// Zero or more `Fragment`s are followed by exactly one terminal event.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    Fragment(String),
    Complete(ExecutionResult),
    Error(ExecutionResult),
}

impl StreamEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Fragment(_))
    }
}

/// The gateway. Cheap to clone; all fields are shared handles.
#[derive(Clone)]
pub struct ModelGateway {
    config: Arc<GatewayConfig>,
    backend: Arc<dyn ModelBackend>,
    agent_clients: Arc<HashMap<String, Arc<dyn ModelBackend>>>,
    cache: Option<Arc<dyn ResponseCache>>,
}

impl ModelGateway {
    pub fn new(config: GatewayConfig, backend: Arc<dyn ModelBackend>) -> Self {
        Self {
            config: Arc::new(config),
            backend,
            agent_clients: Arc::new(HashMap::new()),
            cache: None,
        }
    }

    /// Route calls for `agent_id` through a dedicated execution client.
    pub fn with_agent_client(mut self, agent_id: impl Into<String>, client: Arc<dyn ModelBackend>) -> Self {
        Arc::make_mut(&mut self.agent_clients).insert(agent_id.into(), client);
        self
    }

    pub fn with_cache(mut self, cache: Arc<dyn ResponseCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    fn client_for(&self, agent_id: Option<&str>) -> Arc<dyn ModelBackend> {
        agent_id
            .and_then(|id| self.agent_clients.get(id))
            .cloned()
            .unwrap_or_else(|| self.backend.clone())
    }

    fn model_call(&self, request: &ExecutionRequest, model: &str) -> ModelCall {
        ModelCall {
            model: model.to_string(),
            provider: self.config.provider_for(model).to_string(),
            prompt: request.prompt.clone(),
            temperature: self.config.temperature(request.role),
            role: request.role,
            context: request.context.clone(),
        }
    }

    /// Shorthand for the common `(role, pool, prompt, context)` call shape.
    pub async fn execute_prompt(
        &self,
        role: Option<Role>,
        pool: Pool,
        prompt: &str,
        context: HashMap<String, serde_json::Value>,
    ) -> ExecutionResult {
        let request = ExecutionRequest {
            prompt: prompt.to_string(),
            role,
            pool,
            context,
            ..Default::default()
        };
        self.execute(request).await
    }

    /// Execute one logical request. Never fails: every failure mode is
    /// encoded in the returned [`ExecutionResult`].
    pub async fn execute(&self, request: ExecutionRequest) -> ExecutionResult {
        let started = Instant::now();
        let candidates = self.config.candidates(
            request.role,
            request.pool,
            request.task_type.as_deref(),
        );
        let client = self.client_for(request.agent_id.as_deref());
        let attempt_timeout = self.config.attempt_timeout();
        let mut attempts: Vec<AttemptRecord> = Vec::new();

        for model in &candidates {
            let call = self.model_call(&request, model);
            debug!(model = %model, provider = %call.provider, role = ?request.role, "gateway attempt");

            let outcome = match tokio::time::timeout(attempt_timeout, client.complete(&call)).await {
                Ok(outcome) => outcome,
                Err(_) => Err(BackendError::Timeout(attempt_timeout)),
            };

            match outcome {
                Ok(completion) => {
                    let latency_ms = started.elapsed().as_millis() as u64;
                    let cost = self.config.estimate_cost(
                        model,
                        completion.usage.prompt_tokens,
                        completion.usage.completion_tokens,
                    );
                    if !attempts.is_empty() {
                        info!(
                            model = %model,
                            failed = attempts.len(),
                            "gateway served by fallback model"
                        );
                    }
                    self.remember(&request, &completion.content).await;
                    return ExecutionResult::served(
                        completion.content,
                        model,
                        &call.provider,
                        completion.usage,
                        cost,
                        attempts,
                        latency_ms,
                    )
                    .with_ids(request.trace_id, request.session_id);
                }
                Err(e) => {
                    warn!(model = %model, error = %e, "gateway attempt failed");
                    attempts.push(AttemptRecord::failed(model, &call.provider, &e));
                }
            }
        }

        let latency_ms = started.elapsed().as_millis() as u64;
        if let Some(content) = self.lookup_cache(&request).await {
            info!(pool = %request.pool, "fallback chain exhausted, served from cache");
            return ExecutionResult::cached(content, attempts, latency_ms)
                .with_ids(request.trace_id, request.session_id);
        }

        warn!(
            attempts = attempts.len(),
            pool = %request.pool,
            "fallback chain exhausted"
        );
        ExecutionResult::exhausted(attempts, latency_ms).with_ids(request.trace_id, request.session_id)
    }

    /// Streaming variant of [`execute`](Self::execute).
    ///
    /// The fallback chain is walked until a candidate opens a stream; from
    /// then on its fragments are forwarded as they arrive. The per-attempt
    /// timeout covers opening and draining the stream. A stream that fails or
    /// stalls midway ends with an `Error` event coded [`STREAM_INTERRUPTED`].
    pub fn execute_stream(&self, request: ExecutionRequest) -> mpsc::Receiver<StreamEvent> {
        let (tx, rx) = mpsc::channel(64);
        let gateway = self.clone();
        tokio::spawn(async move {
            gateway.drive_stream(request, tx).await;
        });
        rx
    }

    async fn drive_stream(&self, request: ExecutionRequest, tx: mpsc::Sender<StreamEvent>) {
        let started = Instant::now();
        let candidates = self.config.candidates(
            request.role,
            request.pool,
            request.task_type.as_deref(),
        );
        let client = self.client_for(request.agent_id.as_deref());
        let attempt_timeout = self.config.attempt_timeout();
        let mut attempts: Vec<AttemptRecord> = Vec::new();

        for model in &candidates {
            let call = self.model_call(&request, model);
            let deadline = tokio::time::Instant::now() + attempt_timeout;
            let opened = match tokio::time::timeout_at(deadline, client.stream(&call)).await {
                Ok(opened) => opened,
                Err(_) => Err(BackendError::Timeout(attempt_timeout)),
            };
            let mut fragments = match opened {
                Ok(fragments) => fragments,
                Err(e) => {
                    warn!(model = %model, error = %e, "gateway stream failed to open");
                    attempts.push(AttemptRecord::failed(model, &call.provider, &e));
                    continue;
                }
            };

            let mut content = String::new();
            loop {
                let fragment = match tokio::time::timeout_at(deadline, fragments.next()).await {
                    Ok(Some(fragment)) => fragment,
                    Ok(None) => break,
                    Err(_) => Err(BackendError::Timeout(attempt_timeout)),
                };
                match fragment {
                    Ok(text) => {
                        content.push_str(&text);
                        if tx.send(StreamEvent::Fragment(text)).await.is_err() {
                            debug!("stream receiver dropped");
                            return;
                        }
                    }
                    Err(e) => {
                        warn!(model = %model, error = %e, "gateway stream interrupted");
                        attempts.push(AttemptRecord::failed(model, &call.provider, &e));
                        let status = if e.is_timeout() {
                            ExecutionStatus::Timeout
                        } else {
                            ExecutionStatus::Error
                        };
                        let result = ExecutionResult::failure(
                            status,
                            STREAM_INTERRUPTED,
                            &e.to_string(),
                            attempts,
                            started.elapsed().as_millis() as u64,
                        )
                        .with_ids(request.trace_id, request.session_id);
                        let _ = tx.send(StreamEvent::Error(result)).await;
                        return;
                    }
                }
            }

            self.remember(&request, &content).await;
            let result = ExecutionResult::served(
                content,
                model,
                &call.provider,
                TokenUsage::default(),
                0.0,
                attempts,
                started.elapsed().as_millis() as u64,
            )
            .with_ids(request.trace_id, request.session_id);
            let _ = tx.send(StreamEvent::Complete(result)).await;
            return;
        }

        let latency_ms = started.elapsed().as_millis() as u64;
        let terminal = match self.lookup_cache(&request).await {
            Some(content) => {
                if tx.send(StreamEvent::Fragment(content.clone())).await.is_err() {
                    return;
                }
                StreamEvent::Complete(
                    ExecutionResult::cached(content, attempts, latency_ms)
                        .with_ids(request.trace_id, request.session_id),
                )
            }
            None => StreamEvent::Error(
                ExecutionResult::exhausted(attempts, latency_ms)
                    .with_ids(request.trace_id, request.session_id),
            ),
        };
        let _ = tx.send(terminal).await;
    }

    async fn lookup_cache(&self, request: &ExecutionRequest) -> Option<String> {
        let cache = self.cache.as_ref()?;
        cache.get(&cache_key(request.pool, &request.prompt)).await
    }

    async fn remember(&self, request: &ExecutionRequest, content: &str) {
        if let Some(cache) = &self.cache {
            cache
                .put(&cache_key(request.pool, &request.prompt), content)
                .await;
        }
    }
}
