//! Gateway fallback-chain tests against mock execution clients.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use coordination::gateway::{
    BackendError, Completion, ExecutionRequest, ExecutionStatus, GatewayConfig, ModelBackend,
    ModelCall, ModelGateway, FALLBACK_CHAIN_EXHAUSTED,
};
use coordination::{Pool, Role};

/// Helper: fails every model with a fixed error and records what was tried.
struct Failing {
    error: BackendError,
    tried: Mutex<Vec<String>>,
}

impl Failing {
    fn new(error: BackendError) -> Arc<Self> {
        Arc::new(Self {
            error,
            tried: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl ModelBackend for Failing {
    async fn complete(&self, call: &ModelCall) -> Result<Completion, BackendError> {
        self.tried.lock().unwrap().push(call.model.clone());
        Err(self.error.clone())
    }
}

#[tokio::test]
async fn test_all_three_fallbacks_fail() {
    let backend = Failing::new(BackendError::Status {
        status: 503,
        body: "overloaded".to_string(),
    });
    let gateway = ModelGateway::new(GatewayConfig::default(), backend.clone());

    let result = gateway
        .execute_prompt(Some(Role::Generator), Pool::Balanced, "write a parser", HashMap::new())
        .await;

    assert_eq!(result.status, ExecutionStatus::Error);
    assert_eq!(result.error_code.as_deref(), Some(FALLBACK_CHAIN_EXHAUSTED));
    assert_eq!(result.attempts.len(), 3);
    assert!(!result.success);
    assert_eq!(result.content, "");
    assert_eq!(
        *backend.tried.lock().unwrap(),
        vec!["gpt-4o", "claude-sonnet-4", "gemini-1.5-pro"]
    );
    assert!(result.attempts.iter().all(|a| a.error_kind == "http_status"));
}

#[tokio::test]
async fn test_all_rate_limited_reports_rate_limited() {
    let backend = Failing::new(BackendError::RateLimited {
        retry_after: Some(Duration::from_secs(5)),
    });
    let gateway = ModelGateway::new(GatewayConfig::default(), backend);
    let result = gateway.execute(ExecutionRequest::new("hi", Pool::Fast)).await;

    assert_eq!(result.status, ExecutionStatus::RateLimited);
    assert_eq!(result.error_code.as_deref(), Some(FALLBACK_CHAIN_EXHAUSTED));
    assert_eq!(result.content, "");
}

#[tokio::test]
async fn test_max_attempts_caps_the_chain() {
    let backend = Failing::new(BackendError::Transport("connection reset".to_string()));
    let config = GatewayConfig {
        max_attempts: 2,
        ..Default::default()
    };
    let gateway = ModelGateway::new(config, backend.clone());
    let result = gateway
        .execute(ExecutionRequest::new("hi", Pool::Heavy).with_role(Role::Judge))
        .await;

    assert_eq!(result.attempts.len(), 2);
    assert_eq!(backend.tried.lock().unwrap().len(), 2);
}

#[tokio::test]
async fn test_failure_never_carries_content() {
    for error in [
        BackendError::Timeout(Duration::from_secs(1)),
        BackendError::InvalidResponse("not json".to_string()),
        BackendError::Unavailable("gone".to_string()),
    ] {
        let gateway = ModelGateway::new(GatewayConfig::default(), Failing::new(error));
        let result = gateway.execute(ExecutionRequest::new("hi", Pool::Balanced)).await;
        assert!(!result.success);
        assert!(result.content.is_empty());
        assert!(ExecutionStatus::ALL.contains(&result.status));
    }
}
