//! Gateway results — every outcome of a logical call, success or not.
//!
//! ```text
//! execute()
//!   ├─ primary model succeeds            → status: success
//!   ├─ primary fails, later one succeeds → status: fallback   (attempts logged)
//!   ├─ all fail, cache hit               → status: cached
//!   └─ all fail, no cache                → status: error | timeout | rate_limited
//!                                           error_code: FALLBACK_CHAIN_EXHAUSTED
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::backend::{BackendError, TokenUsage};

/// Error code used when every candidate in the fallback chain failed.
pub const FALLBACK_CHAIN_EXHAUSTED: &str = "FALLBACK_CHAIN_EXHAUSTED";

/// Outcome class of one gateway call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// Primary model answered.
    Success,
    /// A later candidate answered after earlier ones failed.
    Fallback,
    /// Every candidate failed; a cached answer was served.
    Cached,
    /// Every candidate failed with mixed or non-retriable errors.
    Error,
    /// Every candidate timed out.
    Timeout,
    /// Every candidate was rate limited.
    RateLimited,
}

impl ExecutionStatus {
    pub const ALL: [ExecutionStatus; 6] = [
        ExecutionStatus::Success,
        ExecutionStatus::Fallback,
        ExecutionStatus::Cached,
        ExecutionStatus::Error,
        ExecutionStatus::Timeout,
        ExecutionStatus::RateLimited,
    ];

    /// Whether this status carries usable content.
    pub fn is_success(self) -> bool {
        matches!(self, Self::Success | Self::Fallback | Self::Cached)
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Fallback => write!(f, "fallback"),
            Self::Cached => write!(f, "cached"),
            Self::Error => write!(f, "error"),
            Self::Timeout => write!(f, "timeout"),
            Self::RateLimited => write!(f, "rate_limited"),
        }
    }
}

/// One failed attempt in the fallback chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub model: String,
    pub provider: String,
    /// Machine-readable error class (see [`BackendError::kind`]).
    pub error_kind: String,
    pub error: String,
    pub timestamp: DateTime<Utc>,
}

impl AttemptRecord {
    pub fn failed(model: &str, provider: &str, error: &BackendError) -> Self {
        Self {
            model: model.to_string(),
            provider: provider.to_string(),
            error_kind: error.kind().to_string(),
            error: error.to_string(),
            timestamp: Utc::now(),
        }
    }
}

/// The single value a gateway call produces.
///
/// Immutable after construction except for the trace/session ids, which the
/// caller may attach post-hoc.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Model output; always empty when `success` is false.
    pub content: String,
    pub success: bool,
    pub status: ExecutionStatus,
    /// Model that produced `content` (empty on failure).
    pub model_used: String,
    pub provider: String,
    pub latency_ms: u64,
    pub usage: TokenUsage,
    /// Estimated cost in USD from the model catalog.
    pub estimated_cost: f64,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    /// Failed attempts, in the order they were tried.
    pub attempts: Vec<AttemptRecord>,
    /// Last model tried, whether it succeeded or not.
    pub final_model: String,
    pub trace_id: Option<String>,
    pub session_id: Option<String>,
}

impl ExecutionResult {
    /// Result for a candidate that answered.
    pub fn served(
        content: String,
        model: &str,
        provider: &str,
        usage: TokenUsage,
        estimated_cost: f64,
        attempts: Vec<AttemptRecord>,
        latency_ms: u64,
    ) -> Self {
        let status = if attempts.is_empty() {
            ExecutionStatus::Success
        } else {
            ExecutionStatus::Fallback
        };
        Self {
            content,
            success: true,
            status,
            model_used: model.to_string(),
            provider: provider.to_string(),
            latency_ms,
            usage,
            estimated_cost,
            error_code: None,
            error_message: None,
            attempts,
            final_model: model.to_string(),
            trace_id: None,
            session_id: None,
        }
    }

    /// Result served from the response cache after the chain was exhausted.
    pub fn cached(content: String, attempts: Vec<AttemptRecord>, latency_ms: u64) -> Self {
        let final_model = attempts.last().map(|a| a.model.clone()).unwrap_or_default();
        Self {
            content,
            success: true,
            status: ExecutionStatus::Cached,
            model_used: "cache".to_string(),
            provider: "cache".to_string(),
            latency_ms,
            usage: TokenUsage::default(),
            estimated_cost: 0.0,
            error_code: None,
            error_message: None,
            attempts,
            final_model,
            trace_id: None,
            session_id: None,
        }
    }

    /// Result for an exhausted chain with no cache entry.
    ///
    /// The status narrows to `timeout` or `rate_limited` only when every
    /// attempt failed that way.
    pub fn exhausted(attempts: Vec<AttemptRecord>, latency_ms: u64) -> Self {
        let status = if !attempts.is_empty() && attempts.iter().all(|a| a.error_kind == "timeout") {
            ExecutionStatus::Timeout
        } else if !attempts.is_empty() && attempts.iter().all(|a| a.error_kind == "rate_limited")
        {
            ExecutionStatus::RateLimited
        } else {
            ExecutionStatus::Error
        };
        let message = if attempts.is_empty() {
            "no candidate models configured".to_string()
        } else {
            format!(
                "all {} candidate models failed; last error: {}",
                attempts.len(),
                attempts.last().map(|a| a.error.as_str()).unwrap_or("")
            )
        };
        Self::failure(status, FALLBACK_CHAIN_EXHAUSTED, &message, attempts, latency_ms)
    }

    /// Generic failure constructor; keeps `content` empty.
    pub fn failure(
        status: ExecutionStatus,
        error_code: &str,
        message: &str,
        attempts: Vec<AttemptRecord>,
        latency_ms: u64,
    ) -> Self {
        let final_model = attempts.last().map(|a| a.model.clone()).unwrap_or_default();
        Self {
            content: String::new(),
            success: false,
            status,
            model_used: String::new(),
            provider: String::new(),
            latency_ms,
            usage: TokenUsage::default(),
            estimated_cost: 0.0,
            error_code: Some(error_code.to_string()),
            error_message: Some(message.to_string()),
            attempts,
            final_model,
            trace_id: None,
            session_id: None,
        }
    }

    /// Attach trace and session ids after the fact.
    pub fn with_ids(mut self, trace_id: Option<String>, session_id: Option<String>) -> Self {
        self.trace_id = trace_id;
        self.session_id = session_id;
        self
    }

    /// Whether any candidate failed before the result was produced.
    pub fn used_fallback(&self) -> bool {
        !self.attempts.is_empty()
    }

    /// One-line description for logs and debate error lists.
    pub fn summary_line(&self) -> String {
        match (&self.error_code, &self.error_message) {
            (Some(code), Some(msg)) => format!("[{}] {}: {}", self.status, code, msg),
            _ => format!(
                "[{}] {} via {} in {}ms",
                self.status, self.model_used, self.provider, self.latency_ms
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn attempt(model: &str, err: BackendError) -> AttemptRecord {
        AttemptRecord::failed(model, "test", &err)
    }

    #[test]
    fn test_served_without_attempts_is_success() {
        let r = ExecutionResult::served("ok".into(), "m1", "p", TokenUsage::default(), 0.0, vec![], 5);
        assert!(r.success);
        assert_eq!(r.status, ExecutionStatus::Success);
        assert!(!r.used_fallback());
        assert_eq!(r.final_model, "m1");
    }

    #[test]
    fn test_served_after_failure_is_fallback() {
        let attempts = vec![attempt("m1", BackendError::Transport("reset".into()))];
        let r = ExecutionResult::served("ok".into(), "m2", "p", TokenUsage::default(), 0.0, attempts, 5);
        assert!(r.success);
        assert_eq!(r.status, ExecutionStatus::Fallback);
        assert!(r.used_fallback());
    }

    #[test]
    fn test_exhausted_has_empty_content_and_code() {
        let attempts = vec![
            attempt("m1", BackendError::Transport("reset".into())),
            attempt("m2", BackendError::Timeout(Duration::from_secs(1))),
        ];
        let r = ExecutionResult::exhausted(attempts, 10);
        assert!(!r.success);
        assert!(r.content.is_empty());
        assert_eq!(r.status, ExecutionStatus::Error);
        assert_eq!(r.error_code.as_deref(), Some(FALLBACK_CHAIN_EXHAUSTED));
        assert_eq!(r.final_model, "m2");
    }

    #[test]
    fn test_exhausted_all_timeouts_narrows_status() {
        let attempts = vec![
            attempt("m1", BackendError::Timeout(Duration::from_secs(1))),
            attempt("m2", BackendError::Timeout(Duration::from_secs(1))),
        ];
        assert_eq!(ExecutionResult::exhausted(attempts, 0).status, ExecutionStatus::Timeout);
    }

    #[test]
    fn test_exhausted_all_rate_limited_narrows_status() {
        let attempts = vec![
            attempt("m1", BackendError::RateLimited { retry_after: None }),
            attempt(
                "m2",
                BackendError::Status {
                    status: 429,
                    body: String::new(),
                },
            ),
        ];
        assert_eq!(
            ExecutionResult::exhausted(attempts, 0).status,
            ExecutionStatus::RateLimited
        );
    }

    #[test]
    fn test_with_ids_attaches_post_hoc() {
        let r = ExecutionResult::exhausted(vec![], 0)
            .with_ids(Some("trace".into()), Some("session".into()));
        assert_eq!(r.trace_id.as_deref(), Some("trace"));
        assert_eq!(r.session_id.as_deref(), Some("session"));
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&ExecutionStatus::RateLimited).unwrap();
        assert_eq!(json, "\"rate_limited\"");
        assert_eq!(ExecutionStatus::ALL.len(), 6);
    }
}
