//! Resilient multi-agent debate pipeline.
//!
//! A task is proposed by several generators, critiqued, optionally revised,
//! judged, and finally allowed or blocked for downstream execution.
//!
//! ```text
//! DebateOrchestrator ──► ModelGateway (fallback chain per call) ──► ModelBackend
//!        │                      │
//!        │◄── Normalizer ◄──────┘ (raw text → schema-valid record)
//!        ▼
//!   gate::evaluate ──► GateDecision ──► DebateResult
//! ```
//!
//! # Modules
//!
//! - [`gateway`]: one logical prompt against an ordered list of candidate
//!   models, with per-attempt timeouts, cache fallback and streaming
//! - [`normalizer`]: structured records out of free-text model output
//! - [`debate`]: the bounded proposal/critique/judgment state machine
//! - [`gate`]: the pure allow/block decision
//! - [`memory`]: the optional context provider seam

#![allow(dead_code)]
#![allow(clippy::uninlined_format_args)]

pub mod config;
pub mod debate;
pub mod gate;
pub mod gateway;
pub mod memory;
pub mod normalizer;
pub mod roles;

pub use config::ConfigError;
pub use debate::{
    CritiqueRecord, Decision, DebateConfig, DebateOrchestrator, DebatePhase, DebateResult,
    JudgmentRecord, Proposal, RiskLevel, Verdict,
};
pub use gate::{evaluate as evaluate_gate, GateConfig, GateDecision};
pub use gateway::{
    BackendError, Completion, ExecutionRequest, ExecutionResult, ExecutionStatus, GatewayConfig,
    ModelBackend, ModelCall, ModelGateway, StreamEvent, FALLBACK_CHAIN_EXHAUSTED,
};
pub use memory::{ContextItem, ContextProvider, InMemoryContextStore, MemoryError};
pub use normalizer::{normalize, normalize_with, NormalizedRecord, SchemaKind};
pub use roles::{Pool, Role};
