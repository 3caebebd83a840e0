//! Debate Orchestration — proposal, critique, revision, judgment, gate.
//!
//! One bounded run per task. The gateway and memory provider are injected;
//! each run owns its [`DebateResult`] until it is returned.
//!
//! # Debate Flow
//!
//! ```text
//! Init → ContextFetch? → Proposal ──────────────────────────────┐ (fast mode)
//!                           │                                   │
//!                           ▼                                   ▼
//!                        Critique ⇄ Revision (≤ max rounds) → Judgment → Gate → Done
//!
//! total timeout / fatal error at any point → Done (allowed = false)
//! ```

pub mod config;
pub mod orchestrator;
pub mod prompts;
pub mod records;
pub mod result;
pub mod state;

pub use config::DebateConfig;
pub use orchestrator::DebateOrchestrator;
pub use records::{CritiqueRecord, Decision, JudgmentRecord, Proposal, RiskLevel, Verdict};
pub use result::{DebateResult, ValidationFlags};
pub use state::{DebatePhase, PhaseTracker, PhaseTransition, TransitionError};
