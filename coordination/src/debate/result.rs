//! The top-level debate aggregate returned to callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::gate::GateDecision;

use super::records::{CritiqueRecord, JudgmentRecord, Proposal};
use super::state::PhaseTracker;

/// Which parts of the debate produced structured output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationFlags {
    pub has_proposals: bool,
    pub critique_parsed: bool,
    pub judgment_parsed: bool,
    /// Set when fast mode replaced the separate critique round.
    pub fast_mode: bool,
}

/// Everything one debate produced. Exclusively owned by the run that built it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateResult {
    pub debate_id: String,
    pub task: String,
    pub team_id: Option<String>,
    pub session_id: Option<String>,
    pub proposals: Vec<Proposal>,
    pub critique: Option<CritiqueRecord>,
    pub judgment: Option<JudgmentRecord>,
    pub validation: ValidationFlags,
    pub gate: Option<GateDecision>,
    /// Final approval. `false` unless the gate allowed.
    pub allowed: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub revision_rounds: u32,
    pub execution_time_ms: u64,
    pub created_at: DateTime<Utc>,
    /// Ids of memory entries written as a side effect.
    pub memory_entries: Vec<String>,
    pub phases: PhaseTracker,
}

impl DebateResult {
    pub fn new(task: &str, team_id: Option<String>, session_id: Option<String>) -> Self {
        Self {
            debate_id: uuid::Uuid::new_v4().to_string(),
            task: task.to_string(),
            team_id,
            session_id,
            proposals: Vec::new(),
            critique: None,
            judgment: None,
            validation: ValidationFlags::default(),
            gate: None,
            allowed: false,
            errors: Vec::new(),
            warnings: Vec::new(),
            revision_rounds: 0,
            execution_time_ms: 0,
            created_at: Utc::now(),
            memory_entries: Vec::new(),
            phases: PhaseTracker::new(),
        }
    }

    /// Structured critique, structured judgment, at least one proposal,
    /// and no recorded error.
    pub fn reliability_passed(&self) -> bool {
        self.validation.has_proposals
            && self.validation.critique_parsed
            && self.validation.judgment_parsed
            && self.errors.is_empty()
    }

    /// Human-readable reason the debate ended where it did.
    pub fn reason(&self) -> &str {
        match (&self.gate, self.errors.first()) {
            (Some(gate), _) => &gate.reason,
            (None, Some(error)) => error,
            (None, None) => "incomplete debate",
        }
    }

    /// Compact summary line.
    pub fn summary_line(&self) -> String {
        format!(
            "[{}] {} | {} proposals | {} revisions | {} errors | {}ms | debate={}",
            if self.allowed { "ALLOWED" } else { "BLOCKED" },
            self.reason(),
            self.proposals.len(),
            self.revision_rounds,
            self.errors.len(),
            self.execution_time_ms,
            self.debate_id
        )
    }
}
