//! Debate state machine — phases, transitions, and history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Phase of a debate run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebatePhase {
    /// Run created, nothing issued yet.
    Init,
    /// Optional best-effort memory lookup.
    ContextFetch,
    /// Generators fan out.
    Proposal,
    Critique,
    /// Team applies the critic's must-fix list.
    Revision,
    Judgment,
    Gate,
    /// Terminal. Reachable from every phase (timeout or fatal error).
    Done,
}

impl DebatePhase {
    pub fn is_terminal(self) -> bool {
        self == Self::Done
    }

    /// Valid transitions from this phase.
    pub fn valid_transitions(self) -> &'static [DebatePhase] {
        match self {
            Self::Init => &[Self::ContextFetch, Self::Proposal, Self::Done],
            Self::ContextFetch => &[Self::Proposal, Self::Done],
            // Fast mode goes straight to judgment.
            Self::Proposal => &[Self::Critique, Self::Judgment, Self::Done],
            Self::Critique => &[Self::Revision, Self::Judgment, Self::Done],
            // A failed revision call proceeds with the last critique.
            Self::Revision => &[Self::Critique, Self::Judgment, Self::Done],
            Self::Judgment => &[Self::Gate, Self::Done],
            Self::Gate => &[Self::Done],
            Self::Done => &[],
        }
    }
}

impl std::fmt::Display for DebatePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Init => write!(f, "init"),
            Self::ContextFetch => write!(f, "context_fetch"),
            Self::Proposal => write!(f, "proposal"),
            Self::Critique => write!(f, "critique"),
            Self::Revision => write!(f, "revision"),
            Self::Judgment => write!(f, "judgment"),
            Self::Gate => write!(f, "gate"),
            Self::Done => write!(f, "done"),
        }
    }
}

/// A phase transition record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseTransition {
    pub from: DebatePhase,
    pub to: DebatePhase,
    pub timestamp: DateTime<Utc>,
    pub reason: String,
}

/// Illegal transition. Only reachable through an orchestrator bug.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition {from} → {to}: {reason}")]
pub struct TransitionError {
    pub from: DebatePhase,
    pub to: DebatePhase,
    pub reason: String,
}

/// Current phase plus the transition history of one debate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseTracker {
    pub phase: DebatePhase,
    /// Revision rounds entered so far.
    pub revision_rounds: u32,
    pub transitions: Vec<PhaseTransition>,
}

impl Default for PhaseTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl PhaseTracker {
    pub fn new() -> Self {
        Self {
            phase: DebatePhase::Init,
            revision_rounds: 0,
            transitions: Vec::new(),
        }
    }

    /// Transition to a new phase with a reason.
    pub fn transition(&mut self, to: DebatePhase, reason: &str) -> Result<(), TransitionError> {
        if !self.phase.valid_transitions().contains(&to) {
            return Err(TransitionError {
                from: self.phase,
                to,
                reason: format!(
                    "not a valid transition (allowed: {:?})",
                    self.phase.valid_transitions()
                ),
            });
        }

        self.transitions.push(PhaseTransition {
            from: self.phase,
            to,
            timestamp: Utc::now(),
            reason: reason.to_string(),
        });
        self.phase = to;

        if to == DebatePhase::Revision {
            self.revision_rounds += 1;
        }
        Ok(())
    }

    /// Force the terminal phase. No-op when already done.
    pub fn finish(&mut self, reason: &str) {
        if !self.phase.is_terminal() {
            // Done is valid from every non-terminal phase.
            let _ = self.transition(DebatePhase::Done, reason);
        }
    }

    pub fn is_complete(&self) -> bool {
        self.phase.is_terminal()
    }

    /// Phases visited, in order, starting with `Init`.
    pub fn path(&self) -> Vec<DebatePhase> {
        std::iter::once(DebatePhase::Init)
            .chain(self.transitions.iter().map(|t| t.to))
            .collect()
    }

    /// How many times `phase` was entered.
    pub fn visits(&self, phase: DebatePhase) -> usize {
        self.transitions.iter().filter(|t| t.to == phase).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_path_with_revision() {
        let mut tracker = PhaseTracker::new();
        for (to, reason) in [
            (DebatePhase::ContextFetch, "memory enabled"),
            (DebatePhase::Proposal, "context ready"),
            (DebatePhase::Critique, "2 proposals"),
            (DebatePhase::Revision, "must-fix items"),
            (DebatePhase::Critique, "revised"),
            (DebatePhase::Judgment, "critique done"),
            (DebatePhase::Gate, "judged"),
            (DebatePhase::Done, "gate decided"),
        ] {
            tracker.transition(to, reason).unwrap();
        }
        assert!(tracker.is_complete());
        assert_eq!(tracker.revision_rounds, 1);
        assert_eq!(tracker.visits(DebatePhase::Critique), 2);
        assert_eq!(tracker.path().len(), 9);
    }

    #[test]
    fn test_fast_path_skips_critique() {
        let mut tracker = PhaseTracker::new();
        tracker.transition(DebatePhase::Proposal, "start").unwrap();
        tracker.transition(DebatePhase::Judgment, "fast mode").unwrap();
        assert_eq!(tracker.visits(DebatePhase::Critique), 0);
    }

    #[test]
    fn test_invalid_transition() {
        let mut tracker = PhaseTracker::new();
        let err = tracker.transition(DebatePhase::Gate, "skip").unwrap_err();
        assert_eq!(err.from, DebatePhase::Init);
        assert_eq!(err.to, DebatePhase::Gate);
        assert!(err.to_string().contains("init → gate"));
    }

    #[test]
    fn test_done_reachable_from_every_phase() {
        for phase in [
            DebatePhase::Init,
            DebatePhase::ContextFetch,
            DebatePhase::Proposal,
            DebatePhase::Critique,
            DebatePhase::Revision,
            DebatePhase::Judgment,
            DebatePhase::Gate,
        ] {
            assert!(phase.valid_transitions().contains(&DebatePhase::Done), "{}", phase);
        }
        assert!(DebatePhase::Done.valid_transitions().is_empty());
    }

    #[test]
    fn test_finish_is_idempotent() {
        let mut tracker = PhaseTracker::new();
        tracker.transition(DebatePhase::Proposal, "start").unwrap();
        tracker.finish("timed out");
        tracker.finish("again");
        assert_eq!(tracker.transitions.len(), 2);
        assert_eq!(tracker.transitions[1].reason, "timed out");
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(DebatePhase::ContextFetch.to_string(), "context_fetch");
        assert_eq!(DebatePhase::Done.to_string(), "done");
    }
}
