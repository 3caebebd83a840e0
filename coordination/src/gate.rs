//! Gate/Admission decision — the final allow/block verdict.
//!
//! A pure function of (critique, judgment, accuracy, reliability, config).
//! Checks run in a fixed order and the first failing check decides:
//!
//! ```text
//! incomplete debate? ─► judge rejected? ─► critic rejected? ─► accuracy < threshold?
//!                                                                     │ all clear
//!                                                                     ▼
//!                          low risk + auto-approve ─► allowed (auto-approved)
//!                          risk != high            ─► allowed
//!                          risk == high            ─► blocked, manual approval required
//! ```

use serde::{Deserialize, Serialize};

use crate::debate::records::{CritiqueRecord, JudgmentRecord, RiskLevel, Verdict};

/// Gate thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GateConfig {
    /// Minimum accuracy score (0–10) to allow.
    pub accuracy_threshold: f64,
    /// Allow low-risk outcomes without further checks.
    pub auto_approve_low_risk: bool,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            accuracy_threshold: 7.0,
            auto_approve_low_risk: false,
        }
    }
}

/// The gate verdict. Derived once; never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateDecision {
    pub allowed: bool,
    /// Human-readable explanation; always set.
    pub reason: String,
    pub accuracy_score: f64,
    pub reliability_passed: bool,
    pub risk_level: RiskLevel,
    pub requires_approval: bool,
    /// Actions a human must approve (the judge's runner instructions).
    pub approval_actions: Vec<String>,
}

impl GateDecision {
    fn blocked(reason: impl Into<String>, accuracy_score: f64, reliability_passed: bool, risk_level: RiskLevel) -> Self {
        Self {
            allowed: false,
            reason: reason.into(),
            accuracy_score,
            reliability_passed,
            risk_level,
            requires_approval: false,
            approval_actions: Vec::new(),
        }
    }

    /// Fail-safe decision for a debate that never reached the gate.
    pub fn unresolved(reason: impl Into<String>) -> Self {
        Self::blocked(reason, 0.0, false, RiskLevel::Unknown)
    }

    /// Compact summary line.
    pub fn summary_line(&self) -> String {
        format!(
            "[{}] {} | accuracy={:.1} risk={} reliability={}",
            if self.allowed { "ALLOWED" } else { "BLOCKED" },
            self.reason,
            self.accuracy_score,
            self.risk_level,
            if self.reliability_passed { "ok" } else { "degraded" }
        )
    }
}

/// Compute the gate decision.
pub fn evaluate(
    critique: Option<&CritiqueRecord>,
    judgment: Option<&JudgmentRecord>,
    accuracy_score: f64,
    reliability_passed: bool,
    config: &GateConfig,
) -> GateDecision {
    let (Some(critique), Some(judgment)) = (critique, judgment) else {
        return GateDecision::blocked(
            "incomplete debate",
            accuracy_score,
            reliability_passed,
            RiskLevel::Unknown,
        );
    };
    let risk = judgment.risk_assessment;

    if !judgment.decision.is_approval() {
        return GateDecision::blocked(
            format!("judge decision: {}", judgment.decision),
            accuracy_score,
            reliability_passed,
            risk,
        );
    }

    if critique.verdict == Verdict::Reject {
        return GateDecision::blocked(
            "critic rejected proposals",
            accuracy_score,
            reliability_passed,
            risk,
        );
    }

    if accuracy_score < config.accuracy_threshold {
        return GateDecision::blocked(
            "accuracy below threshold",
            accuracy_score,
            reliability_passed,
            risk,
        );
    }

    let allowed = |reason: &str| GateDecision {
        allowed: true,
        reason: reason.to_string(),
        accuracy_score,
        reliability_passed,
        risk_level: risk,
        requires_approval: false,
        approval_actions: Vec::new(),
    };

    match risk {
        RiskLevel::Low if config.auto_approve_low_risk => allowed("auto-approved: low risk"),
        RiskLevel::High => GateDecision {
            allowed: false,
            reason: "high risk: manual approval required".to_string(),
            accuracy_score,
            reliability_passed,
            risk_level: risk,
            requires_approval: true,
            approval_actions: judgment.runner_instructions.clone(),
        },
        _ => allowed("approved: meets all criteria"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::debate::records::Decision;
    use std::collections::BTreeMap;

    fn critique(verdict: Verdict) -> CritiqueRecord {
        CritiqueRecord {
            verdict,
            findings: BTreeMap::new(),
            must_fix: vec![],
            nice_to_have: vec![],
            confidence: 0.9,
        }
    }

    fn judgment(decision: Decision, risk: RiskLevel) -> JudgmentRecord {
        JudgmentRecord {
            decision,
            runner_instructions: vec!["cargo test".to_string(), "git push".to_string()],
            rationale: "looks right".to_string(),
            confidence: 0.8,
            risk_assessment: risk,
            accuracy_score: 8.0,
        }
    }

    #[test]
    fn test_accept_pass_medium_risk_is_allowed() {
        let decision = evaluate(
            Some(&critique(Verdict::Pass)),
            Some(&judgment(Decision::Accept, RiskLevel::Medium)),
            8.0,
            true,
            &GateConfig::default(),
        );
        assert!(decision.allowed);
        assert_eq!(decision.reason, "approved: meets all criteria");
        assert!(!decision.requires_approval);
    }

    #[test]
    fn test_judge_reject_blocks() {
        let decision = evaluate(
            Some(&critique(Verdict::Pass)),
            Some(&judgment(Decision::Reject, RiskLevel::Low)),
            9.0,
            true,
            &GateConfig::default(),
        );
        assert!(!decision.allowed);
        assert!(decision.reason.contains("judge decision: reject"));
    }

    #[test]
    fn test_missing_records_block() {
        let config = GateConfig::default();
        let j = judgment(Decision::Accept, RiskLevel::Low);
        let c = critique(Verdict::Pass);
        for decision in [
            evaluate(None, Some(&j), 9.0, true, &config),
            evaluate(Some(&c), None, 9.0, true, &config),
            evaluate(None, None, 9.0, true, &config),
        ] {
            assert!(!decision.allowed);
            assert_eq!(decision.reason, "incomplete debate");
            assert_eq!(decision.risk_level, RiskLevel::Unknown);
        }
    }

    #[test]
    fn test_critic_reject_blocks_even_when_judge_accepts() {
        let decision = evaluate(
            Some(&critique(Verdict::Reject)),
            Some(&judgment(Decision::Merge, RiskLevel::Low)),
            9.0,
            true,
            &GateConfig::default(),
        );
        assert!(!decision.allowed);
        assert_eq!(decision.reason, "critic rejected proposals");
    }

    #[test]
    fn test_accuracy_below_threshold_blocks() {
        let decision = evaluate(
            Some(&critique(Verdict::Pass)),
            Some(&judgment(Decision::Accept, RiskLevel::Low)),
            6.9,
            true,
            &GateConfig::default(),
        );
        assert!(!decision.allowed);
        assert_eq!(decision.reason, "accuracy below threshold");
        assert_eq!(decision.accuracy_score, 6.9);
    }

    #[test]
    fn test_accuracy_equal_to_threshold_passes() {
        let decision = evaluate(
            Some(&critique(Verdict::Revise)),
            Some(&judgment(Decision::Accept, RiskLevel::Unknown)),
            7.0,
            false,
            &GateConfig::default(),
        );
        assert!(decision.allowed);
        assert!(!decision.reliability_passed);
    }

    #[test]
    fn test_low_risk_auto_approval() {
        let config = GateConfig {
            auto_approve_low_risk: true,
            ..Default::default()
        };
        let decision = evaluate(
            Some(&critique(Verdict::Pass)),
            Some(&judgment(Decision::Accept, RiskLevel::Low)),
            8.0,
            true,
            &config,
        );
        assert!(decision.allowed);
        assert_eq!(decision.reason, "auto-approved: low risk");
    }

    #[test]
    fn test_low_risk_without_auto_approval() {
        let decision = evaluate(
            Some(&critique(Verdict::Pass)),
            Some(&judgment(Decision::Accept, RiskLevel::Low)),
            8.0,
            true,
            &GateConfig::default(),
        );
        assert_eq!(decision.reason, "approved: meets all criteria");
    }

    #[test]
    fn test_high_risk_requires_manual_approval() {
        let decision = evaluate(
            Some(&critique(Verdict::Pass)),
            Some(&judgment(Decision::Merge, RiskLevel::High)),
            9.5,
            true,
            &GateConfig::default(),
        );
        assert!(!decision.allowed);
        assert!(decision.requires_approval);
        assert_eq!(decision.reason, "high risk: manual approval required");
        assert_eq!(decision.approval_actions, vec!["cargo test", "git push"]);
    }

    #[test]
    fn test_decision_is_deterministic() {
        let c = critique(Verdict::Pass);
        let j = judgment(Decision::Accept, RiskLevel::Medium);
        let config = GateConfig::default();
        let first = serde_json::to_string(&evaluate(Some(&c), Some(&j), 8.0, true, &config)).unwrap();
        for _ in 0..10 {
            let again = serde_json::to_string(&evaluate(Some(&c), Some(&j), 8.0, true, &config)).unwrap();
            assert_eq!(first, again);
        }
    }

    #[test]
    fn test_summary_line() {
        let decision = GateDecision::unresolved("debate timed out");
        let line = decision.summary_line();
        assert!(line.starts_with("[BLOCKED] debate timed out"));
        assert!(line.contains("risk=unknown"));
    }
}
