//! Typed debate records built from normalized model output.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::normalizer::{string_list, NormalizedRecord};

/// Critic verdict on the proposals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Pass,
    Revise,
    Reject,
}

impl Verdict {
    /// Parse a canonical value; anything else is the conservative `Revise`.
    pub fn parse_or_default(raw: &str) -> Self {
        match raw {
            "pass" => Self::Pass,
            "reject" => Self::Reject,
            _ => Self::Revise,
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pass => write!(f, "pass"),
            Self::Revise => write!(f, "revise"),
            Self::Reject => write!(f, "reject"),
        }
    }
}

/// Judge decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Accept,
    Merge,
    Reject,
}

impl Decision {
    /// Parse a canonical value; anything else is the conservative `Reject`.
    pub fn parse_or_default(raw: &str) -> Self {
        match raw {
            "accept" => Self::Accept,
            "merge" => Self::Merge,
            _ => Self::Reject,
        }
    }

    pub fn is_approval(self) -> bool {
        matches!(self, Self::Accept | Self::Merge)
    }
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Accept => write!(f, "accept"),
            Self::Merge => write!(f, "merge"),
            Self::Reject => write!(f, "reject"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    #[default]
    Unknown,
}

impl RiskLevel {
    pub fn parse_or_default(raw: &str) -> Self {
        match raw {
            "low" => Self::Low,
            "medium" => Self::Medium,
            "high" => Self::High,
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// One generator's proposal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proposal {
    pub agent_id: String,
    pub approach: String,
    pub code: String,
    pub tests: Option<String>,
    pub risk_level: RiskLevel,
    pub confidence: f64,
    pub tools_used: Vec<String>,
}

impl Proposal {
    /// Build from a normalized generator record.
    ///
    /// `agent_id` always comes from the orchestrator so proposals stay keyed
    /// by agent identity even when a model invents its own name. When no
    /// structure was recovered, the raw response becomes the approach.
    pub fn from_record(agent_id: &str, record: &NormalizedRecord) -> Self {
        let approach = if record.parsed() {
            record.get_str("approach").to_string()
        } else {
            record.get_str("response").to_string()
        };
        Self {
            agent_id: agent_id.to_string(),
            approach,
            code: record.get_str("code").to_string(),
            tests: record
                .fields
                .get("tests")
                .and_then(Value::as_str)
                .filter(|t| !t.is_empty())
                .map(String::from),
            risk_level: RiskLevel::parse_or_default(record.get_str("risk_level")),
            confidence: record.get_f64("confidence"),
            tools_used: record.get_strings("tools_used"),
        }
    }

    /// Whether the proposal carries anything a critic can review.
    pub fn is_substantive(&self) -> bool {
        !self.approach.trim().is_empty() || !self.code.trim().is_empty()
    }
}

/// Structured critique of a round's proposals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CritiqueRecord {
    pub verdict: Verdict,
    /// Category → issues.
    pub findings: BTreeMap<String, Vec<String>>,
    pub must_fix: Vec<String>,
    pub nice_to_have: Vec<String>,
    pub confidence: f64,
}

impl CritiqueRecord {
    pub fn from_record(record: &NormalizedRecord) -> Self {
        let findings = record
            .fields
            .get("findings")
            .and_then(Value::as_object)
            .map(|map| {
                map.iter()
                    .map(|(category, issues)| (category.clone(), string_list(Some(issues))))
                    .collect()
            })
            .unwrap_or_default();
        Self {
            verdict: Verdict::parse_or_default(record.get_str("verdict")),
            findings,
            must_fix: record.get_strings("must_fix"),
            nice_to_have: record.get_strings("nice_to_have"),
            confidence: record.get_f64("confidence"),
        }
    }

    /// Whether the critic asked for a revision with concrete fixes.
    pub fn wants_revision(&self) -> bool {
        self.verdict == Verdict::Revise && !self.must_fix.is_empty()
    }

    pub fn issue_count(&self) -> usize {
        self.findings.values().map(Vec::len).sum()
    }
}

/// The judge's final decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgmentRecord {
    pub decision: Decision,
    /// Ordered steps for the downstream runner.
    pub runner_instructions: Vec<String>,
    pub rationale: String,
    pub confidence: f64,
    pub risk_assessment: RiskLevel,
    /// Judge's accuracy estimate, 0–10.
    pub accuracy_score: f64,
}

impl JudgmentRecord {
    pub fn from_record(record: &NormalizedRecord) -> Self {
        Self {
            decision: Decision::parse_or_default(record.get_str("decision")),
            runner_instructions: record.get_strings("runner_instructions"),
            rationale: record.get_str("rationale").to_string(),
            confidence: record.get_f64("confidence"),
            risk_assessment: RiskLevel::parse_or_default(record.get_str("risk_assessment")),
            accuracy_score: record.get_f64("accuracy_score"),
        }
    }
}
