//! Roles and pools — the static tags that drive model selection.
//!
//! A [`Role`] says *what* an agent does in the debate (propose, critique,
//! judge, ...). A [`Pool`] says *how much* model the caller is willing to pay
//! for. The gateway resolves a concrete model from the role first and falls
//! back to the pool's model list when the role is absent or unmapped.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Functional tag of an agent in the debate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Breaks a task down before generation.
    Planner,
    /// Produces candidate proposals.
    Generator,
    /// Reviews proposals and lists required fixes.
    Critic,
    /// Issues the final accept/merge/reject decision.
    Judge,
    /// Executes the judge's instructions downstream.
    Runner,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Planner,
        Role::Generator,
        Role::Critic,
        Role::Judge,
        Role::Runner,
    ];

    /// Sampling temperature used when no override is configured.
    ///
    /// Generators explore, judges and runners stay deterministic.
    pub fn default_temperature(self) -> f32 {
        match self {
            Self::Planner => 0.3,
            Self::Generator => 0.7,
            Self::Critic => 0.2,
            Self::Judge => 0.1,
            Self::Runner => 0.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Planner => "planner",
            Self::Generator => "generator",
            Self::Critic => "critic",
            Self::Judge => "judge",
            Self::Runner => "runner",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "planner" => Ok(Self::Planner),
            "generator" => Ok(Self::Generator),
            "critic" => Ok(Self::Critic),
            "judge" => Ok(Self::Judge),
            "runner" => Ok(Self::Runner),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// Named tier of candidate models, trading latency for quality.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Pool {
    Fast,
    #[default]
    Balanced,
    Heavy,
}

impl Pool {
    pub const ALL: [Pool; 3] = [Pool::Fast, Pool::Balanced, Pool::Heavy];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Balanced => "balanced",
            Self::Heavy => "heavy",
        }
    }
}

impl std::fmt::Display for Pool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Pool {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fast" => Ok(Self::Fast),
            "balanced" => Ok(Self::Balanced),
            "heavy" => Ok(Self::Heavy),
            other => Err(format!("unknown pool: {}", other)),
        }
    }
}
