//! Debate configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::{self, ConfigError};
use crate::gate::GateConfig;
use crate::roles::Pool;

pub const MAX_GENERATORS: usize = 10;
pub const MAX_REVISION_ROUNDS: u32 = 5;
pub const MIN_TIMEOUT_SECONDS: u64 = 30;

/// Options recognized by [`DebateOrchestrator::run_debate`](super::DebateOrchestrator::run_debate).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebateConfig {
    pub pool: Pool,
    /// Concurrent generators in the proposal round (1–10).
    pub max_generators: usize,
    /// Bound on revise → re-critique iterations.
    pub max_revision_rounds: u32,
    /// Total wall-clock budget for the debate (≥ 30).
    pub timeout_seconds: u64,
    /// Share of the total budget each round may use, in (0, 1].
    pub round_timeout_fraction: f64,
    /// Minimum judge accuracy (0–10) for the gate to allow.
    pub accuracy_threshold: f64,
    pub auto_approve_low_risk: bool,
    /// Consult the memory provider before proposing, store a summary after.
    pub use_memory: bool,
    /// Single proposal plus a combined critique/judgment pass.
    pub fast_mode: bool,
    pub memory_search_limit: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl Default for DebateConfig {
    fn default() -> Self {
        Self {
            pool: Pool::Balanced,
            max_generators: 3,
            max_revision_rounds: 1,
            timeout_seconds: 300,
            round_timeout_fraction: 1.0 / 3.0,
            accuracy_threshold: 7.0,
            auto_approve_low_risk: false,
            use_memory: true,
            fast_mode: false,
            memory_search_limit: 5,
            team_id: None,
            session_id: None,
        }
    }
}

impl DebateConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = config::from_toml_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config: Self = config::load_toml(path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_pool(mut self, pool: Pool) -> Self {
        self.pool = pool;
        self
    }

    pub fn with_generators(mut self, count: usize) -> Self {
        self.max_generators = count;
        self
    }

    pub fn with_fast_mode(mut self, fast: bool) -> Self {
        self.fast_mode = fast;
        self
    }

    pub fn with_timeout_seconds(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Reject out-of-range values. Runs before any gateway call.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_GENERATORS).contains(&self.max_generators) {
            return Err(ConfigError::out_of_range(
                "max_generators",
                self.max_generators,
                "1..=10",
            ));
        }
        if self.max_revision_rounds > MAX_REVISION_ROUNDS {
            return Err(ConfigError::out_of_range(
                "max_revision_rounds",
                self.max_revision_rounds,
                "0..=5",
            ));
        }
        if self.timeout_seconds < MIN_TIMEOUT_SECONDS {
            return Err(ConfigError::out_of_range(
                "timeout_seconds",
                self.timeout_seconds,
                ">= 30",
            ));
        }
        // Written negated so NaN is rejected too.
        if !(self.round_timeout_fraction > 0.0 && self.round_timeout_fraction <= 1.0) {
            return Err(ConfigError::out_of_range(
                "round_timeout_fraction",
                self.round_timeout_fraction,
                "(0, 1]",
            ));
        }
        if !(0.0..=10.0).contains(&self.accuracy_threshold) {
            return Err(ConfigError::out_of_range(
                "accuracy_threshold",
                self.accuracy_threshold,
                "0..=10",
            ));
        }
        if self.use_memory && self.memory_search_limit == 0 {
            return Err(ConfigError::Invalid(
                "memory_search_limit must be >= 1 when use_memory is set".to_string(),
            ));
        }
        Ok(())
    }

    pub fn total_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Per-round deadline; a subset of the total budget, never additive.
    pub fn round_timeout(&self) -> Duration {
        let millis = (self.timeout_seconds as f64 * 1000.0 * self.round_timeout_fraction).round();
        Duration::from_millis(millis as u64)
    }

    pub fn gate(&self) -> GateConfig {
        GateConfig {
            accuracy_threshold: self.accuracy_threshold,
            auto_approve_low_risk: self.auto_approve_low_risk,
        }
    }
}
