//! Gateway routing tables: role → model, pool → models, model catalog.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::{self, ConfigError};
use crate::roles::{Pool, Role};

/// Catalog entry for one concrete model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub provider: String,
    /// USD per 1K prompt tokens.
    #[serde(default)]
    pub input_cost_per_1k: f64,
    /// USD per 1K completion tokens.
    #[serde(default)]
    pub output_cost_per_1k: f64,
}

impl ModelSpec {
    fn new(provider: &str, input_cost_per_1k: f64, output_cost_per_1k: f64) -> Self {
        Self {
            provider: provider.to_string(),
            input_cost_per_1k,
            output_cost_per_1k,
        }
    }
}

/// Routing and budget configuration for the gateway.
///
/// Map keys are the snake_case role/pool names so the tables read naturally
/// in TOML (`[role_models] judge = "claude-opus-4"`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub role_models: BTreeMap<String, String>,
    pub pool_models: BTreeMap<String, Vec<String>>,
    /// Task-type hint → model. A matching hint overrides the role model.
    pub task_routes: BTreeMap<String, String>,
    /// Per-role temperature overrides.
    pub temperatures: BTreeMap<String, f32>,
    pub models: BTreeMap<String, ModelSpec>,
    /// Upper bound on candidates tried per call.
    pub max_attempts: usize,
    /// Budget for a single candidate attempt.
    pub attempt_timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        let role_models = [
            (Role::Planner, "claude-sonnet-4"),
            (Role::Generator, "gpt-4o"),
            (Role::Critic, "claude-sonnet-4"),
            (Role::Judge, "claude-opus-4"),
            (Role::Runner, "gpt-4o-mini"),
        ]
        .into_iter()
        .map(|(r, m)| (r.as_str().to_string(), m.to_string()))
        .collect();

        let pool_models = [
            (
                Pool::Fast,
                vec!["gpt-4o-mini", "claude-3-5-haiku", "gemini-1.5-flash"],
            ),
            (
                Pool::Balanced,
                vec!["gpt-4o", "claude-sonnet-4", "gemini-1.5-pro"],
            ),
            (Pool::Heavy, vec!["claude-opus-4", "o1", "gpt-4o"]),
        ]
        .into_iter()
        .map(|(p, ms)| {
            (
                p.as_str().to_string(),
                ms.into_iter().map(String::from).collect(),
            )
        })
        .collect();

        let models = [
            ("gpt-4o-mini", ModelSpec::new("openai", 0.00015, 0.0006)),
            ("gpt-4o", ModelSpec::new("openai", 0.0025, 0.01)),
            ("o1", ModelSpec::new("openai", 0.015, 0.06)),
            ("claude-3-5-haiku", ModelSpec::new("anthropic", 0.0008, 0.004)),
            ("claude-sonnet-4", ModelSpec::new("anthropic", 0.003, 0.015)),
            ("claude-opus-4", ModelSpec::new("anthropic", 0.015, 0.075)),
            ("gemini-1.5-flash", ModelSpec::new("google", 0.000075, 0.0003)),
            ("gemini-1.5-pro", ModelSpec::new("google", 0.00125, 0.005)),
        ]
        .into_iter()
        .map(|(m, spec)| (m.to_string(), spec))
        .collect();

        Self {
            role_models,
            pool_models,
            task_routes: BTreeMap::new(),
            temperatures: BTreeMap::new(),
            models,
            max_attempts: 3,
            attempt_timeout_secs: 60,
        }
    }
}

impl GatewayConfig {
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

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::out_of_range("max_attempts", 0, ">= 1"));
        }
        if self.attempt_timeout_secs == 0 {
            return Err(ConfigError::out_of_range("attempt_timeout_secs", 0, ">= 1"));
        }
        for pool in Pool::ALL {
            if self.pool_models(pool).is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "pool '{}' has no candidate models",
                    pool
                )));
            }
        }
        Ok(())
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.attempt_timeout_secs)
    }

    pub fn pool_models(&self, pool: Pool) -> &[String] {
        self.pool_models
            .get(pool.as_str())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn role_model(&self, role: Role) -> Option<&str> {
        self.role_models.get(role.as_str()).map(String::as_str)
    }

    pub fn temperature(&self, role: Option<Role>) -> f32 {
        match role {
            Some(role) => self
                .temperatures
                .get(role.as_str())
                .copied()
                .unwrap_or_else(|| role.default_temperature()),
            None => 0.5,
        }
    }

    /// Provider for a model, `"default"` for models missing from the catalog.
    pub fn provider_for(&self, model: &str) -> &str {
        self.models
            .get(model)
            .map(|spec| spec.provider.as_str())
            .unwrap_or("default")
    }

    pub fn estimate_cost(&self, model: &str, prompt_tokens: u32, completion_tokens: u32) -> f64 {
        self.models
            .get(model)
            .map(|spec| {
                (prompt_tokens as f64 / 1000.0) * spec.input_cost_per_1k
                    + (completion_tokens as f64 / 1000.0) * spec.output_cost_per_1k
            })
            .unwrap_or(0.0)
    }

    /// Primary model for a request.
    ///
    /// Precedence: task-type route, then role table, then the pool's first model.
    pub fn primary_model(&self, role: Option<Role>, pool: Pool, task_type: Option<&str>) -> Option<String> {
        if let Some(model) = task_type.and_then(|t| self.task_routes.get(t)) {
            return Some(model.clone());
        }
        if let Some(model) = role.and_then(|r| self.role_model(r)) {
            return Some(model.to_string());
        }
        self.pool_models(pool).first().cloned()
    }

    /// Ordered, de-duplicated fallback chain, capped at `max_attempts`.
    pub fn candidates(&self, role: Option<Role>, pool: Pool, task_type: Option<&str>) -> Vec<String> {
        let mut chain: Vec<String> = Vec::with_capacity(self.max_attempts);
        if let Some(primary) = self.primary_model(role, pool, task_type) {
            chain.push(primary);
        }
        for model in self.pool_models(pool) {
            if chain.len() >= self.max_attempts {
                break;
            }
            if !chain.contains(model) {
                chain.push(model.clone());
            }
        }
        chain.truncate(self.max_attempts);
        chain
    }
}
