//! Memory/context provider seam.
//!
//! The orchestrator consults an external store for extra task context and
//! may write a debate summary back. Both directions are best-effort: the
//! debate never fails because memory is unavailable.

use std::sync::RwLock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("memory store unavailable: {0}")]
    Unavailable(String),

    #[error("memory store rejected entry: {0}")]
    Rejected(String),
}

/// One piece of recalled context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextItem {
    pub content: String,
    /// Relevance score from the store, if it reports one.
    #[serde(default)]
    pub score: Option<f64>,
}

impl ContextItem {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            score: None,
        }
    }
}

#[async_trait]
pub trait ContextProvider: Send + Sync {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<ContextItem>, MemoryError>;

    /// Persist an entry and return its id. Stores that are read-only keep
    /// the default and return `Ok(None)`.
    async fn store(&self, _content: &str, _tags: &[String]) -> Result<Option<String>, MemoryError> {
        Ok(None)
    }
}

/// Process-local store with keyword matching; useful for tests and demos.
#[derive(Default)]
pub struct InMemoryContextStore {
    entries: RwLock<Vec<(String, String, Vec<String>)>>,
}

impl InMemoryContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ContextProvider for InMemoryContextStore {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<ContextItem>, MemoryError> {
        let entries = self
            .entries
            .read()
            .map_err(|e| MemoryError::Unavailable(e.to_string()))?;
        let terms: Vec<String> = query
            .split_whitespace()
            .filter(|t| t.len() > 2)
            .map(str::to_lowercase)
            .collect();
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored: Vec<ContextItem> = entries
            .iter()
            .filter_map(|(_, content, _)| {
                let lowered = content.to_lowercase();
                let hits = terms.iter().filter(|t| lowered.contains(t.as_str())).count();
                (hits > 0).then(|| ContextItem {
                    content: content.clone(),
                    score: Some(hits as f64 / terms.len() as f64),
                })
            })
            .collect();
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(limit);
        Ok(scored)
    }

    async fn store(&self, content: &str, tags: &[String]) -> Result<Option<String>, MemoryError> {
        let id = uuid::Uuid::new_v4().to_string();
        self.entries
            .write()
            .map_err(|e| MemoryError::Unavailable(e.to_string()))?
            .push((id.clone(), content.to_string(), tags.to_vec()));
        Ok(Some(id))
    }
}
