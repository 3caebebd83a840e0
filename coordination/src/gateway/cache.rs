//! Best-effort response cache consulted when the fallback chain is exhausted.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::roles::Pool;

/// Cache key for a prompt in a pool.
pub fn cache_key(pool: Pool, prompt: &str) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(pool.as_str().as_bytes());
    hasher.update(b"\0");
    hasher.update(prompt.as_bytes());
    hasher.finalize().to_hex().to_string()
}

/// Cache seam. Lookups and writes must never fail the caller; an
/// implementation that cannot reach its store returns `None` / drops the write.
#[async_trait]
pub trait ResponseCache: Send + Sync {
    async fn get(&self, key: &str) -> Option<String>;
    async fn put(&self, key: &str, content: &str);
}

struct CacheEntry {
    content: String,
    stored_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, ttl: Duration) -> bool {
        self.stored_at.elapsed() >= ttl
    }
}

/// Process-local cache with a time-to-live. Expired entries are dropped on
/// lookup and swept on every write, so the map holds live entries only.
pub struct InMemoryResponseCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
}

impl InMemoryResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryResponseCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(3600))
    }
}

#[async_trait]
impl ResponseCache for InMemoryResponseCache {
    async fn get(&self, key: &str) -> Option<String> {
        let mut entries = self.entries.write().ok()?;
        if entries.get(key)?.is_expired(self.ttl) {
            entries.remove(key);
            return None;
        }
        entries.get(key).map(|entry| entry.content.clone())
    }

    async fn put(&self, key: &str, content: &str) {
        if let Ok(mut entries) = self.entries.write() {
            let ttl = self.ttl;
            entries.retain(|_, entry| !entry.is_expired(ttl));
            entries.insert(
                key.to_string(),
                CacheEntry {
                    content: content.to_string(),
                    stored_at: Instant::now(),
                },
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_depends_on_pool_and_prompt() {
        let a = cache_key(Pool::Fast, "hello");
        assert_eq!(a, cache_key(Pool::Fast, "hello"));
        assert_ne!(a, cache_key(Pool::Heavy, "hello"));
        assert_ne!(a, cache_key(Pool::Fast, "hello!"));
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let cache = InMemoryResponseCache::default();
        assert!(cache.is_empty());
        cache.put("k", "v").await;
        assert_eq!(cache.get("k").await.as_deref(), Some("v"));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_expired_entry_is_ignored() {
        let cache = InMemoryResponseCache::new(Duration::ZERO);
        cache.put("k", "v").await;
        assert!(cache.get("k").await.is_none());
    }

    #[tokio::test]
    async fn test_expired_entries_are_evicted() {
        let cache = InMemoryResponseCache::new(Duration::ZERO);
        cache.put("a", "1").await;
        cache.put("b", "2").await;
        // "a" was swept by the second write.
        assert_eq!(cache.len(), 1);
        assert!(cache.get("b").await.is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_live_entries_survive_sweep() {
        let cache = InMemoryResponseCache::new(Duration::from_secs(600));
        cache.put("a", "1").await;
        cache.put("b", "2").await;
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("a").await.as_deref(), Some("1"));
    }
}
