//! Response cache keyed by a hash of subject and canonical context.

use cake_core::{GeneratedResponse, ResponseContext, Subject};
use dashmap::DashMap;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct CacheEntry {
    response: GeneratedResponse,
    expires_at: Instant,
}

/// Concurrent key to (response, expiry) store.
///
/// Expired entries are purged when read. When the store is full, expired
/// entries are swept first and then the entry closest to expiry is evicted.
#[derive(Debug)]
pub struct ResponseCache {
    entries: DashMap<String, CacheEntry>,
    max_entries: usize,
}

impl ResponseCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            max_entries: max_entries.max(1),
        }
    }

    /// Deterministic key over the subject and the context with keys sorted.
    pub fn key_for(subject: Subject, context: &ResponseContext) -> String {
        let material = format!("{}:{}", subject, context.canonical_string());
        format!("cake:{}:{}", subject, utils::compute_content_hash(&material))
    }

    pub fn get(&self, key: &str) -> Option<GeneratedResponse> {
        let now = Instant::now();
        let expired = match self.entries.get(key) {
            Some(entry) if entry.expires_at > now => return Some(entry.response.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            self.entries.remove_if(key, |_, entry| entry.expires_at <= now);
            tracing::debug!(key = %key, "Purged expired cache entry");
        }
        None
    }

    pub fn put(&self, key: impl Into<String>, response: GeneratedResponse, ttl: Duration) {
        let key = key.into();
        let Some(expires_at) = Instant::now().checked_add(ttl) else {
            tracing::debug!(
                key = %key,
                ttl_secs = ttl.as_secs(),
                "Skipped caching, TTL out of range"
            );
            return;
        };
        if !self.entries.contains_key(&key) && self.entries.len() >= self.max_entries {
            self.make_room();
        }
        self.entries.insert(
            key,
            CacheEntry {
                response,
                expires_at,
            },
        );
    }

    pub fn clear(&self) -> usize {
        let removed = self.entries.len();
        self.entries.clear();
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.max_entries
    }

    fn make_room(&self) {
        let now = Instant::now();
        self.entries.retain(|_, entry| entry.expires_at > now);
        if self.entries.len() < self.max_entries {
            return;
        }

        let soonest = self
            .entries
            .iter()
            .min_by_key(|entry| entry.value().expires_at)
            .map(|entry| entry.key().clone());
        if let Some(key) = soonest {
            self.entries.remove(&key);
            tracing::debug!(key = %key, "Evicted cache entry to stay within capacity");
        }
    }
}
