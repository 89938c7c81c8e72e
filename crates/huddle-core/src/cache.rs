//! Query result cache owned by one [`crate::client::ApiClient`].
//!
//! Entries are keyed by endpoint plus the canonical JSON of the call's
//! arguments. Mutations invalidate the entries they make stale; nothing is
//! refetched behind the caller's back.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serde::Serialize;
use serde_json::Value;

use crate::endpoints::Endpoint;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub endpoint: Endpoint,
    pub args: String,
}

impl CacheKey {
    /// Key for an endpoint called without arguments.
    pub fn bare(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            args: String::new(),
        }
    }

    /// Key for an endpoint called with serializable arguments.
    pub fn with_args(endpoint: Endpoint, args: &impl Serialize) -> Self {
        // serde_json::Value objects are BTreeMap-backed, so keys come out sorted.
        let args = serde_json::to_value(args)
            .map(|v| v.to_string())
            .unwrap_or_default();
        Self { endpoint, args }
    }
}

#[derive(Debug)]
struct Entry {
    value: Value,
    stored_at: Instant,
}

#[derive(Debug, Default)]
pub struct RequestCache {
    ttl: Option<Duration>,
    entries: Mutex<HashMap<CacheKey, Entry>>,
}

impl RequestCache {
    /// `ttl` of None keeps entries until invalidated.
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<CacheKey, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns a fresh entry. Stale entries are dropped on the way.
    pub fn get(&self, key: &CacheKey) -> Option<Value> {
        let mut entries = self.entries();
        let fresh = match (entries.get(key), self.ttl) {
            (None, _) => return None,
            (Some(_), None) => true,
            (Some(entry), Some(ttl)) => entry.stored_at.elapsed() < ttl,
        };
        if fresh {
            entries.get(key).map(|entry| entry.value.clone())
        } else {
            entries.remove(key);
            None
        }
    }

    pub fn insert(&self, key: CacheKey, value: Value) {
        self.entries().insert(
            key,
            Entry {
                value,
                stored_at: Instant::now(),
            },
        );
    }

    /// Drops every entry for `endpoint`, whatever its arguments.
    pub fn invalidate(&self, endpoint: Endpoint) {
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|key, _| key.endpoint != endpoint);
        let dropped = before - entries.len();
        if dropped > 0 {
            tracing::debug!(endpoint = %endpoint, dropped, "invalidated cached queries");
        }
    }

    pub fn invalidate_key(&self, key: &CacheKey) {
        if self.entries().remove(key).is_some() {
            tracing::debug!(endpoint = %key.endpoint, args = %key.args, "invalidated cached query");
        }
    }

    pub fn clear(&self) {
        self.entries().clear();
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}
