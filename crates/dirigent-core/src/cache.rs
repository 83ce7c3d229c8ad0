//! In-memory TTL caches and cache-key signatures.
//!
//! Two independent caches back the runtime: the operation cache (results of
//! cache-eligible operations plus explicit `cacheResult` entries) and the
//! prompt cache (loaded prompt templates). Both outlive individual
//! directive executions and are shared across concurrent calls; access is
//! mutex-guarded with no awaiting while locked.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Counters and live-entry count for one cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

struct CacheEntry {
    value: Value,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn expired(&self) -> bool {
        matches!(self.expires_at, Some(at) if Instant::now() >= at)
    }
}

/// Key-value cache with per-entry TTL expiry. Expired entries are treated
/// as absent and evicted lazily on access.
pub struct TtlCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Default for TtlCache {
    fn default() -> Self {
        Self::new()
    }
}

impl TtlCache {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Look up a live entry. Expired entries count as misses and are
    /// removed.
    pub fn get(&self, key: &str) -> Option<Value> {
        let mut entries = self.entries.lock().expect("cache lock poisoned");
        match entries.get(key) {
            Some(entry) if entry.expired() => {
                entries.remove(key);
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            Some(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.value.clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Insert or replace an entry. `ttl = None` means the entry never
    /// expires (until `clear`).
    pub fn put(&self, key: impl Into<String>, value: Value, ttl: Option<Duration>) {
        let entry = CacheEntry {
            value,
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        };
        self.entries
            .lock()
            .expect("cache lock poisoned")
            .insert(key.into(), entry);
    }

    /// Count of live (non-expired) entries.
    pub fn len(&self) -> usize {
        let entries = self.entries.lock().expect("cache lock poisoned");
        entries.values().filter(|e| !e.expired()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.lock().expect("cache lock poisoned").clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

/// Stable signature of (op, args) for operation-cache keys.
///
/// `serde_json::Map` keeps keys sorted, so serializing the args map yields
/// a canonical encoding. Filesystem-reading operations pass their project
/// path as a salt, because their results depend on project contents; other
/// operations share entries across projects.
pub fn operation_signature(op: &str, args: &Map<String, Value>, path_salt: Option<&Path>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(op.as_bytes());
    hasher.update(b"\0");
    hasher.update(Value::Object(args.clone()).to_string().as_bytes());
    if let Some(path) = path_salt {
        hasher.update(b"\0");
        hasher.update(path.to_string_lossy().as_bytes());
    }
    hex::encode(hasher.finalize())
}
