//! Explicit cache operations: `cacheResult` and `retrieveCache`.
//!
//! These manage operation-cache entries under a caller-chosen key. The key
//! namespace is prefixed so explicit entries can never collide with
//! signature-derived entries for cache-eligible operations.

use std::time::Duration;

use serde_json::{json, Map, Value};
use tracing::debug;

use crate::cache::TtlCache;

const EXPLICIT_PREFIX: &str = "explicit:";
const DEFAULT_TTL_SECS: u64 = 3_600;

/// `cacheResult`: store the resolved input value under `args.key` with an
/// optional TTL in seconds. A missing key is reported in the result, not
/// as a failure.
pub fn cache_result(cache: &TtlCache, args: &Map<String, Value>, input: Option<&Value>) -> Value {
    let Some(key) = args.get("key").and_then(Value::as_str) else {
        return json!({"cached": false, "reason": "missing \"key\" argument"});
    };
    let ttl = args
        .get("ttl")
        .and_then(Value::as_u64)
        .unwrap_or(DEFAULT_TTL_SECS);
    let value = input.cloned().unwrap_or(Value::Null);

    cache.put(
        format!("{EXPLICIT_PREFIX}{key}"),
        value,
        Some(Duration::from_secs(ttl)),
    );
    debug!(key, ttl, "explicit cache entry stored");
    json!({"cached": true, "key": key, "ttl": ttl})
}

/// `retrieveCache`: the value stored under `args.key`, or null when the
/// entry is absent or expired.
pub fn retrieve_cache(cache: &TtlCache, args: &Map<String, Value>) -> Value {
    match args.get("key").and_then(Value::as_str) {
        Some(key) => cache
            .get(&format!("{EXPLICIT_PREFIX}{key}"))
            .unwrap_or(Value::Null),
        None => Value::Null,
    }
}
