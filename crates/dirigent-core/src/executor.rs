//! The runtime instance: caches, queue, catalog, and configuration, plus
//! the process-wide singleton accessor.
//!
//! A `DirectiveExecutor` outlives individual directive executions; its
//! caches and queue are shared across concurrent calls. The singleton is
//! an explicit lock-guarded global with a reset hook for tests — config is
//! honored only on the call that first creates the instance.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use opqueue::{OperationQueue, QueueConfig, QueueStats};

use crate::cache::{CacheStats, TtlCache};
use crate::catalog::{Catalog, StaticCatalog};
use crate::config::{RuntimeConfig, RuntimeConfigOverlay};

/// Per-cache statistics for both runtime caches.
#[derive(Debug, Clone, Serialize)]
pub struct RuntimeCacheStats {
    pub operations: CacheStats,
    pub prompts: CacheStats,
}

/// The directive runtime: interpreter services scoped to one instance.
pub struct DirectiveExecutor {
    pub(crate) config: RuntimeConfig,
    pub(crate) catalog: Arc<dyn Catalog>,
    pub(crate) op_cache: TtlCache,
    pub(crate) prompt_cache: TtlCache,
    pub(crate) queue: OperationQueue,
}

impl DirectiveExecutor {
    /// Build an executor with the built-in catalog.
    pub fn new(config: RuntimeConfig) -> Self {
        Self::with_catalog(config, Arc::new(StaticCatalog::builtin()))
    }

    /// Build an executor with a caller-supplied catalog collaborator.
    pub fn with_catalog(config: RuntimeConfig, catalog: Arc<dyn Catalog>) -> Self {
        let queue = OperationQueue::new(QueueConfig {
            max_concurrency: 8,
            max_queue_size: 256,
            operation_timeout: Duration::from_secs(10),
        })
        .expect("built-in queue configuration is valid");

        Self {
            config,
            catalog,
            op_cache: TtlCache::new(),
            prompt_cache: TtlCache::new(),
            queue,
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Entry counts and hit/miss counters for both caches.
    pub fn cache_stats(&self) -> RuntimeCacheStats {
        RuntimeCacheStats {
            operations: self.op_cache.stats(),
            prompts: self.prompt_cache.stats(),
        }
    }

    pub fn clear_caches(&self) {
        self.op_cache.clear();
        self.prompt_cache.clear();
    }

    /// Activity snapshot of the internal operation queue.
    pub fn queue_stats(&self) -> QueueStats {
        self.queue.stats()
    }
}

static EXECUTOR: Mutex<Option<Arc<DirectiveExecutor>>> = Mutex::new(None);

/// Process-wide executor instance.
///
/// The configuration overlay is honored only on the call that first
/// creates the singleton; later calls before a [`reset_executor`] silently
/// ignore new config.
pub fn executor(config: Option<RuntimeConfigOverlay>) -> Arc<DirectiveExecutor> {
    let mut guard = EXECUTOR.lock().expect("executor lock poisoned");
    if let Some(existing) = guard.as_ref() {
        if config.is_some() {
            debug!("executor already initialized; ignoring new configuration");
        }
        return Arc::clone(existing);
    }

    let config = config
        .map(RuntimeConfigOverlay::into_config)
        .unwrap_or_default();
    let instance = Arc::new(DirectiveExecutor::new(config));
    *guard = Some(Arc::clone(&instance));
    instance
}

/// Drop the process-wide instance so the next [`executor`] call creates a
/// fresh one. Exposed for tests.
pub fn reset_executor() {
    EXECUTOR
        .lock()
        .expect("executor lock poisoned")
        .take();
}
