//! Per-execution sandbox context: project path, resource limits, and the
//! state store. A context is created fresh for each `execute_directive`
//! call and owned exclusively by that call.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::config::SandboxSettings;

/// Resource limits applied to one directive execution.
///
/// `memory_limit_bytes` is surfaced configuration, not enforced preemption.
/// `network_allowed` defaults to false and is never enabled implicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceLimits {
    pub timeout_ms: u64,
    pub memory_limit_bytes: u64,
    pub fs_operations_limit: u32,
    pub network_allowed: bool,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            memory_limit_bytes: 256 * 1024 * 1024,
            fs_operations_limit: 1_000,
            network_allowed: false,
        }
    }
}

impl From<&SandboxSettings> for ResourceLimits {
    fn from(settings: &SandboxSettings) -> Self {
        Self {
            timeout_ms: settings.timeout,
            memory_limit_bytes: settings.memory_limit,
            fs_operations_limit: settings.fs_operations_limit,
            network_allowed: settings.network_allowed,
        }
    }
}

/// Shared, atomically-charged budget for filesystem operations.
///
/// Handlers charge one unit per file read or directory listing; parallel
/// sub-tasks share the same counter via `Clone`.
#[derive(Debug, Clone)]
pub struct FsBudget {
    used: Arc<AtomicU32>,
    limit: u32,
}

impl FsBudget {
    pub fn new(limit: u32) -> Self {
        Self {
            used: Arc::new(AtomicU32::new(0)),
            limit,
        }
    }

    /// Charge one filesystem operation. Returns false once the budget is
    /// exhausted; callers truncate their work instead of failing the
    /// directive.
    pub fn charge(&self) -> bool {
        self.used.fetch_add(1, Ordering::Relaxed) < self.limit
    }

    pub fn used(&self) -> u32 {
        self.used.load(Ordering::Relaxed)
    }

    pub fn exhausted(&self) -> bool {
        self.used() >= self.limit
    }
}

/// The per-call sandbox: project location, limits, and the mutable state
/// store accumulated by pipeline operations.
#[derive(Debug)]
pub struct SandboxContext {
    pub project_path: PathBuf,
    pub working_dir: PathBuf,
    pub env: HashMap<String, String>,
    pub limits: ResourceLimits,
    /// Insertion-ordered key-value store; lifetime is one directive call.
    pub state: IndexMap<String, Value>,
    pub fs_budget: FsBudget,
}

impl SandboxContext {
    pub fn new(project_path: impl AsRef<Path>, limits: ResourceLimits) -> Self {
        let project_path = project_path.as_ref().to_path_buf();
        Self {
            working_dir: project_path.clone(),
            env: HashMap::new(),
            fs_budget: FsBudget::new(limits.fs_operations_limit),
            limits,
            project_path,
            state: IndexMap::new(),
        }
    }

    /// The full state store as a JSON object, in insertion order.
    pub fn state_value(&self) -> Value {
        let mut object = Map::new();
        for (key, value) in &self.state {
            object.insert(key.clone(), value.clone());
        }
        Value::Object(object)
    }
}
