//! Runtime configuration with nested-partial overrides.
//!
//! Callers supply an overlay where every field is optional; the overlay is
//! merged over the built-in defaults field by field, so overriding
//! `sandbox.timeout` cannot erase unrelated `prompts`/`fallback` defaults.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Sandbox limits applied to each directive execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SandboxSettings {
    pub enabled: bool,
    /// Whole-directive timeout in milliseconds.
    pub timeout: u64,
    /// Surfaced configuration; not enforced preemption.
    pub memory_limit: u64,
    pub fs_operations_limit: u32,
    /// Never enabled implicitly; an overlay must set it explicitly.
    pub network_allowed: bool,
}

impl Default for SandboxSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout: 30_000,
            memory_limit: 256 * 1024 * 1024,
            fs_operations_limit: 1_000,
            network_allowed: false,
        }
    }
}

/// Prompt catalog behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PromptSettings {
    pub lazy_loading: bool,
    pub cache_enabled: bool,
    /// Prompt cache TTL in seconds.
    #[serde(rename = "cacheTTL")]
    pub cache_ttl: u64,
}

impl Default for PromptSettings {
    fn default() -> Self {
        Self {
            lazy_loading: true,
            cache_enabled: true,
            cache_ttl: 3_600,
        }
    }
}

/// Fallback-mode settings, surfaced for the host system; this core does
/// not execute fallback calls itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FallbackSettings {
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub max_retries: u32,
}

impl Default for FallbackSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: None,
            model: None,
            max_retries: 2,
        }
    }
}

/// Full runtime configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RuntimeConfig {
    pub sandbox: SandboxSettings,
    pub prompts: PromptSettings,
    pub fallback: FallbackSettings,
}

/// How the host system routes a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    #[default]
    Directive,
    Hybrid,
    Legacy,
    Fallback,
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExecutionMode::Directive => "directive",
            ExecutionMode::Hybrid => "hybrid",
            ExecutionMode::Legacy => "legacy",
            ExecutionMode::Fallback => "fallback",
        };
        f.write_str(name)
    }
}

impl FromStr for ExecutionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "directive" => Ok(ExecutionMode::Directive),
            "hybrid" => Ok(ExecutionMode::Hybrid),
            "legacy" => Ok(ExecutionMode::Legacy),
            "fallback" => Ok(ExecutionMode::Fallback),
            other => Err(format!(
                "unknown execution mode '{other}' (expected directive|hybrid|legacy|fallback)"
            )),
        }
    }
}

/// Partial override of [`SandboxSettings`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SandboxOverlay {
    pub enabled: Option<bool>,
    pub timeout: Option<u64>,
    pub memory_limit: Option<u64>,
    pub fs_operations_limit: Option<u32>,
    pub network_allowed: Option<bool>,
}

/// Partial override of [`PromptSettings`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PromptOverlay {
    pub lazy_loading: Option<bool>,
    pub cache_enabled: Option<bool>,
    #[serde(rename = "cacheTTL")]
    pub cache_ttl: Option<u64>,
}

/// Partial override of [`FallbackSettings`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FallbackOverlay {
    pub enabled: Option<bool>,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub max_retries: Option<u32>,
}

/// Nested-partial configuration override, merged over defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RuntimeConfigOverlay {
    pub sandbox: Option<SandboxOverlay>,
    pub prompts: Option<PromptOverlay>,
    pub fallback: Option<FallbackOverlay>,
}

impl RuntimeConfigOverlay {
    /// Merge this overlay over `base`, field by field.
    pub fn apply(self, mut base: RuntimeConfig) -> RuntimeConfig {
        if let Some(sandbox) = self.sandbox {
            let s = &mut base.sandbox;
            if let Some(enabled) = sandbox.enabled {
                s.enabled = enabled;
            }
            if let Some(timeout) = sandbox.timeout {
                s.timeout = timeout;
            }
            if let Some(memory_limit) = sandbox.memory_limit {
                s.memory_limit = memory_limit;
            }
            if let Some(limit) = sandbox.fs_operations_limit {
                s.fs_operations_limit = limit;
            }
            if let Some(network_allowed) = sandbox.network_allowed {
                s.network_allowed = network_allowed;
            }
        }
        if let Some(prompts) = self.prompts {
            let p = &mut base.prompts;
            if let Some(lazy_loading) = prompts.lazy_loading {
                p.lazy_loading = lazy_loading;
            }
            if let Some(cache_enabled) = prompts.cache_enabled {
                p.cache_enabled = cache_enabled;
            }
            if let Some(cache_ttl) = prompts.cache_ttl {
                p.cache_ttl = cache_ttl;
            }
        }
        if let Some(fallback) = self.fallback {
            let f = &mut base.fallback;
            if let Some(enabled) = fallback.enabled {
                f.enabled = enabled;
            }
            if let Some(api_key) = fallback.api_key {
                f.api_key = Some(api_key);
            }
            if let Some(model) = fallback.model {
                f.model = Some(model);
            }
            if let Some(max_retries) = fallback.max_retries {
                f.max_retries = max_retries;
            }
        }
        base
    }

    /// Merge this overlay over the built-in defaults.
    pub fn into_config(self) -> RuntimeConfig {
        self.apply(RuntimeConfig::default())
    }
}
