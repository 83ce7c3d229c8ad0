//! Dirigent Core Library
//!
//! Sandboxed directive-execution runtime: interprets declarative
//! directives — linear operation pipelines and explicit state machines —
//! against nine built-in operations, under resource limits (time,
//! file-system operation count, no network), with per-operation and
//! per-directive result caching.
//!
//! ## Key Components
//!
//! - [`DirectiveExecutor`]: the runtime instance; `execute_directive` is
//!   the public entry point and never fails across its boundary
//! - [`directive`]: the directive data model (wire format: camelCase JSON)
//! - [`ops`]: the nine built-in operation handlers
//! - [`cache`]: TTL caches and operation signatures
//! - [`Catalog`]: the knowledge/prompt collaborator interface

pub mod cache;
pub mod catalog;
pub mod config;
pub mod context;
pub mod directive;
pub mod error;
mod executor;
mod interpreter;
pub mod ops;
pub mod result;
pub mod telemetry;

pub use cache::{operation_signature, CacheStats, TtlCache};
pub use catalog::{Catalog, CatalogEntry, PromptTemplate, StaticCatalog};
pub use config::{
    ExecutionMode, FallbackSettings, PromptSettings, RuntimeConfig, RuntimeConfigOverlay,
    SandboxSettings,
};
pub use context::{FsBudget, ResourceLimits, SandboxContext};
pub use directive::{
    ComposeFormat, Composition, CompositionSection, Condition, ConditionOperator, Directive,
    DirectiveMetadata, ErrorPolicy, OrchestrationDirective, SandboxOperation,
    StateMachineDirective, StateTransition, Transform, TransitionOperation,
};
pub use error::{DirectiveError, Result};
pub use executor::{executor, reset_executor, DirectiveExecutor, RuntimeCacheStats};
pub use result::{ExecutionMetadata, SandboxExecutionResult};
pub use telemetry::init_tracing;

/// Dirigent version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
