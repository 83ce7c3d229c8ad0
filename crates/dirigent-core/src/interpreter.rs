//! The directive interpreter: pipeline and state-machine execution.
//!
//! All entry points convert failures into `SandboxExecutionResult` —
//! nothing here panics or returns `Err` across the public boundary.

use std::path::Path;
use std::time::{Duration, Instant};

use chrono::Utc;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::cache::operation_signature;
use crate::context::{ResourceLimits, SandboxContext};
use crate::directive::{
    Composition, Condition, ConditionOperator, Directive, DirectiveMetadata, ErrorPolicy,
    OrchestrationDirective, SandboxOperation, StateMachineDirective, StateTransition,
    TransitionOperation,
};
use crate::error::DirectiveError;
use crate::executor::DirectiveExecutor;
use crate::ops::{self, OperationKind};
use crate::result::{ExecutionMetadata, SandboxExecutionResult};

/// Implicit start state of every state machine.
const INITIAL_STATE: &str = "initial";

/// TTL for signature-derived operation cache entries.
const OPERATION_CACHE_TTL: Duration = Duration::from_secs(300);

/// TTL for full-directive cache entries.
const DIRECTIVE_CACHE_TTL: Duration = Duration::from_secs(300);

/// Execution bookkeeping accumulated while a directive runs.
#[derive(Default)]
struct Tracker {
    operations_executed: u32,
    cached_operations: Vec<String>,
}

impl DirectiveExecutor {
    /// Execute a directive given as raw JSON against `project_path`.
    ///
    /// Shape validation happens here: a malformed or unknown directive
    /// becomes a `{success: false, error, metadata}` result.
    pub async fn execute_directive(
        &self,
        directive: &Value,
        project_path: impl AsRef<Path>,
    ) -> SandboxExecutionResult {
        let started_at = Utc::now();
        let started = Instant::now();
        match Directive::parse(directive) {
            Ok(parsed) => self.execute(&parsed, project_path).await,
            Err(e) => {
                warn!(error = %e, "rejecting malformed directive");
                SandboxExecutionResult::failed(
                    e.to_string(),
                    ExecutionMetadata {
                        execution_time_ms: started.elapsed().as_millis() as u64,
                        operations_executed: 0,
                        cached_operations: Vec::new(),
                        peak_memory: None,
                        started_at,
                    },
                )
            }
        }
    }

    /// Execute an already-validated directive against `project_path`.
    #[instrument(skip_all, fields(execution_id = %Uuid::new_v4()))]
    pub async fn execute(
        &self,
        directive: &Directive,
        project_path: impl AsRef<Path>,
    ) -> SandboxExecutionResult {
        let started_at = Utc::now();
        let started = Instant::now();

        let limits = ResourceLimits::from(&self.config.sandbox);
        let mut ctx = SandboxContext::new(project_path.as_ref(), limits);
        let mut tracker = Tracker::default();

        // Full-directive cache short-circuit.
        let cache_key = directive_cache_key(directive);
        if let Some(key) = &cache_key {
            if let Some(data) = self.op_cache.get(key) {
                info!("serving directive result from cache");
                return SandboxExecutionResult {
                    success: true,
                    data: Some(data),
                    error: None,
                    metadata: ExecutionMetadata {
                        execution_time_ms: started.elapsed().as_millis() as u64,
                        operations_executed: 0,
                        cached_operations: vec![key.clone()],
                        peak_memory: None,
                        started_at,
                    },
                };
            }
        }

        let budget = Duration::from_millis(ctx.limits.timeout_ms.max(1));
        let outcome = tokio::time::timeout(
            budget,
            self.run_directive(directive, &mut ctx, &mut tracker),
        )
        .await;

        let metadata = ExecutionMetadata {
            execution_time_ms: started.elapsed().as_millis() as u64,
            operations_executed: tracker.operations_executed,
            cached_operations: tracker.cached_operations,
            peak_memory: None,
            started_at,
        };

        match outcome {
            Ok(Ok(data)) => {
                if let Some(key) = cache_key {
                    self.op_cache
                        .put(key, data.clone(), Some(DIRECTIVE_CACHE_TTL));
                }
                SandboxExecutionResult::completed(data, metadata)
            }
            Ok(Err(e)) => {
                warn!(error = %e, "directive failed");
                SandboxExecutionResult::failed(e.to_string(), metadata)
            }
            Err(_elapsed) => {
                warn!(timeout_ms = ctx.limits.timeout_ms, "directive timed out");
                SandboxExecutionResult::failed(
                    DirectiveError::Timeout {
                        limit_ms: ctx.limits.timeout_ms,
                    }
                    .to_string(),
                    metadata,
                )
            }
        }
    }

    async fn run_directive(
        &self,
        directive: &Directive,
        ctx: &mut SandboxContext,
        tracker: &mut Tracker,
    ) -> Result<Value, DirectiveError> {
        match directive {
            Directive::Orchestration(d) => self.run_pipeline(d, ctx, tracker).await,
            Directive::StateMachine(d) => self.run_state_machine(d, ctx, tracker).await,
        }
    }

    /// Run an orchestration pipeline: operations in strict array order,
    /// condition gating, store/return handling, then composition.
    async fn run_pipeline(
        &self,
        directive: &OrchestrationDirective,
        ctx: &mut SandboxContext,
        tracker: &mut Tracker,
    ) -> Result<Value, DirectiveError> {
        debug!(
            tool = %directive.tool,
            operations = directive.operations.len(),
            "running orchestration pipeline"
        );

        for operation in &directive.operations {
            if let Some(condition) = &operation.condition {
                if !condition_holds(condition, &ctx.state) {
                    debug!(op = %operation.op, key = %condition.key, "condition not met; skipping");
                    continue;
                }
            }

            let value = self.execute_operation(operation, ctx, tracker).await?;
            if let Some(store) = &operation.store {
                ctx.state.insert(store.clone(), value);
            }
            tracker.operations_executed += 1;

            if operation.return_early {
                debug!(op = %operation.op, "early return requested; stopping pipeline");
                break;
            }
        }

        Ok(match &directive.compose {
            Some(compose) => compose_sections(compose, &ctx.state),
            None => ctx.state_value(),
        })
    }

    /// Drive a state machine from the implicit `"initial"` state to
    /// `final_state`, applying each transition's error policy.
    async fn run_state_machine(
        &self,
        directive: &StateMachineDirective,
        ctx: &mut SandboxContext,
        tracker: &mut Tracker,
    ) -> Result<Value, DirectiveError> {
        for (key, value) in &directive.initial_state {
            ctx.state.insert(key.clone(), value.clone());
        }

        let mut current = INITIAL_STATE.to_string();
        while current != directive.final_state {
            let transition = directive
                .transitions
                .iter()
                .find(|t| t.from == current)
                .ok_or_else(|| DirectiveError::NoTransitionFound {
                    state: current.clone(),
                })?;
            debug!(
                transition = %transition.name,
                from = %current,
                to = %transition.next_state,
                "applying transition"
            );

            let mut outcome = self.run_transition_operation(transition, ctx, tracker).await;
            if transition.on_error == ErrorPolicy::Retry {
                let retries = transition.max_retries.unwrap_or(1);
                let mut attempt = 0;
                while outcome.is_err() && attempt < retries {
                    attempt += 1;
                    if let Err(e) = &outcome {
                        warn!(
                            transition = %transition.name,
                            attempt,
                            error = %e,
                            "transition failed; retrying"
                        );
                    }
                    outcome = self.run_transition_operation(transition, ctx, tracker).await;
                }
            }

            match outcome {
                Ok(stored) => {
                    if let Some((key, value)) = stored {
                        ctx.state.insert(key, value);
                    }
                    tracker.operations_executed += 1;
                    current = transition.next_state.clone();
                }
                Err(e) => match transition.on_error {
                    ErrorPolicy::Skip => {
                        debug!(
                            transition = %transition.name,
                            error = %e,
                            "transition failed; advancing per skip policy"
                        );
                        current = transition.next_state.clone();
                    }
                    // Abort, or retry budget exhausted.
                    _ => return Err(e),
                },
            }
        }

        Ok(ctx.state_value())
    }

    /// Resolve and run one transition operation. Successful inline
    /// operations yield their optional `(store, value)` pair; string
    /// references always fail (resolution is an external collaborator).
    async fn run_transition_operation(
        &self,
        transition: &StateTransition,
        ctx: &mut SandboxContext,
        tracker: &mut Tracker,
    ) -> Result<Option<(String, Value)>, DirectiveError> {
        match &transition.operation {
            TransitionOperation::Inline(operation) => {
                let value = self.execute_operation(operation, ctx, tracker).await?;
                Ok(operation.store.clone().map(|key| (key, value)))
            }
            TransitionOperation::Named(name) => Err(DirectiveError::OperationFailed {
                op: name.clone(),
                reason: "named operation references cannot be resolved in this runtime".to_string(),
            }),
        }
    }

    /// Dispatch one operation: cache consult, input resolution, handler
    /// call, cache populate.
    async fn execute_operation(
        &self,
        operation: &SandboxOperation,
        ctx: &SandboxContext,
        tracker: &mut Tracker,
    ) -> Result<Value, DirectiveError> {
        // Yield between operations so the directive-level timeout can fire
        // even when every handler completes without awaiting.
        tokio::task::yield_now().await;

        let kind =
            OperationKind::parse(&operation.op).ok_or_else(|| DirectiveError::UnknownOperation {
                op: operation.op.clone(),
            })?;

        let signature = kind.cache_eligible().then(|| {
            operation_signature(
                &operation.op,
                &operation.args,
                kind.path_scoped().then_some(ctx.project_path.as_path()),
            )
        });
        if let Some(sig) = &signature {
            if let Some(hit) = self.op_cache.get(sig) {
                debug!(op = %operation.op, "operation served from cache");
                tracker.cached_operations.push(
                    operation
                        .store
                        .clone()
                        .unwrap_or_else(|| operation.op.clone()),
                );
                return Ok(hit);
            }
        }

        let input = operation
            .input
            .as_ref()
            .and_then(|key| ctx.state.get(key).cloned());
        let inputs: Vec<(String, Value)> = operation
            .inputs
            .iter()
            .flatten()
            .map(|key| {
                (
                    key.clone(),
                    ctx.state.get(key).cloned().unwrap_or(Value::Null),
                )
            })
            .collect();

        let result = match kind {
            OperationKind::LoadKnowledge => {
                ops::knowledge::load_knowledge(self.catalog.as_ref(), &operation.args).await
            }
            OperationKind::LoadPrompt => {
                ops::knowledge::load_prompt(
                    self.catalog.as_ref(),
                    &self.prompt_cache,
                    &self.config.prompts,
                    &operation.args,
                )
                .await
            }
            OperationKind::AnalyzeFiles => {
                ops::files::analyze_files(&self.queue, ctx, &operation.args).await
            }
            OperationKind::ScanEnvironment => ops::files::scan_environment(ctx).await,
            OperationKind::GenerateContext => {
                Ok(ops::compose::generate_context(&operation.args, &inputs))
            }
            OperationKind::ComposeResult => {
                Ok(ops::compose::compose_result(&operation.args, &ctx.state))
            }
            OperationKind::ValidateOutput => Ok(ops::compose::validate_output(input.as_ref())),
            OperationKind::CacheResult => Ok(ops::cache_ops::cache_result(
                &self.op_cache,
                &operation.args,
                input.as_ref(),
            )),
            OperationKind::RetrieveCache => {
                Ok(ops::cache_ops::retrieve_cache(&self.op_cache, &operation.args))
            }
        }?;

        if let Some(sig) = signature {
            self.op_cache
                .put(sig, result.clone(), Some(OPERATION_CACHE_TTL));
        }
        Ok(result)
    }
}

/// Evaluate an operation's condition against the state store.
fn condition_holds(condition: &Condition, state: &IndexMap<String, Value>) -> bool {
    let current = state.get(&condition.key);
    match condition.operator {
        ConditionOperator::Exists => current.is_some(),
        ConditionOperator::Equals => match (current, &condition.value) {
            (Some(actual), Some(expected)) => actual == expected,
            (Some(actual), None) => actual.is_null(),
            (None, _) => false,
        },
        ConditionOperator::Contains => match (current, &condition.value) {
            (Some(Value::Array(items)), Some(needle)) => items.contains(needle),
            (Some(Value::String(haystack)), Some(Value::String(needle))) => {
                haystack.contains(needle.as_str())
            }
            (Some(Value::Object(map)), Some(Value::String(key))) => map.contains_key(key),
            _ => false,
        },
        ConditionOperator::Truthy => matches!(current, Some(value) if value_truthy(value)),
    }
}

/// JavaScript-style truthiness over JSON values, extended to collections:
/// empty arrays and objects are falsy.
fn value_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Build the final `data` object from composition sections.
fn compose_sections(compose: &Composition, state: &IndexMap<String, Value>) -> Value {
    let mut data = Map::new();
    for section in &compose.sections {
        let source = state.get(&section.source).cloned().unwrap_or(Value::Null);
        data.insert(
            section.key.clone(),
            ops::compose::apply_transform(section.transform, &source),
        );
    }
    data.insert(
        "template".to_string(),
        Value::String(compose.template.clone()),
    );
    if let Some(format) = compose.format {
        if let Ok(tag) = serde_json::to_value(format) {
            data.insert("format".to_string(), tag);
        }
    }
    Value::Object(data)
}

/// Cache key for a cacheable orchestration directive: the explicit
/// `cacheKey` when given, otherwise a content signature of the directive.
fn directive_cache_key(directive: &Directive) -> Option<String> {
    let Directive::Orchestration(d) = directive else {
        return None;
    };
    let meta = d.metadata.as_ref()?;
    if !meta.cacheable {
        return None;
    }
    Some(derived_directive_key(d, meta))
}

fn derived_directive_key(d: &OrchestrationDirective, meta: &DirectiveMetadata) -> String {
    match &meta.cache_key {
        Some(key) => format!("directive:{key}"),
        None => {
            let encoded = serde_json::to_vec(d).unwrap_or_default();
            let mut hasher = Sha256::new();
            hasher.update(&encoded);
            format!("directive:{}", hex::encode(hasher.finalize()))
        }
    }
}
