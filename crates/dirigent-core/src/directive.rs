//! Directive data model.
//!
//! A directive is a declarative description of work: either an
//! orchestration pipeline (ordered operations over a shared state store) or
//! an explicit state machine (named transitions between states). Directives
//! arrive as JSON from the host system; the wire format uses camelCase
//! field names.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::DirectiveError;

/// A declarative unit of work, discriminated by its `type` tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Directive {
    #[serde(rename = "orchestration")]
    Orchestration(OrchestrationDirective),
    #[serde(rename = "stateMachine")]
    StateMachine(StateMachineDirective),
}

impl Directive {
    /// Validate the shape of a raw JSON directive.
    ///
    /// The `type` tag is checked by hand so an unrecognized value reports
    /// `Unknown directive type: <value>` rather than a serde variant error.
    pub fn parse(value: &Value) -> Result<Self, DirectiveError> {
        let object = value
            .as_object()
            .ok_or_else(|| DirectiveError::Validation("directive must be a JSON object".into()))?;
        let tag = object
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| DirectiveError::Validation("directive is missing \"type\"".into()))?;

        match tag {
            "orchestration" => serde_json::from_value::<OrchestrationDirective>(value.clone())
                .map(Directive::Orchestration)
                .map_err(|e| DirectiveError::Validation(format!("orchestration directive: {e}"))),
            "stateMachine" => serde_json::from_value::<StateMachineDirective>(value.clone())
                .map(Directive::StateMachine)
                .map_err(|e| DirectiveError::Validation(format!("state machine directive: {e}"))),
            other => Err(DirectiveError::UnknownDirectiveType {
                found: other.to_string(),
            }),
        }
    }
}

/// A linear pipeline of operations executed in array order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestrationDirective {
    #[serde(default)]
    pub version: String,
    /// Name of the tool this directive implements.
    pub tool: String,
    #[serde(default)]
    pub description: String,
    pub operations: Vec<SandboxOperation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compose: Option<Composition>,
    /// Opaque schema blob, passed through unvalidated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<DirectiveMetadata>,
}

/// Execution hints attached to an orchestration directive.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectiveMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complexity: Option<String>,
    /// When true, repeated execution may be served from the directive cache.
    #[serde(default)]
    pub cacheable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_key: Option<String>,
}

/// One operation in a pipeline or state-machine transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SandboxOperation {
    /// Operation kind; resolved against the built-in set at dispatch time.
    pub op: String,
    #[serde(default)]
    pub args: Map<String, Value>,
    /// Destination key in the state store for the operation's result.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store: Option<String>,
    /// Single source key read from the state store.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
    /// Source keys for multi-input operations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inputs: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
    /// Stop the pipeline after this operation succeeds.
    #[serde(default, rename = "return")]
    pub return_early: bool,
}

/// Gate evaluated against the state store before an operation runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    pub key: String,
    pub operator: ConditionOperator,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConditionOperator {
    Exists,
    Equals,
    Contains,
    Truthy,
}

/// An explicit state machine driven by named transitions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateMachineDirective {
    #[serde(default)]
    pub version: String,
    /// Seed values merged into the state store before the first transition.
    #[serde(default)]
    pub initial_state: Map<String, Value>,
    pub transitions: Vec<StateTransition>,
    pub final_state: String,
}

/// One edge of the state machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateTransition {
    pub name: String,
    /// State name this transition applies from.
    pub from: String,
    pub operation: TransitionOperation,
    pub next_state: String,
    #[serde(default)]
    pub on_error: ErrorPolicy,
    /// Extra attempts when `on_error` is `retry`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
}

/// A transition's operation: inline, or a string reference to a named
/// operation. References require an external resolution collaborator and
/// always fail in this runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TransitionOperation {
    Inline(Box<SandboxOperation>),
    Named(String),
}

/// What to do when a transition's operation fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    Retry,
    Skip,
    #[default]
    Abort,
}

/// Reshapes accumulated state into the final result via named sections.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Composition {
    pub sections: Vec<CompositionSection>,
    /// Template name, passed through to the caller.
    pub template: String,
    /// Output format hint, passed through (not rendered by this core).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<ComposeFormat>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositionSection {
    /// State key to read.
    pub source: String,
    /// Destination key in the composed result.
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<Transform>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transform {
    Summarize,
    Extract,
    Format,
    Filter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComposeFormat {
    Json,
    Markdown,
    Text,
}
