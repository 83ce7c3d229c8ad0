//! Error taxonomy for directive execution.
//!
//! None of these cross the public `execute_directive` boundary as `Err`:
//! the interpreter converts every failure into a
//! `{success: false, error, metadata}` result. Messages name the operation
//! or transition and the reason, so callers can diagnose without inspecting
//! internal state.

/// Errors produced while validating or executing a directive.
#[derive(Debug, thiserror::Error)]
pub enum DirectiveError {
    #[error("Unknown directive type: {found}")]
    UnknownDirectiveType { found: String },

    #[error("Invalid directive: {0}")]
    Validation(String),

    #[error("Unknown operation: {op}")]
    UnknownOperation { op: String },

    #[error("{op} requires \"{arg}\" argument")]
    MissingArgument { op: String, arg: String },

    #[error("No transition found from state '{state}'")]
    NoTransitionFound { state: String },

    #[error("Operation '{op}' failed: {reason}")]
    OperationFailed { op: String, reason: String },

    #[error("Directive execution timed out after {limit_ms}ms")]
    Timeout { limit_ms: u64 },

    #[error("queue error: {0}")]
    Queue(#[from] opqueue::QueueError),
}

/// Result type for directive operations.
pub type Result<T> = std::result::Result<T, DirectiveError>;
