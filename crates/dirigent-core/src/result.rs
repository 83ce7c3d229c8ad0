//! Execution result types returned across the public boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Uniform result of one directive execution.
///
/// `error` is present exactly when `success` is false; the interpreter
/// never propagates an `Err` or panic across this boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SandboxExecutionResult {
    pub success: bool,
    /// Final state or composed object (present on success).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub metadata: ExecutionMetadata,
}

impl SandboxExecutionResult {
    pub fn completed(data: Value, metadata: ExecutionMetadata) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            metadata,
        }
    }

    pub fn failed(error: impl Into<String>, metadata: ExecutionMetadata) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            metadata,
        }
    }
}

/// Bookkeeping gathered while a directive runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionMetadata {
    pub execution_time_ms: u64,
    /// Operations that completed before termination; skipped (condition
    /// not met) and failing operations are not counted.
    pub operations_executed: u32,
    /// Store keys whose values were served from the operation cache.
    #[serde(default)]
    pub cached_operations: Vec<String>,
    /// Best-effort peak memory, when the platform reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peak_memory: Option<u64>,
    pub started_at: DateTime<Utc>,
}
