//! End-to-end orchestration pipeline tests through the public
//! `execute_directive` boundary.

use serde_json::{json, Value};

use dirigent_core::{DirectiveExecutor, RuntimeConfig};

fn executor() -> DirectiveExecutor {
    DirectiveExecutor::new(RuntimeConfig::default())
}

fn project() -> tempfile::TempDir {
    tempfile::tempdir().expect("tempdir")
}

async fn run(directive: Value) -> dirigent_core::SandboxExecutionResult {
    let dir = project();
    executor().execute_directive(&directive, dir.path()).await
}

#[tokio::test]
async fn test_pipeline_runs_operations_in_order() {
    let result = run(json!({
        "type": "orchestration",
        "tool": "demo",
        "operations": [
            {"op": "generateContext", "args": {"type": "first"}, "store": "a"},
            {"op": "validateOutput", "input": "a", "store": "b"},
            {"op": "composeResult", "store": "c"}
        ]
    }))
    .await;

    assert!(result.success, "error: {:?}", result.error);
    assert_eq!(result.metadata.operations_executed, 3);

    let data = result.data.expect("data");
    assert_eq!(data["a"]["type"], json!("first"));
    assert_eq!(data["b"]["valid"], json!(true));
    // composeResult sees keys stored before it, in insertion order.
    assert_eq!(data["c"]["keys"], json!(["a", "b"]));
}

#[tokio::test]
async fn test_return_early_halts_pipeline() {
    let result = run(json!({
        "type": "orchestration",
        "tool": "demo",
        "operations": [
            {"op": "generateContext", "args": {"type": "a"}, "store": "a", "return": true},
            {"op": "generateContext", "args": {"type": "b"}, "store": "b"}
        ]
    }))
    .await;

    assert!(result.success);
    assert_eq!(result.metadata.operations_executed, 1);

    let data = result.data.expect("data");
    assert_eq!(data["a"]["type"], json!("a"));
    assert!(data.get("b").is_none(), "operation after return ran");
}

#[tokio::test]
async fn test_condition_on_missing_key_skips_operation() {
    let result = run(json!({
        "type": "orchestration",
        "tool": "demo",
        "operations": [
            {
                "op": "generateContext",
                "store": "skipped",
                "condition": {"key": "missing", "operator": "exists"}
            },
            {"op": "generateContext", "args": {"type": "ran"}, "store": "ran"}
        ]
    }))
    .await;

    assert!(result.success);
    // Skipped operations are not counted as executed.
    assert_eq!(result.metadata.operations_executed, 1);

    let data = result.data.expect("data");
    assert!(data.get("skipped").is_none());
    assert_eq!(data["ran"]["type"], json!("ran"));
}

#[tokio::test]
async fn test_condition_operators_gate_execution() {
    let result = run(json!({
        "type": "orchestration",
        "tool": "demo",
        "operations": [
            {"op": "generateContext", "args": {"type": "seed"}, "store": "seed"},
            {
                "op": "generateContext", "args": {"type": "on-truthy"}, "store": "truthy",
                "condition": {"key": "seed", "operator": "truthy"}
            },
            {
                "op": "generateContext", "args": {"type": "on-equals"}, "store": "equals",
                "condition": {"key": "seed", "operator": "equals", "value": {"other": 1}}
            }
        ]
    }))
    .await;

    assert!(result.success);
    let data = result.data.expect("data");
    assert!(data.get("truthy").is_some(), "truthy condition must pass");
    assert!(data.get("equals").is_none(), "equals condition must fail");
    assert_eq!(result.metadata.operations_executed, 2);
}

#[tokio::test]
async fn test_unknown_directive_type_fails() {
    let result = run(json!({"type": "bogus"})).await;
    assert!(!result.success);
    let error = result.error.expect("error");
    assert!(error.contains("Unknown directive type"), "got: {error}");
    assert_eq!(result.metadata.operations_executed, 0);
}

#[tokio::test]
async fn test_unknown_operation_fails_directive() {
    let result = run(json!({
        "type": "orchestration",
        "tool": "demo",
        "operations": [
            {"op": "generateContext", "store": "a"},
            {"op": "doesNotExist"},
            {"op": "composeResult", "store": "never"}
        ]
    }))
    .await;

    assert!(!result.success);
    let error = result.error.expect("error");
    assert!(error.contains("Unknown operation"), "got: {error}");
    assert!(error.contains("doesNotExist"));
    // The failing operation is not counted.
    assert_eq!(result.metadata.operations_executed, 1);
}

#[tokio::test]
async fn test_missing_argument_fails_directive() {
    let result = run(json!({
        "type": "orchestration",
        "tool": "demo",
        "operations": [{"op": "loadPrompt"}]
    }))
    .await;

    assert!(!result.success);
    let error = result.error.expect("error");
    assert!(error.contains("requires \"name\" argument"), "got: {error}");
}

#[tokio::test]
async fn test_composition_reshapes_final_data() {
    let result = run(json!({
        "type": "orchestration",
        "tool": "demo",
        "operations": [
            {"op": "generateContext", "args": {"type": "ctx"}, "store": "context"},
            {"op": "loadKnowledge", "args": {"domain": "testing"}, "store": "knowledge"}
        ],
        "compose": {
            "template": "report",
            "format": "markdown",
            "sections": [
                {"source": "knowledge", "key": "domainInfo", "transform": "extract"},
                {"source": "context", "key": "raw"}
            ]
        }
    }))
    .await;

    assert!(result.success, "error: {:?}", result.error);
    let data = result.data.expect("data");
    assert_eq!(data["template"], json!("report"));
    assert_eq!(data["format"], json!("markdown"));
    // extract keeps only scalar fields of the knowledge object.
    assert_eq!(data["domainInfo"]["domain"], json!("testing"));
    assert!(data["domainInfo"].get("sections").is_none());
    assert_eq!(data["raw"]["type"], json!("ctx"));
    // With a composition, raw state keys are not leaked.
    assert!(data.get("context").is_none());
}

#[tokio::test]
async fn test_without_composition_data_is_full_state() {
    let result = run(json!({
        "type": "orchestration",
        "tool": "demo",
        "operations": [
            {"op": "generateContext", "args": {"type": "only"}, "store": "only"}
        ]
    }))
    .await;

    let data = result.data.expect("data");
    assert_eq!(
        data.as_object().expect("object").len(),
        1,
        "data must be exactly the accumulated state"
    );
}

#[tokio::test]
async fn test_operation_without_store_discards_result() {
    let result = run(json!({
        "type": "orchestration",
        "tool": "demo",
        "operations": [
            {"op": "generateContext", "args": {"type": "dropped"}}
        ]
    }))
    .await;

    assert!(result.success);
    assert_eq!(result.metadata.operations_executed, 1);
    assert_eq!(result.data, Some(json!({})));
}

#[tokio::test]
async fn test_validation_error_on_malformed_shape() {
    let result = run(json!({"type": "orchestration"})).await;
    assert!(!result.success);
    assert!(result.error.expect("error").contains("Invalid directive"));
}

#[tokio::test]
async fn test_metadata_reports_execution_time() {
    let result = run(json!({
        "type": "orchestration",
        "tool": "demo",
        "operations": [{"op": "composeResult", "store": "r"}]
    }))
    .await;

    assert!(result.success);
    assert!(result.metadata.cached_operations.is_empty());
    assert!(result.metadata.peak_memory.is_none());
    // Wall clock is tracked even for near-instant pipelines.
    assert!(result.metadata.execution_time_ms < 10_000);
}
