//! State-machine directive tests: transition lookup, error policies, and
//! termination.

use serde_json::{json, Value};

use dirigent_core::{DirectiveExecutor, RuntimeConfig, RuntimeConfigOverlay};

fn executor() -> DirectiveExecutor {
    DirectiveExecutor::new(RuntimeConfig::default())
}

async fn run(directive: Value) -> dirigent_core::SandboxExecutionResult {
    let dir = tempfile::tempdir().expect("tempdir");
    executor().execute_directive(&directive, dir.path()).await
}

#[tokio::test]
async fn test_single_transition_to_final_state() {
    let result = run(json!({
        "type": "stateMachine",
        "initialState": {"attempt": 1},
        "transitions": [
            {
                "name": "finish",
                "from": "initial",
                "operation": {"op": "validateOutput", "input": "attempt", "store": "check"},
                "nextState": "final"
            }
        ],
        "finalState": "final"
    }))
    .await;

    assert!(result.success, "error: {:?}", result.error);
    assert_eq!(result.metadata.operations_executed, 1);

    let data = result.data.expect("data");
    assert_eq!(data["attempt"], json!(1));
    assert_eq!(data["check"]["valid"], json!(true));
}

#[tokio::test]
async fn test_multi_step_machine_threads_state() {
    let result = run(json!({
        "type": "stateMachine",
        "transitions": [
            {
                "name": "gather",
                "from": "initial",
                "operation": {"op": "generateContext", "args": {"type": "gathered"}, "store": "ctx"},
                "nextState": "validating"
            },
            {
                "name": "validate",
                "from": "validating",
                "operation": {"op": "validateOutput", "input": "ctx", "store": "check"},
                "nextState": "done"
            }
        ],
        "finalState": "done"
    }))
    .await;

    assert!(result.success);
    assert_eq!(result.metadata.operations_executed, 2);
    let data = result.data.expect("data");
    assert_eq!(data["ctx"]["type"], json!("gathered"));
    assert_eq!(data["check"]["valid"], json!(true));
}

#[tokio::test]
async fn test_no_transition_found_names_state() {
    let result = run(json!({
        "type": "stateMachine",
        "transitions": [
            {
                "name": "step",
                "from": "initial",
                "operation": {"op": "composeResult"},
                "nextState": "stranded"
            }
        ],
        "finalState": "done"
    }))
    .await;

    assert!(!result.success);
    let error = result.error.expect("error");
    assert!(error.contains("No transition found"), "got: {error}");
    assert!(error.contains("stranded"), "got: {error}");
    assert_eq!(result.metadata.operations_executed, 1);
}

#[tokio::test]
async fn test_abort_policy_stops_machine() {
    let result = run(json!({
        "type": "stateMachine",
        "transitions": [
            {
                "name": "failing",
                "from": "initial",
                "operation": {"op": "loadPrompt"},
                "nextState": "done",
                "onError": "abort"
            }
        ],
        "finalState": "done"
    }))
    .await;

    assert!(!result.success);
    assert!(result.error.is_some());
    assert_eq!(result.metadata.operations_executed, 0);
}

#[tokio::test]
async fn test_abort_is_the_default_policy() {
    let result = run(json!({
        "type": "stateMachine",
        "transitions": [
            {
                "name": "failing",
                "from": "initial",
                "operation": {"op": "doesNotExist"},
                "nextState": "done"
            }
        ],
        "finalState": "done"
    }))
    .await;

    assert!(!result.success);
    assert!(result.error.expect("error").contains("Unknown operation"));
}

#[tokio::test]
async fn test_skip_policy_advances_without_store() {
    let result = run(json!({
        "type": "stateMachine",
        "initialState": {"seed": true},
        "transitions": [
            {
                "name": "failing",
                "from": "initial",
                "operation": {"op": "loadPrompt", "store": "prompt"},
                "nextState": "done",
                "onError": "skip"
            }
        ],
        "finalState": "done"
    }))
    .await;

    assert!(result.success, "skip must tolerate the failure");
    let data = result.data.expect("data");
    assert!(data.get("prompt").is_none(), "skip must not populate store");
    assert_eq!(data["seed"], json!(true));
}

#[tokio::test]
async fn test_retry_policy_exhausts_then_aborts() {
    // loadPrompt without a name fails deterministically, so every retry
    // fails and the machine aborts once the budget is exhausted.
    let result = run(json!({
        "type": "stateMachine",
        "transitions": [
            {
                "name": "retrying",
                "from": "initial",
                "operation": {"op": "loadPrompt"},
                "nextState": "done",
                "onError": "retry",
                "maxRetries": 3
            }
        ],
        "finalState": "done"
    }))
    .await;

    assert!(!result.success);
    assert!(result
        .error
        .expect("error")
        .contains("requires \"name\" argument"));
    assert_eq!(result.metadata.operations_executed, 0);
}

#[tokio::test]
async fn test_string_operation_reference_always_fails() {
    let result = run(json!({
        "type": "stateMachine",
        "transitions": [
            {
                "name": "external",
                "from": "initial",
                "operation": "resolveViaRegistry",
                "nextState": "done"
            }
        ],
        "finalState": "done"
    }))
    .await;

    assert!(!result.success);
    let error = result.error.expect("error");
    assert!(error.contains("resolveViaRegistry"), "got: {error}");
    assert!(error.contains("cannot be resolved"), "got: {error}");
}

#[tokio::test]
async fn test_string_reference_with_skip_still_advances() {
    let result = run(json!({
        "type": "stateMachine",
        "transitions": [
            {
                "name": "external",
                "from": "initial",
                "operation": "resolveViaRegistry",
                "nextState": "done",
                "onError": "skip"
            }
        ],
        "finalState": "done"
    }))
    .await;

    assert!(result.success, "skip applies to resolution failures too");
}

#[tokio::test]
async fn test_cyclic_machine_is_bounded_by_timeout() {
    let overlay: RuntimeConfigOverlay =
        serde_json::from_value(json!({"sandbox": {"timeout": 100}})).expect("valid overlay");
    let exec = DirectiveExecutor::new(overlay.into_config());
    let dir = tempfile::tempdir().expect("tempdir");

    let result = exec
        .execute_directive(
            &json!({
                "type": "stateMachine",
                "transitions": [
                    {
                        "name": "ping",
                        "from": "initial",
                        "operation": {"op": "composeResult"},
                        "nextState": "pong"
                    },
                    {
                        "name": "pong",
                        "from": "pong",
                        "operation": {"op": "composeResult"},
                        "nextState": "initial"
                    }
                ],
                "finalState": "never"
            }),
            dir.path(),
        )
        .await;

    assert!(!result.success);
    assert!(result.error.expect("error").contains("timed out"));
}

#[tokio::test]
async fn test_initial_state_seeds_the_store() {
    let result = run(json!({
        "type": "stateMachine",
        "initialState": {"config": {"depth": 2}, "label": "seeded"},
        "transitions": [
            {
                "name": "noop",
                "from": "initial",
                "operation": {"op": "validateOutput", "input": "config", "store": "check"},
                "nextState": "done"
            }
        ],
        "finalState": "done"
    }))
    .await;

    let data = result.data.expect("data");
    assert_eq!(data["label"], json!("seeded"));
    assert_eq!(data["config"]["depth"], json!(2));
    assert_eq!(data["check"]["valid"], json!(true));
}
