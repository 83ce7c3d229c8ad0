//! End-to-end project analysis: a realistic directive combining
//! environment scanning, file analysis, context generation, and
//! composition over a temporary project tree.

use std::fs;

use serde_json::json;

use dirigent_core::{DirectiveExecutor, RuntimeConfig, RuntimeConfigOverlay};

fn rust_project() -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::create_dir_all(dir.path().join("src/handlers")).expect("mkdir");
    fs::create_dir_all(dir.path().join("tests")).expect("mkdir");
    fs::create_dir_all(dir.path().join("node_modules/left-pad")).expect("mkdir");
    fs::create_dir_all(dir.path().join(".github/workflows")).expect("mkdir");

    fs::write(
        dir.path().join("Cargo.toml"),
        "[package]\nname = \"sample\"\nversion = \"0.1.0\"\n\n[dependencies]\nserde = \"1\"\n",
    )
    .expect("write");
    fs::write(dir.path().join("src/main.rs"), "fn main() {}").expect("write");
    fs::write(dir.path().join("src/handlers/http.rs"), "pub fn handle() {}").expect("write");
    fs::write(dir.path().join("tests/smoke.rs"), "#[test]\nfn ok() {}").expect("write");
    fs::write(dir.path().join("node_modules/left-pad/index.js"), "x").expect("write");
    fs::write(dir.path().join(".github/workflows/ci.yml"), "on: push").expect("write");
    dir
}

#[tokio::test]
async fn test_full_analysis_pipeline() {
    let dir = rust_project();
    let exec = DirectiveExecutor::new(RuntimeConfig::default());

    let result = exec
        .execute_directive(
            &json!({
                "type": "orchestration",
                "version": "1.0",
                "tool": "analyze-project",
                "description": "environment + files + composed report",
                "operations": [
                    {"op": "scanEnvironment", "store": "env"},
                    {"op": "analyzeFiles", "args": {"patterns": ["**/*.rs"], "maxFiles": 50}, "store": "files"},
                    {"op": "generateContext", "args": {"type": "analysis"}, "inputs": ["env", "files"], "store": "context"},
                    {"op": "validateOutput", "input": "context", "store": "check"}
                ],
                "compose": {
                    "template": "project-report",
                    "sections": [
                        {"source": "env", "key": "environment"},
                        {"source": "files", "key": "fileSummary", "transform": "summarize"},
                        {"source": "check", "key": "validation"}
                    ]
                }
            }),
            dir.path(),
        )
        .await;

    assert!(result.success, "error: {:?}", result.error);
    assert_eq!(result.metadata.operations_executed, 4);

    let data = result.data.expect("data");
    assert_eq!(data["template"], json!("project-report"));
    assert_eq!(data["environment"]["language"], json!("rust"));
    assert_eq!(data["validation"]["valid"], json!(true));
    // summarize turns the files object into {keys, count}.
    assert!(data["fileSummary"]["keys"]
        .as_array()
        .expect("keys")
        .contains(&json!("totalFiles")));
}

#[tokio::test]
async fn test_analysis_never_leaks_excluded_paths() {
    let dir = rust_project();
    let exec = DirectiveExecutor::new(RuntimeConfig::default());

    let result = exec
        .execute_directive(
            &json!({
                "type": "orchestration",
                "tool": "scan-all",
                "operations": [
                    {"op": "analyzeFiles", "args": {"patterns": ["**/*"]}, "store": "files"}
                ]
            }),
            dir.path(),
        )
        .await;

    let data = result.data.expect("data");
    let files = data["files"]["files"].as_array().expect("files");
    assert!(!files.is_empty());
    for file in files {
        let path = file["path"].as_str().expect("path");
        assert!(path.starts_with('/'), "not root-relative: {path}");
        assert!(!path.contains("node_modules"), "leaked {path}");
        assert!(!path.contains("/."), "leaked dot-dir entry {path}");
        assert!(!path.contains(".."), "escaped root: {path}");
    }
}

#[tokio::test]
async fn test_conditional_deep_scan_runs_only_for_rust() {
    let dir = rust_project();
    let exec = DirectiveExecutor::new(RuntimeConfig::default());

    let result = exec
        .execute_directive(
            &json!({
                "type": "orchestration",
                "tool": "conditional-scan",
                "operations": [
                    {"op": "scanEnvironment", "store": "env"},
                    {
                        "op": "analyzeFiles",
                        "args": {"patterns": ["**/*.rs"]},
                        "store": "rustFiles",
                        "condition": {"key": "env", "operator": "contains", "value": "language"}
                    },
                    {
                        "op": "analyzeFiles",
                        "args": {"patterns": ["**/*.py"]},
                        "store": "pythonFiles",
                        "condition": {"key": "missing", "operator": "exists"}
                    }
                ]
            }),
            dir.path(),
        )
        .await;

    assert!(result.success);
    assert_eq!(result.metadata.operations_executed, 2);
    let data = result.data.expect("data");
    assert_eq!(data["rustFiles"]["totalFiles"], json!(3));
    assert!(data.get("pythonFiles").is_none());
}

#[tokio::test]
async fn test_fs_budget_truncates_oversized_scan() {
    let dir = rust_project();
    let overlay: RuntimeConfigOverlay =
        serde_json::from_value(json!({"sandbox": {"fsOperationsLimit": 2}}))
            .expect("valid overlay");
    let exec = DirectiveExecutor::new(overlay.into_config());

    let result = exec
        .execute_directive(
            &json!({
                "type": "orchestration",
                "tool": "bounded-scan",
                "operations": [
                    {"op": "analyzeFiles", "args": {"patterns": ["**/*"]}, "store": "files"}
                ]
            }),
            dir.path(),
        )
        .await;

    // The directive still succeeds; the scan reports truncation.
    assert!(result.success, "error: {:?}", result.error);
    let data = result.data.expect("data");
    assert_eq!(data["files"]["truncated"], json!(true));
}
