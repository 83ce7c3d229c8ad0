//! Project-tree operations: `analyzeFiles` and `scanEnvironment`.
//!
//! Both operations read only beneath `project_path` and charge the shared
//! fs-operation budget per directory listing or file read. Budget
//! exhaustion truncates the scan instead of failing the directive.

use std::path::Path;

use globset::{Glob, GlobSet, GlobSetBuilder};
use opqueue::OperationQueue;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use crate::context::SandboxContext;
use crate::error::{DirectiveError, Result};

const DEFAULT_MAX_FILES: usize = 100;

/// Manifest files recognized by `scanEnvironment`.
const MANIFESTS: &[&str] = &[
    "package.json",
    "Cargo.toml",
    "pyproject.toml",
    "go.mod",
    "tsconfig.json",
    "requirements.txt",
    "package-lock.json",
    "yarn.lock",
    "Cargo.lock",
];

fn traversable(entry: &DirEntry) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return true;
    }
    let name = entry.file_name().to_string_lossy();
    name != "node_modules" && !name.starts_with('.')
}

fn build_globs(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| DirectiveError::OperationFailed {
            op: "analyzeFiles".to_string(),
            reason: format!("invalid pattern '{pattern}': {e}"),
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|e| DirectiveError::OperationFailed {
        op: "analyzeFiles".to_string(),
        reason: format!("cannot compile patterns: {e}"),
    })
}

/// `analyzeFiles`: recursively scan the project for files matching
/// `args.patterns`, excluding `node_modules` and dot-directories.
///
/// Returns `{totalFiles, files: [{path, extension, size}], truncated}`
/// with root-relative, `/`-prefixed paths, capped at `args.maxFiles`
/// (default 100; non-positive values yield an empty list). Per-file
/// metadata is gathered through the operation queue; a failed lookup
/// drops that file's size rather than aborting the scan.
pub async fn analyze_files(
    queue: &OperationQueue,
    ctx: &SandboxContext,
    args: &Map<String, Value>,
) -> Result<Value> {
    let patterns: Vec<String> = args
        .get("patterns")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_else(|| vec!["**/*".to_string()]);

    let max_files = match args.get("maxFiles") {
        Some(value) => value.as_i64().unwrap_or(DEFAULT_MAX_FILES as i64),
        None => DEFAULT_MAX_FILES as i64,
    };
    if max_files <= 0 {
        return Ok(json!({"totalFiles": 0, "files": [], "truncated": false}));
    }
    let max_files = max_files as usize;

    let globs = build_globs(&patterns)?;
    let root = ctx.project_path.clone();

    let mut matched = Vec::new();
    let mut truncated = false;
    let walker = WalkDir::new(&root)
        .follow_links(false)
        .into_iter()
        .filter_entry(traversable);
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!(error = %e, "skipping unreadable entry");
                continue;
            }
        };
        if entry.file_type().is_dir() {
            // One budget unit per directory listing.
            if !ctx.fs_budget.charge() {
                truncated = true;
                break;
            }
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(&root)
            .unwrap_or_else(|_| entry.path())
            .to_path_buf();
        if globs.is_match(&rel) {
            matched.push(rel);
            if matched.len() >= max_files {
                truncated = true;
                break;
            }
        }
    }

    debug!(
        matched = matched.len(),
        truncated,
        fs_ops = ctx.fs_budget.used(),
        "project scan finished"
    );

    // Per-file metadata through the queue: bounded parallel sub-work.
    let mut lookups = Vec::new();
    for rel in matched {
        let abs = root.join(&rel);
        let budget = ctx.fs_budget.clone();
        lookups.push(queue.enqueue(async move {
            let path = format!("/{}", rel.to_string_lossy().replace('\\', "/"));
            let extension = rel
                .extension()
                .map(|ext| ext.to_string_lossy().into_owned());
            let size = if budget.charge() {
                tokio::fs::metadata(&abs).await.ok().map(|m| m.len())
            } else {
                None
            };
            Ok::<_, String>(json!({"path": path, "extension": extension, "size": size}))
        }));
    }

    let mut files = Vec::new();
    for outcome in futures::future::join_all(lookups).await {
        match outcome {
            Ok(file) => files.push(file),
            Err(e) => warn!(error = %e, "file metadata lookup dropped"),
        }
    }

    Ok(json!({"totalFiles": files.len(), "files": files, "truncated": truncated}))
}

async fn read_manifest(ctx: &SandboxContext, path: &Path) -> Option<String> {
    if !ctx.fs_budget.charge() {
        return None;
    }
    tokio::fs::read_to_string(path).await.ok()
}

fn package_json_dependencies(raw: &str, dependencies: &mut Vec<String>) -> bool {
    let Ok(manifest) = serde_json::from_str::<Value>(raw) else {
        return false;
    };
    let mut has_typescript = false;
    for section in ["dependencies", "devDependencies"] {
        if let Some(deps) = manifest.get(section).and_then(Value::as_object) {
            for name in deps.keys() {
                if name == "typescript" {
                    has_typescript = true;
                }
                dependencies.push(name.clone());
            }
        }
    }
    has_typescript
}

fn cargo_toml_dependencies(raw: &str, dependencies: &mut Vec<String>) {
    let Ok(manifest) = raw.parse::<toml::Value>() else {
        return;
    };
    for section in ["dependencies", "dev-dependencies"] {
        if let Some(deps) = manifest.get(section).and_then(toml::Value::as_table) {
            dependencies.extend(deps.keys().cloned());
        }
    }
}

/// `scanEnvironment`: inspect well-known manifest/config files at the
/// project root and summarize the project's stack.
pub async fn scan_environment(ctx: &SandboxContext) -> Result<Value> {
    let mut config_files = Vec::new();
    let mut dependencies: Vec<String> = Vec::new();
    let mut has_typescript = false;

    for name in MANIFESTS {
        let path = ctx.project_path.join(name);
        if !path.is_file() {
            continue;
        }
        config_files.push((*name).to_string());
        match *name {
            "package.json" => {
                if let Some(raw) = read_manifest(ctx, &path).await {
                    has_typescript |= package_json_dependencies(&raw, &mut dependencies);
                }
            }
            "Cargo.toml" => {
                if let Some(raw) = read_manifest(ctx, &path).await {
                    cargo_toml_dependencies(&raw, &mut dependencies);
                }
            }
            "tsconfig.json" => has_typescript = true,
            _ => {}
        }
    }

    let language = if config_files.iter().any(|f| f == "Cargo.toml") {
        "rust"
    } else if config_files.iter().any(|f| f == "package.json") {
        if has_typescript {
            "typescript"
        } else {
            "javascript"
        }
    } else if config_files
        .iter()
        .any(|f| f == "pyproject.toml" || f == "requirements.txt")
    {
        "python"
    } else if config_files.iter().any(|f| f == "go.mod") {
        "go"
    } else {
        "unknown"
    };

    Ok(json!({
        "configFiles": config_files,
        "dependencies": dependencies,
        "hasTypeScript": has_typescript,
        "language": language,
    }))
}
