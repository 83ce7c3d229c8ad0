//! Catalog-backed operations: `loadKnowledge` and `loadPrompt`.

use std::time::Duration;

use serde_json::{json, Map, Value};
use tracing::debug;

use crate::cache::TtlCache;
use crate::catalog::Catalog;
use crate::config::PromptSettings;
use crate::error::{DirectiveError, Result};

/// `loadKnowledge`: return a knowledge summary for `args.domain`.
///
/// Delegates to the catalog collaborator; an unknown domain is reported as
/// `loaded: false` rather than a failure.
pub async fn load_knowledge(catalog: &dyn Catalog, args: &Map<String, Value>) -> Result<Value> {
    let domain = args.get("domain").and_then(Value::as_str).unwrap_or_default();
    let scope = args.get("scope").and_then(Value::as_str);

    match catalog.knowledge(domain).await {
        Some(entry) => Ok(json!({
            "domain": domain,
            "scope": scope,
            "category": entry.category,
            "sections": entry.sections,
            "tokens": entry.tokens,
            "file": entry.file,
            "loaded": true,
        })),
        None => {
            debug!(domain, "knowledge domain not in catalog");
            Ok(json!({"domain": domain, "scope": scope, "loaded": false}))
        }
    }
}

/// `loadPrompt`: load the named prompt template, consulting the prompt
/// cache when enabled. Fails when `args.name` is missing.
pub async fn load_prompt(
    catalog: &dyn Catalog,
    prompt_cache: &TtlCache,
    settings: &PromptSettings,
    args: &Map<String, Value>,
) -> Result<Value> {
    let name = args
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| DirectiveError::MissingArgument {
            op: "loadPrompt".to_string(),
            arg: "name".to_string(),
        })?;

    if settings.cache_enabled {
        if let Some(cached) = prompt_cache.get(name) {
            debug!(name, "prompt served from cache");
            return Ok(cached);
        }
    }

    let value = match catalog.prompt(name).await {
        Some(template) => json!({
            "name": name,
            "content": template.body,
            "tokens": template.entry.tokens,
            "category": template.entry.category,
            "found": true,
        }),
        None => json!({"name": name, "found": false}),
    };

    if settings.cache_enabled {
        prompt_cache.put(
            name,
            value.clone(),
            Some(Duration::from_secs(settings.cache_ttl)),
        );
    }
    Ok(value)
}
