//! Knowledge/prompt catalog collaborator.
//!
//! The catalog backing `loadKnowledge` and `loadPrompt` lives outside this
//! core; it is consumed through the [`Catalog`] trait. [`StaticCatalog`]
//! is the built-in in-memory implementation used for defaults and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One named entry in the knowledge/prompt catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    /// Source file the entry was distilled from.
    pub file: String,
    /// Approximate token count of the full content.
    pub tokens: u64,
    pub category: String,
    #[serde(default)]
    pub sections: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<Vec<String>>,
    #[serde(default)]
    pub load_on_demand: bool,
}

/// A prompt entry together with its template body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    pub entry: CatalogEntry,
    pub body: String,
}

/// Read-only access to named knowledge and prompt entries.
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn knowledge(&self, domain: &str) -> Option<CatalogEntry>;
    async fn prompt(&self, name: &str) -> Option<PromptTemplate>;
}

/// In-memory catalog with a small built-in entry set.
#[derive(Debug, Default)]
pub struct StaticCatalog {
    knowledge: HashMap<String, CatalogEntry>,
    prompts: HashMap<String, PromptTemplate>,
}

impl StaticCatalog {
    pub fn empty() -> Self {
        Self::default()
    }

    /// The default entries shipped with the runtime.
    pub fn builtin() -> Self {
        let mut catalog = Self::empty();

        catalog.insert_knowledge(
            "architecture",
            CatalogEntry {
                file: "knowledge/architecture.md".to_string(),
                tokens: 1_800,
                category: "engineering".to_string(),
                sections: vec![
                    "layering".to_string(),
                    "boundaries".to_string(),
                    "dependencies".to_string(),
                ],
                dependencies: None,
                load_on_demand: true,
            },
        );
        catalog.insert_knowledge(
            "testing",
            CatalogEntry {
                file: "knowledge/testing.md".to_string(),
                tokens: 1_200,
                category: "engineering".to_string(),
                sections: vec!["unit".to_string(), "integration".to_string()],
                dependencies: Some(vec!["architecture".to_string()]),
                load_on_demand: true,
            },
        );
        catalog.insert_knowledge(
            "refactoring",
            CatalogEntry {
                file: "knowledge/refactoring.md".to_string(),
                tokens: 950,
                category: "engineering".to_string(),
                sections: vec!["smells".to_string(), "moves".to_string()],
                dependencies: None,
                load_on_demand: true,
            },
        );

        catalog.insert_prompt(
            "analyze-project",
            CatalogEntry {
                file: "prompts/analyze-project.md".to_string(),
                tokens: 420,
                category: "analysis".to_string(),
                sections: vec![],
                dependencies: None,
                load_on_demand: true,
            },
            "Analyze the project at {{projectPath}} and report its structure, \
             entry points, and notable dependencies.",
        );
        catalog.insert_prompt(
            "summarize-files",
            CatalogEntry {
                file: "prompts/summarize-files.md".to_string(),
                tokens: 310,
                category: "analysis".to_string(),
                sections: vec![],
                dependencies: None,
                load_on_demand: true,
            },
            "Summarize the purpose of each file in {{files}} in one sentence each.",
        );

        catalog
    }

    pub fn insert_knowledge(&mut self, domain: impl Into<String>, entry: CatalogEntry) {
        self.knowledge.insert(domain.into(), entry);
    }

    pub fn insert_prompt(
        &mut self,
        name: impl Into<String>,
        entry: CatalogEntry,
        body: impl Into<String>,
    ) {
        self.prompts.insert(
            name.into(),
            PromptTemplate {
                entry,
                body: body.into(),
            },
        );
    }
}

#[async_trait]
impl Catalog for StaticCatalog {
    async fn knowledge(&self, domain: &str) -> Option<CatalogEntry> {
        self.knowledge.get(domain).cloned()
    }

    async fn prompt(&self, name: &str) -> Option<PromptTemplate> {
        self.prompts.get(name).cloned()
    }
}
