//! Script requests as sent to the Gremlin Server HTTP endpoint.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// One script submission: Gremlin text plus its parameter bindings.
///
/// Serializes to the body Gremlin Server expects on `POST /`:
/// `{"gremlin": "...", "bindings": {...}, "aliases": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScriptRequest {
    pub gremlin: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub bindings: BTreeMap<String, Value>,
    /// Rebinds script-local names (usually `g`) to server-side traversal sources.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub aliases: BTreeMap<String, String>,
}

impl ScriptRequest {
    pub fn new(gremlin: impl Into<String>) -> Self {
        Self {
            gremlin: gremlin.into(),
            bindings: BTreeMap::new(),
            aliases: BTreeMap::new(),
        }
    }

    pub fn bind(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.bindings.insert(name.to_string(), value.into());
        self
    }

    pub fn alias(mut self, name: &str, target: &str) -> Self {
        self.aliases.insert(name.to_string(), target.to_string());
        self
    }

    pub fn binding(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }
}
