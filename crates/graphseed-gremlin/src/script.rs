//! Administrative and traversal commands as parameterized requests.
//!
//! Scripts target the JanusGraph management API through
//! `ConfiguredGraphFactory`. Script text only ever contains identifiers
//! owned by this module; graph names, labels, property keys and index
//! names travel as bindings.

use crate::request::ScriptRequest;
use serde::{Deserialize, Serialize};

/// Delimiter between statements of one composite command.
pub const STATEMENT_DELIMITER: &str = "; ";

const OPEN_GRAPH: &str = "graph = ConfiguredGraphFactory.open(graphName)";
const OPEN_MANAGEMENT: &str = "mgmt = graph.openManagement()";

/// Server-scoped traversal source name for a configured graph.
pub fn traversal_source(graph: &str) -> String {
    format!("{graph}_traversal")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyType {
    String,
    #[serde(alias = "int64", alias = "i64", alias = "integer")]
    Long,
    #[serde(alias = "float64", alias = "f64")]
    Double,
}

impl PropertyType {
    pub fn class_name(self) -> &'static str {
        match self {
            PropertyType::String => "String.class",
            PropertyType::Long => "Long.class",
            PropertyType::Double => "Double.class",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Vertex,
    Edge,
}

impl ElementKind {
    pub fn parse(s: &str) -> Result<Self, String> {
        match s.trim().to_ascii_lowercase().as_str() {
            "v" | "vertex" => Ok(Self::Vertex),
            "e" | "edge" => Ok(Self::Edge),
            other => Err(format!("unknown element kind `{other}` (expected vertex|edge)")),
        }
    }

    /// Prefix used when naming indexes over this element kind.
    pub fn prefix(self) -> &'static str {
        match self {
            ElementKind::Vertex => "v",
            ElementKind::Edge => "e",
        }
    }

    pub fn class_name(self) -> &'static str {
        match self {
            ElementKind::Vertex => "Vertex.class",
            ElementKind::Edge => "Edge.class",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyKey {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: PropertyType,
}

/// A composite index over one property of one element kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSpec {
    pub property: String,
    #[serde(default = "default_element")]
    pub element: ElementKind,
    #[serde(default)]
    pub unique: bool,
}

fn default_element() -> ElementKind {
    ElementKind::Vertex
}

impl IndexSpec {
    pub fn vertex(property: &str) -> Self {
        Self {
            property: property.to_string(),
            element: ElementKind::Vertex,
            unique: false,
        }
    }

    pub fn edge(property: &str) -> Self {
        Self {
            property: property.to_string(),
            element: ElementKind::Edge,
            unique: false,
        }
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Index name: element prefix followed by the property name (`vname`).
    pub fn name(&self) -> String {
        format!("{}{}", self.element.prefix(), self.property)
    }
}

/// User-supplied schema: labels, typed property keys and indexes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaSpec {
    #[serde(default)]
    pub vertex_labels: Vec<String>,
    #[serde(default)]
    pub edge_labels: Vec<String>,
    #[serde(default)]
    pub properties: Vec<PropertyKey>,
    #[serde(default)]
    pub indexes: Vec<IndexSpec>,
}

impl SchemaSpec {
    pub fn property(&self, name: &str) -> Option<&PropertyKey> {
        self.properties.iter().find(|p| p.name == name)
    }
}

/// Builds requests for one configured graph.
#[derive(Debug, Clone)]
pub struct ScriptBuilder {
    graph: String,
    source: String,
}

impl ScriptBuilder {
    pub fn new(graph: &str) -> Self {
        Self {
            graph: graph.to_string(),
            source: traversal_source(graph),
        }
    }

    pub fn graph(&self) -> &str {
        &self.graph
    }

    pub fn traversal_source(&self) -> &str {
        &self.source
    }

    fn management(&self, statements: &[String]) -> ScriptRequest {
        let mut all = vec![OPEN_GRAPH.to_string(), OPEN_MANAGEMENT.to_string()];
        all.extend_from_slice(statements);
        ScriptRequest::new(all.join(STATEMENT_DELIMITER)).bind("graphName", self.graph.as_str())
    }

    /// Liveness probe used right after connecting.
    pub fn probe() -> ScriptRequest {
        ScriptRequest::new("1")
    }

    /// Creates the graph unless the factory already knows it.
    pub fn create_graph(&self) -> ScriptRequest {
        ScriptRequest::new(
            "if (!ConfiguredGraphFactory.getGraphNames().contains(graphName)) { ConfiguredGraphFactory.create(graphName) }; graphName",
        )
            .bind("graphName", self.graph.as_str())
    }

    pub fn drop_graph(&self) -> ScriptRequest {
        ScriptRequest::new("ConfiguredGraphFactory.drop(graphName)")
            .bind("graphName", self.graph.as_str())
    }

    /// Labels and property keys in one management transaction. Each one is
    /// declared only when the graph does not have it yet.
    pub fn define_schema(&self, schema: &SchemaSpec) -> ScriptRequest {
        let mut statements = Vec::new();
        let mut bindings = Vec::new();

        for (i, label) in schema.vertex_labels.iter().enumerate() {
            let var = format!("vl{i}");
            statements.push(format!(
                "if (!mgmt.containsVertexLabel({var})) {{ mgmt.makeVertexLabel({var}).make() }}"
            ));
            bindings.push((var, label.clone()));
        }
        for (i, label) in schema.edge_labels.iter().enumerate() {
            let var = format!("el{i}");
            statements.push(format!(
                "if (!mgmt.containsEdgeLabel({var})) {{ mgmt.makeEdgeLabel({var}).make() }}"
            ));
            bindings.push((var, label.clone()));
        }
        for (i, key) in schema.properties.iter().enumerate() {
            let var = format!("pk{i}");
            statements.push(format!(
                "if (!mgmt.containsPropertyKey({var})) {{ mgmt.makePropertyKey({var}).dataType({}).make() }}",
                key.data_type.class_name()
            ));
            bindings.push((var, key.name.clone()));
        }
        statements.push("mgmt.commit()".to_string());

        bindings
            .into_iter()
            .fold(self.management(&statements), |req, (var, value)| {
                req.bind(&var, value)
            })
    }

    pub fn build_index(&self, index: &IndexSpec) -> ScriptRequest {
        let unique = if index.unique { ".unique()" } else { "" };
        self.management(&[
            "key = mgmt.getPropertyKey(propertyName)".to_string(),
            format!(
                "mgmt.buildIndex(indexName, {}).addKey(key){unique}.buildCompositeIndex()",
                index.element.class_name()
            ),
            "mgmt.commit()".to_string(),
        ])
        .bind("indexName", index.name())
        .bind("propertyName", index.property.as_str())
    }

    pub fn register_index(&self, index: &IndexSpec) -> ScriptRequest {
        self.update_index(index, "REGISTER_INDEX")
    }

    pub fn reindex(&self, index: &IndexSpec) -> ScriptRequest {
        self.update_index(index, "REINDEX")
    }

    fn update_index(&self, index: &IndexSpec, action: &'static str) -> ScriptRequest {
        self.management(&[
            format!("mgmt.updateIndex(mgmt.getGraphIndex(indexName), SchemaAction.{action}).get()"),
            "mgmt.commit()".to_string(),
        ])
        .bind("indexName", index.name())
    }

    /// Reads the index status for its key; the script evaluates to a string.
    pub fn index_status(&self, index: &IndexSpec) -> ScriptRequest {
        self.management(&[
            "idx = mgmt.getGraphIndex(indexName)".to_string(),
            "status = idx.getIndexStatus(mgmt.getPropertyKey(propertyName)).toString()"
                .to_string(),
            "mgmt.rollback()".to_string(),
            "status".to_string(),
        ])
        .bind("indexName", index.name())
        .bind("propertyName", index.property.as_str())
    }

    /// Bounded read-back: `label`-filtered value maps, at most `limit` rows.
    pub fn read_vertices(&self, label: &str, limit: u64) -> ScriptRequest {
        ScriptRequest::new("g.V().hasLabel(label).valueMap(true).limit(limit)")
            .bind("label", label)
            .bind("limit", limit)
            .alias("g", &self.source)
    }

    pub fn drop_all(&self) -> ScriptRequest {
        ScriptRequest::new("g.V().drop().iterate()").alias("g", &self.source)
    }
}
