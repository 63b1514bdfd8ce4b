//! Schema definition files.
//!
//! A schema file is JSON:
//!
//! ```json
//! {
//!   "vertex_labels": ["person"],
//!   "edge_labels": ["knows"],
//!   "properties": [{ "name": "name", "type": "string" }, { "name": "age", "type": "long" }],
//!   "indexes": [{ "property": "name", "element": "vertex", "unique": false }]
//! }
//! ```

use graphseed_gremlin::{IndexSpec, PropertyKey, PropertyType, SchemaSpec};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("failed to read schema {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse schema {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid schema: {0}")]
    Invalid(String),
}

/// The schema of the built-in sample: `person(name: string, age: long)`
/// with a vertex index on `name`.
pub fn default_schema() -> SchemaSpec {
    SchemaSpec {
        vertex_labels: vec!["person".to_string()],
        edge_labels: Vec::new(),
        properties: vec![
            PropertyKey {
                name: "name".to_string(),
                data_type: PropertyType::String,
            },
            PropertyKey {
                name: "age".to_string(),
                data_type: PropertyType::Long,
            },
        ],
        indexes: vec![IndexSpec::vertex("name")],
    }
}

pub fn load_schema(path: &Path) -> Result<SchemaSpec, SchemaError> {
    let text = std::fs::read_to_string(path).map_err(|source| SchemaError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let schema: SchemaSpec = serde_json::from_str(&text).map_err(|source| SchemaError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    validate_schema(&schema)?;
    Ok(schema)
}

/// Names must be non-empty and unique per kind; every index must refer to
/// a declared property key.
pub fn validate_schema(schema: &SchemaSpec) -> Result<(), SchemaError> {
    check_names("vertex label", schema.vertex_labels.iter().map(String::as_str))?;
    check_names("edge label", schema.edge_labels.iter().map(String::as_str))?;
    check_names("property", schema.properties.iter().map(|p| p.name.as_str()))?;

    let mut index_names = BTreeSet::new();
    for index in &schema.indexes {
        if schema.property(&index.property).is_none() {
            return Err(SchemaError::Invalid(format!(
                "index `{}` refers to undeclared property `{}`",
                index.name(),
                index.property
            )));
        }
        if !index_names.insert(index.name()) {
            return Err(SchemaError::Invalid(format!(
                "index `{}` is declared twice",
                index.name()
            )));
        }
    }
    Ok(())
}

fn check_names<'a>(kind: &str, names: impl Iterator<Item = &'a str>) -> Result<(), SchemaError> {
    let mut seen = BTreeSet::new();
    for name in names {
        if name.trim().is_empty() {
            return Err(SchemaError::Invalid(format!("empty {kind} name")));
        }
        if !seen.insert(name) {
            return Err(SchemaError::Invalid(format!("{kind} `{name}` is declared twice")));
        }
    }
    Ok(())
}
