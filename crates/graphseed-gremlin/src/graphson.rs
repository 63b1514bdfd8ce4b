//! GraphSON result decoding.
//!
//! Gremlin Server answers every script with an envelope
//! `{"status": {"code", "message"}, "result": {"data", "meta"}}`. Under
//! GraphSON 2.0/3.0 the `data` payload is wrapped in `{"@type", "@value"}`
//! objects; under 1.0 it is plain JSON. Decoding strips the wrappers so
//! callers always see plain values:
//!
//! - `g:List` / `g:Set` become arrays, `g:BulkSet` is expanded by bulk
//! - `g:Map` (flat `[k1, v1, k2, v2, ...]`) becomes an object with string keys
//! - `g:T` / `g:Direction` tokens become their names (`id`, `label`, ...)
//! - scalar wrappers (`g:Int64`, `g:Double`, ...) become the bare scalar

use crate::error::GremlinError;
use serde_json::{Map, Value};
use std::fmt;

const TYPE_KEY: &str = "@type";
const VALUE_KEY: &str = "@value";

/// Strip GraphSON type wrappers recursively.
pub fn untype(value: Value) -> Value {
    match value {
        Value::Object(mut map) if is_typed(&map) => {
            let ty = match map.remove(TYPE_KEY) {
                Some(Value::String(ty)) => ty,
                _ => String::new(),
            };
            let inner = map.remove(VALUE_KEY).unwrap_or(Value::Null);
            untype_tagged(&ty, inner)
        }
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, untype(v)))
                .collect::<Map<String, Value>>(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(untype).collect()),
        other => other,
    }
}

fn is_typed(map: &Map<String, Value>) -> bool {
    map.len() <= 2 && map.get(TYPE_KEY).map_or(false, Value::is_string) && {
        map.len() == 1 || map.contains_key(VALUE_KEY)
    }
}

fn untype_tagged(ty: &str, inner: Value) -> Value {
    match ty {
        "g:Map" => match inner {
            Value::Array(flat) => {
                let mut out = Map::new();
                let mut it = flat.into_iter();
                while let Some(key) = it.next() {
                    let value = it.next().map(untype).unwrap_or(Value::Null);
                    out.insert(key_string(untype(key)), value);
                }
                Value::Object(out)
            }
            other => untype(other),
        },
        "g:BulkSet" => match inner {
            Value::Array(flat) => {
                let mut out = Vec::new();
                let mut it = flat.into_iter();
                while let Some(item) = it.next() {
                    let item = untype(item);
                    let bulk = it.next().map(untype).and_then(|b| b.as_u64()).unwrap_or(1);
                    for _ in 0..bulk {
                        out.push(item.clone());
                    }
                }
                Value::Array(out)
            }
            other => untype(other),
        },
        _ => untype(inner),
    }
}

fn key_string(key: Value) -> String {
    match key {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

/// Decoded `result.data` of one response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    items: Vec<Value>,
}

impl ResultSet {
    pub fn new(items: Vec<Value>) -> Self {
        Self { items }
    }

    /// Parse a full response envelope, failing on non-success status codes.
    pub fn from_response(body: Value) -> Result<Self, GremlinError> {
        let Value::Object(mut envelope) = body else {
            return Err(GremlinError::InvalidResponse(
                "response body is not a JSON object".to_string(),
            ));
        };

        let status = envelope
            .remove("status")
            .ok_or_else(|| GremlinError::InvalidResponse("missing `status`".to_string()))?;
        let code = status
            .get("code")
            .and_then(|c| untype(c.clone()).as_u64())
            .ok_or_else(|| GremlinError::InvalidResponse("missing `status.code`".to_string()))?;
        let code = u16::try_from(code).map_err(|_| {
            GremlinError::InvalidResponse(format!("status code {code} is out of range"))
        })?;
        if !(200..300).contains(&code) {
            let message = status
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            return Err(GremlinError::Server { code, message });
        }

        let data = envelope
            .remove("result")
            .and_then(|mut r| r.get_mut("data").map(Value::take))
            .map(untype)
            .unwrap_or(Value::Null);

        let items = match data {
            Value::Null => Vec::new(),
            Value::Array(items) => items,
            single => vec![single],
        };
        Ok(Self { items })
    }

    pub fn items(&self) -> &[Value] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The single scalar string a status-style script returns.
    pub fn one_string(&self) -> Result<String, GremlinError> {
        match self.items.as_slice() {
            [Value::String(s)] => Ok(s.clone()),
            [other] => Err(GremlinError::UnexpectedResult {
                expected: "a string",
                got: other.to_string(),
            }),
            items => Err(GremlinError::UnexpectedResult {
                expected: "exactly one result",
                got: format!("{} results", items.len()),
            }),
        }
    }

    /// Every result as a property map (the shape `valueMap()` produces).
    pub fn property_maps(&self) -> Result<Vec<PropertyMap>, GremlinError> {
        self.items
            .iter()
            .map(|item| match item {
                Value::Object(map) => Ok(PropertyMap::new(map.clone())),
                other => Err(GremlinError::UnexpectedResult {
                    expected: "a property map",
                    got: other.to_string(),
                }),
            })
            .collect()
    }
}

/// One row of a `valueMap(true)` result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyMap {
    entries: Map<String, Value>,
}

impl PropertyMap {
    pub fn new(entries: Map<String, Value>) -> Self {
        Self { entries }
    }

    pub fn id(&self) -> Option<&Value> {
        self.entries.get("id")
    }

    pub fn label(&self) -> Option<&str> {
        self.entries.get("label").and_then(Value::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// First value of a (possibly multi-valued) property.
    pub fn first(&self, key: &str) -> Option<&Value> {
        match self.entries.get(key)? {
            Value::Array(values) => values.first(),
            value => Some(value),
        }
    }

    /// Entries in display order: `id`, `label`, then properties by name.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &Value)> {
        let head = ["id", "label"]
            .into_iter()
            .filter_map(|k| self.entries.get_key_value(k));
        let tail = self
            .entries
            .iter()
            .filter(|(k, _)| k.as_str() != "id" && k.as_str() != "label");
        head.chain(tail).map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Renders a plain value the way Gremlin consoles do: bare strings,
/// `[a, b]` lists, `{k=v}` maps.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => {
            let inner: Vec<String> = items.iter().map(display_value).collect();
            format!("[{}]", inner.join(", "))
        }
        Value::Object(map) => {
            let inner: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{k}={}", display_value(v)))
                .collect();
            format!("{{{}}}", inner.join(", "))
        }
        other => other.to_string(),
    }
}

impl fmt::Display for PropertyMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .entries()
            .map(|(k, v)| format!("{k}={}", display_value(v)))
            .collect();
        write!(f, "{{{}}}", parts.join(", "))
    }
}
