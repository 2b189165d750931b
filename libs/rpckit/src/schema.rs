//! Schema capability.
//!
//! A [`Schema`] wraps a JSON Schema document and offers two operations:
//!
//! - [`Schema::validate`]: strip properties the schema does not declare, then
//!   check the cleaned value. Returns the cleaned value on success.
//! - [`Schema::canonical`]: a canonical serialization used for structural
//!   equality. Two schemas are the same type iff their canonical forms match.
//!
//! The validator is compiled lazily on first use and shared by every clone,
//! so a schema can be consulted by any number of concurrent validations.

use std::fmt;
use std::sync::{Arc, OnceLock};

use jsonschema::Validator;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Map, Value};
use thiserror::Error;

/// Failure to compile a JSON Schema document.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid schema: {reason}")]
pub struct SchemaError {
    pub reason: String,
}

/// A value did not conform to its schema.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("value does not match schema: {}", .violations.join("; "))]
pub struct ValidationFailure {
    pub violations: Vec<String>,
}

struct SchemaInner {
    json: Value,
    canonical: String,
    validator: OnceLock<Result<Validator, SchemaError>>,
}

/// Immutable, cheaply clonable schema handle.
#[derive(Clone)]
pub struct Schema {
    inner: Arc<SchemaInner>,
}

impl Schema {
    /// Wrap an arbitrary JSON Schema document. Compilation is deferred to the
    /// first validation; use [`Schema::try_from_json`] to fail early.
    pub fn from_json(json: Value) -> Self {
        let canonical = canonical_form(&json);
        Self {
            inner: Arc::new(SchemaInner {
                json,
                canonical,
                validator: OnceLock::new(),
            }),
        }
    }

    /// Wrap and compile a JSON Schema document.
    pub fn try_from_json(json: Value) -> Result<Self, SchemaError> {
        let schema = Self::from_json(json);
        schema.compiled()?;
        Ok(schema)
    }

    pub fn string() -> Self {
        Self::from_json(json!({ "type": "string" }))
    }

    pub fn number() -> Self {
        Self::from_json(json!({ "type": "number" }))
    }

    pub fn integer() -> Self {
        Self::from_json(json!({ "type": "integer" }))
    }

    pub fn boolean() -> Self {
        Self::from_json(json!({ "type": "boolean" }))
    }

    pub fn null() -> Self {
        Self::from_json(json!({ "type": "null" }))
    }

    /// Homogeneous array of `items`.
    pub fn array(items: Schema) -> Self {
        Self::from_json(json!({ "type": "array", "items": items.inner.json.clone() }))
    }

    /// Object whose listed properties are all required.
    pub fn object<I, K>(properties: I) -> Self
    where
        I: IntoIterator<Item = (K, Schema)>,
        K: Into<String>,
    {
        let mut props = Map::new();
        let mut required = Vec::new();
        for (key, schema) in properties {
            let key = key.into();
            required.push(Value::String(key.clone()));
            props.insert(key, schema.inner.json.clone());
        }
        Self::from_json(json!({
            "type": "object",
            "properties": props,
            "required": required,
        }))
    }

    /// The underlying JSON Schema document.
    pub fn as_json(&self) -> &Value {
        &self.inner.json
    }

    /// Canonical serialization (sorted keys, sorted `required` lists, compact).
    pub fn canonical(&self) -> &str {
        &self.inner.canonical
    }

    /// Top-level `type` keyword, if it is a single string.
    pub fn kind(&self) -> Option<&str> {
        self.inner.json.get("type").and_then(Value::as_str)
    }

    /// Make sure the schema compiles.
    pub fn compile(&self) -> Result<(), SchemaError> {
        self.compiled().map(|_| ())
    }

    /// Strip undeclared properties from `value` and check the result.
    pub fn validate(&self, value: Value) -> Result<Value, ValidationFailure> {
        let validator = self.compiled().map_err(|e| ValidationFailure {
            violations: vec![e.to_string()],
        })?;

        let cleaned = clean(&self.inner.json, value);
        let violations: Vec<String> = validator
            .iter_errors(&cleaned)
            .map(|e| {
                let path = e.instance_path.to_string();
                if path.is_empty() {
                    e.to_string()
                } else {
                    format!("{path}: {e}")
                }
            })
            .collect();

        if violations.is_empty() {
            Ok(cleaned)
        } else {
            Err(ValidationFailure { violations })
        }
    }

    fn compiled(&self) -> Result<&Validator, SchemaError> {
        self.inner
            .validator
            .get_or_init(|| {
                jsonschema::validator_for(&self.inner.json).map_err(|e| SchemaError {
                    reason: e.to_string(),
                })
            })
            .as_ref()
            .map_err(Clone::clone)
    }
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.canonical() == other.canonical()
    }
}

impl Eq for Schema {}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Schema").field(&self.inner.canonical).finish()
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner.json)
    }
}

impl From<Value> for Schema {
    fn from(json: Value) -> Self {
        Self::from_json(json)
    }
}

impl Serialize for Schema {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.inner.json.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Schema {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Self::from_json)
    }
}

/// Canonical text of a schema document.
///
/// Object keys are emitted in sorted order at every level and `required`
/// arrays of schema nodes are treated as sets, so field order never affects
/// equality. Literal payloads (`const`, `enum`, `default`, `examples`) keep
/// their array order.
pub fn canonical_form(schema: &Value) -> String {
    canonicalize(schema).to_string()
}

/// Keywords whose value is instance data rather than a schema.
const DATA_KEYWORDS: &[&str] = &["const", "enum", "default", "examples"];

/// Keywords whose value maps arbitrary names to subschemas.
const SCHEMA_MAP_KEYWORDS: &[&str] = &[
    "properties",
    "patternProperties",
    "$defs",
    "definitions",
    "dependentSchemas",
];

fn canonicalize(schema: &Value) -> Value {
    match schema {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut out = Map::new();
            for key in keys {
                let item = &map[key.as_str()];
                let normalized = match (key.as_str(), item) {
                    ("required", Value::Array(names)) => {
                        let mut names = names.clone();
                        names.sort_by_key(|n| n.to_string());
                        names.dedup();
                        Value::Array(names)
                    }
                    (k, Value::Object(subschemas)) if SCHEMA_MAP_KEYWORDS.contains(&k) => {
                        sorted_object(subschemas, canonicalize)
                    }
                    (k, _) if DATA_KEYWORDS.contains(&k) => canonicalize_data(item),
                    _ => canonicalize(item),
                };
                out.insert(key.clone(), normalized);
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

fn canonicalize_data(value: &Value) -> Value {
    match value {
        Value::Object(map) => sorted_object(map, canonicalize_data),
        Value::Array(items) => Value::Array(items.iter().map(canonicalize_data).collect()),
        other => other.clone(),
    }
}

fn sorted_object(map: &Map<String, Value>, f: fn(&Value) -> Value) -> Value {
    let mut keys: Vec<&String> = map.keys().collect();
    keys.sort();
    let mut out = Map::new();
    for key in keys {
        out.insert(key.clone(), f(&map[key.as_str()]));
    }
    Value::Object(out)
}

/// Remove properties that `schema` does not declare.
///
/// Objects keep a property when it is listed under `properties`, or when
/// `additionalProperties` is `true` or a schema. Arrays are cleaned element
/// by element against `items`.
fn clean(schema: &Value, value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
                return Value::Object(map);
            };
            let additional = schema.get("additionalProperties");
            let mut out = Map::new();
            for (key, item) in map {
                if let Some(prop_schema) = properties.get(&key) {
                    out.insert(key, clean(prop_schema, item));
                    continue;
                }
                match additional {
                    Some(Value::Bool(true)) => {
                        out.insert(key, item);
                    }
                    Some(extra @ Value::Object(_)) => {
                        out.insert(key, clean(extra, item));
                    }
                    _ => {}
                }
            }
            Value::Object(out)
        }
        Value::Array(items) => match schema.get("items") {
            Some(item_schema @ Value::Object(_)) => Value::Array(
                items
                    .into_iter()
                    .map(|item| clean(item_schema, item))
                    .collect(),
            ),
            _ => Value::Array(items),
        },
        other => other,
    }
}
