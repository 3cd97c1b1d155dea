//! # Query Parameters
//!
//! The named-parameter bag passed alongside query text. Values are JSON so that
//! any `Serialize` type can contribute parameters and so the bag has a canonical
//! serialization for cache-key derivation.

use crate::error::{SqlKitError, SqlKitResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Named query parameters.
///
/// Two bags with the same entries have the same [`Parameters::canonical_json`]
/// no matter the order they were inserted in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Parameters {
    values: Map<String, Value>,
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a bag from any struct or map that serializes to a JSON object.
    pub fn from_serialize<T: Serialize + ?Sized>(source: &T) -> SqlKitResult<Self> {
        match serde_json::to_value(source)? {
            Value::Object(values) => Ok(Self { values }),
            Value::Null => Ok(Self::new()),
            other => Err(SqlKitError::validation(format!(
                "Query parameters must serialize to an object, got {}",
                json_type_name(&other)
            ))),
        }
    }

    /// Insert or overwrite a parameter (builder style).
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }

    /// Copy every entry of `other` into this bag; `other` wins on conflicts.
    pub fn merge(&mut self, other: &Parameters) {
        for (name, value) in &other.values {
            self.values.insert(name.clone(), value.clone());
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    /// Canonical JSON text of the bag (keys sorted at every nesting level).
    pub fn canonical_json(&self) -> String {
        canonicalize(&Value::Object(self.values.clone())).to_string()
    }
}

/// Rebuild `value` with object keys inserted in sorted order, which holds even
/// when serde_json's `preserve_order` feature is active in the build.
fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.clone(), canonicalize(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

impl From<Map<String, Value>> for Parameters {
    fn from(values: Map<String, Value>) -> Self {
        Self { values }
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Parameters {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Parameters::new();
        for (name, value) in iter {
            params.insert(name, value);
        }
        params
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
