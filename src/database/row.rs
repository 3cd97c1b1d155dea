//! Dynamic result rows.
//!
//! A [`Row`] keeps columns in the order the database returned them, so callers can
//! consume result shapes that are unknown at compile time and still decode into
//! typed structs when they are known.

use crate::error::{SqlKitError, SqlKitResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut row = Row::new();
        for (column, value) in pairs {
            row.push(column, value);
        }
        row
    }

    /// Append a column. Duplicate names are kept; lookups return the first match.
    pub fn push(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.columns.push(column.into());
        self.values.push(value.into());
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|index| &self.values[index])
    }

    pub fn get_index(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    /// Column/value pairs as a JSON object (later duplicates are dropped)
    pub fn to_object(&self) -> Map<String, Value> {
        let mut object = Map::new();
        for (column, value) in self.iter() {
            if !object.contains_key(column) {
                object.insert(column.to_string(), value.clone());
            }
        }
        object
    }

    /// Decode the row into `T`.
    ///
    /// The row is first read as an object keyed by column name. Single-column
    /// rows fall back to decoding the bare value, which is what `query::<i64>`
    /// over `SELECT count(*)` needs.
    pub fn decode<T: DeserializeOwned>(&self) -> SqlKitResult<T> {
        match serde_json::from_value(Value::Object(self.to_object())) {
            Ok(decoded) => Ok(decoded),
            Err(_) if self.len() == 1 => self.decode_scalar(),
            Err(e) => Err(SqlKitError::SerializationError(format!(
                "Failed to decode row with columns {:?}: {e}",
                self.columns
            ))),
        }
    }

    /// Decode the first column of the row into `T`
    pub fn decode_scalar<T: DeserializeOwned>(&self) -> SqlKitResult<T> {
        let value = self.values.first().cloned().unwrap_or(Value::Null);
        serde_json::from_value(value).map_err(|e| {
            SqlKitError::SerializationError(format!("Failed to decode scalar column: {e}"))
        })
    }
}

/// Decode every row of a result set into `T`
pub fn decode_rows<T: DeserializeOwned>(rows: &[Row]) -> SqlKitResult<Vec<T>> {
    rows.iter().map(Row::decode).collect()
}
