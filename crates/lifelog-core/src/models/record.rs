// ABOUTME: Canonical record shape exposed to callers regardless of the originating store
// ABOUTME: snake_case keys, JSON arrays for list fields, RFC 3339 timestamps
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Lifelog Contributors

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::{AppError, AppResult};

/// A record in canonical shape
///
/// Field names are snake_case, list-valued fields are JSON arrays of strings,
/// timestamps are RFC 3339 strings and dates are `YYYY-MM-DD`. The persistence
/// layer validates payloads against an entity schema before they reach a store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    /// Empty record
    #[must_use]
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Wrap an existing JSON map
    #[must_use]
    pub const fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Builder-style insert
    #[must_use]
    pub fn with(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.0.insert(field.to_owned(), value.into());
        self
    }

    /// Insert or replace a field
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(field.into(), value.into());
    }

    /// Remove a field
    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.0.remove(field)
    }

    /// Raw field access
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Whether the field is present (even if null)
    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// String field, `None` for null or non-string values
    #[must_use]
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(Value::as_str)
    }

    /// Integer field
    #[must_use]
    pub fn get_i64(&self, field: &str) -> Option<i64> {
        self.0.get(field).and_then(Value::as_i64)
    }

    /// Numeric field as float (integers included)
    #[must_use]
    pub fn get_f64(&self, field: &str) -> Option<f64> {
        self.0.get(field).and_then(Value::as_f64)
    }

    /// Boolean field
    #[must_use]
    pub fn get_bool(&self, field: &str) -> Option<bool> {
        self.0.get(field).and_then(Value::as_bool)
    }

    /// List field; missing or non-array values read as an empty list
    #[must_use]
    pub fn get_list(&self, field: &str) -> Vec<String> {
        self.0
            .get(field)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .map(|item| match item {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Record id, if assigned
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.get_str("id")
    }

    /// Iterate fields in key order
    pub fn fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Number of fields
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the record has no fields
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Unwrap into the underlying JSON map
    #[must_use]
    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    /// Render as a JSON value
    #[must_use]
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl TryFrom<Value> for Record {
    type Error = AppError;

    fn try_from(value: Value) -> AppResult<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(AppError::invalid_input(format!(
                "Record payload must be a JSON object, got {}",
                json_type_name(&other)
            ))),
        }
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        record.into_value()
    }
}

/// Short name of a JSON value's type for error messages
#[must_use]
pub const fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
