// ABOUTME: Record translator between each store's native row shape and the canonical record
// ABOUTME: Handles field naming conventions, JSON list columns, and timestamp normalization
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Lifelog Contributors

//! Record translation
//!
//! Stores speak [`NativeRow`]: store-specific column names paired with typed
//! [`StoreValue`]s. Callers only ever see a canonical [`Record`]: snake_case
//! keys, list fields as JSON arrays, timestamps as RFC 3339 UTC strings with
//! millisecond precision, and dates as `YYYY-MM-DD`.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde_json::{Map, Number, Value};

use super::schema::{ColumnDef, ColumnType, EntitySchema};
use crate::errors::{AppError, AppResult};
use crate::models::Record;

/// Field naming convention used by a store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Convention {
    /// `journal_entry_id`
    SnakeCase,
    /// `journalEntryId`
    CamelCase,
}

impl Convention {
    /// Store column name for a canonical field
    #[must_use]
    pub fn column_name(self, field: &str) -> String {
        match self {
            Self::SnakeCase => field.to_owned(),
            Self::CamelCase => snake_to_camel(field),
        }
    }

    /// Canonical field name for a store column
    #[must_use]
    pub fn canonical_name(self, column: &str) -> String {
        match self {
            Self::SnakeCase => column.to_owned(),
            Self::CamelCase => camel_to_snake(column),
        }
    }
}

/// Typed value as bound to or read from a store
///
/// The variant fixes the SQL type even for NULL, which matters for stores
/// that type-check parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreValue {
    /// TEXT (also dates and JSON lists)
    Text(Option<String>),
    /// BIGINT / INTEGER
    Integer(Option<i64>),
    /// DOUBLE PRECISION / REAL
    Real(Option<f64>),
    /// BOOLEAN
    Bool(Option<bool>),
    /// TIMESTAMPTZ (stores without a native type bind it as text)
    Timestamp(Option<DateTime<Utc>>),
}

impl StoreValue {
    /// Typed NULL for a column type
    #[must_use]
    pub const fn null_for(ty: ColumnType) -> Self {
        match ty {
            ColumnType::Text | ColumnType::Date | ColumnType::JsonList => Self::Text(None),
            ColumnType::Integer => Self::Integer(None),
            ColumnType::Real => Self::Real(None),
            ColumnType::Boolean => Self::Bool(None),
            ColumnType::Timestamp => Self::Timestamp(None),
        }
    }

    /// Whether the value is NULL
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(
            self,
            Self::Text(None)
                | Self::Integer(None)
                | Self::Real(None)
                | Self::Bool(None)
                | Self::Timestamp(None)
        )
    }
}

/// A row in a store's native shape
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NativeRow {
    values: Vec<(String, StoreValue)>,
}

impl NativeRow {
    /// Empty row
    #[must_use]
    pub const fn new() -> Self {
        Self { values: Vec::new() }
    }

    /// Append a column value
    pub fn push(&mut self, column: impl Into<String>, value: StoreValue) {
        self.values.push((column.into(), value));
    }

    /// Value of a column
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&StoreValue> {
        self.values
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Column/value pairs in insertion order
    #[must_use]
    pub fn values(&self) -> &[(String, StoreValue)] {
        &self.values
    }

    /// Column names in insertion order
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|(name, _)| name.as_str())
    }

    /// Number of columns
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the row has no columns
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

// ================================
// Naming
// ================================

/// `journal_entry_id` -> `journalEntryId`
#[must_use]
pub fn snake_to_camel(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper_next = false;
    for ch in field.chars() {
        if ch == '_' {
            upper_next = !out.is_empty();
        } else if upper_next {
            out.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}

/// `journalEntryId` -> `journal_entry_id`, `userID` -> `user_id`
#[must_use]
pub fn camel_to_snake(column: &str) -> String {
    let chars: Vec<char> = column.chars().collect();
    let mut out = String::with_capacity(column.len() + 4);
    for (i, &ch) in chars.iter().enumerate() {
        if ch.is_uppercase() {
            let prev = i.checked_sub(1).and_then(|p| chars.get(p)).copied();
            let next = chars.get(i + 1).copied();
            let boundary = match prev {
                Some(p) if p.is_lowercase() || p.is_ascii_digit() => true,
                Some(p) if p.is_uppercase() => next.is_some_and(char::is_lowercase),
                _ => false,
            };
            if boundary && !out.ends_with('_') {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

/// Rename every key of an inbound payload to its canonical snake_case form
#[must_use]
pub fn canonicalize_keys(record: Record) -> Record {
    let map: Map<String, Value> = record
        .into_map()
        .into_iter()
        .map(|(key, value)| (camel_to_snake(&key), value))
        .collect();
    Record::from_map(map)
}

// ================================
// JSON list columns
// ================================

/// Encode a list of strings as JSON text
#[must_use]
pub fn encode_list(items: &[String]) -> String {
    serde_json::to_string(items).unwrap_or_else(|_| "[]".to_owned())
}

/// Decode list text, never failing
///
/// Valid JSON arrays decode element-wise; blank text is an empty list;
/// legacy comma-separated text is split; anything else becomes a
/// single-element list wrapping the raw text.
#[must_use]
pub fn decode_list(raw: &str) -> Vec<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Array(items)) => items.into_iter().map(list_item_to_string).collect(),
        Ok(Value::Null) => Vec::new(),
        Ok(Value::String(inner)) => decode_list(&inner),
        _ if trimmed.contains(',') && !trimmed.starts_with('[') && !trimmed.starts_with('{') => {
            trimmed
                .split(',')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(ToOwned::to_owned)
                .collect()
        }
        _ => vec![raw.to_owned()],
    }
}

fn list_item_to_string(item: Value) -> String {
    match item {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

// ================================
// Timestamps and dates
// ================================

/// Canonical timestamp rendering
#[must_use]
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse any timestamp representation a store may hold
///
/// Accepts RFC 3339, SQLite's `YYYY-MM-DD HH:MM:SS[.fff]` (interpreted as UTC),
/// and a bare date (midnight UTC).
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Parse a calendar date, accepting full timestamps by taking their UTC date
#[must_use]
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| parse_timestamp(raw).map(|ts| ts.date_naive()))
}

// ================================
// Canonical <-> native
// ================================

/// Convert one canonical (already validated) value into a typed store value
///
/// # Errors
///
/// Returns an error if the value does not match the column type
pub fn to_store_value(column: &ColumnDef, value: &Value) -> AppResult<StoreValue> {
    if value.is_null() {
        return Ok(StoreValue::null_for(column.ty));
    }
    let mismatch = || {
        AppError::invalid_input(format!(
            "Field '{}' has an unexpected value for its type",
            column.name
        ))
    };

    match column.ty {
        ColumnType::Text => value
            .as_str()
            .map(|s| StoreValue::Text(Some(s.to_owned())))
            .ok_or_else(mismatch),
        ColumnType::Integer => value
            .as_i64()
            .map(|n| StoreValue::Integer(Some(n)))
            .ok_or_else(mismatch),
        ColumnType::Real => value
            .as_f64()
            .map(|n| StoreValue::Real(Some(n)))
            .ok_or_else(mismatch),
        ColumnType::Boolean => value
            .as_bool()
            .map(|b| StoreValue::Bool(Some(b)))
            .ok_or_else(mismatch),
        ColumnType::Date => value
            .as_str()
            .and_then(parse_date)
            .map(|d| StoreValue::Text(Some(d.format("%Y-%m-%d").to_string())))
            .ok_or_else(mismatch),
        ColumnType::Timestamp => value
            .as_str()
            .and_then(parse_timestamp)
            .map(|ts| StoreValue::Timestamp(Some(ts)))
            .ok_or_else(mismatch),
        ColumnType::JsonList => {
            let items: Vec<String> = match value {
                Value::Array(items) => items.iter().cloned().map(list_item_to_string).collect(),
                Value::String(raw) => decode_list(raw),
                _ => return Err(mismatch()),
            };
            Ok(StoreValue::Text(Some(encode_list(&items))))
        }
    }
}

/// Convert a canonical record into a native row for a store
///
/// Only fields present in the record are emitted, in schema column order.
///
/// # Errors
///
/// Returns an error if a field is unknown to the schema or mistyped
pub fn to_native(
    schema: &EntitySchema,
    record: &Record,
    convention: Convention,
) -> AppResult<NativeRow> {
    if let Some((unknown, _)) = record
        .fields()
        .find(|(field, _)| schema.column(field).is_none())
    {
        return Err(AppError::invalid_input(format!(
            "Unknown field '{unknown}' for {}",
            schema.kind
        )));
    }

    let mut row = NativeRow::new();
    for column in schema.all_columns() {
        if let Some(value) = record.get(column.name) {
            row.push(
                convention.column_name(column.name),
                to_store_value(&column, value)?,
            );
        }
    }
    Ok(row)
}

/// Convert a native row read from a store into the canonical record
///
/// Never fails: malformed list text decodes best-effort, unparseable
/// timestamps are passed through as-is.
#[must_use]
pub fn from_native(schema: &EntitySchema, row: &NativeRow, convention: Convention) -> Record {
    let mut record = Record::new();
    for column in schema.all_columns() {
        let value = row
            .get(&convention.column_name(column.name))
            .map_or(Value::Null, |v| canonical_value(&column, v));
        record.insert(column.name, value);
    }
    record
}

fn canonical_value(column: &ColumnDef, value: &StoreValue) -> Value {
    match (column.ty, value) {
        (ColumnType::JsonList, StoreValue::Text(raw)) => Value::Array(
            raw.as_deref()
                .map(decode_list)
                .unwrap_or_default()
                .into_iter()
                .map(Value::String)
                .collect(),
        ),
        (ColumnType::Timestamp, StoreValue::Timestamp(Some(ts))) => {
            Value::String(format_timestamp(*ts))
        }
        (ColumnType::Timestamp, StoreValue::Text(Some(raw))) => Value::String(
            parse_timestamp(raw).map_or_else(|| raw.clone(), format_timestamp),
        ),
        (ColumnType::Date, StoreValue::Text(Some(raw))) => Value::String(
            parse_date(raw).map_or_else(|| raw.clone(), |d| d.format("%Y-%m-%d").to_string()),
        ),
        (ColumnType::Boolean, StoreValue::Integer(Some(n))) => Value::Bool(*n != 0),
        (ColumnType::Real, StoreValue::Integer(Some(n))) => Value::from(*n as f64),
        (_, StoreValue::Text(Some(s))) => Value::String(s.clone()),
        (_, StoreValue::Integer(Some(n))) => Value::from(*n),
        (_, StoreValue::Real(Some(n))) => Number::from_f64(*n).map_or(Value::Null, Value::Number),
        (_, StoreValue::Bool(Some(b))) => Value::Bool(*b),
        (_, StoreValue::Timestamp(Some(ts))) => Value::String(format_timestamp(*ts)),
        _ => Value::Null,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::persistence::schema::EntityKind;
    use serde_json::json;

    #[test]
    fn naming_round_trips() {
        for field in ["journal_entry_id", "user_id", "id", "created_at", "how_met"] {
            assert_eq!(camel_to_snake(&snake_to_camel(field)), field);
        }
        assert_eq!(snake_to_camel("journal_entry_id"), "journalEntryId");
        assert_eq!(camel_to_snake("userID"), "user_id");
        assert_eq!(camel_to_snake("sleepScore2"), "sleep_score2");
    }

    #[test]
    fn list_round_trip_includes_empty() {
        let cases: Vec<Vec<String>> = vec![
            vec![],
            vec![String::new()],
            vec!["a".to_owned(), "b, c".to_owned()],
            vec!["[not json]".to_owned(), "\"quoted\"".to_owned()],
            vec!["ünïcode".to_owned()],
        ];
        for list in cases {
            assert_eq!(decode_list(&encode_list(&list)), list);
        }
    }

    #[test]
    fn legacy_list_text_is_best_effort() {
        assert_eq!(decode_list("running, lifting ,"), vec!["running", "lifting"]);
        assert_eq!(decode_list("just one"), vec!["just one"]);
        assert_eq!(decode_list("   "), Vec::<String>::new());
        assert_eq!(decode_list("null"), Vec::<String>::new());
        assert_eq!(decode_list("[1, true]"), vec!["1", "true"]);
        assert_eq!(decode_list("{broken"), vec!["{broken"]);
        assert_eq!(decode_list("\"a,b\""), vec!["a", "b"]);
    }

    #[test]
    fn timestamps_normalize_across_representations() {
        let expected = "2024-01-01T10:00:00.000Z";
        for raw in [
            "2024-01-01T10:00:00Z",
            "2024-01-01T12:00:00+02:00",
            "2024-01-01 10:00:00",
            "2024-01-01T10:00:00.000",
        ] {
            let ts = parse_timestamp(raw).unwrap();
            assert_eq!(format_timestamp(ts), expected, "{raw}");
        }
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn camel_case_store_rows_translate_to_canonical() {
        let schema = EntityKind::Story.schema();
        let mut row = NativeRow::new();
        row.push("id", StoreValue::Text(Some("s1".to_owned())));
        row.push("userId", StoreValue::Text(Some("u1".to_owned())));
        row.push("title", StoreValue::Text(Some("Camping".to_owned())));
        row.push("timesTold", StoreValue::Integer(Some(3)));
        row.push("journalEntryId", StoreValue::Text(None));
        row.push(
            "createdAt",
            StoreValue::Timestamp(parse_timestamp("2024-05-01T08:00:00Z")),
        );

        let record = from_native(schema, &row, Convention::CamelCase);
        assert_eq!(record.get_str("user_id"), Some("u1"));
        assert_eq!(record.get_i64("times_told"), Some(3));
        assert_eq!(record.get("journal_entry_id"), Some(&Value::Null));
        assert_eq!(
            record.get_str("created_at"),
            Some("2024-05-01T08:00:00.000Z")
        );
    }

    #[test]
    fn sqlite_rows_decode_lists_and_legacy_timestamps() {
        let schema = EntityKind::Person.schema();
        let mut row = NativeRow::new();
        row.push("interests", StoreValue::Text(Some("[\"chess\",\"hiking\"]".to_owned())));
        row.push("personality_traits", StoreValue::Text(Some("kind, loud".to_owned())));
        row.push("shared_experiences", StoreValue::Text(None));
        row.push("created_at", StoreValue::Text(Some("2024-02-03 04:05:06".to_owned())));

        let record = from_native(schema, &row, Convention::SnakeCase);
        assert_eq!(record.get_list("interests"), vec!["chess", "hiking"]);
        assert_eq!(record.get_list("personality_traits"), vec!["kind", "loud"]);
        assert_eq!(record.get("shared_experiences"), Some(&json!([])));
        assert_eq!(
            record.get_str("created_at"),
            Some("2024-02-03T04:05:06.000Z")
        );
    }

    #[test]
    fn to_native_uses_store_convention() {
        let schema = EntityKind::WellnessEntry.schema();
        let record = Record::try_from(json!({
            "date": "2024-01-01",
            "exercise_minutes": 30,
            "supplements": ["zinc"]
        }))
        .unwrap();

        let row = to_native(schema, &record, Convention::CamelCase).unwrap();
        assert_eq!(
            row.get("exerciseMinutes"),
            Some(&StoreValue::Integer(Some(30)))
        );
        assert_eq!(
            row.get("supplements"),
            Some(&StoreValue::Text(Some("[\"zinc\"]".to_owned())))
        );
        assert_eq!(
            row.get("date"),
            Some(&StoreValue::Text(Some("2024-01-01".to_owned())))
        );
    }

    #[test]
    fn to_native_rejects_unknown_fields() {
        let schema = EntityKind::Joke.schema();
        let record = Record::new().with("punchline_color", "blue");
        let err = to_native(schema, &record, Convention::SnakeCase).unwrap_err();
        assert!(err.message.contains("punchline_color"));
    }
}
