// ABOUTME: Boundary validation of caller payloads against the static entity schema
// ABOUTME: Normalizes keys and coerces values to canonical form before any store access
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Lifelog Contributors

use serde_json::Value;

use super::schema::{ColumnDef, ColumnType, EntitySchema};
use super::translator::{
    canonicalize_keys, decode_list, format_timestamp, parse_date, parse_timestamp,
};
use crate::errors::{AppError, AppResult};
use crate::models::record::json_type_name;
use crate::models::Record;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Create,
    Update,
    Condition,
}

/// Validate a create (or upsert) payload
///
/// # Errors
///
/// Returns an error for unknown or server-managed fields, mistyped values,
/// or missing required fields
pub fn validate_create(schema: &EntitySchema, payload: Record) -> AppResult<Record> {
    let record = validate_fields(schema, payload, Mode::Create)?;
    for column in schema.columns.iter().filter(|c| c.required) {
        if record.get(column.name).filter(|v| !v.is_null()).is_none() {
            return Err(AppError::missing_field(column.name));
        }
    }
    Ok(record)
}

/// Validate a partial update payload
///
/// # Errors
///
/// Returns an error for unknown or server-managed fields, mistyped values,
/// nulls written to required fields, or an empty payload
pub fn validate_update(schema: &EntitySchema, payload: Record) -> AppResult<Record> {
    let record = validate_fields(schema, payload, Mode::Update)?;
    if record.is_empty() {
        return Err(AppError::invalid_input(format!(
            "Update for {} has no fields",
            schema.kind
        )));
    }
    Ok(record)
}

/// Validate equality conditions used to filter list operations
///
/// # Errors
///
/// Returns an error for unknown fields, owner fields, or mistyped values
pub fn validate_conditions(schema: &EntitySchema, conditions: Record) -> AppResult<Record> {
    validate_fields(schema, conditions, Mode::Condition)
}

/// Resolve an ordering field to its canonical name
///
/// # Errors
///
/// Returns an error if the field is not a column of the entity
pub fn validate_order_field(schema: &EntitySchema, field: &str) -> AppResult<&'static str> {
    let canonical = super::translator::camel_to_snake(field);
    schema
        .column(&canonical)
        .map(|column| column.name)
        .ok_or_else(|| {
            AppError::invalid_input(format!("Cannot order {} by unknown field '{field}'", schema.kind))
        })
}

fn validate_fields(schema: &EntitySchema, payload: Record, mode: Mode) -> AppResult<Record> {
    let payload = canonicalize_keys(payload);
    let mut out = Record::new();

    for (field, value) in payload.into_map() {
        let column = schema.column(&field).ok_or_else(|| {
            AppError::invalid_input(format!("Unknown field '{field}' for {}", schema.kind))
        })?;

        if column.name == schema.owner_field() || column.name == "user_id" {
            return Err(AppError::invalid_input(format!(
                "Field '{field}' is taken from the authenticated user and cannot be supplied"
            )));
        }
        if column.system && mode != Mode::Condition {
            return Err(AppError::invalid_input(format!(
                "Field '{field}' is managed by the server"
            )));
        }

        let value = coerce(&column, value, mode)?;
        out.insert(column.name, value);
    }

    Ok(out)
}

fn coerce(column: &ColumnDef, value: Value, mode: Mode) -> AppResult<Value> {
    if value.is_null() {
        return match (mode, column.ty) {
            (Mode::Condition, _) => Ok(Value::Null),
            (_, ColumnType::JsonList) => Ok(Value::Array(Vec::new())),
            (Mode::Create, _) if column.required => Err(AppError::missing_field(column.name)),
            (Mode::Update, _) if column.required => Err(AppError::invalid_input(format!(
                "Field '{}' cannot be null",
                column.name
            ))),
            _ => Ok(Value::Null),
        };
    }

    let invalid = |expected: &str, got: &Value| {
        AppError::invalid_input(format!(
            "Field '{}' must be {expected}, got {}",
            column.name,
            json_type_name(got)
        ))
    };

    match column.ty {
        ColumnType::Text => match value {
            Value::String(s) if column.required && s.trim().is_empty() && mode != Mode::Condition => {
                Err(AppError::missing_field(column.name))
            }
            Value::String(s) => Ok(Value::String(s)),
            other => Err(invalid("a string", &other)),
        },
        ColumnType::Integer => integer_value(&value)
            .map(Value::from)
            .ok_or_else(|| invalid("an integer", &value)),
        ColumnType::Real => real_value(&value)
            .map(Value::from)
            .ok_or_else(|| invalid("a number", &value)),
        ColumnType::Boolean => bool_value(&value)
            .map(Value::Bool)
            .ok_or_else(|| invalid("a boolean", &value)),
        ColumnType::Date => value
            .as_str()
            .and_then(parse_date)
            .map(|d| Value::String(d.format("%Y-%m-%d").to_string()))
            .ok_or_else(|| invalid("a YYYY-MM-DD date", &value)),
        ColumnType::Timestamp => value
            .as_str()
            .and_then(parse_timestamp)
            .map(|ts| Value::String(format_timestamp(ts)))
            .ok_or_else(|| invalid("an RFC 3339 timestamp", &value)),
        ColumnType::JsonList => match value {
            Value::Array(items) => Ok(Value::Array(
                items
                    .into_iter()
                    .map(|item| match item {
                        Value::String(s) => Value::String(s),
                        other => Value::String(other.to_string()),
                    })
                    .collect(),
            )),
            Value::String(raw) => Ok(Value::Array(
                decode_list(&raw).into_iter().map(Value::String).collect(),
            )),
            other => Err(invalid("a list of strings", &other)),
        },
    }
}

fn integer_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.fract().abs() < f64::EPSILON)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn real_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

fn bool_value(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::errors::ErrorCode;
    use crate::persistence::schema::EntityKind;
    use serde_json::json;

    fn record(value: Value) -> Record {
        Record::try_from(value).unwrap()
    }

    #[test]
    fn camel_case_payloads_are_normalized() {
        let schema = EntityKind::WellnessEntry.schema();
        let out = validate_create(
            schema,
            record(json!({ "date": "2024-01-01", "exerciseMinutes": "30", "sleepScore": 82.0 })),
        )
        .unwrap();
        assert_eq!(out.get_i64("exercise_minutes"), Some(30));
        assert_eq!(out.get_i64("sleep_score"), Some(82));
    }

    #[test]
    fn caller_cannot_choose_owner() {
        let schema = EntityKind::JournalEntry.schema();
        let err = validate_create(
            schema,
            record(json!({ "content": "hi", "userId": "someone-else" })),
        )
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidInput);
        assert!(err.message.contains("authenticated user"));
    }

    #[test]
    fn system_fields_are_rejected() {
        let schema = EntityKind::Goal.schema();
        let err = validate_update(schema, record(json!({ "created_at": "2024-01-01T00:00:00Z" })))
            .unwrap_err();
        assert!(err.message.contains("managed by the server"));
    }

    #[test]
    fn required_fields_are_enforced() {
        let schema = EntityKind::Story.schema();
        let err = validate_create(schema, record(json!({ "title": "x", "content": "   " })))
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::MissingRequiredField);
        assert!(err.message.contains("content"));

        let err = validate_create(schema, record(json!({ "content": "y" }))).unwrap_err();
        assert!(err.message.contains("title"));
    }

    #[test]
    fn mistyped_values_name_the_field() {
        let schema = EntityKind::Joke.schema();
        let err = validate_update(schema, record(json!({ "times_told": "often" }))).unwrap_err();
        assert!(err.message.contains("times_told"));
        assert!(err.message.contains("integer"));
    }

    #[test]
    fn list_fields_accept_legacy_text_and_null() {
        let schema = EntityKind::Person.schema();
        let out = validate_update(
            schema,
            record(json!({ "interests": "chess, climbing", "personality_traits": null })),
        )
        .unwrap();
        assert_eq!(out.get_list("interests"), vec!["chess", "climbing"]);
        assert_eq!(out.get("personality_traits"), Some(&json!([])));
    }

    #[test]
    fn empty_update_is_rejected() {
        let schema = EntityKind::Goal.schema();
        assert!(validate_update(schema, Record::new()).is_err());
    }

    #[test]
    fn conditions_allow_nulls_but_not_owner() {
        let schema = EntityKind::JournalEntry.schema();
        let out = validate_conditions(schema, record(json!({ "mood": null }))).unwrap();
        assert_eq!(out.get("mood"), Some(&Value::Null));
        assert!(validate_conditions(schema, record(json!({ "user_id": "x" }))).is_err());
    }

    #[test]
    fn order_fields_resolve_from_camel_case() {
        let schema = EntityKind::WellnessEntry.schema();
        assert_eq!(validate_order_field(schema, "createdAt").unwrap(), "created_at");
        assert!(validate_order_field(schema, "mood").is_err());
    }
}
