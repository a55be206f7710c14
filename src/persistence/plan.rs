// ABOUTME: Validated, store-independent execution plan for one logical operation
// ABOUTME: Renders the plan into dialect-specific statements and canonical results per store
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Lifelog Contributors

//! Execution plans
//!
//! A [`Plan`] is built once per logical operation, before any store is
//! touched: payloads are validated, ids and timestamps are assigned. The same
//! plan can then run against either store, so a fallback replays exactly the
//! operation the primary was asked to perform.

use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use super::operation::{Filter, Operation, Output};
use super::schema::{EntityKind, EntitySchema, Ownership, SortDirection};
use super::sql::{self, Conflict, Dialect, SqlStatement};
use super::store::{RecordStore, StoreError};
use super::translator::{format_timestamp, from_native, to_native, NativeRow, StoreValue};
use super::validation::{validate_conditions, validate_create, validate_order_field, validate_update};
use crate::errors::{AppError, AppResult};
use crate::models::{AuthContext, Record};

#[derive(Debug, Clone)]
enum Step {
    Insert {
        record: Record,
    },
    Fetch {
        id: String,
    },
    Scan {
        conditions: Record,
        order: (&'static str, SortDirection),
        limit: Option<u32>,
        offset: Option<u32>,
    },
    Modify {
        id: String,
        changes: Record,
    },
    Remove {
        id: String,
    },
    Merge {
        record: Record,
        update_fields: Vec<&'static str>,
    },
}

/// A validated operation ready to run against any store
#[derive(Debug, Clone)]
pub struct Plan {
    schema: &'static EntitySchema,
    operation: &'static str,
    owner: AuthContext,
    step: Step,
}

impl Plan {
    /// Validate an operation and freeze its inputs
    ///
    /// # Errors
    ///
    /// Returns a validation error if the payload or filter is not acceptable
    /// for the entity
    pub fn new(kind: EntityKind, operation: Operation, filter: Filter) -> AppResult<Self> {
        let schema = kind.schema();
        let name = operation.name();
        let Filter {
            owner,
            id,
            equals,
            order_by,
            limit,
            offset,
        } = filter;
        let require_id = |id: Option<String>| {
            id.filter(|id| !id.trim().is_empty()).ok_or_else(|| {
                AppError::invalid_input(format!("A record id is required to {name} {kind}"))
            })
        };

        let step = match operation {
            Operation::Create(payload) => {
                let payload = validate_create(schema, payload)?;
                Step::Insert {
                    record: stamp_new(schema, &owner, payload),
                }
            }
            Operation::Read => Step::Fetch {
                id: require_id(id)?,
            },
            Operation::List => {
                let mut conditions = validate_conditions(schema, equals)?;
                if let Some(id) = id {
                    conditions.insert("id", id);
                }
                let order = match order_by {
                    Some((field, direction)) => (validate_order_field(schema, &field)?, direction),
                    None => schema.default_order,
                };
                Step::Scan {
                    conditions,
                    order,
                    limit,
                    offset,
                }
            }
            Operation::Update(payload) => {
                let mut changes = validate_update(schema, payload)?;
                changes.insert("updated_at", format_timestamp(Utc::now()));
                Step::Modify {
                    id: require_id(id)?,
                    changes,
                }
            }
            Operation::Delete => Step::Remove {
                id: require_id(id)?,
            },
            Operation::Upsert(payload) => {
                if schema.unique.is_empty() {
                    return Err(AppError::invalid_input(format!(
                        "{kind} has no unique key to upsert on"
                    )));
                }
                let payload = validate_create(schema, payload)?;
                let mut update_fields: Vec<&'static str> = payload
                    .fields()
                    .filter_map(|(field, _)| schema.column(field).map(|c| c.name))
                    .filter(|field| !schema.unique.contains(field))
                    .collect();
                update_fields.push("updated_at");
                Step::Merge {
                    record: stamp_new(schema, &owner, payload),
                    update_fields,
                }
            }
        };

        Ok(Self {
            schema,
            operation: name,
            owner,
            step,
        })
    }

    /// Entity the plan operates on
    #[must_use]
    pub const fn kind(&self) -> EntityKind {
        self.schema.kind
    }

    /// Operation name
    #[must_use]
    pub const fn operation(&self) -> &'static str {
        self.operation
    }

    /// Authenticated caller
    #[must_use]
    pub const fn owner(&self) -> &AuthContext {
        &self.owner
    }

    /// Whether running the plan mutates the store
    #[must_use]
    pub const fn is_write(&self) -> bool {
        !matches!(self.step, Step::Fetch { .. } | Step::Scan { .. })
    }

    /// Run against one store
    ///
    /// `Ok(None)` means the store answered and no owned row matched.
    ///
    /// # Errors
    ///
    /// Returns the store's error if any statement fails
    pub async fn run(&self, store: &dyn RecordStore) -> Result<Option<Output>, StoreError> {
        let dialect = store.dialect();
        let schema = self.schema;

        match &self.step {
            Step::Insert { record } => {
                self.check_parents(store, record).await?;
                let row = native(schema, record, dialect)?;
                let statement = sql::insert(dialect, schema, &row, &Conflict::Fail);
                let stored = self.single(store, &statement).await?;
                stored.map(Output::Record).map(Some).ok_or_else(|| {
                    StoreError::Other(format!("insert into {} returned no row", schema.kind))
                })
            }
            Step::Fetch { id } => {
                let conditions = self.scope(dialect, Some(id));
                let statement = sql::select(
                    dialect,
                    schema,
                    &conditions,
                    schema.default_order,
                    Some(1),
                    None,
                );
                Ok(self.single(store, &statement).await?.map(Output::Record))
            }
            Step::Scan {
                conditions,
                order,
                limit,
                offset,
            } => {
                let mut scoped = self.scope(dialect, None);
                for (column, value) in native(schema, conditions, dialect)?.values() {
                    scoped.push(column.clone(), value.clone());
                }
                let statement = sql::select(dialect, schema, &scoped, *order, *limit, *offset);
                debug!(entity = %schema.kind, sql = %statement.sql, "listing records");
                let rows = store.fetch(&statement).await?;
                let records = rows
                    .iter()
                    .map(|row| from_native(schema, row, dialect.convention()))
                    .collect();
                Ok(Some(Output::Records(records)))
            }
            Step::Modify { id, changes } => {
                self.check_parents(store, changes).await?;
                let changes = native(schema, changes, dialect)?;
                let conditions = self.scope(dialect, Some(id));
                let statement = sql::update(dialect, schema, &changes, &conditions);
                Ok(self.single(store, &statement).await?.map(Output::Record))
            }
            Step::Remove { id } => {
                let conditions = self.scope(dialect, Some(id));
                let statement = sql::delete(dialect, schema, &conditions);
                debug!(entity = %schema.kind, sql = %statement.sql, "deleting record");
                let removed = store.execute(&statement).await?;
                Ok((removed > 0).then_some(Output::Deleted(removed)))
            }
            Step::Merge {
                record,
                update_fields,
            } => {
                self.check_parents(store, record).await?;
                let row = native(schema, record, dialect)?;
                let conflict = Conflict::Merge {
                    target: schema
                        .unique
                        .iter()
                        .map(|field| dialect.column_name(field))
                        .collect(),
                    update: update_fields
                        .iter()
                        .map(|field| dialect.column_name(field))
                        .collect(),
                    owner: dialect.column_name(schema.owner_field()),
                };
                let statement = sql::insert(dialect, schema, &row, &conflict);
                // no row back: the key is taken by another user's row
                Ok(self.single(store, &statement).await?.map(Output::Record))
            }
        }
    }

    /// Owner condition, plus the record id when given
    fn scope(&self, dialect: Dialect, id: Option<&String>) -> NativeRow {
        let mut conditions = NativeRow::new();
        conditions.push(
            dialect.column_name(self.schema.owner_field()),
            StoreValue::Text(Some(self.owner.user_key())),
        );
        if let Some(id) = id {
            conditions.push(dialect.column_name("id"), StoreValue::Text(Some(id.clone())));
        }
        conditions
    }

    /// Every parent referenced by `record` must exist and belong to the caller
    async fn check_parents(
        &self,
        store: &dyn RecordStore,
        record: &Record,
    ) -> Result<(), StoreError> {
        let dialect = store.dialect();
        for column in self.schema.columns {
            let Some(fk) = column.references else {
                continue;
            };
            let Some(parent_id) = record.get_str(column.name).filter(|id| !id.is_empty()) else {
                continue;
            };
            let parent = fk.entity.schema();
            let mut conditions = NativeRow::new();
            conditions.push(
                dialect.column_name(parent.owner_field()),
                StoreValue::Text(Some(self.owner.user_key())),
            );
            conditions.push(
                dialect.column_name("id"),
                StoreValue::Text(Some(parent_id.to_owned())),
            );
            let statement = sql::select(
                dialect,
                parent,
                &conditions,
                parent.default_order,
                Some(1),
                None,
            );
            if store.fetch(&statement).await?.is_empty() {
                debug!(
                    entity = %self.schema.kind,
                    parent = %fk.entity,
                    field = column.name,
                    "referenced parent not owned by caller"
                );
                return Err(StoreError::MissingParent(fk.entity));
            }
        }
        Ok(())
    }

    async fn single(
        &self,
        store: &dyn RecordStore,
        statement: &SqlStatement,
    ) -> Result<Option<Record>, StoreError> {
        debug!(
            entity = %self.schema.kind,
            operation = self.operation,
            sql = %statement.sql,
            "running statement"
        );
        let rows = store.fetch(statement).await?;
        Ok(rows
            .first()
            .map(|row| from_native(self.schema, row, store.dialect().convention())))
    }
}

/// Statement inserting a minimal user row for the caller, ignoring conflicts
///
/// # Errors
///
/// Returns an error if the caller identity cannot be rendered as a row
pub fn shadow_user_statement(
    dialect: Dialect,
    owner: &AuthContext,
) -> Result<SqlStatement, StoreError> {
    let schema = EntityKind::User.schema();
    let now = format_timestamp(Utc::now());
    // email is unique, so a blank one would collide with other shadow rows
    let email = if owner.email.trim().is_empty() {
        format!("{}@users.invalid", owner.user_key())
    } else {
        owner.email.clone()
    };
    let record = Record::new()
        .with("id", owner.user_key())
        .with("email", email)
        .with("password_hash", "")
        .with("created_at", now.as_str())
        .with("updated_at", now);
    let row = native(schema, &record, dialect)?;
    Ok(sql::insert(dialect, schema, &row, &Conflict::Ignore))
}

fn stamp_new(schema: &EntitySchema, owner: &AuthContext, mut record: Record) -> Record {
    let now = format_timestamp(Utc::now());
    let id = match schema.ownership {
        Ownership::SelfOwned => owner.user_key(),
        Ownership::UserOwned => {
            record.insert("user_id", owner.user_key());
            Uuid::new_v4().to_string()
        }
    };
    record.insert("id", id);
    record.insert("created_at", now.clone());
    record.insert("updated_at", now);
    record
}

fn native(
    schema: &EntitySchema,
    record: &Record,
    dialect: Dialect,
) -> Result<NativeRow, StoreError> {
    to_native(schema, record, dialect.convention()).map_err(|e| StoreError::Other(e.message))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use serde_json::json;

    fn owner() -> AuthContext {
        AuthContext::new(Uuid::new_v4(), "owner@example.com")
    }

    #[test]
    fn create_assigns_identity_and_timestamps() {
        let auth = owner();
        let payload = Record::try_from(json!({ "content": "hello" })).unwrap();
        let plan = Plan::new(
            EntityKind::JournalEntry,
            Operation::Create(payload),
            Filter::for_owner(&auth),
        )
        .unwrap();

        let Step::Insert { record } = &plan.step else {
            panic!("expected insert step");
        };
        assert_eq!(record.get_str("user_id"), Some(auth.user_key().as_str()));
        assert!(record.id().is_some());
        assert_eq!(record.get_str("created_at"), record.get_str("updated_at"));
        assert!(plan.is_write());
    }

    #[test]
    fn single_record_operations_require_an_id() {
        let auth = owner();
        let err = Plan::new(EntityKind::Goal, Operation::Read, Filter::for_owner(&auth)).unwrap_err();
        assert!(err.message.contains("record id is required"));
        assert!(Plan::new(EntityKind::Goal, Operation::Delete, Filter::for_owner(&auth)).is_err());
    }

    #[test]
    fn upsert_never_overwrites_key_or_creation_time() {
        let auth = owner();
        let payload =
            Record::try_from(json!({ "date": "2024-01-01", "exercise_minutes": 45 })).unwrap();
        let plan = Plan::new(
            EntityKind::WellnessEntry,
            Operation::Upsert(payload),
            Filter::for_owner(&auth),
        )
        .unwrap();

        let Step::Merge { update_fields, .. } = &plan.step else {
            panic!("expected merge step");
        };
        assert_eq!(update_fields, &vec!["exercise_minutes", "updated_at"]);
    }

    #[test]
    fn upsert_requires_a_unique_key() {
        let auth = owner();
        let payload = Record::try_from(json!({ "content": "x" })).unwrap();
        let err = Plan::new(
            EntityKind::JournalEntry,
            Operation::Upsert(payload),
            Filter::for_owner(&auth),
        )
        .unwrap_err();
        assert!(err.message.contains("unique key"));
    }

    #[test]
    fn validation_runs_before_any_store() {
        let auth = owner();
        let payload = Record::try_from(json!({ "title": 7 })).unwrap();
        let err = Plan::new(EntityKind::Goal, Operation::Create(payload), Filter::for_owner(&auth))
            .unwrap_err();
        assert!(err.message.contains("title"));
    }
}
