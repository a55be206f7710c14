// ABOUTME: Logical operations, owner-scoped filters, and results of the dual-store accessor
// ABOUTME: Results report which store served them
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Lifelog Contributors

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use super::schema::SortDirection;
use super::store::StoreRole;
use crate::errors::{AppError, AppResult};
use crate::models::{AuthContext, Record};

/// Logical operation on one entity
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Insert a new record
    Create(Record),
    /// Fetch one record by id
    Read,
    /// Fetch all matching records
    List,
    /// Partially update one record by id
    Update(Record),
    /// Delete one record by id
    Delete,
    /// Insert, or update the row sharing the entity's unique key
    Upsert(Record),
}

impl Operation {
    /// Short name for logs and error messages
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Create(_) => "create",
            Self::Read => "read",
            Self::List => "list",
            Self::Update(_) => "update",
            Self::Delete => "delete",
            Self::Upsert(_) => "upsert",
        }
    }

    /// Whether the operation mutates the store
    #[must_use]
    pub const fn is_write(&self) -> bool {
        !matches!(self, Self::Read | Self::List)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Owner-scoped selection of records
///
/// The owner is mandatory, so every statement built from a filter is
/// restricted to the authenticated caller's rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    /// Authenticated caller
    pub owner: AuthContext,
    /// Record id for single-record operations
    pub id: Option<String>,
    /// Equality conditions on canonical fields
    pub equals: Record,
    /// Ordering override (canonical or camelCase field name)
    pub order_by: Option<(String, SortDirection)>,
    /// Maximum number of rows
    pub limit: Option<u32>,
    /// Rows to skip
    pub offset: Option<u32>,
}

impl Filter {
    /// Everything owned by the caller
    #[must_use]
    pub fn for_owner(owner: &AuthContext) -> Self {
        Self {
            owner: owner.clone(),
            id: None,
            equals: Record::new(),
            order_by: None,
            limit: None,
            offset: None,
        }
    }

    /// Restrict to one record id
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Add an equality condition
    #[must_use]
    pub fn where_eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.equals.insert(field, value);
        self
    }

    /// Override the entity's default ordering
    #[must_use]
    pub fn order_by(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.order_by = Some((field.into(), direction));
        self
    }

    /// Cap the number of rows
    #[must_use]
    pub const fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Skip rows
    #[must_use]
    pub const fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }
}

/// Result of a logical operation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Output {
    /// Single record (create, read, update, upsert)
    Record(Record),
    /// Zero or more records (list)
    Records(Vec<Record>),
    /// Rows removed (delete)
    Deleted(u64),
}

/// An output together with the store that produced it
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Served {
    /// Operation result
    pub output: Output,
    /// Store that served the operation
    pub served_by: StoreRole,
}

impl Served {
    /// Single record result
    ///
    /// # Errors
    ///
    /// Returns an error if the operation did not produce a single record
    pub fn into_record(self) -> AppResult<Record> {
        match self.output {
            Output::Record(record) => Ok(record),
            other => Err(AppError::internal(format!(
                "Expected a single record, got {}",
                output_kind(&other)
            ))),
        }
    }

    /// List result
    ///
    /// # Errors
    ///
    /// Returns an error if the operation did not produce a list
    pub fn into_records(self) -> AppResult<Vec<Record>> {
        match self.output {
            Output::Records(records) => Ok(records),
            other => Err(AppError::internal(format!(
                "Expected a list of records, got {}",
                output_kind(&other)
            ))),
        }
    }

    /// Number of deleted rows
    ///
    /// # Errors
    ///
    /// Returns an error if the operation was not a delete
    pub fn into_deleted(self) -> AppResult<u64> {
        match self.output {
            Output::Deleted(count) => Ok(count),
            other => Err(AppError::internal(format!(
                "Expected a delete count, got {}",
                output_kind(&other)
            ))),
        }
    }
}

const fn output_kind(output: &Output) -> &'static str {
    match output {
        Output::Record(_) => "a single record",
        Output::Records(_) => "a list",
        Output::Deleted(_) => "a delete count",
    }
}
