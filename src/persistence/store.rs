// ABOUTME: RecordStore trait implemented by the embedded and networked stores
// ABOUTME: Defines store roles and the typed StoreError classified from driver errors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Lifelog Contributors

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::schema::EntityKind;
use super::sql::{Dialect, SqlStatement};
use super::translator::NativeRow;
use crate::errors::AppError;

/// Which side of the dual-store accessor a store plays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreRole {
    /// Networked store, always tried first
    Primary,
    /// Embedded fallback store
    Secondary,
}

impl StoreRole {
    /// Lowercase name used in logs and payloads
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Secondary => "secondary",
        }
    }
}

impl fmt::Display for StoreRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure reported by a single store
#[derive(Debug, Error)]
pub enum StoreError {
    /// No store configured for this role
    #[error("store is not configured")]
    Unconfigured,
    /// The statement violated a unique, foreign key, not-null or check constraint
    #[error("constraint violation: {0}")]
    Constraint(String),
    /// Driver or connection failure
    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
    /// A referenced parent row is missing or belongs to another user
    #[error("referenced {0} does not exist")]
    MissingParent(EntityKind),
    /// A row came back but a column could not be decoded
    #[error("decode error: {0}")]
    Decode(String),
    /// Filesystem failure around the embedded file
    #[error("filesystem error: {0}")]
    Io(#[from] std::io::Error),
    /// Anything else (injected test failures, unrepresentable values)
    #[error("{0}")]
    Other(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(error: sqlx::Error) -> Self {
        let constraint = error.as_database_error().is_some_and(|db| {
            matches!(
                db.kind(),
                sqlx::error::ErrorKind::UniqueViolation
                    | sqlx::error::ErrorKind::ForeignKeyViolation
                    | sqlx::error::ErrorKind::NotNullViolation
                    | sqlx::error::ErrorKind::CheckViolation
            )
        });
        if constraint {
            Self::Constraint(error.to_string())
        } else {
            Self::Database(error)
        }
    }
}

impl From<StoreError> for AppError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Constraint(_) => Self::invalid_input(error.to_string()),
            StoreError::MissingParent(kind) => Self::not_found(kind.name()),
            StoreError::Unconfigured | StoreError::Io(_) => {
                Self::storage_unavailable(error.to_string())
            }
            StoreError::Database(_) | StoreError::Decode(_) | StoreError::Other(_) => {
                Self::database(error.to_string())
            }
        }
    }
}

impl StoreError {
    /// Whether the store answered by refusing the statement, so another store
    /// would refuse it too
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        matches!(self, Self::Constraint(_) | Self::MissingParent(_))
    }

    /// Whether the failure points at a read-only filesystem or database file
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        if let Self::Io(io) = self {
            // EROFS
            if io.raw_os_error() == Some(30) {
                return true;
            }
        }
        let message = self.to_string().to_lowercase();
        ["readonly", "read-only", "read only"]
            .iter()
            .any(|needle| message.contains(needle))
    }

    /// Whether a DDL failure is a lost "if not exists" race that leaves the
    /// schema in the intended state
    #[must_use]
    pub fn is_benign_ddl_race(&self) -> bool {
        if matches!(self, Self::Constraint(_)) {
            // concurrent CREATE TABLE in PostgreSQL collides on pg_type
            return true;
        }
        let message = self.to_string().to_lowercase();
        message.contains("already exists") || message.contains("duplicate column")
    }
}

/// A SQL store the accessor can run statements against
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Role this store plays
    fn role(&self) -> StoreRole;

    /// SQL dialect and naming convention of the store
    fn dialect(&self) -> Dialect;

    /// Short human-readable description for logs and health output
    fn describe(&self) -> String;

    /// Execute a schema statement
    async fn execute_ddl(&self, sql: &str) -> Result<(), StoreError>;

    /// Column names currently present on a table (empty if the table is missing)
    async fn existing_columns(&self, table: &str) -> Result<Vec<String>, StoreError>;

    /// Run a statement that yields rows, decoding the statement's declared columns
    async fn fetch(&self, statement: &SqlStatement) -> Result<Vec<NativeRow>, StoreError>;

    /// Run a statement for its side effect, returning the affected row count
    async fn execute(&self, statement: &SqlStatement) -> Result<u64, StoreError>;

    /// Cheap reachability check
    async fn ping(&self) -> Result<(), StoreError>;
}
