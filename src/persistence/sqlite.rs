// ABOUTME: Embedded SQLite store backing the secondary side of the dual-store accessor
// ABOUTME: WAL-mode pool with busy timeout and foreign keys; binds timestamps as text
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Lifelog Contributors

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use sqlx::sqlite::{
    SqliteArguments, SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow,
};
use sqlx::{query::Query, Row, Sqlite, SqlitePool};
use tracing::info;

use super::schema::ColumnType;
use super::sql::{Dialect, SqlStatement};
use super::store::{RecordStore, StoreError, StoreRole};
use super::translator::{format_timestamp, NativeRow, StoreValue};
use crate::errors::{AppError, AppResult};

/// SQLite-backed record store
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    path: Option<PathBuf>,
    role: StoreRole,
}

impl SqliteStore {
    /// Open (creating if missing) a database file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or created
    pub async fn open(path: &Path, busy_timeout: Duration) -> AppResult<Self> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(busy_timeout)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| {
                AppError::database(format!(
                    "Failed to open SQLite database at {}: {e}",
                    path.display()
                ))
            })?;

        info!("SQLite store opened at {}", path.display());
        Ok(Self {
            pool,
            path: Some(path.to_path_buf()),
            role: StoreRole::Secondary,
        })
    }

    /// Private in-memory database
    ///
    /// A single connection is kept alive for the pool's lifetime so the
    /// database is not dropped between statements.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established
    pub async fn in_memory() -> AppResult<Self> {
        let options = SqliteConnectOptions::new()
            .in_memory(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| AppError::database(format!("Failed to open in-memory SQLite: {e}")))?;

        Ok(Self {
            pool,
            path: None,
            role: StoreRole::Secondary,
        })
    }

    /// Play a different role (a SQLite primary is useful for local runs and tests)
    #[must_use]
    pub const fn with_role(mut self, role: StoreRole) -> Self {
        self.role = role;
        self
    }

    /// Underlying pool
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Database file, if file-backed
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

fn bind_all<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    params: &[StoreValue],
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    for param in params {
        query = match param {
            StoreValue::Text(v) => query.bind(v.clone()),
            StoreValue::Integer(v) => query.bind(*v),
            StoreValue::Real(v) => query.bind(*v),
            StoreValue::Bool(v) => query.bind(*v),
            StoreValue::Timestamp(v) => query.bind(v.map(format_timestamp)),
        };
    }
    query
}

/// Decode one column, tolerating the loose typing of SQLite storage classes
fn decode(row: &SqliteRow, index: usize, ty: ColumnType) -> StoreValue {
    match ty {
        ColumnType::Text | ColumnType::Date | ColumnType::JsonList | ColumnType::Timestamp => {
            let text = row
                .try_get::<Option<String>, _>(index)
                .ok()
                .flatten()
                .or_else(|| {
                    row.try_get::<Option<i64>, _>(index)
                        .ok()
                        .flatten()
                        .map(|n| n.to_string())
                });
            StoreValue::Text(text)
        }
        ColumnType::Integer => StoreValue::Integer(
            row.try_get::<Option<i64>, _>(index)
                .ok()
                .flatten()
                .or_else(|| {
                    row.try_get::<Option<f64>, _>(index)
                        .ok()
                        .flatten()
                        .map(|f| f.round() as i64)
                }),
        ),
        ColumnType::Real => StoreValue::Real(
            row.try_get::<Option<f64>, _>(index)
                .ok()
                .flatten()
                .or_else(|| {
                    row.try_get::<Option<i64>, _>(index)
                        .ok()
                        .flatten()
                        .map(|n| n as f64)
                }),
        ),
        ColumnType::Boolean => StoreValue::Bool(row.try_get::<Option<bool>, _>(index).ok().flatten()),
    }
}

#[async_trait]
impl RecordStore for SqliteStore {
    fn role(&self) -> StoreRole {
        self.role
    }

    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn describe(&self) -> String {
        self.path.as_ref().map_or_else(
            || "SQLite (in-memory)".to_owned(),
            |path| format!("SQLite ({})", path.display()),
        )
    }

    async fn execute_ddl(&self, sql: &str) -> Result<(), StoreError> {
        sqlx::query(sql).execute(&self.pool).await?;
        Ok(())
    }

    async fn existing_columns(&self, table: &str) -> Result<Vec<String>, StoreError> {
        let rows = sqlx::query("SELECT name FROM pragma_table_info(?1)")
            .bind(table)
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|row| row.try_get::<String, _>("name").map_err(StoreError::from))
            .collect()
    }

    async fn fetch(&self, statement: &SqlStatement) -> Result<Vec<NativeRow>, StoreError> {
        let rows = bind_all(sqlx::query(&statement.sql), &statement.params)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .iter()
            .map(|row| {
                let mut native = NativeRow::new();
                for (index, (column, ty)) in statement.columns.iter().enumerate() {
                    native.push(column.clone(), decode(row, index, *ty));
                }
                native
            })
            .collect())
    }

    async fn execute(&self, statement: &SqlStatement) -> Result<u64, StoreError> {
        let result = bind_all(sqlx::query(&statement.sql), &statement.params)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
