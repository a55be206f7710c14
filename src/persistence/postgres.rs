// ABOUTME: Networked PostgreSQL store backing the primary side of the dual-store accessor
// ABOUTME: Lazily connected pool so an unreachable server degrades to fallback instead of startup failure
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Lifelog Contributors

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::postgres::{PgArguments, PgPoolOptions, PgRow};
use sqlx::{query::Query, PgPool, Postgres, Row};
use tracing::info;

use super::schema::ColumnType;
use super::sql::{Dialect, SqlStatement};
use super::store::{RecordStore, StoreError, StoreRole};
use super::translator::{NativeRow, StoreValue};
use crate::config::environment::PostgresPoolConfig;
use crate::config::redact_database_url;
use crate::errors::{AppError, AppResult};

/// PostgreSQL-backed record store
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
    redacted_url: String,
}

impl PostgresStore {
    /// Build a pool for the given URL
    ///
    /// Connections are opened on first use, so an unreachable server shows up
    /// as per-operation errors (and therefore fallbacks) rather than a startup
    /// failure.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be parsed
    pub fn connect_lazy(database_url: &str, pool_config: &PostgresPoolConfig) -> AppResult<Self> {
        let max_connections = pool_config.max_connections;
        let min_connections = pool_config.min_connections;
        let acquire_timeout_secs = pool_config.acquire_timeout_secs;
        info!(
            "PostgreSQL pool config: max_connections={max_connections}, min_connections={min_connections}, timeout={acquire_timeout_secs}s"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(acquire_timeout_secs))
            .idle_timeout(Some(Duration::from_secs(300)))
            .max_lifetime(Some(Duration::from_secs(600)))
            .test_before_acquire(true)
            .connect_lazy(database_url)
            .map_err(|e| AppError::config(format!("Invalid PostgreSQL URL: {e}")))?;

        Ok(Self {
            pool,
            redacted_url: redact_database_url(database_url),
        })
    }

    /// Underlying pool
    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn bind_all<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    params: &[StoreValue],
) -> Query<'q, Postgres, PgArguments> {
    for param in params {
        query = match param {
            StoreValue::Text(v) => query.bind(v.clone()),
            StoreValue::Integer(v) => query.bind(*v),
            StoreValue::Real(v) => query.bind(*v),
            StoreValue::Bool(v) => query.bind(*v),
            StoreValue::Timestamp(v) => query.bind(*v),
        };
    }
    query
}

fn decode(row: &PgRow, index: usize, ty: ColumnType) -> Result<StoreValue, StoreError> {
    let value = match ty {
        ColumnType::Text | ColumnType::Date | ColumnType::JsonList => {
            row.try_get::<Option<String>, _>(index).map(StoreValue::Text)
        }
        ColumnType::Integer => row.try_get::<Option<i64>, _>(index).map(StoreValue::Integer),
        ColumnType::Real => row.try_get::<Option<f64>, _>(index).map(StoreValue::Real),
        ColumnType::Boolean => row.try_get::<Option<bool>, _>(index).map(StoreValue::Bool),
        // tables created outside this server may use "timestamp" without a zone
        ColumnType::Timestamp => row
            .try_get::<Option<DateTime<Utc>>, _>(index)
            .or_else(|_| {
                row.try_get::<Option<NaiveDateTime>, _>(index)
                    .map(|naive| naive.map(|n| n.and_utc()))
            })
            .map(StoreValue::Timestamp),
    };
    value.map_err(|e| StoreError::Decode(format!("column {index}: {e}")))
}

#[async_trait]
impl RecordStore for PostgresStore {
    fn role(&self) -> StoreRole {
        StoreRole::Primary
    }

    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    fn describe(&self) -> String {
        format!("PostgreSQL ({})", self.redacted_url)
    }

    async fn execute_ddl(&self, sql: &str) -> Result<(), StoreError> {
        sqlx::query(sql).execute(&self.pool).await?;
        Ok(())
    }

    async fn existing_columns(&self, table: &str) -> Result<Vec<String>, StoreError> {
        let rows = sqlx::query(
            "SELECT column_name FROM information_schema.columns \
             WHERE table_schema = current_schema() AND table_name = $1",
        )
        .bind(table)
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|row| row.try_get::<String, _>("column_name").map_err(StoreError::from))
            .collect()
    }

    async fn fetch(&self, statement: &SqlStatement) -> Result<Vec<NativeRow>, StoreError> {
        let rows = bind_all(sqlx::query(&statement.sql), &statement.params)
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| {
                let mut native = NativeRow::new();
                for (index, (column, ty)) in statement.columns.iter().enumerate() {
                    native.push(column.clone(), decode(row, index, *ty)?);
                }
                Ok(native)
            })
            .collect()
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
