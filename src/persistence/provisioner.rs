// ABOUTME: Schema provisioner creating tables, indexes, and drifted columns idempotently
// ABOUTME: Process-wide registry guarantees each entity is provisioned at most once per store
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Lifelog Contributors

//! Schema provisioning
//!
//! Provisioning an entity runs `CREATE TABLE IF NOT EXISTS`, its indexes, and
//! then adds any column the live table is missing. Lost races against a
//! concurrent creator are treated as success. The [`ProvisionRegistry`] makes
//! the whole sequence run once per entity per store; concurrent callers wait
//! on the same attempt, and a failed attempt is retried by the next caller.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use super::schema::{EntityKind, EntitySchema};
use super::sql;
use super::store::{RecordStore, StoreError};

/// Concurrency-safe record of which entities have been provisioned
#[derive(Debug, Default)]
pub struct ProvisionRegistry {
    cells: DashMap<EntityKind, Arc<OnceCell<()>>>,
}

impl ProvisionRegistry {
    /// Empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an entity has been provisioned successfully
    #[must_use]
    pub fn is_provisioned(&self, kind: EntityKind) -> bool {
        self.cells
            .get(&kind)
            .is_some_and(|cell| cell.initialized())
    }

    /// Entities provisioned so far
    #[must_use]
    pub fn provisioned(&self) -> Vec<EntityKind> {
        let mut kinds: Vec<EntityKind> = self
            .cells
            .iter()
            .filter(|entry| entry.value().initialized())
            .map(|entry| *entry.key())
            .collect();
        kinds.sort();
        kinds
    }

    /// Run `init` unless the entity is already provisioned
    ///
    /// Concurrent callers for the same entity share one attempt. An error is
    /// returned to every waiter and leaves the entity unprovisioned.
    ///
    /// # Errors
    ///
    /// Returns the error produced by `init`
    pub async fn ensure<F, Fut>(&self, kind: EntityKind, init: F) -> Result<(), StoreError>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<(), StoreError>> + Send,
    {
        let cell = self.cells.entry(kind).or_default().clone();
        cell.get_or_try_init(init).await?;
        Ok(())
    }
}

/// Provisions entity schemas on one store
#[derive(Debug, Default)]
pub struct SchemaProvisioner {
    registry: ProvisionRegistry,
    runs: AtomicUsize,
}

impl SchemaProvisioner {
    /// Provisioner with an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry backing this provisioner
    #[must_use]
    pub const fn registry(&self) -> &ProvisionRegistry {
        &self.registry
    }

    /// Number of provisioning sequences actually executed (not skipped)
    #[must_use]
    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::Relaxed)
    }

    /// Ensure an entity and every entity it references exist on the store
    ///
    /// # Errors
    ///
    /// Returns the first provisioning failure
    pub async fn ensure(&self, store: &dyn RecordStore, kind: EntityKind) -> Result<(), StoreError> {
        for entity in with_ancestors(kind) {
            self.registry
                .ensure(entity, || async {
                    self.runs.fetch_add(1, Ordering::Relaxed);
                    provision_entity(store, entity.schema()).await
                })
                .await?;
        }
        Ok(())
    }

    /// Ensure every known entity exists on the store
    ///
    /// # Errors
    ///
    /// Returns the first provisioning failure
    pub async fn ensure_all(&self, store: &dyn RecordStore) -> Result<(), StoreError> {
        for kind in EntityKind::ALL {
            self.ensure(store, *kind).await?;
        }
        info!(
            store = %store.role(),
            entities = EntityKind::ALL.len(),
            "Schema provisioned"
        );
        Ok(())
    }
}

/// The entity and everything it references, parents first
fn with_ancestors(kind: EntityKind) -> Vec<EntityKind> {
    let mut pending = vec![kind];
    let mut found: Vec<EntityKind> = Vec::new();
    while let Some(next) = pending.pop() {
        if !found.contains(&next) {
            found.push(next);
            pending.extend(next.schema().parents());
        }
    }
    // catalog order lists parents before children
    found.sort_by_key(|k| EntityKind::ALL.iter().position(|candidate| candidate == k));
    found
}

/// Create one entity's table and indexes, then add drifted columns
///
/// Safe to run any number of times and concurrently with itself.
///
/// # Errors
///
/// Returns an error if the table or an index cannot be created for a reason
/// other than a lost creation race
pub async fn provision_entity(
    store: &dyn RecordStore,
    schema: &EntitySchema,
) -> Result<(), StoreError> {
    let dialect = store.dialect();
    let table = dialect.table_name(schema);
    debug!(store = %store.role(), table, "Provisioning table");

    tolerate_race(store.execute_ddl(&sql::create_table(dialect, schema)).await, table)?;
    for statement in sql::create_indexes(dialect, schema) {
        tolerate_race(store.execute_ddl(&statement).await, table)?;
    }

    reconcile_columns(store, schema).await;
    Ok(())
}

/// Add columns present in the catalog but missing from the live table
///
/// Failures are logged and ignored: a concurrent provisioner may have added
/// the column already, and a missing optional column only degrades writes
/// that use it.
async fn reconcile_columns(store: &dyn RecordStore, schema: &EntitySchema) {
    let dialect = store.dialect();
    let table = dialect.table_name(schema);
    let existing = match store.existing_columns(table).await {
        Ok(columns) => columns,
        Err(e) => {
            warn!(store = %store.role(), table, "Could not inspect columns: {e}");
            return;
        }
    };

    for column in schema.all_columns() {
        let name = dialect.column_name(column.name);
        if existing.iter().any(|c| c.eq_ignore_ascii_case(&name)) {
            continue;
        }
        match store
            .execute_ddl(&sql::add_column(dialect, schema, &column))
            .await
        {
            Ok(()) => info!(store = %store.role(), table, column = %name, "Added missing column"),
            Err(e) => debug!(store = %store.role(), table, column = %name, "Column not added: {e}"),
        }
    }
}

fn tolerate_race(result: Result<(), StoreError>, table: &str) -> Result<(), StoreError> {
    match result {
        Err(e) if e.is_benign_ddl_race() => {
            debug!(table, "Concurrent schema creation detected, continuing: {e}");
            Ok(())
        }
        other => other,
    }
}
