// ABOUTME: Shared test utilities and setup functions for integration tests
// ABOUTME: Provides store construction, failing-store doubles, and caller identities
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Lifelog Contributors
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]
#![allow(
    dead_code,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::module_name_repetitions,
    clippy::too_many_lines,
    clippy::uninlined_format_args,
    clippy::redundant_closure_for_method_calls
)]
//! Shared test utilities for `lifelog_server`

use std::env;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use lifelog_server::models::{AuthContext, Record};
use lifelog_server::persistence::sql::{Dialect, SqlStatement};
use lifelog_server::persistence::translator::NativeRow;
use lifelog_server::persistence::{
    DualStore, EntityKind, Filter, Operation, RecordStore, SqliteStore, StoreError, StoreRole,
};
use uuid::Uuid;

static INIT_LOGGER: Once = Once::new();

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let log_level = match env::var("TEST_LOG").as_deref() {
            Ok("TRACE") => tracing::Level::TRACE,
            Ok("DEBUG") => tracing::Level::DEBUG,
            Ok("INFO") => tracing::Level::INFO,
            Ok("WARN" | "ERROR") | _ => tracing::Level::WARN,
        };

        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_test_writer()
            .init();
    });
}

/// Fresh caller identity
pub fn test_user(label: &str) -> AuthContext {
    let id = Uuid::new_v4();
    AuthContext::new(id, format!("{label}-{}@example.com", id.as_simple()))
}

/// Embedded store in memory
pub async fn memory_store() -> Result<Arc<SqliteStore>> {
    Ok(Arc::new(SqliteStore::in_memory().await?))
}

/// Embedded store backed by a file
pub async fn file_store(path: &Path) -> Result<Arc<SqliteStore>> {
    Ok(Arc::new(
        SqliteStore::open(path, Duration::from_secs(5)).await?,
    ))
}

/// Accessor with no primary and an in-memory secondary
pub async fn fallback_only() -> Result<(DualStore, Arc<SqliteStore>)> {
    init_test_logging();
    let secondary = memory_store().await?;
    let store = DualStore::new(None, secondary.clone());
    Ok((store, secondary))
}

/// Accessor whose primary always fails
pub async fn with_failing_primary() -> Result<(DualStore, Arc<FailingStore>, Arc<SqliteStore>)> {
    init_test_logging();
    let primary = Arc::new(FailingStore::new(StoreRole::Primary, "connection refused"));
    let secondary = memory_store().await?;
    let store = DualStore::new(Some(primary.clone()), secondary.clone());
    Ok((store, primary, secondary))
}

/// Accessor with a working in-memory SQLite primary
pub async fn with_sqlite_primary() -> Result<(DualStore, Arc<SqliteStore>, Arc<SqliteStore>)> {
    init_test_logging();
    let primary = Arc::new(SqliteStore::in_memory().await?.with_role(StoreRole::Primary));
    let secondary = memory_store().await?;
    let store = DualStore::new(Some(primary.clone()), secondary.clone());
    store.prepare().await;
    Ok((store, primary, secondary))
}

/// Create the caller's user row (needed when a real primary enforces foreign keys)
pub async fn register_user(store: &DualStore, auth: &AuthContext) -> Result<Record> {
    let payload = Record::new().with("email", auth.email.as_str());
    Ok(store
        .execute(EntityKind::User, Operation::Create(payload), Filter::for_owner(auth))
        .await?
        .into_record()?)
}

/// Create one journal entry
pub async fn journal(
    store: &DualStore,
    auth: &AuthContext,
    content: &str,
    mood: Option<&str>,
) -> Result<Record> {
    let mut payload = Record::new().with("content", content);
    if let Some(mood) = mood {
        payload.insert("mood", mood);
    }
    Ok(store
        .execute(
            EntityKind::JournalEntry,
            Operation::Create(payload),
            Filter::for_owner(auth),
        )
        .await?
        .into_record()?)
}

/// Store double that fails every call and counts them
pub struct FailingStore {
    role: StoreRole,
    message: String,
    calls: AtomicUsize,
}

impl FailingStore {
    pub fn new(role: StoreRole, message: &str) -> Self {
        Self {
            role,
            message: message.to_owned(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn fail<T>(&self) -> Result<T, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::Other(self.message.clone()))
    }
}

#[async_trait]
impl RecordStore for FailingStore {
    fn role(&self) -> StoreRole {
        self.role
    }

    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn describe(&self) -> String {
        format!("failing store ({})", self.message)
    }

    async fn execute_ddl(&self, _sql: &str) -> Result<(), StoreError> {
        self.fail()
    }

    async fn existing_columns(&self, _table: &str) -> Result<Vec<String>, StoreError> {
        self.fail()
    }

    async fn fetch(&self, _statement: &SqlStatement) -> Result<Vec<NativeRow>, StoreError> {
        self.fail()
    }

    async fn execute(&self, _statement: &SqlStatement) -> Result<u64, StoreError> {
        self.fail()
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.fail()
    }
}
