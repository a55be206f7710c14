// ABOUTME: Persistence layer: dual-store accessor over a networked primary and an embedded secondary
// ABOUTME: Entity catalog, record translation, schema provisioning, and store implementations
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Lifelog Contributors

//! # Persistence
//!
//! Callers use [`DualStore::execute`] with an [`EntityKind`], an
//! [`Operation`] and an owner-scoped [`Filter`], and receive canonical
//! [`Record`](crate::models::Record)s tagged with the store that served them.

/// Dual-store accessor with fallback
pub mod dual;
/// Builds the accessor from configuration
pub mod factory;
/// Operations, filters, and results
pub mod operation;
/// Validated per-operation execution plans
pub mod plan;
/// PostgreSQL primary store
#[cfg(feature = "postgresql")]
pub mod postgres;
/// Idempotent schema provisioning
pub mod provisioner;
/// Static entity catalog
pub mod schema;
/// Dialect-aware SQL builder
pub mod sql;
/// Embedded SQLite store
pub mod sqlite;
/// Store trait and errors
pub mod store;
/// Native row <-> canonical record translation
pub mod translator;
/// Boundary validation of payloads
pub mod validation;

pub use dual::DualStore;
pub use operation::{Filter, Operation, Output, Served};
pub use provisioner::{ProvisionRegistry, SchemaProvisioner};
pub use schema::{EntityKind, EntitySchema, SortDirection};
pub use sqlite::SqliteStore;
pub use store::{RecordStore, StoreError, StoreRole};
