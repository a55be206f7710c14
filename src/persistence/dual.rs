// ABOUTME: Dual-store accessor running each logical operation on the primary, falling back to the secondary
// ABOUTME: Explicit attempt state machine, lazy secondary provisioning, and best-effort shadow user rows
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Lifelog Contributors

//! Dual-store accessor
//!
//! Every logical operation is validated once, then attempted on the primary
//! store. When the primary is unconfigured or fails, the identical plan runs
//! on the secondary store after the secondary's schema for that entity has
//! been provisioned. Exactly one store is mutated per logical write; the two
//! stores are never reconciled, so a fallback write is only visible through
//! the secondary until an operator migrates it.
//!
//! A primary that answers "no such row" has answered: that is reported as
//! not found without consulting the secondary. Constraint violations on the
//! primary are answers too and surface as invalid input, and a reference to a
//! parent the caller does not own surfaces as that parent not being found.
//! A primary write whose returned row cannot be decoded is never replayed on
//! the secondary, since the primary may already have committed it.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::operation::{Filter, Operation, Output, Served};
use super::plan::{shadow_user_statement, Plan};
use super::provisioner::SchemaProvisioner;
use super::schema::{EntityKind, Ownership};
use super::store::{RecordStore, StoreError, StoreRole};
use crate::errors::{AppError, AppResult};
use crate::models::AuthContext;

/// Outcome of running one plan across the two stores
#[derive(Debug)]
enum Attempt<T> {
    /// The primary answered
    Primary(T),
    /// The primary failed (or is unconfigured) and the secondary answered
    Secondary { value: T, primary_error: StoreError },
    /// A store refused the operation (no fallback)
    Rejected(StoreError),
    /// The primary ran a write but its result could not be read back (no fallback)
    Unconfirmed(StoreError),
    /// Neither store could serve the operation
    BothFailed {
        primary: StoreError,
        secondary: StoreError,
    },
}

/// Accessor over a primary (networked) and a secondary (embedded) store
pub struct DualStore {
    primary: Option<Arc<dyn RecordStore>>,
    secondary: Arc<dyn RecordStore>,
    primary_schema: SchemaProvisioner,
    secondary_schema: SchemaProvisioner,
}

impl DualStore {
    /// Accessor over the given stores; `None` leaves the primary unconfigured
    #[must_use]
    pub fn new(primary: Option<Arc<dyn RecordStore>>, secondary: Arc<dyn RecordStore>) -> Self {
        Self {
            primary,
            secondary,
            primary_schema: SchemaProvisioner::new(),
            secondary_schema: SchemaProvisioner::new(),
        }
    }

    /// Whether a primary store is configured
    #[must_use]
    pub fn has_primary(&self) -> bool {
        self.primary.is_some()
    }

    /// Primary store, if configured
    #[must_use]
    pub fn primary(&self) -> Option<&Arc<dyn RecordStore>> {
        self.primary.as_ref()
    }

    /// Secondary store
    #[must_use]
    pub const fn secondary(&self) -> &Arc<dyn RecordStore> {
        &self.secondary
    }

    /// Provisioner tracking a store's schema
    #[must_use]
    pub const fn provisioner(&self, role: StoreRole) -> &SchemaProvisioner {
        match role {
            StoreRole::Primary => &self.primary_schema,
            StoreRole::Secondary => &self.secondary_schema,
        }
    }

    /// Provision the primary store for every entity
    ///
    /// The secondary stays lazy: it is provisioned per entity on first fallback.
    /// A primary that cannot be provisioned is logged, not fatal, since every
    /// operation can still fall back.
    pub async fn prepare(&self) {
        let Some(primary) = &self.primary else {
            info!("No primary store configured; all operations use the secondary store");
            return;
        };
        match self.primary_schema.ensure_all(primary.as_ref()).await {
            Ok(()) => info!("Primary store ready: {}", primary.describe()),
            Err(e) => warn!(
                "Primary store {} could not be provisioned, operations will fall back: {e}",
                primary.describe()
            ),
        }
    }

    /// Run one logical operation
    ///
    /// # Errors
    ///
    /// - `invalid_input` / `missing_required_field` when validation fails (no store is touched)
    /// - `resource_not_found` when no row owned by the caller matches
    /// - `storage_unavailable` when both stores fail
    pub async fn execute(
        &self,
        entity: EntityKind,
        operation: Operation,
        filter: Filter,
    ) -> AppResult<Served> {
        let plan = Plan::new(entity, operation, filter)?;

        match self.attempt(&plan).await {
            Attempt::Primary(value) => finish(&plan, value, StoreRole::Primary),
            Attempt::Secondary {
                value,
                primary_error,
            } => {
                if !matches!(primary_error, StoreError::Unconfigured) {
                    info!(
                        entity = %plan.kind(),
                        operation = plan.operation(),
                        "Served by secondary store after primary failure"
                    );
                }
                finish(&plan, value, StoreRole::Secondary)
            }
            Attempt::Rejected(e @ StoreError::MissingParent(_)) => Err(e.into()),
            Attempt::Rejected(e) => Err(AppError::invalid_input(format!(
                "Cannot {} {}: {e}",
                plan.operation(),
                plan.kind()
            ))),
            Attempt::Unconfirmed(e) => {
                error!(
                    entity = %plan.kind(),
                    operation = plan.operation(),
                    "Primary write result unreadable, not retrying on secondary: {e}"
                );
                Err(AppError::database(format!(
                    "Outcome of {} {} on the primary store is unknown: {e}",
                    plan.operation(),
                    plan.kind()
                )))
            }
            Attempt::BothFailed { primary, secondary } => {
                error!(
                    entity = %plan.kind(),
                    operation = plan.operation(),
                    "Both stores failed: primary: {primary}; secondary: {secondary}"
                );
                Err(both_failed(&plan, &primary, &secondary))
            }
        }
    }

    async fn attempt(&self, plan: &Plan) -> Attempt<Option<Output>> {
        let primary_error = match &self.primary {
            None => StoreError::Unconfigured,
            Some(primary) => match self.run_primary(primary.as_ref(), plan).await {
                Ok(value) => return Attempt::Primary(value),
                Err(e) if e.is_rejection() => return Attempt::Rejected(e),
                Err(e @ StoreError::Decode(_)) if plan.is_write() => {
                    return Attempt::Unconfirmed(e)
                }
                Err(e) => {
                    warn!(
                        entity = %plan.kind(),
                        operation = plan.operation(),
                        "Primary store failed, falling back to secondary: {e}"
                    );
                    e
                }
            },
        };

        match self.run_secondary(plan).await {
            Ok(value) => Attempt::Secondary {
                value,
                primary_error,
            },
            Err(e) if e.is_rejection() => Attempt::Rejected(e),
            Err(secondary) => Attempt::BothFailed {
                primary: primary_error,
                secondary,
            },
        }
    }

    async fn run_primary(
        &self,
        store: &dyn RecordStore,
        plan: &Plan,
    ) -> Result<Option<Output>, StoreError> {
        self.primary_schema.ensure(store, plan.kind()).await?;
        plan.run(store).await
    }

    async fn run_secondary(&self, plan: &Plan) -> Result<Option<Output>, StoreError> {
        let store = self.secondary.as_ref();
        self.secondary_schema.ensure(store, plan.kind()).await?;
        if plan.is_write() && plan.kind().schema().ownership == Ownership::UserOwned {
            self.ensure_shadow_user(plan.owner()).await;
        }
        plan.run(store).await
    }

    /// Insert a minimal user row so foreign keys hold in the secondary store
    async fn ensure_shadow_user(&self, owner: &AuthContext) {
        let store = self.secondary.as_ref();
        let result = match shadow_user_statement(store.dialect(), owner) {
            Ok(statement) => store.execute(&statement).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(0) => {}
            Ok(_) => debug!(user_id = %owner.user_id, "Inserted shadow user row"),
            Err(e) => warn!(user_id = %owner.user_id, "Shadow user row not written: {e}"),
        }
    }
}

fn finish(plan: &Plan, value: Option<Output>, served_by: StoreRole) -> AppResult<Served> {
    value
        .map(|output| Served { output, served_by })
        .ok_or_else(|| AppError::not_found(plan.kind().name()))
}

fn both_failed(plan: &Plan, primary: &StoreError, secondary: &StoreError) -> AppError {
    let primary = match primary {
        StoreError::Unconfigured => "not configured".to_owned(),
        other => other.to_string(),
    };
    let mut message = format!(
        "Storage unavailable for {} {}: primary store error: {primary}; secondary store error: {secondary}",
        plan.operation(),
        plan.kind()
    );
    if secondary.is_read_only() {
        message.push_str(
            ". The embedded database location is read-only; set LIFELOG_SQLITE_DIR to a writable directory",
        );
    }
    AppError::storage_unavailable(message)
}
