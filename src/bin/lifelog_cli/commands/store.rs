// ABOUTME: Store maintenance commands for lifelog-cli
// ABOUTME: Schema provisioning for either store and a health report
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Lifelog Contributors

use std::sync::Arc;

use lifelog_server::config::ServerConfig;
use lifelog_server::errors::{AppError, AppResult};
use lifelog_server::health::{HealthChecker, HealthStatus};
use lifelog_server::persistence::{factory, DualStore, EntityKind, StoreRole};
use tracing::{info, warn};

/// Provision every entity in the primary store, and optionally the fallback
pub async fn provision(config: &ServerConfig, include_secondary: bool) -> AppResult<()> {
    let store = factory::build_dual_store(config).await?;

    match store.primary() {
        Some(primary) => {
            info!("Provisioning {}", primary.describe());
            store
                .provisioner(StoreRole::Primary)
                .ensure_all(primary.as_ref())
                .await?;
            report(&store, StoreRole::Primary);
        }
        None => warn!("DATABASE_URL not set; skipping primary store"),
    }

    if include_secondary {
        let secondary = store.secondary();
        info!("Provisioning {}", secondary.describe());
        store
            .provisioner(StoreRole::Secondary)
            .ensure_all(secondary.as_ref())
            .await?;
        report(&store, StoreRole::Secondary);
    }

    Ok(())
}

fn report(store: &DualStore, role: StoreRole) {
    let provisioned = store.provisioner(role).registry().provisioned();
    println!(
        "{role} store: {} of {} entities provisioned",
        provisioned.len(),
        EntityKind::ALL.len()
    );
}

/// Print store health as JSON; fails when no store is usable
pub async fn status(config: &ServerConfig) -> AppResult<()> {
    let store = Arc::new(factory::build_dual_store(config).await?);
    let health = HealthChecker::new(store).comprehensive_health().await;

    let rendered = serde_json::to_string_pretty(&health)
        .map_err(|e| AppError::internal(format!("Failed to render health report: {e}")))?;
    println!("{rendered}");

    if health.status == HealthStatus::Unhealthy {
        return Err(AppError::storage_unavailable("No record store is reachable"));
    }
    Ok(())
}
