// ABOUTME: Store health monitoring: pings each configured store and reports status with latency
// ABOUTME: Overall status reflects whether requests are served by the primary, the fallback, or nothing
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Lifelog Contributors

//! Health check utilities

use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::persistence::{DualStore, RecordStore, StoreRole};

const SERVICE_NAME: &str = "lifelog-server";

/// Overall health status
#[non_exhaustive]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Primary store reachable
    Healthy,
    /// Only the fallback store can serve requests
    Degraded,
    /// No store can serve requests
    Unhealthy,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall service status
    pub status: HealthStatus,
    /// Service information
    pub service: ServiceInfo,
    /// Individual component checks
    pub checks: Vec<ComponentHealth>,
    /// Response timestamp (seconds since the epoch)
    pub timestamp: u64,
    /// Response time in milliseconds
    pub response_time_ms: u64,
}

/// Service information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceInfo {
    /// Service name
    pub name: String,
    /// Service version
    pub version: String,
    /// Service uptime in seconds
    pub uptime_seconds: u64,
}

/// Individual component health status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    /// Component name
    pub name: String,
    /// Component status
    pub status: HealthStatus,
    /// Status description
    pub message: String,
    /// Check duration in milliseconds
    pub duration_ms: u64,
    /// Additional metadata
    pub metadata: Option<Value>,
}

/// Health checker over the dual-store accessor
pub struct HealthChecker {
    start_time: Instant,
    store: Arc<DualStore>,
    cached_status: RwLock<Option<(HealthResponse, Instant)>>,
    cache_ttl: Duration,
}

impl HealthChecker {
    /// Create a new health checker with a 30 second result cache
    #[must_use]
    pub fn new(store: Arc<DualStore>) -> Self {
        Self::with_cache_ttl(store, Duration::from_secs(30))
    }

    /// Create a new health checker with a custom cache lifetime
    #[must_use]
    pub fn with_cache_ttl(store: Arc<DualStore>, cache_ttl: Duration) -> Self {
        Self {
            start_time: Instant::now(),
            store,
            cached_status: RwLock::new(None),
            cache_ttl,
        }
    }

    /// Liveness only, no store access
    #[must_use]
    pub fn basic_health(&self) -> HealthResponse {
        HealthResponse {
            status: HealthStatus::Healthy,
            service: self.service_info(),
            checks: vec![ComponentHealth {
                name: "service".into(),
                status: HealthStatus::Healthy,
                message: "Service is running".into(),
                duration_ms: 0,
                metadata: None,
            }],
            timestamp: unix_now(),
            response_time_ms: 0,
        }
    }

    /// Ping every store and derive the overall status
    pub async fn comprehensive_health(&self) -> HealthResponse {
        {
            let cached = self.cached_status.read().await;
            if let Some((response, cached_at)) = cached.as_ref() {
                if cached_at.elapsed() < self.cache_ttl {
                    return response.clone();
                }
            }
        }

        let start = Instant::now();
        info!("Performing store health check");

        let primary = match self.store.primary() {
            Some(store) => check_store(StoreRole::Primary, store.as_ref()).await,
            None => ComponentHealth {
                name: StoreRole::Primary.to_string(),
                status: HealthStatus::Degraded,
                message: "Primary store not configured".into(),
                duration_ms: 0,
                metadata: None,
            },
        };
        let secondary = check_store(StoreRole::Secondary, self.store.secondary().as_ref()).await;

        let response = HealthResponse {
            status: overall_status(primary.status, secondary.status),
            service: self.service_info(),
            checks: vec![primary, secondary],
            timestamp: unix_now(),
            response_time_ms: elapsed_ms(start),
        };

        {
            let mut cached = self.cached_status.write().await;
            *cached = Some((response.clone(), Instant::now()));
        }

        response
    }

    fn service_info(&self) -> ServiceInfo {
        ServiceInfo {
            name: SERVICE_NAME.into(),
            version: env!("CARGO_PKG_VERSION").to_owned(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }
}

async fn check_store(role: StoreRole, store: &dyn RecordStore) -> ComponentHealth {
    let start = Instant::now();
    let metadata = Some(json!({ "store": store.describe() }));

    match store.ping().await {
        Ok(()) => ComponentHealth {
            name: role.to_string(),
            status: HealthStatus::Healthy,
            message: "Store is accessible and responsive".into(),
            duration_ms: elapsed_ms(start),
            metadata,
        },
        Err(e) => {
            if role == StoreRole::Primary {
                warn!("Primary store health check failed: {e}");
            } else {
                error!("Secondary store health check failed: {e}");
            }
            ComponentHealth {
                name: role.to_string(),
                status: HealthStatus::Unhealthy,
                message: format!("Store check failed: {e}"),
                duration_ms: elapsed_ms(start),
                metadata,
            }
        }
    }
}

/// Healthy when the primary answers, degraded when only the fallback does
#[must_use]
pub fn overall_status(primary: HealthStatus, secondary: HealthStatus) -> HealthStatus {
    match (primary, secondary) {
        (HealthStatus::Healthy, _) => HealthStatus::Healthy,
        (_, HealthStatus::Healthy) => HealthStatus::Degraded,
        _ => HealthStatus::Unhealthy,
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
