// ABOUTME: Tracing subscriber setup for binaries and tests
// ABOUTME: RUST_LOG selects levels, LOG_FORMAT selects json, pretty, or compact output
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Lifelog Contributors

use std::env;

use tracing::Subscriber;
use tracing_subscriber::EnvFilter;

use crate::config::LogFormat;
use crate::errors::{AppError, AppResult};

/// Level used when `RUST_LOG` is unset or invalid
pub const DEFAULT_FILTER: &str = "info,sqlx=warn";

/// Install the global subscriber using `RUST_LOG` and `LOG_FORMAT`
///
/// # Errors
///
/// Returns an error if `LOG_FORMAT` is unknown or a global subscriber is
/// already installed
pub fn init_from_env() -> AppResult<()> {
    let format = env::var("LOG_FORMAT")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map_or_else(|| Ok(LogFormat::default()), |v| v.parse())?;
    init(format, DEFAULT_FILTER)
}

/// Install the global subscriber with the given output format
///
/// `fallback_filter` applies when `RUST_LOG` is unset or invalid.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed
pub fn init(format: LogFormat, fallback_filter: &str) -> AppResult<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback_filter));
    tracing::subscriber::set_global_default(subscriber(format, filter))
        .map_err(|e| AppError::config(format!("Failed to install log subscriber: {e}")))
}

/// Subscriber writing the given format, not yet installed
#[must_use]
pub fn subscriber(format: LogFormat, filter: EnvFilter) -> Box<dyn Subscriber + Send + Sync> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    match format {
        LogFormat::Json => Box::new(builder.json().finish()),
        LogFormat::Pretty => Box::new(builder.pretty().finish()),
        LogFormat::Compact => Box::new(builder.compact().finish()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn every_format_builds_a_subscriber() {
        for format in [LogFormat::Json, LogFormat::Pretty, LogFormat::Compact] {
            let subscriber = subscriber(format, EnvFilter::new("debug"));
            tracing::subscriber::with_default(subscriber, || {
                tracing::info!(format = ?format, "subscriber ready");
            });
        }
    }
}
