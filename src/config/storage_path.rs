// ABOUTME: Resolves where the embedded database file lives and seeds it from the bundled snapshot
// ABOUTME: Precedence is explicit directory, platform mount, writable temp dir, bundled file
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Lifelog Contributors

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::environment::{SqliteConfig, SQLITE_FILE_NAME};
use crate::errors::{AppError, AppResult};

/// Where the resolved embedded file came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PathSource {
    /// `LIFELOG_SQLITE_DIR`
    ExplicitDir,
    /// `RAILWAY_VOLUME_MOUNT_PATH`
    PlatformMount,
    /// Writable OS temp directory
    TempDir,
    /// The bundled snapshot itself
    Bundled,
}

/// Resolved embedded database location
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedPath {
    /// Database file
    pub path: PathBuf,
    /// Precedence tier that produced it
    pub source: PathSource,
}

/// Pick the embedded database file
///
/// The first configured tier wins; the OS temp directory only qualifies when
/// it accepts writes.
#[must_use]
pub fn resolve_sqlite_path(config: &SqliteConfig) -> ResolvedPath {
    resolve_with_temp_dir(config, Some(env::temp_dir()))
}

/// [`resolve_sqlite_path`] with an explicit temp directory candidate
#[must_use]
pub fn resolve_with_temp_dir(config: &SqliteConfig, temp_dir: Option<PathBuf>) -> ResolvedPath {
    if let Some(dir) = &config.explicit_dir {
        return ResolvedPath {
            path: dir.join(SQLITE_FILE_NAME),
            source: PathSource::ExplicitDir,
        };
    }
    if let Some(dir) = &config.platform_mount {
        return ResolvedPath {
            path: dir.join(SQLITE_FILE_NAME),
            source: PathSource::PlatformMount,
        };
    }
    if let Some(dir) = temp_dir.filter(|dir| is_writable_dir(dir)) {
        return ResolvedPath {
            path: dir.join("lifelog").join(SQLITE_FILE_NAME),
            source: PathSource::TempDir,
        };
    }
    ResolvedPath {
        path: config.bundled_path.clone(),
        source: PathSource::Bundled,
    }
}

/// Whether a file can be created in `dir`
#[must_use]
pub fn is_writable_dir(dir: &Path) -> bool {
    if !dir.is_dir() {
        return false;
    }
    let marker = dir.join(format!(".lifelog-write-check-{}", Uuid::new_v4()));
    match fs::File::create(&marker) {
        Ok(_) => {
            if let Err(e) = fs::remove_file(&marker) {
                debug!("Could not remove write check file {}: {e}", marker.display());
            }
            true
        }
        Err(_) => false,
    }
}

/// Copy the bundled snapshot to `target` if the target is missing or empty
///
/// Returns whether a copy was made.
///
/// # Errors
///
/// Returns an error if the target directory cannot be created or the copy fails
pub fn seed_from_bundled(target: &Path, bundled: &Path) -> AppResult<bool> {
    if same_file(target, bundled) {
        return Ok(false);
    }
    let target_has_data = fs::metadata(target).is_ok_and(|m| m.len() > 0);
    if target_has_data {
        return Ok(false);
    }
    if !bundled.is_file() {
        debug!("No bundled snapshot at {}, starting empty", bundled.display());
        return Ok(false);
    }

    if let Some(parent) = target.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| {
                AppError::storage_unavailable(format!(
                    "Cannot create directory {}: {e}",
                    parent.display()
                ))
            })?;
        }
    }
    fs::copy(bundled, target).map_err(|e| {
        AppError::storage_unavailable(format!(
            "Cannot seed {} from {}: {e}",
            target.display(),
            bundled.display()
        ))
    })?;
    info!(
        "Seeded embedded database {} from bundled snapshot {}",
        target.display(),
        bundled.display()
    );
    Ok(true)
}

/// Make sure the parent directory of the database file exists
///
/// # Errors
///
/// Returns an error if the directory cannot be created
pub fn ensure_parent_dir(path: &Path) -> AppResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| {
                warn!("Cannot create {}: {e}", parent.display());
                AppError::storage_unavailable(format!(
                    "Cannot create directory {}: {e}",
                    parent.display()
                ))
            })?;
        }
    }
    Ok(())
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
