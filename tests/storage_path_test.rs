// ABOUTME: Integration tests for embedded database location, seeding, and environment configuration
// ABOUTME: Environment-mutating tests run serially
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Lifelog Contributors

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use std::env;
use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use lifelog_server::config::storage_path::{
    resolve_with_temp_dir, seed_from_bundled, PathSource,
};
use lifelog_server::config::{LogFormat, ServerConfig, SqliteConfig};
use lifelog_server::errors::ErrorCode;
use lifelog_server::persistence::factory::open_secondary;
use lifelog_server::persistence::{RecordStore, SqliteStore};
use serial_test::serial;
use tempfile::TempDir;

const ENV_VARS: &[&str] = &[
    "DATABASE_URL",
    "LIFELOG_SQLITE_DIR",
    "RAILWAY_VOLUME_MOUNT_PATH",
    "LIFELOG_BUNDLED_DB",
    "LIFELOG_LLM_URL",
    "LIFELOG_LLM_TIMEOUT_SECS",
    "LOG_FORMAT",
];

fn clear_env() {
    for name in ENV_VARS {
        env::remove_var(name);
    }
}

#[test]
fn precedence_explicit_then_mount_then_temp_then_bundled() -> Result<()> {
    let explicit = TempDir::new()?;
    let mount = TempDir::new()?;
    let temp = TempDir::new()?;
    let mut config = SqliteConfig {
        explicit_dir: Some(explicit.path().to_path_buf()),
        platform_mount: Some(mount.path().to_path_buf()),
        bundled_path: PathBuf::from("bundled/lifelog.db"),
        ..SqliteConfig::default()
    };

    let resolved = resolve_with_temp_dir(&config, Some(temp.path().to_path_buf()));
    assert_eq!(resolved.source, PathSource::ExplicitDir);
    assert_eq!(resolved.path, explicit.path().join("lifelog.db"));

    config.explicit_dir = None;
    let resolved = resolve_with_temp_dir(&config, Some(temp.path().to_path_buf()));
    assert_eq!(resolved.source, PathSource::PlatformMount);

    config.platform_mount = None;
    let resolved = resolve_with_temp_dir(&config, Some(temp.path().to_path_buf()));
    assert_eq!(resolved.source, PathSource::TempDir);
    assert!(resolved.path.starts_with(temp.path()));

    // a temp dir that does not exist cannot take writes
    let resolved = resolve_with_temp_dir(&config, Some(temp.path().join("missing")));
    assert_eq!(resolved.source, PathSource::Bundled);
    assert_eq!(resolved.path, PathBuf::from("bundled/lifelog.db"));

    let resolved = resolve_with_temp_dir(&config, None);
    assert_eq!(resolved.source, PathSource::Bundled);
    Ok(())
}

#[test]
fn seeding_copies_once_into_missing_directories() -> Result<()> {
    let dir = TempDir::new()?;
    let bundled = dir.path().join("bundled.db");
    fs::write(&bundled, b"snapshot")?;
    let target = dir.path().join("nested").join("deeper").join("lifelog.db");

    assert!(seed_from_bundled(&target, &bundled)?);
    assert_eq!(fs::read(&target)?, b"snapshot");

    // existing data is never overwritten
    fs::write(&target, b"live data")?;
    assert!(!seed_from_bundled(&target, &bundled)?);
    assert_eq!(fs::read(&target)?, b"live data");

    // no snapshot, nothing to do
    let other = dir.path().join("other.db");
    assert!(!seed_from_bundled(&other, &dir.path().join("absent.db"))?);
    assert!(!other.exists());

    // a target that is the snapshot itself is left alone
    assert!(!seed_from_bundled(&bundled, &bundled)?);
    Ok(())
}

#[tokio::test]
async fn secondary_opens_seeded_copy_of_bundled_snapshot() -> Result<()> {
    common::init_test_logging();
    let bundle_dir = TempDir::new()?;
    let bundled = bundle_dir.path().join("lifelog.db");
    {
        let snapshot = SqliteStore::open(&bundled, std::time::Duration::from_secs(5)).await?;
        sqlx::query("CREATE TABLE snapshot_marker (id TEXT PRIMARY KEY)")
            .execute(snapshot.pool())
            .await?;
        snapshot.pool().close().await;
    }

    let data_dir = TempDir::new()?;
    let config = SqliteConfig {
        explicit_dir: Some(data_dir.path().join("store")),
        bundled_path: bundled.clone(),
        ..SqliteConfig::default()
    };
    let store = open_secondary(&config).await?;

    assert_eq!(store.path(), Some(data_dir.path().join("store").join("lifelog.db").as_path()));
    assert!(store.existing_columns("snapshot_marker").await?.contains(&"id".to_owned()));
    store.ping().await?;
    Ok(())
}

#[tokio::test]
async fn unusable_location_is_storage_unavailable() -> Result<()> {
    common::init_test_logging();
    let dir = TempDir::new()?;
    // a regular file where a directory is expected
    let blocker = dir.path().join("not-a-dir");
    fs::write(&blocker, b"x")?;

    let config = SqliteConfig {
        explicit_dir: Some(blocker.join("sub")),
        bundled_path: dir.path().join("absent.db"),
        ..SqliteConfig::default()
    };
    let err = open_secondary(&config).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::StorageUnavailable);
    Ok(())
}

#[test]
#[serial]
fn environment_configuration_is_read() -> Result<()> {
    clear_env();
    env::set_var("LIFELOG_SQLITE_DIR", "/srv/lifelog");
    env::set_var("RAILWAY_VOLUME_MOUNT_PATH", "  ");
    env::set_var("LIFELOG_LLM_URL", "http://localhost:11434/v1/chat/completions");
    env::set_var("LOG_FORMAT", "json");

    let config = ServerConfig::from_env()?;
    clear_env();

    assert_eq!(config.database_url, None);
    assert_eq!(config.sqlite.explicit_dir, Some(PathBuf::from("/srv/lifelog")));
    // blank values count as unset
    assert_eq!(config.sqlite.platform_mount, None);
    assert_eq!(
        config.llm.url.as_deref(),
        Some("http://localhost:11434/v1/chat/completions")
    );
    assert_eq!(config.log_format, LogFormat::Json);
    Ok(())
}

#[test]
#[serial]
fn malformed_environment_values_are_config_errors() {
    clear_env();
    env::set_var("LIFELOG_LLM_TIMEOUT_SECS", "soon");
    let err = ServerConfig::from_env().unwrap_err();
    clear_env();

    assert_eq!(err.code, ErrorCode::ConfigError);
    assert!(err.message.contains("LIFELOG_LLM_TIMEOUT_SECS"));
}
