// ABOUTME: Environment-driven server configuration read once at startup
// ABOUTME: Store locations, pool tuning, LLM endpoint, log format, and deployment environment
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Lifelog Contributors

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::redact_database_url;
use crate::errors::{AppError, AppResult};

/// Default bundled snapshot location
pub const DEFAULT_BUNDLED_DB: &str = "data/lifelog.db";
/// File name of the embedded database inside a resolved directory
pub const SQLITE_FILE_NAME: &str = "lifelog.db";
/// Default LLM model
pub const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";

/// Deployment environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Local development: error details are exposed
    Development,
    /// Everything else
    #[default]
    Production,
}

impl Environment {
    /// Whether this is a development deployment
    #[must_use]
    pub const fn is_development(self) -> bool {
        matches!(self, Self::Development)
    }
}

impl FromStr for Environment {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "development" | "dev" | "local" => Ok(Self::Development),
            "production" | "prod" | "staging" => Ok(Self::Production),
            other => Err(AppError::config(format!("Unknown environment '{other}'"))),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Development => f.write_str("development"),
            Self::Production => f.write_str("production"),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line
    Json,
    /// Multi-line human readable
    Pretty,
    /// Single-line human readable
    #[default]
    Compact,
}

impl FromStr for LogFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            other => Err(AppError::config(format!("Unknown log format '{other}'"))),
        }
    }
}

/// PostgreSQL pool tuning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostgresPoolConfig {
    /// Maximum pooled connections
    pub max_connections: u32,
    /// Connections kept open when idle
    pub min_connections: u32,
    /// Seconds to wait for a free connection
    pub acquire_timeout_secs: u64,
}

impl Default for PostgresPoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 1,
            acquire_timeout_secs: 30,
        }
    }
}

/// Embedded store location inputs and tuning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqliteConfig {
    /// Operator-chosen directory (`LIFELOG_SQLITE_DIR`)
    pub explicit_dir: Option<PathBuf>,
    /// Hosting platform volume (`RAILWAY_VOLUME_MOUNT_PATH`)
    pub platform_mount: Option<PathBuf>,
    /// Snapshot shipped with the deployment, last resort and seed source
    pub bundled_path: PathBuf,
    /// Busy timeout for lock contention, milliseconds
    pub busy_timeout_ms: u64,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            explicit_dir: None,
            platform_mount: None,
            bundled_path: PathBuf::from(DEFAULT_BUNDLED_DB),
            busy_timeout_ms: 5000,
        }
    }
}

/// LLM collaborator endpoint
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Chat-completions URL; `None` disables the LLM
    pub url: Option<String>,
    /// Bearer token, empty for unauthenticated endpoints
    pub api_key: String,
    /// Model name
    pub model: String,
    /// Request timeout, seconds
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: String::new(),
            model: DEFAULT_LLM_MODEL.to_owned(),
            timeout_secs: 30,
        }
    }
}

impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("url", &self.url)
            .field("api_key", &if self.api_key.is_empty() { "" } else { "***" })
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Complete server configuration
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Primary store URL; `None` leaves the primary unconfigured
    pub database_url: Option<String>,
    /// Primary pool tuning
    pub postgres_pool: PostgresPoolConfig,
    /// Embedded store inputs
    pub sqlite: SqliteConfig,
    /// LLM endpoint
    pub llm: LlmConfig,
    /// Log output format
    pub log_format: LogFormat,
    /// Deployment environment
    pub environment: Environment,
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field(
                "database_url",
                &self.database_url.as_deref().map(redact_database_url),
            )
            .field("postgres_pool", &self.postgres_pool)
            .field("sqlite", &self.sqlite)
            .field("llm", &self.llm)
            .field("log_format", &self.log_format)
            .field("environment", &self.environment)
            .finish()
    }
}

impl ServerConfig {
    /// Read configuration from the process environment
    ///
    /// # Errors
    ///
    /// Returns a configuration error if a variable is set to a malformed value
    pub fn from_env() -> AppResult<Self> {
        let defaults = Self::default();

        Ok(Self {
            database_url: non_empty_var("DATABASE_URL"),
            postgres_pool: PostgresPoolConfig {
                max_connections: parse_var(
                    "LIFELOG_PG_MAX_CONNECTIONS",
                    defaults.postgres_pool.max_connections,
                )?,
                min_connections: parse_var(
                    "LIFELOG_PG_MIN_CONNECTIONS",
                    defaults.postgres_pool.min_connections,
                )?,
                acquire_timeout_secs: parse_var(
                    "LIFELOG_PG_ACQUIRE_TIMEOUT_SECS",
                    defaults.postgres_pool.acquire_timeout_secs,
                )?,
            },
            sqlite: SqliteConfig {
                explicit_dir: non_empty_var("LIFELOG_SQLITE_DIR").map(PathBuf::from),
                platform_mount: non_empty_var("RAILWAY_VOLUME_MOUNT_PATH").map(PathBuf::from),
                bundled_path: non_empty_var("LIFELOG_BUNDLED_DB")
                    .map_or(defaults.sqlite.bundled_path, PathBuf::from),
                busy_timeout_ms: parse_var(
                    "LIFELOG_SQLITE_BUSY_TIMEOUT_MS",
                    defaults.sqlite.busy_timeout_ms,
                )?,
            },
            llm: LlmConfig {
                url: non_empty_var("LIFELOG_LLM_URL"),
                api_key: non_empty_var("LIFELOG_LLM_API_KEY").unwrap_or_default(),
                model: non_empty_var("LIFELOG_LLM_MODEL").unwrap_or(defaults.llm.model),
                timeout_secs: parse_var("LIFELOG_LLM_TIMEOUT_SECS", defaults.llm.timeout_secs)?,
            },
            log_format: parse_var("LOG_FORMAT", defaults.log_format)?,
            environment: parse_var("LIFELOG_ENV", defaults.environment)?,
        })
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

fn parse_var<T>(name: &str, default: T) -> AppResult<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    non_empty_var(name).map_or(Ok(default), |raw| {
        raw.parse()
            .map_err(|e| AppError::config(format!("Invalid value for {name} ('{raw}'): {e}")))
    })
}
