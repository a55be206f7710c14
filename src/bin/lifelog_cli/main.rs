// ABOUTME: Operator CLI for the lifelog server
// ABOUTME: Provisions schemas, reports store health, and prints mood correlations
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Lifelog Contributors

//! # lifelog-cli
//!
//! ```bash
//! # Create every table in the primary store (and the embedded fallback)
//! lifelog-cli provision --secondary
//!
//! # Ping both stores
//! lifelog-cli status
//!
//! # Mood / wellness correlations for one user
//! lifelog-cli correlations --user-id 6f1c... --email me@example.com
//! ```

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use lifelog_server::config::ServerConfig;
use lifelog_server::errors::AppResult;
use lifelog_server::logging;
use uuid::Uuid;

#[derive(Parser)]
#[command(
    name = "lifelog-cli",
    about = "Lifelog server operator tool",
    long_about = "Provision the record stores, check their health, and inspect a user's wellness insights"
)]
struct Cli {
    /// Primary store URL (overrides DATABASE_URL)
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// Directory for the embedded database file (overrides LIFELOG_SQLITE_DIR)
    #[arg(long, global = true)]
    sqlite_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create tables, indexes, and missing columns
    Provision {
        /// Also provision the embedded fallback store
        #[arg(long)]
        secondary: bool,
    },
    /// Ping the configured stores
    Status,
    /// Correlate a user's journal moods with their wellness logs
    Correlations {
        /// User id
        #[arg(long)]
        user_id: Uuid,
        /// User email, used if a fallback user row must be created
        #[arg(long, default_value = "")]
        email: String,
    },
}

#[tokio::main]
async fn main() -> AppResult<()> {
    let cli = Cli::parse();

    let mut config = ServerConfig::from_env()?;
    if let Some(url) = cli.database_url {
        config.database_url = Some(url);
    }
    if let Some(dir) = cli.sqlite_dir {
        config.sqlite.explicit_dir = Some(dir);
    }

    let fallback_filter = if cli.verbose { "debug" } else { logging::DEFAULT_FILTER };
    logging::init(config.log_format, fallback_filter)?;

    match cli.command {
        Command::Provision { secondary } => commands::store::provision(&config, secondary).await,
        Command::Status => commands::store::status(&config).await,
        Command::Correlations { user_id, email } => {
            commands::insights::correlations(&config, user_id, email).await
        }
    }
}
