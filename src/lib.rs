// ABOUTME: Main library entry point for the lifelog server
// ABOUTME: Dual-store persistence, wellness correlations, and LLM-backed chat memory
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Lifelog Contributors

#![deny(unsafe_code)]

//! # Lifelog Server
//!
//! Backend core for a personal life-organizing application: journal entries,
//! stories, people, jokes, goals, beliefs, wellness logs and AI chat, each
//! owned by one user.
//!
//! ## Architecture
//!
//! - **Persistence**: every record operation goes through [`persistence::DualStore`],
//!   which tries the networked primary store and falls back to an embedded
//!   SQLite file, provisioning the fallback schema on first use
//! - **Intelligence**: correlation of journal moods with daily wellness metrics
//! - **LLM**: OpenAI-compatible chat completions with labeled fallback replies
//! - **Services**: wellness logging, chat with rolling memory, upload metadata
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use lifelog_server::config::ServerConfig;
//! use lifelog_server::errors::AppResult;
//! use lifelog_server::models::{AuthContext, Record};
//! use lifelog_server::persistence::{factory, EntityKind, Filter, Operation};
//!
//! #[tokio::main]
//! async fn main() -> AppResult<()> {
//!     let config = ServerConfig::from_env()?;
//!     let store = factory::initialize(&config).await?;
//!
//!     let auth = AuthContext::new(uuid::Uuid::new_v4(), "me@example.com");
//!     let entry = Record::new().with("content", "Walked by the river").with("mood", "calm");
//!     let served = store
//!         .execute(EntityKind::JournalEntry, Operation::Create(entry), Filter::for_owner(&auth))
//!         .await?;
//!     println!("stored in the {} store", served.served_by);
//!     Ok(())
//! }
//! ```

/// Configuration from environment variables
pub mod config;
/// Unified error handling with standard error codes
pub mod errors;
/// Store health checks
pub mod health;
/// Mood and wellness insights
pub mod intelligence;
/// LLM collaborator client
pub mod llm;
/// Tracing subscriber setup
pub mod logging;
/// Canonical records and typed domain views
pub mod models;
/// Dual-store persistence with automatic fallback
pub mod persistence;
/// Services built on persistence, intelligence, and the LLM
pub mod services;
