// ABOUTME: Shared model definitions used by persistence, services, and outer surfaces
// ABOUTME: Re-exports the canonical record shape, caller identity, and typed record views
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Lifelog Contributors

/// Authenticated caller identity
pub mod auth;
/// Typed view over journal entry records
pub mod journal;
/// Canonical record shape returned by every store
pub mod record;
/// Typed view over wellness entry records
pub mod wellness;

pub use auth::AuthContext;
pub use journal::JournalEntry;
pub use record::Record;
pub use wellness::WellnessEntry;
