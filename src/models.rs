// ABOUTME: Domain models shared with lifelog-core
// ABOUTME: Canonical records, caller identity, and typed wellness and journal views
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Lifelog Contributors

pub use lifelog_core::models::*;
