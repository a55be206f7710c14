// ABOUTME: Subcommand implementations for lifelog-cli
// ABOUTME: Store maintenance and per-user insight reports
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Lifelog Contributors

pub mod insights;
pub mod store;
