// ABOUTME: Shared core types for the lifelog server workspace
// ABOUTME: Hosts the unified error type, the canonical record shape, and typed domain views
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Lifelog Contributors

#![deny(unsafe_code)]

//! # Lifelog Core
//!
//! Types shared between the persistence layer, the services built on top of it,
//! and any outer surface (CLI, HTTP) that needs to render results or errors.
//!
//! - [`errors`]: `AppError` / `ErrorCode` with stable machine-readable categories
//! - [`models`]: canonical `Record`, `AuthContext`, and typed views over records

/// Unified error handling with standard error codes
pub mod errors;

/// Canonical record shape and typed domain views
pub mod models;
