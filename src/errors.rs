// ABOUTME: Unified error handling for the server crate
// ABOUTME: Re-exports the shared AppError, ErrorCode, and AppResult from lifelog-core
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Lifelog Contributors

pub use lifelog_core::errors::*;
