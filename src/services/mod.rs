// ABOUTME: Services composing the record store, the correlation engine, and the LLM client
// ABOUTME: Each service is scoped per call by the authenticated caller
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Lifelog Contributors

/// AI chat with rolling conversation memory
pub mod chat;
/// Upload metadata recording
pub mod uploads;
/// Daily wellness logs and correlations
pub mod wellness;

pub use chat::{ChatMemoryService, ChatTurn};
pub use uploads::{FileStorage, StoredFile, UploadRecorder, UploadTarget};
pub use wellness::WellnessService;
