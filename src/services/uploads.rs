// ABOUTME: Records uploaded files: bytes go to a file storage collaborator, metadata to the record store
// ABOUTME: Supports genome data uploads and per-person message exports
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Lifelog Contributors

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::errors::{AppError, AppResult};
use crate::models::{AuthContext, Record};
use crate::persistence::{DualStore, EntityKind, Filter, Operation};

/// Handle returned by a file storage backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    /// Backend-assigned name
    pub stored_name: String,
    /// Bytes written
    pub size_bytes: u64,
}

/// Destination for uploaded bytes
#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Persist `bytes`, returning the stored handle
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes cannot be stored
    async fn store(&self, bytes: &[u8], original_name: &str) -> AppResult<StoredFile>;
}

/// What an upload belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadTarget {
    /// Raw genome data file
    Genome,
    /// Message export of one person
    PersonMessages {
        /// Person the messages were exchanged with
        person_id: String,
    },
}

impl UploadTarget {
    const fn entity(&self) -> EntityKind {
        match self {
            Self::Genome => EntityKind::GenomeUpload,
            Self::PersonMessages { .. } => EntityKind::PersonMessageUpload,
        }
    }
}

/// Stores upload bytes and persists their metadata
#[derive(Clone)]
pub struct UploadRecorder {
    store: Arc<DualStore>,
    files: Arc<dyn FileStorage>,
}

impl UploadRecorder {
    /// Recorder over the given accessor and file storage
    #[must_use]
    pub fn new(store: Arc<DualStore>, files: Arc<dyn FileStorage>) -> Self {
        Self { store, files }
    }

    /// Store an upload and record its metadata
    ///
    /// The MIME type is guessed from the file extension when not given.
    ///
    /// # Errors
    ///
    /// Returns `invalid_input` for an empty file or a blank name, or an
    /// error if the bytes or the metadata cannot be stored
    pub async fn record(
        &self,
        auth: &AuthContext,
        target: UploadTarget,
        original_name: &str,
        mime_type: Option<&str>,
        bytes: &[u8],
    ) -> AppResult<Record> {
        let original_name = file_name(original_name)
            .ok_or_else(|| AppError::invalid_input("Upload needs a file name"))?;
        if bytes.is_empty() {
            return Err(AppError::invalid_input(format!("Upload '{original_name}' is empty")));
        }

        let stored = self.files.store(bytes, &original_name).await?;
        let mime_type = mime_type.map_or_else(|| guess_mime_type(&original_name), ToOwned::to_owned);

        let entity = target.entity();
        let mut payload = Record::new()
            .with("original_name", original_name.as_str())
            .with("stored_name", stored.stored_name.as_str())
            .with("mime_type", mime_type)
            .with("size_bytes", stored.size_bytes);
        if let UploadTarget::PersonMessages { person_id } = target {
            payload.insert("person_id", person_id);
            payload.insert("message_count", count_messages(bytes));
        }

        let record = self
            .store
            .execute(entity, Operation::Create(payload), Filter::for_owner(auth))
            .await?
            .into_record()?;
        info!(
            user_id = %auth.user_id,
            entity = %entity,
            stored_name = %stored.stored_name,
            size_bytes = stored.size_bytes,
            "Upload recorded"
        );
        Ok(record)
    }
}

/// Final path component of a client-supplied name
fn file_name(raw: &str) -> Option<String> {
    let normalized = raw.trim().replace('\\', "/");
    Path::new(&normalized)
        .file_name()
        .and_then(|name| name.to_str())
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(ToOwned::to_owned)
}

fn guess_mime_type(name: &str) -> String {
    let extension = Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    match extension.as_str() {
        "txt" => "text/plain",
        "csv" => "text/csv",
        "json" => "application/json",
        "zip" => "application/zip",
        "gz" => "application/gzip",
        "html" | "htm" => "text/html",
        _ => "application/octet-stream",
    }
    .to_owned()
}

/// Non-blank lines of a text export; zero for binary content
fn count_messages(bytes: &[u8]) -> u64 {
    std::str::from_utf8(bytes).map_or(0, |text| {
        text.lines().filter(|line| !line.trim().is_empty()).count() as u64
    })
}
