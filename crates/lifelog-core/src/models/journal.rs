// ABOUTME: Typed view over canonical journal entry records
// ABOUTME: Carries the mood label and creation time used by mood correlation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Lifelog Contributors

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::record::Record;
use super::wellness::parse_timestamp;
use crate::errors::{AppError, AppResult};

/// Free-text journal entry with an optional mood tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Record id
    pub id: String,
    /// Entry text
    pub content: String,
    /// Categorical mood label
    pub mood: Option<String>,
    /// Tags
    pub tags: Vec<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl JournalEntry {
    /// Build from a canonical record
    ///
    /// # Errors
    ///
    /// Returns an error if `created_at` is missing or malformed
    pub fn from_record(record: &Record) -> AppResult<Self> {
        let created_at = parse_timestamp(record.get_str("created_at"))
            .ok_or_else(|| AppError::invalid_input("Journal entry has no valid created_at"))?;

        Ok(Self {
            id: record.id().unwrap_or_default().to_owned(),
            content: record.get_str("content").unwrap_or_default().to_owned(),
            mood: record
                .get_str("mood")
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(ToOwned::to_owned),
            tags: record.get_list("tags"),
            created_at,
        })
    }

    /// Calendar day (UTC) the entry was written on
    #[must_use]
    pub fn day(&self) -> NaiveDate {
        self.created_at.date_naive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn blank_mood_is_none() {
        let record = Record::try_from(json!({
            "id": "j1",
            "content": "walked",
            "mood": "  ",
            "created_at": "2024-03-02T23:30:00.000Z"
        }))
        .unwrap();
        let entry = JournalEntry::from_record(&record).unwrap();
        assert!(entry.mood.is_none());
        assert_eq!(entry.day(), NaiveDate::from_ymd_opt(2024, 3, 2).unwrap());
    }
}
