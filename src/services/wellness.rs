// ABOUTME: Wellness logging service: one entry per user per day, history, and mood correlations
// ABOUTME: Writes go through the dual-store accessor as upserts keyed on (user, date)
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Lifelog Contributors

use std::sync::Arc;

use tracing::{debug, warn};

use crate::errors::{AppError, AppResult};
use crate::intelligence::{correlate, CorrelationReport};
use crate::models::{AuthContext, JournalEntry, Record, WellnessEntry};
use crate::persistence::{DualStore, EntityKind, Filter, Operation, SortDirection};

/// Daily wellness logs of the authenticated user
#[derive(Clone)]
pub struct WellnessService {
    store: Arc<DualStore>,
}

impl WellnessService {
    /// Service over the given accessor
    #[must_use]
    pub const fn new(store: Arc<DualStore>) -> Self {
        Self { store }
    }

    /// Record a day's entry, updating the existing row for that date
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is invalid (a `date` is required) or
    /// storage is unavailable
    pub async fn record_day(&self, auth: &AuthContext, payload: Record) -> AppResult<WellnessEntry> {
        if !payload.contains("date") {
            return Err(AppError::missing_field("date"));
        }
        let served = self
            .store
            .execute(
                EntityKind::WellnessEntry,
                Operation::Upsert(payload),
                Filter::for_owner(auth),
            )
            .await?;
        debug!(user_id = %auth.user_id, served_by = %served.served_by, "Wellness day recorded");
        WellnessEntry::from_record(&served.into_record()?)
    }

    /// Entries newest date first
    ///
    /// # Errors
    ///
    /// Returns an error if storage is unavailable
    pub async fn history(
        &self,
        auth: &AuthContext,
        limit: Option<u32>,
    ) -> AppResult<Vec<WellnessEntry>> {
        let mut filter = Filter::for_owner(auth).order_by("date", SortDirection::Desc);
        if let Some(limit) = limit {
            filter = filter.limit(limit);
        }
        let records = self
            .store
            .execute(EntityKind::WellnessEntry, Operation::List, filter)
            .await?
            .into_records()?;
        Ok(parse_all(&records, WellnessEntry::from_record))
    }

    /// Correlate the user's journal moods with their wellness metrics
    ///
    /// # Errors
    ///
    /// Returns an error if storage is unavailable
    pub async fn correlations(&self, auth: &AuthContext) -> AppResult<CorrelationReport> {
        let wellness = self.history(auth, None).await?;
        let journal_records = self
            .store
            .execute(
                EntityKind::JournalEntry,
                Operation::List,
                Filter::for_owner(auth),
            )
            .await?
            .into_records()?;
        let journal = parse_all(&journal_records, JournalEntry::from_record);

        let report = correlate(&journal, &wellness);
        debug!(
            user_id = %auth.user_id,
            mood_days = report.mood_days,
            wellness_days = report.wellness_days,
            "Correlations computed"
        );
        Ok(report)
    }
}

/// Typed views of every well-formed record; malformed rows are skipped
fn parse_all<T>(records: &[Record], parse: impl Fn(&Record) -> AppResult<T>) -> Vec<T> {
    records
        .iter()
        .filter_map(|record| match parse(record) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(id = record.id().unwrap_or_default(), "Skipping malformed record: {e}");
                None
            }
        })
        .collect()
}
