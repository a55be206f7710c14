// ABOUTME: Typed view over canonical wellness entry records
// ABOUTME: One entry per user per calendar date with numeric lifestyle metrics
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Lifelog Contributors

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::record::Record;
use crate::errors::{AppError, AppResult};

/// Daily wellness log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WellnessEntry {
    /// Record id
    pub id: String,
    /// Calendar date the entry describes
    pub date: NaiveDate,
    /// Supplements taken
    pub supplements: Vec<String>,
    /// Medications taken
    pub medications: Vec<String>,
    /// Diet quality score
    pub diet_quality: Option<f64>,
    /// Minutes of exercise
    pub exercise_minutes: Option<f64>,
    /// Exercise intensity score
    pub exercise_intensity: Option<f64>,
    /// Subjective sleep quality
    pub sleep_quality: Option<f64>,
    /// Device or computed sleep score
    pub sleep_score: Option<f64>,
    /// Creation timestamp
    pub created_at: Option<DateTime<Utc>>,
    /// Last mutation timestamp
    pub updated_at: Option<DateTime<Utc>>,
}

impl WellnessEntry {
    /// Build from a canonical record
    ///
    /// # Errors
    ///
    /// Returns an error if `date` is missing or not `YYYY-MM-DD`
    pub fn from_record(record: &Record) -> AppResult<Self> {
        let raw_date = record
            .get_str("date")
            .ok_or_else(|| AppError::missing_field("date"))?;
        let date = NaiveDate::parse_from_str(raw_date, "%Y-%m-%d").map_err(|e| {
            AppError::invalid_input(format!("Invalid wellness date '{raw_date}': {e}"))
        })?;

        Ok(Self {
            id: record.id().unwrap_or_default().to_owned(),
            date,
            supplements: record.get_list("supplements"),
            medications: record.get_list("medications"),
            diet_quality: record.get_f64("diet_quality"),
            exercise_minutes: record.get_f64("exercise_minutes"),
            exercise_intensity: record.get_f64("exercise_intensity"),
            sleep_quality: record.get_f64("sleep_quality"),
            sleep_score: record.get_f64("sleep_score"),
            created_at: parse_timestamp(record.get_str("created_at")),
            updated_at: parse_timestamp(record.get_str("updated_at")),
        })
    }
}

pub(crate) fn parse_timestamp(raw: Option<&str>) -> Option<DateTime<Utc>> {
    raw.and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}
