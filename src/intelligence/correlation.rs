// ABOUTME: Correlation engine relating daily mood from journal entries to wellness metrics
// ABOUTME: Mood label scoring, per-day aggregation, date alignment, and Pearson coefficients
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Lifelog Contributors

//! Mood / wellness correlation
//!
//! Journal entries carry a categorical mood label. Labels are scored on a
//! 1-5 scale, averaged per UTC calendar day, aligned by date with the day's
//! wellness entry, and correlated per metric with the Pearson coefficient.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{JournalEntry, WellnessEntry};

/// Score used for labels outside the known vocabulary
pub const NEUTRAL_MOOD_SCORE: f64 = 3.0;

/// Fewest aligned days that yield a coefficient
pub const MIN_PAIRS: usize = 3;

const MOOD_SCALE: &[(f64, &[&str])] = &[
    (5.0, &["happy", "excited", "grateful", "joyful", "great"]),
    (4.0, &["good", "content", "calm", "relaxed", "hopeful"]),
    (3.0, &["neutral", "okay", "meh"]),
    (2.0, &["tired", "anxious", "stressed", "frustrated", "bored"]),
    (1.0, &["sad", "angry", "depressed", "lonely", "awful"]),
];

/// Numeric score of a mood label (case-insensitive), neutral when unknown
#[must_use]
pub fn mood_score(label: &str) -> f64 {
    let label = label.trim().to_lowercase();
    MOOD_SCALE
        .iter()
        .find(|(_, labels)| labels.contains(&label.as_str()))
        .map_or(NEUTRAL_MOOD_SCORE, |(score, _)| *score)
}

/// Wellness metric correlated against mood
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Minutes of exercise
    ExerciseMinutes,
    /// Exercise intensity
    ExerciseIntensity,
    /// Diet quality
    DietQuality,
    /// Subjective sleep quality
    SleepQuality,
    /// Sleep score
    SleepScore,
    /// Number of supplements taken
    SupplementCount,
    /// Number of medications taken
    MedicationCount,
}

impl Metric {
    /// Every metric, in report order
    pub const ALL: [Self; 7] = [
        Self::ExerciseMinutes,
        Self::ExerciseIntensity,
        Self::DietQuality,
        Self::SleepQuality,
        Self::SleepScore,
        Self::SupplementCount,
        Self::MedicationCount,
    ];

    /// snake_case name
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ExerciseMinutes => "exercise_minutes",
            Self::ExerciseIntensity => "exercise_intensity",
            Self::DietQuality => "diet_quality",
            Self::SleepQuality => "sleep_quality",
            Self::SleepScore => "sleep_score",
            Self::SupplementCount => "supplement_count",
            Self::MedicationCount => "medication_count",
        }
    }

    /// Metric value of one day's entry; `None` when not recorded
    #[must_use]
    pub fn value(self, entry: &WellnessEntry) -> Option<f64> {
        match self {
            Self::ExerciseMinutes => entry.exercise_minutes,
            Self::ExerciseIntensity => entry.exercise_intensity,
            Self::DietQuality => entry.diet_quality,
            Self::SleepQuality => entry.sleep_quality,
            Self::SleepScore => entry.sleep_score,
            Self::SupplementCount => Some(entry.supplements.len() as f64),
            Self::MedicationCount => Some(entry.medications.len() as f64),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Coefficient for one metric
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricCorrelation {
    /// Metric
    pub metric: Metric,
    /// Pearson coefficient in [-1, 1], `None` when undefined
    pub coefficient: Option<f64>,
    /// Days with both a mood score and a metric value
    pub samples: usize,
}

/// Result of correlating a user's mood with their wellness logs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationReport {
    /// One entry per metric, in [`Metric::ALL`] order
    pub correlations: Vec<MetricCorrelation>,
    /// Days with at least one mood-tagged journal entry
    pub mood_days: usize,
    /// Days with a wellness entry
    pub wellness_days: usize,
}

impl CorrelationReport {
    /// Coefficient of one metric
    #[must_use]
    pub fn coefficient(&self, metric: Metric) -> Option<f64> {
        self.correlations
            .iter()
            .find(|c| c.metric == metric)
            .and_then(|c| c.coefficient)
    }

    /// Metric name to coefficient
    #[must_use]
    pub fn as_map(&self) -> BTreeMap<&'static str, Option<f64>> {
        self.correlations
            .iter()
            .map(|c| (c.metric.name(), c.coefficient))
            .collect()
    }
}

/// Mean mood score per UTC calendar day; entries without a mood are skipped
#[must_use]
pub fn daily_mood(entries: &[JournalEntry]) -> BTreeMap<NaiveDate, f64> {
    let mut sums: BTreeMap<NaiveDate, (f64, u32)> = BTreeMap::new();
    for entry in entries {
        if let Some(mood) = &entry.mood {
            let slot = sums.entry(entry.day()).or_insert((0.0, 0));
            slot.0 += mood_score(mood);
            slot.1 += 1;
        }
    }
    sums.into_iter()
        .map(|(day, (sum, count))| (day, sum / f64::from(count)))
        .collect()
}

/// Pearson correlation coefficient
///
/// `None` with fewer than [`MIN_PAIRS`] pairs, mismatched lengths, zero
/// variance in either series, or a non-finite result. Otherwise clamped to
/// [-1, 1].
#[must_use]
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < MIN_PAIRS {
        return None;
    }
    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;

    let (mut covariance, mut var_x, mut var_y) = (0.0_f64, 0.0_f64, 0.0_f64);
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        covariance += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if is_flat(xs, var_x) || is_flat(ys, var_y) {
        return None;
    }

    let r = covariance / (var_x * var_y).sqrt();
    r.is_finite().then(|| r.clamp(-1.0, 1.0))
}

/// Whether a series' spread is indistinguishable from rounding noise at its own scale
fn is_flat(values: &[f64], sum_sq_dev: f64) -> bool {
    let scale = values.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    let noise = f64::EPSILON * scale;
    sum_sq_dev <= values.len() as f64 * noise * noise
}

/// Correlate daily mood with every wellness metric
#[must_use]
pub fn correlate(journal: &[JournalEntry], wellness: &[WellnessEntry]) -> CorrelationReport {
    let mood = daily_mood(journal);
    let days: BTreeMap<NaiveDate, &WellnessEntry> =
        wellness.iter().map(|entry| (entry.date, entry)).collect();

    let correlations = Metric::ALL
        .iter()
        .map(|&metric| {
            let (moods, values): (Vec<f64>, Vec<f64>) = mood
                .iter()
                .filter_map(|(day, score)| {
                    let value = days.get(day).and_then(|entry| metric.value(entry))?;
                    value.is_finite().then_some((*score, value))
                })
                .unzip();
            MetricCorrelation {
                metric,
                coefficient: pearson(&moods, &values),
                samples: moods.len(),
            }
        })
        .collect();

    CorrelationReport {
        correlations,
        mood_days: mood.len(),
        wellness_days: days.len(),
    }
}
