// ABOUTME: Insight computations over a user's records
// ABOUTME: Currently the mood and wellness correlation engine
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Lifelog Contributors

/// Mood / wellness correlation engine
pub mod correlation;

pub use correlation::{correlate, CorrelationReport, Metric, MetricCorrelation};
