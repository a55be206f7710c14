// ABOUTME: Insight commands for lifelog-cli
// ABOUTME: Prints the mood / wellness correlation report of one user
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Lifelog Contributors

use std::sync::Arc;

use lifelog_server::config::ServerConfig;
use lifelog_server::errors::AppResult;
use lifelog_server::models::AuthContext;
use lifelog_server::persistence::factory;
use lifelog_server::services::WellnessService;
use uuid::Uuid;

/// Print per-metric coefficients for one user
pub async fn correlations(config: &ServerConfig, user_id: Uuid, email: String) -> AppResult<()> {
    let store = Arc::new(factory::initialize(config).await?);
    let auth = AuthContext::new(user_id, email);
    let report = WellnessService::new(store).correlations(&auth).await?;

    println!(
        "{} mood days, {} wellness days",
        report.mood_days, report.wellness_days
    );
    println!("{:<20} {:>12} {:>8}", "metric", "coefficient", "days");
    for row in &report.correlations {
        let coefficient = row
            .coefficient
            .map_or_else(|| "n/a".to_owned(), |r| format!("{r:+.3}"));
        println!("{:<20} {coefficient:>12} {:>8}", row.metric.name(), row.samples);
    }
    Ok(())
}
