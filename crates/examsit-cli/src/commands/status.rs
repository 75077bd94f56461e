//! The `examsit status` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::Table;

use examsit_client::{load_config_from, HttpAssessmentApi};
use examsit_core::api::AssessmentApi;
use examsit_core::model::AttemptStatus;

pub async fn execute(attempt: i64, config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let api = HttpAssessmentApi::new(&config);

    let snapshot = api.fetch_progress(attempt).await?;
    let listing = api.list_sections(Some(attempt)).await?;

    let current = snapshot.current_section_id.and_then(|id| {
        listing
            .sections
            .iter()
            .find(|s| s.id == id)
            .map(|s| s.name.clone())
    });

    let mut table = Table::new();
    table.set_header(vec!["Field", "Value"]);
    table.add_row(vec!["Attempt".to_string(), attempt.to_string()]);
    table.add_row(vec!["Status".to_string(), snapshot.status.to_string()]);
    table.add_row(vec![
        "Current section".to_string(),
        current.unwrap_or_else(|| "-".to_string()),
    ]);
    table.add_row(vec![
        "Answers recorded".to_string(),
        snapshot.answers.len().to_string(),
    ]);
    if snapshot.status == AttemptStatus::InProgress {
        table.add_row(vec![
            "Time remaining".to_string(),
            format!(
                "{}:{:02}",
                snapshot.remaining_time_seconds / 60,
                snapshot.remaining_time_seconds % 60
            ),
        ]);
        table.add_row(vec![
            "Paused".to_string(),
            if snapshot.is_paused { "yes" } else { "no" }.to_string(),
        ]);
    }
    println!("{table}");
    Ok(())
}
