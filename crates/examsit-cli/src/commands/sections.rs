//! The `examsit sections` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use examsit_client::{load_config_from, HttpAssessmentApi};
use examsit_core::api::AssessmentApi;
use examsit_core::catalog::SectionCatalog;

pub async fn execute(attempt: Option<i64>, config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let api = HttpAssessmentApi::new(&config);

    let listing = api.list_sections(attempt).await?;
    let catalog = SectionCatalog::new(listing.sections);

    let mut table = Table::new();
    table.set_header(vec!["#", "Section", "Questions", "Time limit", "Status", "Access"]);
    for (i, section) in catalog.iter().enumerate() {
        let access = if catalog.is_unlocked(i) {
            "open"
        } else {
            "locked"
        };
        table.add_row(vec![
            Cell::new(section.order_index),
            Cell::new(&section.name),
            Cell::new(section.question_count),
            Cell::new(format_limit(section.time_limit_seconds)),
            Cell::new(section.status),
            Cell::new(access),
        ]);
    }
    println!("{table}");

    if !listing.can_attempt {
        println!("\nThis assessment has already been taken; see the existing result.");
    }
    Ok(())
}

fn format_limit(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_formatting() {
        assert_eq!(format_limit(420), "7:00");
        assert_eq!(format_limit(61), "1:01");
        assert_eq!(format_limit(0), "0:00");
    }
}
