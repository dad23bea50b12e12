//! Markdown summary generation
//!
//! This module renders an audit report as a human-readable markdown file:
//! run metadata, overall counts, a per-project table and the failed pages.

use crate::output::report::{AuditReport, OutputResult};
use crate::storage::RunRecord;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Longest error message shown in the failures table
const FAILURE_MESSAGE_WIDTH: usize = 80;

/// Writes a markdown summary of an audit report
///
/// # Arguments
///
/// * `report` - The aggregate report
/// * `run` - The capture run the report belongs to, if known
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote markdown summary
/// * `Err(OutputError)` - Failed to write summary
pub fn generate_markdown_summary(
    report: &AuditReport,
    run: Option<&RunRecord>,
    output_path: &Path,
) -> OutputResult<()> {
    let markdown = format_markdown_summary(report, run);

    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

fn table_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}

/// Formats an audit report as markdown
pub fn format_markdown_summary(report: &AuditReport, run: Option<&RunRecord>) -> String {
    let mut md = String::new();

    md.push_str("# Site Canon Audit Summary\n\n");

    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Generated**: {}\n", report.generated_at));
    if let Some(run) = run {
        md.push_str(&format!("- **Run ID**: {}\n", run.id));
        md.push_str(&format!("- **Started**: {}\n", run.started_at));
        if let Some(finished) = &run.finished_at {
            md.push_str(&format!("- **Finished**: {}\n", finished));
        }
        md.push_str(&format!("- **Status**: {}\n", run.status.to_db_string()));
        md.push_str(&format!("- **Config Hash**: {}\n", run.config_hash));
    }
    md.push('\n');

    md.push_str("## Overall Statistics\n\n");
    md.push_str(&format!("- **Projects**: {}\n", report.projects.len()));
    md.push_str(&format!("- **Total Pages**: {}\n", report.total()));
    md.push_str(&format!("- **Success**: {}\n", report.success()));
    md.push_str(&format!("- **Failed**: {}\n", report.failed()));
    if report.pending() > 0 {
        md.push_str(&format!("- **Pending**: {}\n", report.pending()));
    }
    md.push_str(&format!(
        "- **Success Rate**: {:.2}%\n\n",
        report.success_rate()
    ));

    if !report.projects.is_empty() {
        md.push_str("## Projects\n\n");
        md.push_str("| Project | Total | Success | Failed | Pending | Mean Load (s) |\n");
        md.push_str("|---------|-------|---------|--------|---------|---------------|\n");

        for tally in &report.projects {
            let mean = tally
                .mean_load_time_s
                .map(|t| format!("{:.2}", t))
                .unwrap_or_else(|| "-".to_string());
            md.push_str(&format!(
                "| {} | {} | {} | {} | {} | {} |\n",
                table_cell(&tally.project),
                tally.total,
                tally.success,
                tally.failed,
                tally.pending,
                mean
            ));
        }
        md.push('\n');
    }

    if !report.failures.is_empty() {
        md.push_str("## Failed Pages\n\n");
        md.push_str("| Project | Page Type | URL | Error |\n");
        md.push_str("|---------|-----------|-----|-------|\n");

        for failure in &report.failures {
            let message: String = failure.message.chars().take(FAILURE_MESSAGE_WIDTH).collect();
            md.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                table_cell(&failure.project),
                table_cell(&failure.page_type),
                failure.url,
                table_cell(&message)
            ));
        }
        md.push('\n');
    }

    md
}
