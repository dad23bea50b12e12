//! Statistics from the audit database
//!
//! This module provides functionality for extracting and displaying
//! selection and capture statistics from the storage layer.

use crate::output::report::{AuditReport, OutputResult};
use crate::state::TaskStatus;
use crate::storage::{RunKind, RunRecord, Storage};

/// Audit statistics summary
#[derive(Debug, Clone)]
pub struct AuditStatistics {
    /// Rows in the selection table
    pub selections: u64,

    /// Captures logged as successful
    pub captured: u64,

    /// Captures logged as failed
    pub failed: u64,

    pub last_discovery: Option<RunRecord>,
    pub last_capture: Option<RunRecord>,
}

impl AuditStatistics {
    /// Selections without a logged outcome
    pub fn outstanding(&self) -> u64 {
        self.selections.saturating_sub(self.captured + self.failed)
    }
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(AuditStatistics)` - Successfully loaded statistics
/// * `Err(OutputError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn Storage) -> OutputResult<AuditStatistics> {
    Ok(AuditStatistics {
        selections: storage.count_selections()?,
        captured: storage.count_checkpoint_by_status(TaskStatus::Success)?,
        failed: storage.count_checkpoint_by_status(TaskStatus::Failed)?,
        last_discovery: storage.get_latest_run(RunKind::Discovery)?,
        last_capture: storage.get_latest_run(RunKind::Capture)?,
    })
}

fn describe_run(run: &Option<RunRecord>) -> String {
    match run {
        Some(run) => format!(
            "#{} started {} ({})",
            run.id,
            run.started_at,
            run.status.to_db_string()
        ),
        None => "never".to_string(),
    }
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &AuditStatistics) {
    println!("=== Audit Statistics ===\n");

    println!("Runs:");
    println!("  Last discovery: {}", describe_run(&stats.last_discovery));
    println!("  Last capture: {}", describe_run(&stats.last_capture));
    println!();

    println!("Selections: {}", stats.selections);
    println!("  Captured: {}", stats.captured);
    println!("  Failed: {}", stats.failed);
    println!("  Outstanding: {}", stats.outstanding());
}

/// Prints the per-project outcome table of a report
pub fn print_report(report: &AuditReport) {
    println!("=== Capture Summary ===\n");

    let width = report
        .projects
        .iter()
        .map(|p| p.project.chars().count())
        .max()
        .unwrap_or(0)
        .max("Project".len());

    println!(
        "{:<width$}  {:>5}  {:>7}  {:>6}",
        "Project",
        "Total",
        "Success",
        "Failed",
        width = width
    );
    for tally in &report.projects {
        println!(
            "{:<width$}  {:>5}  {:>7}  {:>6}",
            tally.project,
            tally.total,
            tally.success,
            tally.failed,
            width = width
        );
    }
    println!();

    println!(
        "Overall: {} pages, {} success, {} failed ({:.1}%)",
        report.total(),
        report.success(),
        report.failed(),
        report.success_rate()
    );
    if report.pending() > 0 {
        println!("{} pages left pending; resume to retry them", report.pending());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{CheckpointRecord, SqliteStorage};

    #[test]
    fn test_outstanding() {
        let stats = AuditStatistics {
            selections: 10,
            captured: 6,
            failed: 1,
            last_discovery: None,
            last_capture: None,
        };
        assert_eq!(stats.outstanding(), 3);
    }

    #[test]
    fn test_load_statistics() {
        let mut storage = SqliteStorage::open_in_memory().unwrap();
        let run_id = storage.create_run(RunKind::Discovery, "hash").unwrap();
        storage
            .replace_selections(
                run_id,
                &[
                    crate::CanonicalSelection::new("Acme", "Home", "Home", "https://acme.com"),
                    crate::CanonicalSelection::new("Acme", "About", "About", "https://acme.com/about"),
                ],
            )
            .unwrap();
        storage
            .append_checkpoint(&CheckpointRecord {
                project: "Acme".to_string(),
                page_type: "Home".to_string(),
                url: "https://acme.com".to_string(),
                status: TaskStatus::Success,
                load_time_s: Some(1.0),
                screenshot_path: None,
                error_message: None,
                recorded_at: "2024-01-01T00:00:00Z".to_string(),
            })
            .unwrap();

        let stats = load_statistics(&storage).unwrap();
        assert_eq!(stats.selections, 2);
        assert_eq!(stats.captured, 1);
        assert_eq!(stats.failed, 0);
        assert_eq!(stats.outstanding(), 1);
        assert_eq!(stats.last_discovery.map(|r| r.id), Some(run_id));
        assert!(stats.last_capture.is_none());
    }
}
