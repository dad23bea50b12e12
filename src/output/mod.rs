//! Output module for audit reports
//!
//! This module handles:
//! - Tallying capture outcomes per project
//! - Generating markdown summaries of an audit
//! - Printing statistics and reports to the terminal

mod markdown;
mod report;
pub mod stats;

pub use markdown::{format_markdown_summary, generate_markdown_summary};
pub use report::{AuditReport, FailedCapture, OutputError, OutputResult, ProjectTally};
pub use stats::{load_statistics, print_report, print_statistics, AuditStatistics};

use crate::capture::CaptureTask;
use crate::storage::Storage;
use crate::url::resume_key;
use std::collections::HashMap;

/// Builds a report from the selection table and the checkpoint log
///
/// Every selection yields one row: its latest logged outcome, or Pending when
/// it was never finalized. Logged outcomes of URLs no longer selected are
/// kept as well.
///
/// # Arguments
///
/// * `storage` - The storage backend containing audit data
pub fn generate_report(storage: &dyn Storage) -> OutputResult<AuditReport> {
    let selections = storage.load_selections()?;

    let mut logged: HashMap<String, CaptureTask> = HashMap::new();
    let mut order: Vec<String> = Vec::new();
    for record in storage.load_checkpoint()? {
        let key = resume_key(&record.url);
        if logged
            .insert(key.clone(), CaptureTask::from_checkpoint(&record))
            .is_none()
        {
            order.push(key);
        }
    }

    let mut tasks = Vec::with_capacity(selections.len().max(logged.len()));
    for selection in &selections {
        let task = logged
            .remove(&resume_key(&selection.url))
            .unwrap_or_else(|| CaptureTask::from_selection(selection));
        tasks.push(task);
    }
    tasks.extend(order.iter().filter_map(|key| logged.remove(key)));

    Ok(AuditReport::from_tasks(&tasks))
}
