//! Aggregate report types
//!
//! An `AuditReport` tallies capture outcomes per project. It is built either
//! from the tasks of a finished run or from what the database holds.

use crate::capture::CaptureTask;
use crate::state::TaskStatus;
use crate::storage::StorageError;
use chrono::Local;
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Outcome counts of one project
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectTally {
    pub project: String,
    pub total: usize,
    pub success: usize,
    pub failed: usize,
    pub pending: usize,
    /// Mean load time over successful captures
    pub mean_load_time_s: Option<f64>,
}

impl ProjectTally {
    fn new(project: &str) -> Self {
        Self {
            project: project.to_string(),
            ..Self::default()
        }
    }
}

/// A capture that exhausted its attempts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedCapture {
    pub project: String,
    pub page_type: String,
    pub url: String,
    pub message: String,
}

/// Per-project and overall outcome counts
#[derive(Debug, Clone, Default)]
pub struct AuditReport {
    pub generated_at: String,
    /// Sorted by project name
    pub projects: Vec<ProjectTally>,
    pub failures: Vec<FailedCapture>,
}

impl AuditReport {
    /// Tallies a set of tasks
    pub fn from_tasks(tasks: &[CaptureTask]) -> Self {
        let mut tallies: BTreeMap<&str, ProjectTally> = BTreeMap::new();
        let mut load_times: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
        let mut failures = Vec::new();

        for task in tasks {
            let tally = tallies
                .entry(task.project.as_str())
                .or_insert_with(|| ProjectTally::new(&task.project));
            tally.total += 1;

            match task.status {
                TaskStatus::Success => {
                    tally.success += 1;
                    if let Some(load_time) = task.load_time_s {
                        load_times.entry(task.project.as_str()).or_default().push(load_time);
                    }
                }
                TaskStatus::Failed => {
                    tally.failed += 1;
                    failures.push(FailedCapture {
                        project: task.project.clone(),
                        page_type: task.page_type.clone(),
                        url: task.url.clone(),
                        message: task.error_message.clone().unwrap_or_default(),
                    });
                }
                TaskStatus::Pending => tally.pending += 1,
            }
        }

        for (project, times) in load_times {
            if let Some(tally) = tallies.get_mut(project) {
                let mean = times.iter().sum::<f64>() / times.len() as f64;
                tally.mean_load_time_s = Some((mean * 100.0).round() / 100.0);
            }
        }

        Self {
            generated_at: Local::now().to_rfc3339(),
            projects: tallies.into_values().collect(),
            failures,
        }
    }

    pub fn total(&self) -> usize {
        self.projects.iter().map(|p| p.total).sum()
    }

    pub fn success(&self) -> usize {
        self.projects.iter().map(|p| p.success).sum()
    }

    pub fn failed(&self) -> usize {
        self.projects.iter().map(|p| p.failed).sum()
    }

    pub fn pending(&self) -> usize {
        self.projects.iter().map(|p| p.pending).sum()
    }

    /// Returns the success rate as a percentage
    pub fn success_rate(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        (self.success() as f64 / total as f64) * 100.0
    }
}
