//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::select::CanonicalSelection;
use crate::state::TaskStatus;
use crate::storage::{CheckpointRecord, RunKind, RunRecord, RunStatus};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Unknown status in database: {0}")]
    InvalidStatus(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// The capture executor shares one backend between its tasks behind a mutex,
/// so implementations only need `&mut self` access for writes.
pub trait Storage {
    // ===== Run Management =====

    /// Creates a new run
    ///
    /// # Arguments
    ///
    /// * `kind` - Whether this run discovers or captures
    /// * `config_hash` - Hash of the configuration file
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, kind: RunKind, config_hash: &str) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run of the given kind
    fn get_latest_run(&self, kind: RunKind) -> StorageResult<Option<RunRecord>>;

    /// Updates the status of a run
    fn update_run_status(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()>;

    /// Marks a run as completed with a finish timestamp
    fn complete_run(&mut self, run_id: i64) -> StorageResult<()>;

    // ===== Selections =====

    /// Replaces the whole selection table with the rows of one discovery run
    fn replace_selections(
        &mut self,
        run_id: i64,
        selections: &[CanonicalSelection],
    ) -> StorageResult<()>;

    /// Loads the selection table in emission order
    fn load_selections(&self) -> StorageResult<Vec<CanonicalSelection>>;

    // ===== Checkpoint Log =====

    /// Appends one finalized outcome
    fn append_checkpoint(&mut self, record: &CheckpointRecord) -> StorageResult<()>;

    /// Loads every logged outcome in append order
    fn load_checkpoint(&self) -> StorageResult<Vec<CheckpointRecord>>;

    /// Empties the log ahead of a non-resuming capture
    fn clear_checkpoint(&mut self) -> StorageResult<()>;

    // ===== Statistics =====

    /// Counts logged outcomes with the given status
    fn count_checkpoint_by_status(&self, status: TaskStatus) -> StorageResult<u64>;

    /// Counts rows in the selection table
    fn count_selections(&self) -> StorageResult<u64>;
}
