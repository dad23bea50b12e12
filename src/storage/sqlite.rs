//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::select::CanonicalSelection;
use crate::state::TaskStatus;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{CheckpointRecord, RunKind, RunRecord, RunStatus};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<(RunRecord, String)> {
    let kind: String = row.get(1)?;
    Ok((
        RunRecord {
            id: row.get(0)?,
            kind: RunKind::from_db_string(&kind).unwrap_or(RunKind::Capture),
            started_at: row.get(2)?,
            finished_at: row.get(3)?,
            config_hash: row.get(4)?,
            status: RunStatus::Running,
        },
        row.get(5)?,
    ))
}

fn finish_run((mut run, status): (RunRecord, String)) -> StorageResult<RunRecord> {
    run.status = RunStatus::from_db_string(&status).ok_or(StorageError::InvalidStatus(status))?;
    Ok(run)
}

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&mut self, kind: RunKind, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (kind, started_at, config_hash, status) VALUES (?1, ?2, ?3, ?4)",
            params![
                kind.to_db_string(),
                now,
                config_hash,
                RunStatus::Running.to_db_string()
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        let row = self
            .conn
            .query_row(
                "SELECT id, kind, started_at, finished_at, config_hash, status FROM runs WHERE id = ?1",
                params![run_id],
                run_from_row,
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))?;

        finish_run(row)
    }

    fn get_latest_run(&self, kind: RunKind) -> StorageResult<Option<RunRecord>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, kind, started_at, finished_at, config_hash, status FROM runs
                 WHERE kind = ?1 ORDER BY id DESC LIMIT 1",
                params![kind.to_db_string()],
                run_from_row,
            )
            .optional()?;

        row.map(finish_run).transpose()
    }

    fn update_run_status(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        self.conn.execute(
            "UPDATE runs SET status = ?1 WHERE id = ?2",
            params![status.to_db_string(), run_id],
        )?;
        Ok(())
    }

    fn complete_run(&mut self, run_id: i64) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![RunStatus::Completed.to_db_string(), now, run_id],
        )?;
        Ok(())
    }

    // ===== Selections =====

    fn replace_selections(
        &mut self,
        run_id: i64,
        selections: &[CanonicalSelection],
    ) -> StorageResult<()> {
        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM selections", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO selections (run_id, project, category, page_type, url)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for row in selections {
                stmt.execute(params![
                    run_id,
                    row.project,
                    row.category,
                    row.page_type,
                    row.url
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn load_selections(&self) -> StorageResult<Vec<CanonicalSelection>> {
        let mut stmt = self
            .conn
            .prepare("SELECT project, category, page_type, url FROM selections ORDER BY id")?;

        let rows = stmt.query_map([], |row| {
            Ok(CanonicalSelection {
                project: row.get(0)?,
                category: row.get(1)?,
                page_type: row.get(2)?,
                url: row.get(3)?,
            })
        })?;

        let mut selections = Vec::new();
        for row in rows {
            selections.push(row?);
        }

        Ok(selections)
    }

    // ===== Checkpoint Log =====

    fn append_checkpoint(&mut self, record: &CheckpointRecord) -> StorageResult<()> {
        self.conn.execute(
            "INSERT INTO checkpoint
             (project, page_type, url, status, load_time_s, screenshot_path, error_message, recorded_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                record.project,
                record.page_type,
                record.url,
                record.status.to_db_string(),
                record.load_time_s,
                record.screenshot_path,
                record.error_message,
                record.recorded_at
            ],
        )?;
        Ok(())
    }

    fn load_checkpoint(&self) -> StorageResult<Vec<CheckpointRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT project, page_type, url, status, load_time_s, screenshot_path,
             error_message, recorded_at
             FROM checkpoint ORDER BY id",
        )?;

        let rows = stmt.query_map([], |row| {
            let status: String = row.get(3)?;
            Ok((
                status,
                CheckpointRecord {
                    project: row.get(0)?,
                    page_type: row.get(1)?,
                    url: row.get(2)?,
                    status: TaskStatus::Pending,
                    load_time_s: row.get(4)?,
                    screenshot_path: row.get(5)?,
                    error_message: row.get(6)?,
                    recorded_at: row.get(7)?,
                },
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (status, mut record) = row?;
            record.status =
                TaskStatus::from_db_string(&status).ok_or(StorageError::InvalidStatus(status))?;
            records.push(record);
        }

        Ok(records)
    }

    fn clear_checkpoint(&mut self) -> StorageResult<()> {
        self.conn.execute("DELETE FROM checkpoint", [])?;
        Ok(())
    }

    // ===== Statistics =====

    fn count_checkpoint_by_status(&self, status: TaskStatus) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM checkpoint WHERE status = ?1",
            params![status.to_db_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn count_selections(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM selections", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}
