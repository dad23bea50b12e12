//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the site-canon database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Track discovery and capture runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    kind TEXT NOT NULL,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL
);

-- Canonical selections, replaced wholesale by each discovery run
CREATE TABLE IF NOT EXISTS selections (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id INTEGER NOT NULL REFERENCES runs(id),
    project TEXT NOT NULL,
    category TEXT NOT NULL,
    page_type TEXT NOT NULL,
    url TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_selections_project ON selections(project);

-- Append-only log of finalized capture outcomes
CREATE TABLE IF NOT EXISTS checkpoint (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    project TEXT NOT NULL,
    page_type TEXT NOT NULL,
    url TEXT NOT NULL,
    status TEXT NOT NULL,
    load_time_s REAL,
    screenshot_path TEXT,
    error_message TEXT,
    recorded_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_checkpoint_url ON checkpoint(url);
CREATE INDEX IF NOT EXISTS idx_checkpoint_status ON checkpoint(status);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
