//! Screenshot and error-log locations
//!
//! Everything a capture run writes lives under
//! `<screenshot-root>/<YYYY-MM-DD>/<project>/`.

use chrono::Local;
use std::io;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

const ERROR_LOG_NAME: &str = "error_log.txt";

/// Keeps letters, digits, spaces, `-` and `_` of a page type, trimmed
///
/// # Example
///
/// ```
/// use site_canon::capture::sanitize_page_type;
///
/// assert_eq!(sanitize_page_type("Robots.txt"), "Robotstxt");
/// assert_eq!(sanitize_page_type("Product Detail/2"), "Product Detail2");
/// ```
pub fn sanitize_page_type(page_type: &str) -> String {
    path_component(page_type, "page")
}

/// Same filter for the project folder; titles may carry `/` or `..`
pub fn sanitize_project(project: &str) -> String {
    path_component(project, "project")
}

fn path_component(raw: &str, fallback: &str) -> String {
    let kept: String = raw
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect();

    match kept.trim() {
        "" => fallback.to_string(),
        trimmed => trimmed.to_string(),
    }
}

/// Today's folder name
pub fn run_date() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}

/// `<root>/<date>/<project>`
pub fn project_dir(root: &Path, date: &str, project: &str) -> PathBuf {
    root.join(date).join(sanitize_project(project))
}

/// Where the screenshot of one selection is written
pub fn screenshot_path(root: &Path, date: &str, project: &str, page_type: &str) -> PathBuf {
    project_dir(root, date, project).join(format!("{}.png", sanitize_page_type(page_type)))
}

/// Per-project log of exhausted captures
pub fn error_log_path(root: &Path, date: &str, project: &str) -> PathBuf {
    project_dir(root, date, project).join(ERROR_LOG_NAME)
}

/// Appends a timestamped failure note to an error log
pub async fn append_error_note(path: &Path, url: &str, error: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let note = format!(
        "[{}] {}\nError: {}\n\n",
        Local::now().format("%Y-%m-%d %H:%M:%S"),
        url,
        error
    );

    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(note.as_bytes()).await?;
    file.flush().await
}
