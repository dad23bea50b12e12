//! Capture: resumable, concurrent, retrying screenshots of selections
//!
//! # Components
//!
//! - `executor`: task state machine, admission gate and checkpoint appends
//! - `scroll`: lazy-content scrolling ahead of full-page screenshots
//! - `retry`: pure retry decision and error summarizing
//! - `paths`: screenshot and error-log layout
//! - `control`: shared pause/cancel token

mod control;
mod executor;
mod paths;
mod retry;
mod scroll;

pub use control::ControlToken;
pub use executor::{run_capture, CaptureOptions, CaptureRun, CaptureTask, TRACKING_DOMAINS};
pub use paths::{
    append_error_note, error_log_path, project_dir, run_date, sanitize_page_type, sanitize_project,
    screenshot_path,
};
pub use retry::{decide, summarize_error, RetryDecision, MAX_ERROR_CHARS};
pub use scroll::{scroll_page, ScrollReport, ScrollSettings};
