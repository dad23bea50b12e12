//! Retry policy for capture attempts

use crate::browser::BrowserError;
use std::time::Duration;

/// Longest error message kept on a failed outcome
pub const MAX_ERROR_CHARS: usize = 100;

/// What to do after a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry { backoff: Duration },
    Fail,
}

/// Decides whether a failed attempt is retried
///
/// `attempt` is the 1-based number of the attempt that just failed, so a task
/// gets at most `max_retries + 1` attempts. A browser that has gone away is
/// not retried.
///
/// # Examples
///
/// ```
/// use site_canon::browser::BrowserError;
/// use site_canon::capture::{decide, RetryDecision};
/// use std::time::Duration;
///
/// let err = BrowserError::Screenshot("boom".to_string());
/// let backoff = Duration::from_secs(2);
/// assert_eq!(decide(&err, 1, 2, backoff), RetryDecision::Retry { backoff });
/// assert_eq!(decide(&err, 3, 2, backoff), RetryDecision::Fail);
/// ```
pub fn decide(
    error: &BrowserError,
    attempt: u32,
    max_retries: u32,
    backoff: Duration,
) -> RetryDecision {
    if matches!(error, BrowserError::Unavailable(_)) {
        return RetryDecision::Fail;
    }

    if attempt <= max_retries {
        RetryDecision::Retry { backoff }
    } else {
        RetryDecision::Fail
    }
}

/// Reduces an error to its first line, at most `MAX_ERROR_CHARS` characters
pub fn summarize_error(message: &str) -> String {
    let first_line = message.lines().next().unwrap_or_default().trim();
    let summary: String = first_line.chars().take(MAX_ERROR_CHARS).collect();
    if summary.is_empty() {
        "Unknown error".to_string()
    } else {
        summary
    }
}
