//! Capture executor
//!
//! Drives every pending selection through
//! `Pending -> Attempting(n) -> Success | Failed` behind an admission gate.
//! All task futures run together on the calling task; the checkpoint log is
//! the only shared state and is appended to under a mutex.

use crate::browser::{Browser, BrowserContext, BrowserError, BrowserResult, ContextOptions, WaitPolicy};
use crate::capture::paths::{append_error_note, error_log_path, run_date, screenshot_path};
use crate::capture::retry::{decide, summarize_error, RetryDecision};
use crate::capture::scroll::{scroll_page, ScrollSettings};
use crate::capture::ControlToken;
use crate::config::{BrowserConfig, CaptureConfig, OutputConfig};
use crate::select::CanonicalSelection;
use crate::state::{TaskPhase, TaskStatus};
use crate::storage::{CheckpointRecord, Storage, StorageResult};
use crate::url::resume_key;
use chrono::Local;
use futures::future::join_all;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

/// Third-party trackers aborted in every capture context
pub const TRACKING_DOMAINS: &[&str] = &[
    "google-analytics.com",
    "googletagmanager.com",
    "googleadservices.com",
    "doubleclick.net",
    "facebook.net",
    "connect.facebook.net",
    "tiktok.com",
    "pixel.wp.com",
    "hm.baidu.com",
    "cnzz.com",
    "hotjar.com",
    "sentry.io",
    "clarity.ms",
];

/// One selection moving through the executor
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureTask {
    pub project: String,
    pub page_type: String,
    pub url: String,
    pub status: TaskStatus,
    /// Seconds from attempt start through scrolling, two decimals
    pub load_time_s: Option<f64>,
    pub screenshot_path: Option<String>,
    /// Attempts beyond the first
    pub retry_count: u32,
    pub error_message: Option<String>,
}

impl CaptureTask {
    pub fn from_selection(selection: &CanonicalSelection) -> Self {
        Self {
            project: selection.project.clone(),
            page_type: selection.page_type.clone(),
            url: selection.url.clone(),
            status: TaskStatus::Pending,
            load_time_s: None,
            screenshot_path: None,
            retry_count: 0,
            error_message: None,
        }
    }

    /// Rebuilds a finalized task from the checkpoint log
    pub fn from_checkpoint(record: &CheckpointRecord) -> Self {
        Self {
            project: record.project.clone(),
            page_type: record.page_type.clone(),
            url: record.url.clone(),
            status: record.status,
            load_time_s: record.load_time_s,
            screenshot_path: record.screenshot_path.clone(),
            retry_count: 0,
            error_message: record.error_message.clone(),
        }
    }

    pub fn to_checkpoint(&self) -> CheckpointRecord {
        CheckpointRecord {
            project: self.project.clone(),
            page_type: self.page_type.clone(),
            url: self.url.clone(),
            status: self.status,
            load_time_s: self.load_time_s,
            screenshot_path: self.screenshot_path.clone(),
            error_message: self.error_message.clone(),
            recorded_at: Local::now().to_rfc3339(),
        }
    }

    fn fail(&mut self, message: &str) {
        self.status = TaskStatus::Failed;
        self.error_message = Some(summarize_error(message));
    }
}

/// Executor settings resolved from configuration
#[derive(Debug, Clone)]
pub struct CaptureOptions {
    pub concurrency: usize,
    pub max_retries: u32,
    pub page_timeout: Duration,
    pub fallback_timeout: Duration,
    pub wait_policy: WaitPolicy,
    pub retry_backoff: Duration,
    pub resume: bool,
    pub screenshot_root: PathBuf,
    /// `YYYY-MM-DD` folder of this run
    pub date: String,
    pub viewport: ContextOptions,
    pub scroll: ScrollSettings,
}

impl CaptureOptions {
    pub fn from_config(capture: &CaptureConfig, browser: &BrowserConfig, output: &OutputConfig) -> Self {
        Self {
            concurrency: capture.concurrency.max(1) as usize,
            max_retries: capture.max_retries,
            page_timeout: Duration::from_millis(capture.page_timeout_ms),
            fallback_timeout: Duration::from_millis(capture.fallback_timeout_ms),
            wait_policy: if capture.strict_load_mode {
                WaitPolicy::NetworkIdle
            } else {
                WaitPolicy::DomReady
            },
            retry_backoff: Duration::from_millis(capture.retry_backoff_ms),
            resume: capture.resume,
            screenshot_root: PathBuf::from(&output.screenshot_root),
            date: run_date(),
            viewport: ContextOptions::from_config(browser),
            scroll: ScrollSettings::for_viewport(capture.max_scrolls, browser.viewport_height),
        }
    }
}

/// Result of a capture run
#[derive(Debug, Clone, Default)]
pub struct CaptureRun {
    /// Prior outcomes followed by this run's tasks
    pub tasks: Vec<CaptureTask>,
    /// Outcomes carried over from the checkpoint log
    pub resumed: usize,
    /// Tasks handed to the executor this run
    pub attempted: usize,
    pub cancelled: bool,
}

impl CaptureRun {
    pub fn count(&self, status: TaskStatus) -> usize {
        self.tasks.iter().filter(|t| t.status == status).count()
    }
}

enum AttemptOutcome {
    Captured { load_time_s: f64 },
    Interrupted,
}

/// Captures every selection not already finalized in the checkpoint log
///
/// Only storage failures while reading or clearing the log abort the run;
/// everything that goes wrong with a single page ends up on its outcome.
pub async fn run_capture<S: Storage + Send>(
    browser: &dyn Browser,
    selections: &[CanonicalSelection],
    storage: &Mutex<S>,
    options: &CaptureOptions,
    control: &ControlToken,
) -> StorageResult<CaptureRun> {
    let prior = {
        let mut store = storage.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if options.resume {
            store.load_checkpoint()?
        } else {
            store.clear_checkpoint()?;
            Vec::new()
        }
    };

    // Latest row wins when a URL was logged more than once
    let mut finished: HashSet<String> = HashSet::new();
    let mut prior: Vec<CheckpointRecord> = prior
        .into_iter()
        .rev()
        .filter(|r| finished.insert(resume_key(&r.url)))
        .collect();
    prior.reverse();

    let pending: Vec<&CanonicalSelection> = selections
        .iter()
        .filter(|s| !finished.contains(&resume_key(&s.url)))
        .collect();

    info!(
        "Capturing {} pages ({} already finalized, concurrency {})",
        pending.len(),
        prior.len(),
        options.concurrency
    );

    let gate = Arc::new(Semaphore::new(options.concurrency.max(1)));
    let futures = pending.iter().map(|selection| {
        let gate = Arc::clone(&gate);
        async move {
            let task = CaptureTask::from_selection(selection);
            if !control.proceed().await {
                return task;
            }
            let Ok(_permit) = gate.acquire().await else {
                return task;
            };
            capture_task(browser, task, storage, options, control).await
        }
    });

    let fresh = join_all(futures).await;

    let mut run = CaptureRun {
        resumed: prior.len(),
        attempted: fresh.len(),
        cancelled: control.is_cancelled(),
        tasks: prior.iter().map(CaptureTask::from_checkpoint).collect(),
    };
    run.tasks.extend(fresh);

    info!(
        "Capture finished: {} success, {} failed, {} pending",
        run.count(TaskStatus::Success),
        run.count(TaskStatus::Failed),
        run.count(TaskStatus::Pending)
    );

    Ok(run)
}

async fn capture_task<S: Storage + Send>(
    browser: &dyn Browser,
    mut task: CaptureTask,
    storage: &Mutex<S>,
    options: &CaptureOptions,
    control: &ControlToken,
) -> CaptureTask {
    if !control.proceed().await {
        return task;
    }

    let shot = screenshot_path(&options.screenshot_root, &options.date, &task.project, &task.page_type);

    match browser.new_context(&options.viewport).await {
        Ok(mut ctx) => {
            for domain in TRACKING_DOMAINS {
                if let Err(e) = ctx.block(&format!("*{}*", domain)).await {
                    debug!("Could not block {}: {}", domain, e);
                }
            }

            attempt_loop(ctx.as_mut(), &mut task, &shot, options, control).await;

            if let Err(e) = ctx.close().await {
                warn!("[{}] Failed to close context: {}", task.project, e);
            }
        }
        Err(e) => {
            error!("[{}] {} could not open a context: {}", task.project, task.page_type, e);
            task.fail(&e.to_string());
        }
    }

    if task.status.is_final() {
        let record = task.to_checkpoint();
        let mut store = storage.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Err(e) = store.append_checkpoint(&record) {
            error!("Failed to log outcome of {}: {}", task.url, e);
        }
    }

    task
}

async fn attempt_loop(
    ctx: &mut dyn BrowserContext,
    task: &mut CaptureTask,
    shot: &Path,
    options: &CaptureOptions,
    control: &ControlToken,
) {
    let mut phase = TaskPhase::Pending;

    loop {
        if !control.proceed().await {
            info!("[{}] {} interrupted", task.project, task.page_type);
            break;
        }
        let Some(next) = phase.next_attempt() else {
            break;
        };
        phase = next;

        match attempt(ctx, &task.url, shot, options, control).await {
            Ok(AttemptOutcome::Captured { load_time_s }) => {
                info!(
                    "[{}] {} captured in {:.2}s",
                    task.project, task.page_type, load_time_s
                );
                task.load_time_s = Some(load_time_s);
                task.screenshot_path = Some(shot.display().to_string());
                task.error_message = None;
                phase = phase.finish(true);
                break;
            }
            Ok(AttemptOutcome::Interrupted) => {
                info!("[{}] {} interrupted", task.project, task.page_type);
                break;
            }
            Err(e) => match decide(&e, phase.attempts(), options.max_retries, options.retry_backoff) {
                RetryDecision::Retry { backoff } => {
                    warn!(
                        "[{}] {} attempt {} failed, retrying: {}",
                        task.project,
                        task.page_type,
                        phase.attempts(),
                        summarize_error(&e.to_string())
                    );
                    tokio::time::sleep(backoff).await;
                }
                RetryDecision::Fail => {
                    error!(
                        "[{}] {} failed after {} attempts: {}",
                        task.project,
                        task.page_type,
                        phase.attempts(),
                        e
                    );
                    task.error_message = Some(summarize_error(&e.to_string()));
                    phase = phase.finish(false);

                    let log = error_log_path(&options.screenshot_root, &options.date, &task.project);
                    if let Err(io) = append_error_note(&log, &task.url, &e.to_string()).await {
                        warn!("Could not write {}: {}", log.display(), io);
                    }
                    break;
                }
            },
        }
    }

    task.retry_count = phase.attempts().saturating_sub(1);
    if let TaskPhase::Success | TaskPhase::Failed = phase {
        task.status = phase.status();
    }
}

async fn attempt(
    ctx: &mut dyn BrowserContext,
    url: &str,
    shot: &Path,
    options: &CaptureOptions,
    control: &ControlToken,
) -> BrowserResult<AttemptOutcome> {
    let started = Instant::now();

    match ctx.navigate(url, options.page_timeout, options.wait_policy).await {
        Ok(()) => {}
        Err(e) if e.is_timeout() => {
            debug!("{} timed out, falling back to DOM ready", url);
            ctx.navigate(url, options.fallback_timeout, WaitPolicy::DomReady)
                .await?;
        }
        Err(e) => return Err(e),
    }

    scroll_page(ctx, &options.scroll, control).await;
    if control.is_cancelled() {
        return Ok(AttemptOutcome::Interrupted);
    }

    let load_time_s = (started.elapsed().as_secs_f64() * 100.0).round() / 100.0;

    if let Some(dir) = shot.parent() {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| BrowserError::Screenshot(format!("{}: {}", dir.display(), e)))?;
    }
    ctx.screenshot(shot, true).await?;

    Ok(AttemptOutcome::Captured { load_time_s })
}
