//! Integration tests for the capture executor
//!
//! These tests drive `run_capture` against the scripted browser and an
//! in-memory database.

use crate::support::{fast_options, StubBrowser, StubPages};
use site_canon::browser::WaitPolicy;
use site_canon::capture::{run_capture, ControlToken, TRACKING_DOMAINS};
use site_canon::state::TaskStatus;
use site_canon::storage::{CheckpointRecord, SqliteStorage, Storage};
use site_canon::CanonicalSelection;
use std::sync::Mutex;
use std::time::Duration;

fn selections(urls: &[(&str, &str)]) -> Vec<CanonicalSelection> {
    urls.iter()
        .map(|(page_type, url)| CanonicalSelection::new("Acme", page_type, page_type, url))
        .collect()
}

fn acme_selections() -> Vec<CanonicalSelection> {
    selections(&[
        ("Home", "https://acme.com"),
        ("About", "https://acme.com/about-us"),
        ("Contact", "https://acme.com/contact"),
        ("FAQ", "https://acme.com/faq"),
        ("Search", "https://acme.com/search"),
    ])
}

fn logged(url: &str, status: TaskStatus) -> CheckpointRecord {
    CheckpointRecord {
        project: "Acme".to_string(),
        page_type: "Logged".to_string(),
        url: url.to_string(),
        status,
        load_time_s: Some(1.0),
        screenshot_path: None,
        error_message: None,
        recorded_at: "2024-05-01T10:00:00+00:00".to_string(),
    }
}

fn memory_storage() -> Mutex<SqliteStorage> {
    Mutex::new(SqliteStorage::open_in_memory().unwrap())
}

#[tokio::test]
async fn test_capture_all_pages() {
    let root = tempfile::tempdir().unwrap();
    let browser = StubBrowser::new(StubPages::new());
    let storage = memory_storage();

    let run = run_capture(
        &browser,
        &acme_selections(),
        &storage,
        &fast_options(root.path()),
        &ControlToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(run.attempted, 5);
    assert_eq!(run.resumed, 0);
    assert_eq!(run.count(TaskStatus::Success), 5);
    assert!(!run.cancelled);

    for task in &run.tasks {
        assert_eq!(task.retry_count, 0);
        assert!(task.load_time_s.is_some());
        assert!(task.error_message.is_none());
    }

    let home = root.path().join("2024-05-01").join("Acme").join("Home.png");
    assert!(home.exists());
    assert_eq!(browser.stats.screenshots().len(), 5);
    assert_eq!(browser.stats.currently_open(), 0);

    let log = storage.lock().unwrap().load_checkpoint().unwrap();
    assert_eq!(log.len(), 5);
    assert!(log.iter().all(|r| r.status == TaskStatus::Success));
}

#[tokio::test]
async fn test_resume_skips_finalized_urls() {
    let root = tempfile::tempdir().unwrap();
    let browser = StubBrowser::new(StubPages::new());
    let storage = memory_storage();
    {
        let mut store = storage.lock().unwrap();
        // Trailing slash and fragment still match the selections
        store.append_checkpoint(&logged("https://acme.com/", TaskStatus::Success)).unwrap();
        store
            .append_checkpoint(&logged("https://acme.com/contact#form", TaskStatus::Failed))
            .unwrap();
    }

    let run = run_capture(
        &browser,
        &acme_selections(),
        &storage,
        &fast_options(root.path()),
        &ControlToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(run.resumed, 2);
    assert_eq!(run.attempted, 3);
    assert_eq!(run.tasks.len(), 5);
    assert_eq!(run.count(TaskStatus::Success), 4);
    assert_eq!(run.count(TaskStatus::Failed), 1);

    assert_eq!(browser.stats.navigations_to("https://acme.com"), 0);
    assert_eq!(browser.stats.navigations_to("https://acme.com/contact"), 0);
    assert_eq!(browser.stats.navigations_to("https://acme.com/faq"), 1);

    assert_eq!(storage.lock().unwrap().load_checkpoint().unwrap().len(), 5);
}

#[tokio::test]
async fn test_fresh_run_clears_log() {
    let root = tempfile::tempdir().unwrap();
    let browser = StubBrowser::new(StubPages::new());
    let storage = memory_storage();
    storage
        .lock()
        .unwrap()
        .append_checkpoint(&logged("https://acme.com", TaskStatus::Success))
        .unwrap();

    let mut options = fast_options(root.path());
    options.resume = false;

    let run = run_capture(&browser, &acme_selections(), &storage, &options, &ControlToken::new())
        .await
        .unwrap();

    assert_eq!(run.resumed, 0);
    assert_eq!(run.attempted, 5);
    assert_eq!(storage.lock().unwrap().load_checkpoint().unwrap().len(), 5);
}

#[tokio::test]
async fn test_open_contexts_never_exceed_gate() {
    let root = tempfile::tempdir().unwrap();
    let browser = StubBrowser::new(StubPages::new().delay(Duration::from_millis(20)));
    let storage = memory_storage();

    let urls: Vec<String> = (0..8).map(|i| format!("https://acme.com/page-{}", i)).collect();
    let rows: Vec<CanonicalSelection> = urls
        .iter()
        .enumerate()
        .map(|(i, url)| CanonicalSelection::new("Acme", "Other", &format!("Page {}", i), url))
        .collect();

    let mut options = fast_options(root.path());
    options.concurrency = 3;

    let run = run_capture(&browser, &rows, &storage, &options, &ControlToken::new())
        .await
        .unwrap();

    assert_eq!(run.count(TaskStatus::Success), 8);
    assert!(browser.stats.peak_open() <= 3);
    assert!(browser.stats.peak_open() >= 1);
    assert_eq!(browser.stats.contexts_opened(), 8);
    assert_eq!(browser.stats.currently_open(), 0);
}

#[tokio::test]
async fn test_retry_exhaustion_fails_task_only() {
    let root = tempfile::tempdir().unwrap();
    let browser = StubBrowser::new(StubPages::new().unreachable("https://acme.com/faq"));
    let storage = memory_storage();

    let run = run_capture(
        &browser,
        &acme_selections(),
        &storage,
        &fast_options(root.path()),
        &ControlToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(browser.stats.navigations_to("https://acme.com/faq"), 3);

    let faq = run.tasks.iter().find(|t| t.page_type == "FAQ").unwrap();
    assert_eq!(faq.status, TaskStatus::Failed);
    assert_eq!(faq.retry_count, 2);
    let message = faq.error_message.as_deref().unwrap();
    assert!(!message.is_empty());
    assert!(!message.contains('\n'));
    assert!(message.chars().count() <= 100);
    assert!(faq.screenshot_path.is_none());

    assert_eq!(run.count(TaskStatus::Success), 4);

    let error_log = root.path().join("2024-05-01").join("Acme").join("error_log.txt");
    let notes = std::fs::read_to_string(error_log).unwrap();
    assert!(notes.contains("https://acme.com/faq\nError: "));

    let log = storage.lock().unwrap().load_checkpoint().unwrap();
    let failed = log.iter().find(|r| r.url == "https://acme.com/faq").unwrap();
    assert_eq!(failed.status, TaskStatus::Failed);
    assert_eq!(failed.error_message.as_deref(), Some(message));
}

#[tokio::test]
async fn test_zero_retries_means_one_attempt() {
    let root = tempfile::tempdir().unwrap();
    let browser = StubBrowser::new(StubPages::new().unreachable("https://acme.com"));
    let storage = memory_storage();

    let mut options = fast_options(root.path());
    options.max_retries = 0;

    let run = run_capture(
        &browser,
        &selections(&[("Home", "https://acme.com")]),
        &storage,
        &options,
        &ControlToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(browser.stats.navigations_to("https://acme.com"), 1);
    assert_eq!(run.tasks[0].status, TaskStatus::Failed);
    assert_eq!(run.tasks[0].retry_count, 0);
}

#[tokio::test]
async fn test_timeout_falls_back_to_dom_ready() {
    let root = tempfile::tempdir().unwrap();
    let browser = StubBrowser::new(StubPages::new().slow("https://acme.com/about-us"));
    let storage = memory_storage();

    let run = run_capture(
        &browser,
        &selections(&[("About", "https://acme.com/about-us")]),
        &storage,
        &fast_options(root.path()),
        &ControlToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(run.tasks[0].status, TaskStatus::Success);
    assert_eq!(run.tasks[0].retry_count, 0);
    assert_eq!(
        browser.stats.policies_for("https://acme.com/about-us"),
        vec![WaitPolicy::NetworkIdle, WaitPolicy::DomReady]
    );
}

#[tokio::test]
async fn test_context_failure_is_recorded_as_failed() {
    let root = tempfile::tempdir().unwrap();
    let browser = StubBrowser::new(StubPages::new().refuse_contexts());
    let storage = memory_storage();

    let run = run_capture(
        &browser,
        &acme_selections(),
        &storage,
        &fast_options(root.path()),
        &ControlToken::new(),
    )
    .await
    .unwrap();

    assert_eq!(run.count(TaskStatus::Failed), 5);
    assert_eq!(browser.stats.total_navigations(), 0);
    assert!(run
        .tasks
        .iter()
        .all(|t| t.error_message.as_deref().is_some_and(|m| m.contains("target closed"))));
    assert_eq!(storage.lock().unwrap().load_checkpoint().unwrap().len(), 5);
}

#[tokio::test]
async fn test_cancelled_run_reports_pending_and_logs_nothing() {
    let root = tempfile::tempdir().unwrap();
    let browser = StubBrowser::new(StubPages::new());
    let storage = memory_storage();

    let control = ControlToken::new();
    control.cancel();

    let run = run_capture(
        &browser,
        &acme_selections(),
        &storage,
        &fast_options(root.path()),
        &control,
    )
    .await
    .unwrap();

    assert!(run.cancelled);
    assert_eq!(run.tasks.len(), 5);
    assert_eq!(run.count(TaskStatus::Pending), 5);
    assert_eq!(browser.stats.contexts_opened(), 0);
    assert!(storage.lock().unwrap().load_checkpoint().unwrap().is_empty());
}

#[tokio::test]
async fn test_tracking_domains_are_blocked() {
    let root = tempfile::tempdir().unwrap();
    let browser = StubBrowser::new(StubPages::new());
    let storage = memory_storage();

    run_capture(
        &browser,
        &selections(&[("Home", "https://acme.com")]),
        &storage,
        &fast_options(root.path()),
        &ControlToken::new(),
    )
    .await
    .unwrap();

    let blocked = browser.stats.blocked_patterns();
    assert_eq!(blocked.len(), TRACKING_DOMAINS.len());
    assert!(blocked.contains(&"*doubleclick.net*".to_string()));
}

#[tokio::test]
async fn test_screenshot_names_are_sanitized() {
    let root = tempfile::tempdir().unwrap();
    let browser = StubBrowser::new(StubPages::new());
    let storage = memory_storage();

    let rows = vec![CanonicalSelection::new(
        "Acme",
        "SEO",
        "Robots.txt",
        "https://acme.com/robots.txt",
    )];
    let run = run_capture(&browser, &rows, &storage, &fast_options(root.path()), &ControlToken::new())
        .await
        .unwrap();

    let expected = root.path().join("2024-05-01").join("Acme").join("Robotstxt.png");
    assert!(expected.exists());
    assert_eq!(
        run.tasks[0].screenshot_path.as_deref(),
        Some(expected.display().to_string().as_str())
    );
}

#[tokio::test]
async fn test_pause_suspends_without_using_a_retry() {
    let root = tempfile::tempdir().unwrap();
    let browser = StubBrowser::new(StubPages::new().delay(Duration::from_millis(100)));
    let storage = memory_storage();
    let control = ControlToken::new();
    let options = fast_options(root.path());
    let rows = selections(&[("Home", "https://acme.com")]);

    let operator = async {
        // Pause while the navigation is in flight; the scroll loop then blocks
        tokio::time::sleep(Duration::from_millis(30)).await;
        control.pause();
        tokio::time::sleep(Duration::from_millis(250)).await;

        assert!(storage.lock().unwrap().load_checkpoint().unwrap().is_empty());
        assert!(browser.stats.screenshots().is_empty());
        control.resume();
    };

    let (run, ()) = tokio::join!(
        run_capture(&browser, &rows, &storage, &options, &control),
        operator
    );
    let run = run.unwrap();

    assert!(!run.cancelled);
    assert_eq!(run.tasks[0].status, TaskStatus::Success);
    assert_eq!(run.tasks[0].retry_count, 0);
    assert_eq!(browser.stats.navigations_to("https://acme.com"), 1);
    assert_eq!(storage.lock().unwrap().load_checkpoint().unwrap().len(), 1);
}

#[tokio::test]
async fn test_cancel_during_backoff_leaves_task_pending() {
    let root = tempfile::tempdir().unwrap();
    let browser = StubBrowser::new(StubPages::new().unreachable("https://acme.com/faq"));
    let storage = memory_storage();
    let control = ControlToken::new();

    let mut options = fast_options(root.path());
    options.retry_backoff = Duration::from_millis(300);
    let rows = selections(&[("FAQ", "https://acme.com/faq")]);

    let operator = async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        control.cancel();
    };

    let (run, ()) = tokio::join!(
        run_capture(&browser, &rows, &storage, &options, &control),
        operator
    );
    let run = run.unwrap();

    assert!(run.cancelled);
    assert_eq!(run.tasks[0].status, TaskStatus::Pending);
    assert!(run.tasks[0].error_message.is_none());
    assert_eq!(browser.stats.navigations_to("https://acme.com/faq"), 1);
    assert_eq!(browser.stats.currently_open(), 0);
    assert!(storage.lock().unwrap().load_checkpoint().unwrap().is_empty());

    let error_log = root.path().join("2024-05-01").join("Acme").join("error_log.txt");
    assert!(!error_log.exists());
}

#[tokio::test]
async fn test_project_folder_is_sanitized() {
    let root = tempfile::tempdir().unwrap();
    let browser = StubBrowser::new(StubPages::new());
    let storage = memory_storage();

    let rows = vec![CanonicalSelection::new("A/B Co", "Home", "Home", "https://ab.co")];
    run_capture(&browser, &rows, &storage, &fast_options(root.path()), &ControlToken::new())
        .await
        .unwrap();

    let expected = root.path().join("2024-05-01").join("AB Co").join("Home.png");
    assert!(expected.exists());
    assert!(!root.path().join("2024-05-01").join("A").exists());
}
