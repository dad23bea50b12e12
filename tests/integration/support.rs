//! Scripted browser collaborator shared by the integration tests
//!
//! Pages are keyed by their resume key so `https://x.com` and
//! `https://x.com/` address the same stub page.

use async_trait::async_trait;
use serde_json::{json, Value};
use site_canon::browser::{
    Browser, BrowserContext, BrowserError, BrowserResult, ContextOptions, RawResponse, WaitPolicy,
};
use site_canon::capture::{CaptureOptions, ScrollSettings};
use site_canon::discovery::LINKS_SCRIPT;
use site_canon::url::resume_key;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const DEFAULT_HTML: &str = "<html><head><title>Page</title></head><body></body></html>";

/// What the stub serves
#[derive(Default)]
pub struct StubPages {
    links: HashMap<String, Vec<String>>,
    html: HashMap<String, String>,
    raw: HashMap<String, RawResponse>,
    unreachable: HashSet<String>,
    slow: HashSet<String>,
    delay: Duration,
    refuse_contexts: bool,
}

impl StubPages {
    pub fn new() -> Self {
        Self::default()
    }

    /// Anchors returned on `url`
    pub fn links(mut self, url: &str, hrefs: &[&str]) -> Self {
        self.links
            .insert(resume_key(url), hrefs.iter().map(|h| h.to_string()).collect());
        self
    }

    pub fn html(mut self, url: &str, html: &str) -> Self {
        self.html.insert(resume_key(url), html.to_string());
        self
    }

    /// Raw GET answer for an exact URL; anything else is a 404
    pub fn raw(mut self, url: &str, status: u16, body: &str) -> Self {
        self.raw.insert(
            url.to_string(),
            RawResponse {
                status,
                body: body.to_string(),
            },
        );
        self
    }

    /// Every navigation to `url` fails
    pub fn unreachable(mut self, url: &str) -> Self {
        self.unreachable.insert(resume_key(url));
        self
    }

    /// Network-idle navigations to `url` time out; DOM-ready ones succeed
    pub fn slow(mut self, url: &str) -> Self {
        self.slow.insert(resume_key(url));
        self
    }

    /// Time each navigation takes
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Opening a context always fails
    pub fn refuse_contexts(mut self) -> Self {
        self.refuse_contexts = true;
        self
    }
}

/// Counters observed by the tests
#[derive(Default)]
pub struct StubStats {
    open: AtomicUsize,
    peak: AtomicUsize,
    opened: AtomicUsize,
    navigations: Mutex<Vec<(String, WaitPolicy)>>,
    blocked: Mutex<Vec<String>>,
    screenshots: Mutex<Vec<PathBuf>>,
    viewports: Mutex<Vec<ContextOptions>>,
}

impl StubStats {
    /// Most contexts ever open at once
    pub fn peak_open(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn currently_open(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }

    pub fn contexts_opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Navigations to `url`, compared by resume key
    pub fn navigations_to(&self, url: &str) -> usize {
        let key = resume_key(url);
        self.navigations
            .lock()
            .unwrap()
            .iter()
            .filter(|(u, _)| resume_key(u) == key)
            .count()
    }

    pub fn policies_for(&self, url: &str) -> Vec<WaitPolicy> {
        let key = resume_key(url);
        self.navigations
            .lock()
            .unwrap()
            .iter()
            .filter(|(u, _)| resume_key(u) == key)
            .map(|(_, p)| *p)
            .collect()
    }

    pub fn total_navigations(&self) -> usize {
        self.navigations.lock().unwrap().len()
    }

    pub fn blocked_patterns(&self) -> Vec<String> {
        self.blocked.lock().unwrap().clone()
    }

    pub fn screenshots(&self) -> Vec<PathBuf> {
        self.screenshots.lock().unwrap().clone()
    }

    /// Options of every context opened
    pub fn viewports(&self) -> Vec<ContextOptions> {
        self.viewports.lock().unwrap().clone()
    }
}

pub struct StubBrowser {
    pages: Arc<StubPages>,
    pub stats: Arc<StubStats>,
}

impl StubBrowser {
    pub fn new(pages: StubPages) -> Self {
        Self {
            pages: Arc::new(pages),
            stats: Arc::new(StubStats::default()),
        }
    }
}

#[async_trait]
impl Browser for StubBrowser {
    async fn new_context(&self, options: &ContextOptions) -> BrowserResult<Box<dyn BrowserContext>> {
        self.stats.viewports.lock().unwrap().push(*options);
        if self.pages.refuse_contexts {
            return Err(BrowserError::Unavailable("target closed".to_string()));
        }

        let now_open = self.stats.open.fetch_add(1, Ordering::SeqCst) + 1;
        self.stats.peak.fetch_max(now_open, Ordering::SeqCst);
        self.stats.opened.fetch_add(1, Ordering::SeqCst);

        Ok(Box::new(StubContext {
            pages: Arc::clone(&self.pages),
            stats: Arc::clone(&self.stats),
            current: None,
        }))
    }

    async fn raw_get(&self, url: &str) -> BrowserResult<RawResponse> {
        Ok(self.pages.raw.get(url).cloned().unwrap_or(RawResponse {
            status: 404,
            body: String::new(),
        }))
    }
}

struct StubContext {
    pages: Arc<StubPages>,
    stats: Arc<StubStats>,
    current: Option<String>,
}

#[async_trait]
impl BrowserContext for StubContext {
    async fn block(&mut self, pattern: &str) -> BrowserResult<()> {
        self.stats.blocked.lock().unwrap().push(pattern.to_string());
        Ok(())
    }

    async fn navigate(&mut self, url: &str, timeout: Duration, wait: WaitPolicy) -> BrowserResult<()> {
        self.stats
            .navigations
            .lock()
            .unwrap()
            .push((url.to_string(), wait));

        if !self.pages.delay.is_zero() {
            tokio::time::sleep(self.pages.delay).await;
        }

        let key = resume_key(url);
        if self.pages.unreachable.contains(&key) {
            return Err(BrowserError::Navigation {
                url: url.to_string(),
                message: "net::ERR_CONNECTION_REFUSED\n    at navigate".to_string(),
            });
        }
        if self.pages.slow.contains(&key) && wait == WaitPolicy::NetworkIdle {
            return Err(BrowserError::Timeout {
                url: url.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            });
        }

        self.current = Some(key);
        Ok(())
    }

    async fn evaluate(&mut self, script: &str) -> BrowserResult<Value> {
        let current = self.current.clone().unwrap_or_default();

        if script == LINKS_SCRIPT {
            let links = self.pages.links.get(&current).cloned().unwrap_or_default();
            return Ok(json!(links));
        }
        if script == "document.body.scrollHeight" {
            return Ok(json!(1000));
        }
        if script.contains("outerHTML") {
            let html = self
                .pages
                .html
                .get(&current)
                .cloned()
                .unwrap_or_else(|| DEFAULT_HTML.to_string());
            return Ok(json!(html));
        }
        Ok(Value::Null)
    }

    async fn wait_for_network_idle(&mut self, _timeout: Duration) -> BrowserResult<()> {
        Ok(())
    }

    async fn screenshot(&mut self, path: &Path, _full_page: bool) -> BrowserResult<()> {
        std::fs::write(path, b"\x89PNG").map_err(|e| BrowserError::Screenshot(e.to_string()))?;
        self.stats.screenshots.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }

    async fn click_if_visible(&mut self, _selector: &str, _timeout: Duration) -> BrowserResult<bool> {
        Ok(false)
    }

    async fn close(self: Box<Self>) -> BrowserResult<()> {
        self.stats.open.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Capture options without pauses, writing under `root`
pub fn fast_options(root: &Path) -> CaptureOptions {
    CaptureOptions {
        concurrency: 2,
        max_retries: 2,
        page_timeout: Duration::from_secs(1),
        fallback_timeout: Duration::from_secs(1),
        wait_policy: WaitPolicy::NetworkIdle,
        retry_backoff: Duration::ZERO,
        resume: true,
        screenshot_root: root.to_path_buf(),
        date: "2024-05-01".to_string(),
        viewport: ContextOptions::default(),
        scroll: ScrollSettings::instant(5),
    }
}
