//! Chromium-backed browser collaborator using chromiumoxide.

use crate::browser::http::{build_http_client, fetch_raw};
use crate::browser::{
    Browser, BrowserContext, BrowserError, BrowserResult, ContextOptions, RawResponse, WaitPolicy,
};
use crate::config::BrowserConfig;
use async_trait::async_trait;
use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpBrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::network::{EnableParams, SetBlockedUrLsParams};
use chromiumoxide::cdp::browser_protocol::page::{CaptureScreenshotFormat, NavigateParams};
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams, DisposeBrowserContextParams,
};
use chromiumoxide::error::CdpError;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use reqwest::Client;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(100);
const IDLE_WINDOW: Duration = Duration::from_millis(500);

/// Discovery navigates with fixed timeouts of up to a minute
const MIN_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const REQUEST_TIMEOUT_MARGIN: Duration = Duration::from_secs(15);

/// Set on the old document before navigating so polling can tell it apart
const STALE_MARKER_SCRIPT: &str = "window.__siteCanonStale = true";
const READY_STATE_SCRIPT: &str =
    "window.__siteCanonStale === true ? 'stale' : document.readyState";
const RESOURCE_COUNT_SCRIPT: &str = "performance.getEntriesByType('resource').length";

/// Clicks a visible element; `tag:has-text('x')` matches by tag and text.
const CLICK_SCRIPT: &str = r#"(() => {
    const sel = __SELECTOR__;
    let el = null;
    const m = sel.match(/^([\w-]+):has-text\('(.*)'\)$/);
    if (m) {
        el = Array.from(document.querySelectorAll(m[1]))
            .find(e => (e.innerText || e.textContent || '').includes(m[2])) || null;
    } else {
        el = document.querySelector(sel);
    }
    if (!el) return false;
    const rect = el.getBoundingClientRect();
    const style = window.getComputedStyle(el);
    if (rect.width === 0 || rect.height === 0 || style.visibility === 'hidden' || style.display === 'none') {
        return false;
    }
    el.click();
    return true;
})()"#;

/// CDP request timeout for a run whose longest navigation is `navigation`
///
/// Must outlast every navigation timeout so chromiumoxide never drops a
/// pending navigation before our own deadline fires.
pub fn request_timeout(navigation: Duration) -> Duration {
    navigation.max(MIN_REQUEST_TIMEOUT) + REQUEST_TIMEOUT_MARGIN
}

fn navigation_error(url: &str, timeout: Duration, err: CdpError) -> BrowserError {
    match err {
        CdpError::Timeout => BrowserError::Timeout {
            url: url.to_string(),
            timeout_ms: timeout.as_millis() as u64,
        },
        other => BrowserError::Navigation {
            url: url.to_string(),
            message: other.to_string(),
        },
    }
}

/// Whether a polled ready state satisfies the wait policy
fn ready_state_reached(state: &str, wait: WaitPolicy) -> bool {
    match wait {
        WaitPolicy::DomReady => state == "interactive" || state == "complete",
        WaitPolicy::Load | WaitPolicy::NetworkIdle => state == "complete",
    }
}

/// Headless Chromium instance shared by every context of a run
pub struct ChromiumBrowser {
    browser: Arc<CdpBrowser>,
    handler: JoinHandle<()>,
    http: Client,
}

impl ChromiumBrowser {
    /// Launches Chromium with the given configuration
    ///
    /// Uses `chrome-path` when set and chromiumoxide's executable detection
    /// otherwise. `navigation_timeout` is the longest navigation the run will
    /// ask for.
    pub async fn launch(config: &BrowserConfig, navigation_timeout: Duration) -> BrowserResult<Self> {
        let mut builder = CdpBrowserConfig::builder()
            .request_timeout(request_timeout(navigation_timeout))
            .window_size(config.viewport_width, config.viewport_height)
            .viewport(Viewport {
                width: config.viewport_width,
                height: config.viewport_height,
                device_scale_factor: None,
                emulating_mobile: false,
                is_landscape: false,
                has_touch: false,
            })
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--ignore-certificate-errors")
            .arg(format!("--user-agent={}", config.user_agent));

        if let Some(path) = &config.chrome_path {
            builder = builder.chrome_executable(path);
        }

        if let Some(proxy) = &config.proxy {
            builder = builder.arg(format!("--proxy-server={}", proxy));
        }

        if !config.headless {
            builder = builder.with_head();
        }

        let cdp_config = builder.build().map_err(BrowserError::Unavailable)?;

        let (browser, mut handler) = CdpBrowser::launch(cdp_config)
            .await
            .map_err(|e| BrowserError::Unavailable(format!("failed to launch Chromium: {e}")))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("Chromium handler event error: {}", e);
                }
            }
        });

        let http = build_http_client(config).map_err(|e| BrowserError::Request {
            url: String::new(),
            source: e,
        })?;

        Ok(Self {
            browser: Arc::new(browser),
            handler,
            http,
        })
    }

    /// Closes the browser and waits for its handler task
    pub async fn shutdown(self) {
        match Arc::try_unwrap(self.browser) {
            Ok(mut browser) => {
                if let Err(e) = browser.close().await {
                    warn!("Failed to close Chromium cleanly: {}", e);
                }
                let _ = browser.wait().await;
            }
            Err(_) => warn!("Browser contexts still open at shutdown; killing Chromium"),
        }
        self.handler.abort();
    }
}

async fn dispose_context(browser: &CdpBrowser, context_id: BrowserContextId) {
    if let Err(e) = browser
        .execute(DisposeBrowserContextParams::new(context_id))
        .await
    {
        debug!("Failed to dispose browser context: {}", e);
    }
}

#[async_trait]
impl Browser for ChromiumBrowser {
    async fn new_context(
        &self,
        options: &ContextOptions,
    ) -> BrowserResult<Box<dyn BrowserContext>> {
        let context_id = self
            .browser
            .execute(CreateBrowserContextParams::default())
            .await
            .map_err(|e| BrowserError::Unavailable(format!("failed to create context: {e}")))?
            .result
            .browser_context_id;

        let mut target = CreateTargetParams::new("about:blank");
        target.browser_context_id = Some(context_id.clone());

        let page = match self.browser.new_page(target).await {
            Ok(page) => page,
            Err(e) => {
                dispose_context(&self.browser, context_id).await;
                return Err(BrowserError::Unavailable(format!("failed to open page: {e}")));
            }
        };

        let metrics = SetDeviceMetricsOverrideParams::new(
            options.viewport_width as i64,
            options.viewport_height as i64,
            1.0,
            false,
        );
        if let Err(e) = page.execute(metrics).await {
            dispose_context(&self.browser, context_id).await;
            return Err(BrowserError::Unavailable(format!("failed to set viewport: {e}")));
        }

        Ok(Box::new(ChromiumContext {
            browser: Arc::clone(&self.browser),
            context_id,
            page,
            blocked: Vec::new(),
        }))
    }

    async fn raw_get(&self, url: &str) -> BrowserResult<RawResponse> {
        fetch_raw(&self.http, url).await
    }
}

/// One tab inside its own browser context
///
/// Cookies and storage are not shared with other contexts; the context is
/// disposed on close.
pub struct ChromiumContext {
    browser: Arc<CdpBrowser>,
    context_id: BrowserContextId,
    page: Page,
    blocked: Vec<String>,
}

impl ChromiumContext {
    async fn eval(&self, script: &str) -> BrowserResult<serde_json::Value> {
        let result = self
            .page
            .evaluate(script)
            .await
            .map_err(|e| BrowserError::Script(e.to_string()))?;
        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }

    async fn ready_state(&self) -> BrowserResult<String> {
        let value = self.eval(READY_STATE_SCRIPT).await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    /// Polls until the resource count stops growing for `IDLE_WINDOW`
    async fn settle_network(&self) -> BrowserResult<()> {
        let mut last = self.eval(RESOURCE_COUNT_SCRIPT).await?.as_u64();
        let mut quiet_since = Instant::now();

        loop {
            tokio::time::sleep(POLL_INTERVAL).await;
            let current = self.eval(RESOURCE_COUNT_SCRIPT).await?.as_u64();
            if current != last {
                last = current;
                quiet_since = Instant::now();
            } else if quiet_since.elapsed() >= IDLE_WINDOW {
                return Ok(());
            }
        }
    }

    /// Polls the new document's ready state; errors while the old document
    /// is torn down count as not ready
    async fn wait_until(&self, wait: WaitPolicy) -> BrowserResult<()> {
        loop {
            match self.ready_state().await {
                Ok(state) if ready_state_reached(&state, wait) => break,
                Ok(_) => {}
                Err(e) => debug!("Ready state not readable yet: {}", e),
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }

        if wait == WaitPolicy::NetworkIdle {
            self.settle_network().await?;
        }

        Ok(())
    }
}

#[async_trait]
impl BrowserContext for ChromiumContext {
    async fn block(&mut self, pattern: &str) -> BrowserResult<()> {
        if self.blocked.is_empty() {
            self.page
                .execute(EnableParams::default())
                .await
                .map_err(|e| BrowserError::Unavailable(format!("failed to enable network: {e}")))?;
        }

        self.blocked.push(pattern.to_string());
        self.page
            .execute(SetBlockedUrLsParams::new(self.blocked.clone()))
            .await
            .map_err(|e| BrowserError::Unavailable(format!("failed to block {pattern}: {e}")))?;
        Ok(())
    }

    async fn navigate(
        &mut self,
        url: &str,
        timeout: Duration,
        wait: WaitPolicy,
    ) -> BrowserResult<()> {
        let navigation = async {
            if let Err(e) = self.eval(STALE_MARKER_SCRIPT).await {
                debug!("Could not mark the previous document: {}", e);
            }

            match wait {
                // goto resolves on the load event, which DOM ready must not wait for
                WaitPolicy::DomReady => {
                    let response = self
                        .page
                        .execute(NavigateParams::new(url))
                        .await
                        .map_err(|e| navigation_error(url, timeout, e))?;
                    if let Some(message) = response.result.error_text.clone() {
                        return Err(BrowserError::Navigation {
                            url: url.to_string(),
                            message,
                        });
                    }
                }
                WaitPolicy::Load | WaitPolicy::NetworkIdle => {
                    self.page
                        .goto(url)
                        .await
                        .map_err(|e| navigation_error(url, timeout, e))?;
                }
            }

            self.wait_until(wait).await
        };

        match tokio::time::timeout(timeout, navigation).await {
            Ok(result) => result,
            Err(_) => Err(BrowserError::Timeout {
                url: url.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            }),
        }
    }

    async fn evaluate(&mut self, script: &str) -> BrowserResult<serde_json::Value> {
        self.eval(script).await
    }

    async fn wait_for_network_idle(&mut self, timeout: Duration) -> BrowserResult<()> {
        match tokio::time::timeout(timeout, self.settle_network()).await {
            Ok(result) => result,
            Err(_) => Err(BrowserError::Timeout {
                url: "network-idle".to_string(),
                timeout_ms: timeout.as_millis() as u64,
            }),
        }
    }

    async fn screenshot(&mut self, path: &Path, full_page: bool) -> BrowserResult<()> {
        let params = ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .full_page(full_page)
            .build();

        self.page
            .save_screenshot(params, path)
            .await
            .map_err(|e| BrowserError::Screenshot(e.to_string()))?;
        Ok(())
    }

    async fn click_if_visible(
        &mut self,
        selector: &str,
        timeout: Duration,
    ) -> BrowserResult<bool> {
        let literal =
            serde_json::to_string(selector).map_err(|e| BrowserError::Script(e.to_string()))?;
        let script = CLICK_SCRIPT.replace("__SELECTOR__", &literal);
        let deadline = Instant::now() + timeout;

        loop {
            if self.eval(&script).await?.as_bool().unwrap_or(false) {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn close(self: Box<Self>) -> BrowserResult<()> {
        let ChromiumContext {
            browser,
            context_id,
            page,
            ..
        } = *self;

        let closed = page
            .close()
            .await
            .map_err(|e| BrowserError::Unavailable(format!("failed to close page: {e}")));
        dispose_context(&browser, context_id).await;
        closed
    }
}
