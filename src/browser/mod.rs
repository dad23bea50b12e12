//! Browser collaborator interface
//!
//! Discovery and capture never talk to a browser engine directly. They go
//! through the `Browser` and `BrowserContext` traits defined here, which the
//! Chromium adapter implements for real runs and which tests replace with
//! scripted stubs.

pub mod chromium;
pub mod http;

use crate::config::BrowserConfig;
use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub use chromium::ChromiumBrowser;
pub use http::{build_http_client, fetch_raw};

/// Errors raised by the browser collaborator
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("Timeout {timeout_ms}ms exceeded navigating to {url}")]
    Timeout { url: String, timeout_ms: u64 },

    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("Script evaluation failed: {0}")]
    Script(String),

    #[error("Screenshot failed: {0}")]
    Screenshot(String),

    #[error("Request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Browser unavailable: {0}")]
    Unavailable(String),
}

impl BrowserError {
    /// Returns true if the operation ran out of time
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Result type for browser operations
pub type BrowserResult<T> = Result<T, BrowserError>;

/// When a navigation counts as finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitPolicy {
    /// DOM parsed (`DOMContentLoaded`)
    DomReady,
    /// Window `load` event fired
    Load,
    /// Load fired and no new network requests for a short quiet period
    NetworkIdle,
}

/// Settings applied to a freshly opened context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextOptions {
    pub viewport_width: u32,
    pub viewport_height: u32,
}

impl ContextOptions {
    /// Viewport configured under `[browser]`
    pub fn from_config(config: &BrowserConfig) -> Self {
        Self {
            viewport_width: config.viewport_width,
            viewport_height: config.viewport_height,
        }
    }
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            viewport_width: 1920,
            viewport_height: 1080,
        }
    }
}

/// Status and body of a plain HTTP GET
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// A browser engine that can open isolated contexts
#[async_trait]
pub trait Browser: Send + Sync {
    /// Opens a new isolated context (tab)
    async fn new_context(&self, options: &ContextOptions) -> BrowserResult<Box<dyn BrowserContext>>;

    /// Fetches a URL without rendering it
    async fn raw_get(&self, url: &str) -> BrowserResult<RawResponse>;
}

/// A single isolated browsing context
#[async_trait]
pub trait BrowserContext: Send {
    /// Aborts every request whose URL matches the glob pattern
    async fn block(&mut self, pattern: &str) -> BrowserResult<()>;

    /// Navigates and waits according to `wait`, failing after `timeout`
    async fn navigate(
        &mut self,
        url: &str,
        timeout: Duration,
        wait: WaitPolicy,
    ) -> BrowserResult<()>;

    /// Evaluates a script and returns its JSON result (`Null` for undefined)
    async fn evaluate(&mut self, script: &str) -> BrowserResult<serde_json::Value>;

    /// Waits until the page stops issuing requests
    async fn wait_for_network_idle(&mut self, timeout: Duration) -> BrowserResult<()>;

    /// Writes a PNG screenshot of the viewport or of the full page
    async fn screenshot(&mut self, path: &Path, full_page: bool) -> BrowserResult<()>;

    /// Clicks the first element matching `selector` if it becomes visible
    /// within `timeout`
    ///
    /// Besides CSS, selectors of the form `tag:has-text('text')` are
    /// understood.
    async fn click_if_visible(&mut self, selector: &str, timeout: Duration)
        -> BrowserResult<bool>;

    /// Closes the context
    async fn close(self: Box<Self>) -> BrowserResult<()>;
}
