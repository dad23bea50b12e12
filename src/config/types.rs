use serde::Deserialize;

/// Main configuration structure for site-canon
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
    pub output: OutputConfig,
    #[serde(default, rename = "site")]
    pub sites: Vec<SiteEntry>,
}

/// Headless browser configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BrowserConfig {
    /// Explicit Chromium executable; searched on PATH when absent
    #[serde(rename = "chrome-path", default)]
    pub chrome_path: Option<String>,

    #[serde(default = "default_true")]
    pub headless: bool,

    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Proxy server passed to Chromium, e.g. `http://127.0.0.1:8080`
    #[serde(default)]
    pub proxy: Option<String>,

    #[serde(rename = "viewport-width", default = "default_viewport_width")]
    pub viewport_width: u32,

    #[serde(rename = "viewport-height", default = "default_viewport_height")]
    pub viewport_height: u32,
}

/// Link discovery configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DiscoveryConfig {
    /// Number of sites discovered concurrently
    #[serde(default = "default_discovery_concurrency")]
    pub concurrency: u32,

    /// Drop selected pages marked noindex or titled as not-found
    #[serde(rename = "check-indexability", default)]
    pub check_indexability: bool,

    /// Classify an exported page list instead of crawling live
    #[serde(rename = "records-path", default)]
    pub records_path: Option<String>,
}

/// Capture executor configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CaptureConfig {
    /// Maximum number of simultaneously open browser contexts
    #[serde(default = "default_capture_concurrency")]
    pub concurrency: u32,

    /// Extra attempts after the first failure
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// Navigation timeout in milliseconds
    #[serde(rename = "page-timeout-ms", default = "default_page_timeout_ms")]
    pub page_timeout_ms: u64,

    /// Timeout of the lighter navigation attempted after a timeout
    #[serde(rename = "fallback-timeout-ms", default = "default_fallback_timeout_ms")]
    pub fallback_timeout_ms: u64,

    /// Wait for network idle (true) or DOM ready (false)
    #[serde(rename = "strict-load-mode", default = "default_true")]
    pub strict_load_mode: bool,

    /// Pause between attempts in milliseconds
    #[serde(rename = "retry-backoff-ms", default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Skip URLs already present in the checkpoint log
    #[serde(default = "default_true")]
    pub resume: bool,

    /// Upper bound on scroll-to-bottom iterations per page
    #[serde(rename = "max-scrolls", default = "default_max_scrolls")]
    pub max_scrolls: u32,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Directory under which dated screenshot folders are created
    #[serde(rename = "screenshot-root")]
    pub screenshot_root: String,

    /// Path to the markdown summary file
    #[serde(rename = "summary-path")]
    pub summary_path: String,
}

/// One audited site
#[derive(Debug, Clone, Deserialize)]
pub struct SiteEntry {
    /// Seed URL (scheme optional, defaults to https)
    pub url: String,

    /// Project label; derived from the domain when absent
    #[serde(default)]
    pub project: Option<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            chrome_path: None,
            headless: true,
            user_agent: default_user_agent(),
            proxy: None,
            viewport_width: default_viewport_width(),
            viewport_height: default_viewport_height(),
        }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            concurrency: default_discovery_concurrency(),
            check_indexability: false,
            records_path: None,
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            concurrency: default_capture_concurrency(),
            max_retries: default_max_retries(),
            page_timeout_ms: default_page_timeout_ms(),
            fallback_timeout_ms: default_fallback_timeout_ms(),
            strict_load_mode: true,
            retry_backoff_ms: default_retry_backoff_ms(),
            resume: true,
            max_scrolls: default_max_scrolls(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36".to_string()
}

fn default_viewport_width() -> u32 {
    1920
}

fn default_viewport_height() -> u32 {
    1080
}

fn default_discovery_concurrency() -> u32 {
    3
}

fn default_capture_concurrency() -> u32 {
    2
}

fn default_max_retries() -> u32 {
    2
}

fn default_page_timeout_ms() -> u64 {
    60_000
}

fn default_fallback_timeout_ms() -> u64 {
    30_000
}

fn default_retry_backoff_ms() -> u64 {
    2_000
}

fn default_max_scrolls() -> u32 {
    30
}
