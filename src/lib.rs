//! site-canon: canonical page auditing for large website sets
//!
//! This crate discovers the links of each audited site, classifies every URL
//! into a small taxonomy of page archetypes, selects one canonical URL per
//! archetype, and captures the selections with a resumable, concurrent,
//! retrying browser pipeline.

pub mod browser;
pub mod capture;
pub mod classify;
pub mod config;
pub mod discovery;
pub mod output;
pub mod select;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for site-canon operations
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Browser error: {0}")]
    Browser(#[from] browser::BrowserError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Invalid page records: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Malformed URL: {0}")]
    Malformed(String),

    #[error("Static asset: {0}")]
    StaticAsset(String),

    #[error("Link leaves the site: {0}")]
    ForeignHost(String),
}

/// Result type alias for site-canon operations
pub type Result<T> = std::result::Result<T, AuditError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use capture::ControlToken;
pub use classify::{classify, slug, Category, Classification, SubType};
pub use config::Config;
pub use select::{select_canonical, CanonicalSelection, PoolKey, SitePools};
pub use state::TaskStatus;
