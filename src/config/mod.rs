//! Configuration module for site-canon
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use site_canon::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("audit.toml")).unwrap();
//! println!("Auditing {} sites", config.sites.len());
//! ```

mod parser;
mod types;
mod validation;

pub use types::{
    BrowserConfig, CaptureConfig, Config, DiscoveryConfig, OutputConfig, SiteEntry,
};

pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
