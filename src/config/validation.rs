use crate::config::types::{
    BrowserConfig, CaptureConfig, Config, DiscoveryConfig, OutputConfig, SiteEntry,
};
use crate::url::ensure_scheme;
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_browser_config(&config.browser)?;
    validate_discovery_config(&config.discovery)?;
    validate_capture_config(&config.capture)?;
    validate_output_config(&config.output)?;
    validate_sites(&config.sites)?;
    Ok(())
}

/// Validates browser configuration
fn validate_browser_config(config: &BrowserConfig) -> Result<(), ConfigError> {
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    if config.viewport_width < 320 || config.viewport_height < 240 {
        return Err(ConfigError::Validation(format!(
            "viewport must be at least 320x240, got {}x{}",
            config.viewport_width, config.viewport_height
        )));
    }

    if let Some(proxy) = &config.proxy {
        Url::parse(proxy)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid proxy '{}': {}", proxy, e)))?;
    }

    Ok(())
}

/// Validates discovery configuration
fn validate_discovery_config(config: &DiscoveryConfig) -> Result<(), ConfigError> {
    if config.concurrency < 1 || config.concurrency > 32 {
        return Err(ConfigError::Validation(format!(
            "discovery concurrency must be between 1 and 32, got {}",
            config.concurrency
        )));
    }

    if let Some(path) = &config.records_path {
        if path.trim().is_empty() {
            return Err(ConfigError::Validation(
                "records-path cannot be empty when set".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validates capture configuration
fn validate_capture_config(config: &CaptureConfig) -> Result<(), ConfigError> {
    if config.concurrency < 1 || config.concurrency > 32 {
        return Err(ConfigError::Validation(format!(
            "capture concurrency must be between 1 and 32, got {}",
            config.concurrency
        )));
    }

    if config.max_retries > 10 {
        return Err(ConfigError::Validation(format!(
            "max-retries must be at most 10, got {}",
            config.max_retries
        )));
    }

    if config.page_timeout_ms < 1_000 {
        return Err(ConfigError::Validation(format!(
            "page-timeout-ms must be >= 1000ms, got {}ms",
            config.page_timeout_ms
        )));
    }

    if config.fallback_timeout_ms < 1_000 {
        return Err(ConfigError::Validation(format!(
            "fallback-timeout-ms must be >= 1000ms, got {}ms",
            config.fallback_timeout_ms
        )));
    }

    if config.max_scrolls < 1 {
        return Err(ConfigError::Validation(
            "max-scrolls must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }

    if config.screenshot_root.is_empty() {
        return Err(ConfigError::Validation(
            "screenshot-root cannot be empty".to_string(),
        ));
    }

    if config.summary_path.is_empty() {
        return Err(ConfigError::Validation(
            "summary-path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates site entries
fn validate_sites(sites: &[SiteEntry]) -> Result<(), ConfigError> {
    for site in sites {
        let seed = ensure_scheme(&site.url);
        let url = Url::parse(&seed).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid site URL '{}': {}", site.url, e))
        })?;

        if url.host_str().is_none() {
            return Err(ConfigError::InvalidUrl(format!(
                "Site URL '{}' has no host",
                site.url
            )));
        }

        if let Some(project) = &site.project {
            if project.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "Project name for '{}' cannot be empty",
                    site.url
                )));
            }
        }
    }

    Ok(())
}
