//! Indexability check for selected candidates
//!
//! A candidate is dropped when its `robots` meta tag says `noindex` or its
//! title reads like an error page. Anything that goes wrong while checking
//! keeps the candidate.

use crate::browser::{BrowserContext, BrowserResult, WaitPolicy};
use crate::capture::ControlToken;
use crate::select::CanonicalSelection;
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::{debug, info};

const CHECK_TIMEOUT: Duration = Duration::from_secs(20);
const HTML_SCRIPT: &str = "document.documentElement.outerHTML";

/// Signals read from a page's head
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageSignals {
    /// Content of `<meta name="robots">`
    pub meta_robots: Option<String>,

    /// Text of `<title>`
    pub title: Option<String>,
}

impl PageSignals {
    /// Parses the signals out of an HTML document
    ///
    /// # Example
    ///
    /// ```
    /// use site_canon::discovery::PageSignals;
    ///
    /// let html = r#"<html><head><title>Shop</title><meta name="robots" content="NOINDEX"></head></html>"#;
    /// let signals = PageSignals::from_html(html);
    /// assert!(!signals.is_indexable());
    /// ```
    pub fn from_html(html: &str) -> Self {
        let document = Html::parse_document(html);
        Self {
            meta_robots: extract_meta_robots(&document),
            title: extract_title(&document),
        }
    }

    /// Returns false for noindex pages and error-page titles
    pub fn is_indexable(&self) -> bool {
        if let Some(robots) = &self.meta_robots {
            if robots.to_lowercase().contains("noindex") {
                return false;
            }
        }

        if let Some(title) = &self.title {
            if title.contains("404") || title.to_lowercase().contains("not found") {
                return false;
            }
        }

        true
    }
}

fn extract_title(document: &Html) -> Option<String> {
    let title_selector = Selector::parse("title").ok()?;

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn extract_meta_robots(document: &Html) -> Option<String> {
    let selector = Selector::parse("meta[name]").ok()?;

    document
        .select(&selector)
        .find(|element| {
            element
                .value()
                .attr("name")
                .is_some_and(|name| name.eq_ignore_ascii_case("robots"))
        })
        .and_then(|element| element.value().attr("content"))
        .map(str::to_string)
}

async fn read_signals(ctx: &mut dyn BrowserContext, url: &str) -> BrowserResult<PageSignals> {
    ctx.navigate(url, CHECK_TIMEOUT, WaitPolicy::DomReady).await?;
    let html = ctx.evaluate(HTML_SCRIPT).await?;
    Ok(PageSignals::from_html(html.as_str().unwrap_or_default()))
}

/// Drops candidates that are not indexable
///
/// SEO rows pass through unchecked. Stops at cancellation, dropping the
/// unchecked remainder.
pub async fn filter_indexable(
    ctx: &mut dyn BrowserContext,
    candidates: Vec<CanonicalSelection>,
    control: &ControlToken,
) -> Vec<CanonicalSelection> {
    let mut kept = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        if !control.proceed().await {
            break;
        }

        if candidate.is_seo() {
            kept.push(candidate);
            continue;
        }

        match read_signals(ctx, &candidate.url).await {
            Ok(signals) if !signals.is_indexable() => {
                info!(
                    "[{}] Dropping non-indexable {}: {}",
                    candidate.project, candidate.page_type, candidate.url
                );
            }
            Ok(_) => kept.push(candidate),
            Err(e) => {
                debug!("Indexability check of {} failed, keeping: {}", candidate.url, e);
                kept.push(candidate);
            }
        }
    }

    kept
}
