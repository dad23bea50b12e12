//! SEO endpoint probing
//!
//! Checks a site for robots.txt and a sitemap using raw GETs. Probe failures
//! mean "absent"; nothing here returns an error.

use crate::browser::Browser;
use crate::select::{CanonicalSelection, SEO_CATEGORY};
use robotstxt::{parse_robotstxt, RobotsParseHandler};
use tracing::{debug, info, warn};
use url::Url;

/// Conventional sitemap locations, probed after any robots.txt directives
pub const SITEMAP_PATHS: &[&str] = &[
    "/sitemap.xml",
    "/sitemap_index.xml",
    "/sitemap-index.xml",
    "/wp-sitemap.xml",
    "/sitemap/sitemap.xml",
];

pub const ROBOTS_PAGE_TYPE: &str = "Robots.txt";
pub const SITEMAP_PAGE_TYPE: &str = "Sitemap";

/// Collects `Sitemap:` directives while robotstxt walks the file
#[derive(Default)]
struct SitemapCollector {
    sitemaps: Vec<String>,
}

impl RobotsParseHandler for SitemapCollector {
    fn handle_robots_start(&mut self) {}

    fn handle_robots_end(&mut self) {}

    fn handle_user_agent(&mut self, _line_num: u32, _user_agent: &str) {}

    fn handle_allow(&mut self, _line_num: u32, _value: &str) {}

    fn handle_disallow(&mut self, _line_num: u32, _value: &str) {}

    fn handle_sitemap(&mut self, _line_num: u32, value: &str) {
        let value = value.trim();
        let lower = value.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            self.sitemaps.push(value.to_string());
        }
    }

    fn handle_unknown_action(&mut self, _line_num: u32, _action: &str, _value: &str) {}
}

/// Extracts absolute http(s) sitemap URLs declared in a robots.txt body
///
/// # Examples
///
/// ```
/// use site_canon::discovery::sitemap_directives;
///
/// let body = "User-agent: *\nsitemap: https://x.com/a.xml\nSitemap: /relative.xml\n";
/// assert_eq!(sitemap_directives(body), vec!["https://x.com/a.xml"]);
/// ```
pub fn sitemap_directives(robots_body: &str) -> Vec<String> {
    let mut collector = SitemapCollector::default();
    parse_robotstxt(robots_body, &mut collector);
    collector.sitemaps
}

/// Builds the ordered, de-duplicated list of sitemap URLs to probe
pub fn sitemap_candidates(seed: &Url, directives: &[String]) -> Vec<String> {
    let mut candidates: Vec<String> = Vec::new();

    let conventional = SITEMAP_PATHS
        .iter()
        .filter_map(|path| seed.join(path).ok())
        .map(|url| url.to_string());

    for candidate in directives.iter().cloned().chain(conventional) {
        if !candidates.contains(&candidate) {
            candidates.push(candidate);
        }
    }

    candidates
}

/// Probes robots.txt and sitemaps, returning the SEO rows that exist
///
/// A `Robots.txt` row is emitted when robots.txt answers 200. Sitemap
/// candidates are probed in order and the first answering 200 becomes the
/// single `Sitemap` row.
pub async fn probe_seo(browser: &dyn Browser, seed: &Url, project: &str) -> Vec<CanonicalSelection> {
    let mut rows = Vec::new();
    let mut directives = Vec::new();

    if let Ok(robots_url) = seed.join("/robots.txt") {
        match browser.raw_get(robots_url.as_str()).await {
            Ok(response) if response.is_ok() => {
                info!("[{}] Found robots.txt: {}", project, robots_url);
                rows.push(CanonicalSelection::new(
                    project,
                    SEO_CATEGORY,
                    ROBOTS_PAGE_TYPE,
                    robots_url.as_str(),
                ));
                directives = sitemap_directives(&response.body);
            }
            Ok(response) => {
                debug!("[{}] No robots.txt (status {})", project, response.status);
            }
            Err(e) => debug!("[{}] robots.txt probe failed: {}", project, e),
        }
    }

    let candidates = sitemap_candidates(seed, &directives);
    for candidate in &candidates {
        match browser.raw_get(candidate).await {
            Ok(response) if response.is_ok() => {
                info!("[{}] Found sitemap: {}", project, candidate);
                rows.push(CanonicalSelection::new(
                    project,
                    SEO_CATEGORY,
                    SITEMAP_PAGE_TYPE,
                    candidate,
                ));
                return rows;
            }
            Ok(_) => {}
            Err(e) => debug!("[{}] Sitemap probe {} failed: {}", project, candidate, e),
        }
    }

    warn!(
        "[{}] No sitemap found after probing {} locations",
        project,
        candidates.len()
    );
    rows
}
