//! Discovery: from seed URLs to canonical selections
//!
//! Each site is crawled in its own browser context, its links classified into
//! pools, the pools reduced to canonical selections, and SEO endpoints probed.
//! Sites run concurrently behind a semaphore.

mod crawler;
mod indexability;
mod records;
mod seo;

pub use crawler::{crawl_site, dismiss_overlay, extract_links, LinkHarvest, LINKS_SCRIPT, OVERLAY_SELECTORS};
pub use indexability::{filter_indexable, PageSignals};
pub use records::{group_records, load_page_records, PageRecord, RecordGroups, RecordSite};
pub use seo::{probe_seo, sitemap_candidates, sitemap_directives, SITEMAP_PATHS};

use crate::browser::{Browser, ContextOptions};
use crate::capture::ControlToken;
use crate::config::{DiscoveryConfig, SiteEntry};
use crate::select::{select_canonical, CanonicalSelection, SitePools};
use crate::url::{ensure_scheme, project_name};
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};
use url::Url;

/// A site to discover
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteTarget {
    /// Seed URL with a scheme
    pub seed: String,
    pub project: String,
}

impl SiteTarget {
    /// Builds a target from a configured site, deriving the project if unset
    pub fn from_entry(entry: &SiteEntry) -> Self {
        let seed = ensure_scheme(&entry.url);
        let project = entry
            .project
            .clone()
            .unwrap_or_else(|| project_name(&seed));
        Self { seed, project }
    }
}

/// Outcome of discovering one site
#[derive(Debug, Clone)]
pub struct SiteDiscovery {
    pub target: SiteTarget,
    /// False when the seed could not be loaded at all
    pub reachable: bool,
    pub selections: Vec<CanonicalSelection>,
}

impl SiteDiscovery {
    /// The single Home row emitted for an unreachable site
    fn unreachable(target: &SiteTarget) -> Self {
        Self {
            target: target.clone(),
            reachable: false,
            selections: select_canonical(&target.project, &target.seed, &SitePools::new()),
        }
    }
}

/// Discovers one site
///
/// Never fails: an unreachable seed yields a single Home row pointing at the
/// seed.
pub async fn discover_site(
    browser: &dyn Browser,
    target: &SiteTarget,
    config: &DiscoveryConfig,
    viewport: &ContextOptions,
    control: &ControlToken,
) -> SiteDiscovery {
    info!("[{}] Discovering {}", target.project, target.seed);

    let seed = match Url::parse(&target.seed) {
        Ok(seed) => seed,
        Err(e) => {
            error!("[{}] Invalid seed {}: {}", target.project, target.seed, e);
            return SiteDiscovery::unreachable(target);
        }
    };

    let mut ctx = match browser.new_context(viewport).await {
        Ok(ctx) => ctx,
        Err(e) => {
            error!("[{}] Could not open a browser context: {}", target.project, e);
            return SiteDiscovery::unreachable(target);
        }
    };

    let discovery = match crawl_site(ctx.as_mut(), &seed, control).await {
        Ok(pools) => {
            let mut selections = select_canonical(&target.project, &target.seed, &pools);
            selections.extend(probe_seo(browser, &seed, &target.project).await);

            if config.check_indexability {
                selections = filter_indexable(ctx.as_mut(), selections, control).await;
            }

            info!(
                "[{}] {} selections from {} pooled links",
                target.project,
                selections.len(),
                pools.total()
            );

            SiteDiscovery {
                target: target.clone(),
                reachable: true,
                selections,
            }
        }
        Err(e) => {
            error!("[{}] Seed unreachable: {}", target.project, e);
            SiteDiscovery::unreachable(target)
        }
    };

    if let Err(e) = ctx.close().await {
        warn!("[{}] Failed to close context: {}", target.project, e);
    }

    discovery
}

/// Discovers every site with at most `config.concurrency` in flight
///
/// Results keep the order of `targets`. Sites not yet started when
/// cancellation is requested are left out.
pub async fn discover_all(
    browser: &dyn Browser,
    targets: &[SiteTarget],
    config: &DiscoveryConfig,
    viewport: &ContextOptions,
    control: &ControlToken,
) -> Vec<SiteDiscovery> {
    let gate = Arc::new(Semaphore::new(config.concurrency.max(1) as usize));

    let tasks = targets.iter().map(|target| {
        let gate = Arc::clone(&gate);
        async move {
            let _permit = gate.acquire().await.ok()?;
            if !control.proceed().await {
                return None;
            }
            Some(discover_site(browser, target, config, viewport, control).await)
        }
    });

    let results: Vec<SiteDiscovery> = join_all(tasks).await.into_iter().flatten().collect();

    if results.len() < targets.len() {
        warn!(
            "Discovery stopped early: {} of {} sites processed",
            results.len(),
            targets.len()
        );
    }

    results
}

/// Builds selections from page records instead of a live crawl
pub fn select_from_records(groups: &RecordGroups) -> Vec<SiteDiscovery> {
    groups
        .sites
        .iter()
        .map(|site| SiteDiscovery {
            target: SiteTarget {
                seed: site.seed.clone(),
                project: site.project.clone(),
            },
            reachable: true,
            selections: select_canonical(&site.project, &site.seed, &site.pools),
        })
        .collect()
}
