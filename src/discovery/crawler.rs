//! Per-site link discovery
//!
//! Loads a site's seed page in a browser context, harvests its anchors and
//! feeds them through classification into the site's candidate pools. When a
//! detail pool comes up empty, one listing page is opened to look for detail
//! links one level deeper.

use crate::browser::{BrowserContext, BrowserError, BrowserResult, WaitPolicy};
use crate::capture::ControlToken;
use crate::classify::classify;
use crate::select::{PoolKey, SitePools};
use crate::url::normalize_link;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Script returning the resolved href of every anchor on the page
pub const LINKS_SCRIPT: &str = "Array.from(document.querySelectorAll('a')).map(a => a.href)";

/// Overlays (age gates, consent walls) dismissed before harvesting, in order
pub const OVERLAY_SELECTORS: &[&str] = &[
    ".lay-btn .colsebtn1",
    "a.act.colsebtn1",
    "button:has-text('21+')",
    "a:has-text('21+')",
    "button:has-text('I am 21')",
    "button:has-text('Yes')",
    "button:has-text('Enter Site')",
    "#age-gate-yes",
    ".age-gate-submit",
];

const SEED_TIMEOUT: Duration = Duration::from_secs(40);
const SEED_RETRY_TIMEOUT: Duration = Duration::from_secs(60);
const SECONDARY_TIMEOUT: Duration = Duration::from_secs(30);
const OVERLAY_TIMEOUT: Duration = Duration::from_secs(2);
const OVERLAY_SETTLE: Duration = Duration::from_secs(1);
const WARM_UP_SCROLLS: usize = 3;
const WARM_UP_STEP_PX: u32 = 1000;
const WARM_UP_PAUSE: Duration = Duration::from_millis(500);

/// Accumulates a site's classified links
///
/// Every link passes through `normalize_link` and a per-site seen-set before
/// it is classified, so each URL lands in at most one pool.
#[derive(Debug)]
pub struct LinkHarvest {
    base: Url,
    seen: HashSet<String>,
    pools: SitePools,
}

impl LinkHarvest {
    pub fn new(base: Url) -> Self {
        Self {
            base,
            seen: HashSet::new(),
            pools: SitePools::new(),
        }
    }

    /// Classifies and pools every new same-site link
    ///
    /// Returns the number of links not seen before.
    pub fn absorb<'a, I>(&mut self, hrefs: I) -> usize
    where
        I: IntoIterator<Item = &'a str>,
    {
        self.absorb_filtered(hrefs, |_| true)
    }

    /// Like [`absorb`](Self::absorb) but keeps only detail-page results
    ///
    /// Non-detail links are still marked as seen.
    pub fn absorb_details<'a, I>(&mut self, hrefs: I) -> usize
    where
        I: IntoIterator<Item = &'a str>,
    {
        self.absorb_filtered(hrefs, |key| key.is_detail())
    }

    fn absorb_filtered<'a, I, F>(&mut self, hrefs: I, keep: F) -> usize
    where
        I: IntoIterator<Item = &'a str>,
        F: Fn(PoolKey) -> bool,
    {
        let mut fresh = 0;

        for href in hrefs {
            let link = match normalize_link(href, &self.base) {
                Ok(link) => link,
                Err(e) => {
                    debug!("Skipping link {}: {}", href, e);
                    continue;
                }
            };

            if !self.seen.insert(link.clone()) {
                continue;
            }
            fresh += 1;

            let classification = classify(&link, None, None);
            if let Some(key) = PoolKey::route(&link, &classification) {
                if keep(key) {
                    self.pools.insert(key, &link);
                }
            }
        }

        fresh
    }

    pub fn pools(&self) -> &SitePools {
        &self.pools
    }

    pub fn into_pools(self) -> SitePools {
        self.pools
    }

    pub fn seen(&self) -> usize {
        self.seen.len()
    }
}

/// Clicks the first visible overlay button, if any
///
/// Best effort: errors are logged and treated as "not visible".
pub async fn dismiss_overlay(ctx: &mut dyn BrowserContext) -> bool {
    for selector in OVERLAY_SELECTORS {
        match ctx.click_if_visible(selector, OVERLAY_TIMEOUT).await {
            Ok(true) => {
                info!("Dismissed overlay via {}", selector);
                tokio::time::sleep(OVERLAY_SETTLE).await;
                return true;
            }
            Ok(false) => {}
            Err(e) => debug!("Overlay probe {} failed: {}", selector, e),
        }
    }
    false
}

/// Scrolls a few screens down so lazily rendered links appear
async fn warm_up_scroll(ctx: &mut dyn BrowserContext) {
    let script = format!("window.scrollBy(0, {})", WARM_UP_STEP_PX);
    for _ in 0..WARM_UP_SCROLLS {
        if let Err(e) = ctx.evaluate(&script).await {
            debug!("Warm-up scroll failed: {}", e);
            return;
        }
        tokio::time::sleep(WARM_UP_PAUSE).await;
    }
}

/// Returns the hrefs of every anchor on the current page
pub async fn extract_links(ctx: &mut dyn BrowserContext) -> BrowserResult<Vec<String>> {
    let value = ctx.evaluate(LINKS_SCRIPT).await?;
    let links = value
        .as_array()
        .ok_or_else(|| BrowserError::Script("anchor list is not an array".to_string()))?
        .iter()
        .filter_map(|v| v.as_str().map(str::to_string))
        .collect();
    Ok(links)
}

/// Opens the seed, retrying once with the load policy and a longer timeout
async fn open_seed(ctx: &mut dyn BrowserContext, seed: &Url) -> BrowserResult<()> {
    match ctx
        .navigate(seed.as_str(), SEED_TIMEOUT, WaitPolicy::DomReady)
        .await
    {
        Ok(()) => Ok(()),
        Err(e) => {
            warn!("Seed {} failed ({}), retrying", seed, e);
            ctx.navigate(seed.as_str(), SEED_RETRY_TIMEOUT, WaitPolicy::Load)
                .await
        }
    }
}

/// Opens a listing page and merges its detail links
///
/// Failures are logged and ignored.
async fn fetch_children(ctx: &mut dyn BrowserContext, harvest: &mut LinkHarvest, parent: &str) {
    info!("Looking one level deeper: {}", parent);

    let result = async {
        ctx.navigate(parent, SECONDARY_TIMEOUT, WaitPolicy::DomReady)
            .await?;
        dismiss_overlay(ctx).await;
        extract_links(ctx).await
    }
    .await;

    match result {
        Ok(links) => {
            let fresh = harvest.absorb_details(links.iter().map(String::as_str));
            debug!("{} new links under {}", fresh, parent);
        }
        Err(e) => warn!("Secondary fetch of {} failed: {}", parent, e),
    }
}

/// Crawls one site and returns its candidate pools
///
/// # Arguments
///
/// * `ctx` - An open browser context
/// * `seed` - The site's seed URL
/// * `control` - Checked before the secondary fetches
///
/// # Returns
///
/// * `Ok(SitePools)` - Pools built from the seed page (and secondary fetches)
/// * `Err(BrowserError)` - The seed could not be reached
pub async fn crawl_site(
    ctx: &mut dyn BrowserContext,
    seed: &Url,
    control: &ControlToken,
) -> BrowserResult<SitePools> {
    open_seed(ctx, seed).await?;
    dismiss_overlay(ctx).await;
    warm_up_scroll(ctx).await;

    let links = extract_links(ctx).await?;
    let mut harvest = LinkHarvest::new(seed.clone());
    let fresh = harvest.absorb(links.iter().map(String::as_str));
    info!("{}: {} internal links on the seed page", seed, fresh);

    if harvest.pools().is_empty(PoolKey::ProductDetail) && control.proceed().await {
        let parent = harvest
            .pools()
            .shortest_of(&[PoolKey::ProductCategory, PoolKey::ProductList]);
        if let Some(parent) = parent {
            fetch_children(ctx, &mut harvest, &parent).await;
        }
    }

    if harvest.pools().is_empty(PoolKey::NewsDetail) && control.proceed().await {
        if let Some(parent) = harvest.pools().shortest_of(&[PoolKey::NewsList]) {
            fetch_children(ctx, &mut harvest, &parent).await;
        }
    }

    Ok(harvest.into_pools())
}
