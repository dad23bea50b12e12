//! Canonical URL selection
//!
//! Reduces each of a site's candidate pools to at most one representative
//! URL. Selection is deterministic: pools are sorted by (length, lexicographic
//! order) before picking, so insertion order never affects the result.

mod pool;

pub use pool::{Pool, PoolKey, SitePools};

use crate::classify::slug;
use serde::{Deserialize, Serialize};

/// Category label used for SEO endpoint rows
pub const SEO_CATEGORY: &str = "SEO";

/// One row of the capture task list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalSelection {
    pub project: String,
    pub category: String,
    pub page_type: String,
    pub url: String,
}

impl CanonicalSelection {
    pub fn new(project: &str, category: &str, page_type: &str, url: &str) -> Self {
        Self {
            project: project.to_string(),
            category: category.to_string(),
            page_type: page_type.to_string(),
            url: url.to_string(),
        }
    }

    /// Returns true for robots.txt / sitemap rows
    pub fn is_seo(&self) -> bool {
        self.category == SEO_CATEGORY
    }
}

/// How a pool is reduced to a single URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Shortest,
    Longest,
    Median,
}

impl Strategy {
    /// Strategy applied to each pool
    pub fn for_pool(key: PoolKey) -> Self {
        match key {
            PoolKey::NewsDetail => Self::Longest,
            PoolKey::ProductDetail => Self::Median,
            _ => Self::Shortest,
        }
    }

    /// Picks from a pool already sorted by (length, lexicographic order)
    pub fn pick<'a>(&self, sorted: &[&'a str]) -> Option<&'a str> {
        match self {
            Self::Shortest => sorted.first().copied(),
            Self::Longest => sorted.last().copied(),
            Self::Median => sorted.get(sorted.len() / 2).copied(),
        }
    }
}

/// Builds the page-type label of a selection
pub fn page_type_label(key: PoolKey, url: &str) -> String {
    if key.is_instance() {
        format!("{}-{}", key.label(), slug(url))
    } else {
        key.label().to_string()
    }
}

/// Selects the canonical URL for every non-empty pool of one project
///
/// The Home row is always emitted; when the Home pool is empty the project's
/// seed URL stands in.
///
/// # Example
///
/// ```
/// use site_canon::select::{select_canonical, PoolKey, SitePools};
///
/// let mut pools = SitePools::new();
/// pools.insert(PoolKey::About, "https://x.com/about-us");
/// let rows = select_canonical("X", "https://x.com", &pools);
/// assert_eq!(rows.len(), 2);
/// assert_eq!(rows[0].url, "https://x.com");
/// assert_eq!(rows[1].page_type, "About");
/// ```
pub fn select_canonical(project: &str, seed: &str, pools: &SitePools) -> Vec<CanonicalSelection> {
    let mut rows = Vec::new();

    for key in PoolKey::ALL {
        let sorted = pools.get(key).map(Pool::sorted).unwrap_or_default();
        let picked = Strategy::for_pool(key).pick(&sorted);

        let url = match (key, picked) {
            (_, Some(url)) => url,
            (PoolKey::Home, None) => seed,
            (_, None) => continue,
        };

        rows.push(CanonicalSelection::new(
            project,
            key.category().label(),
            &page_type_label(key, url),
            url,
        ));
    }

    rows
}
