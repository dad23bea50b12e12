//! Per-site candidate pools
//!
//! Discovery feeds every classified URL into one of ten pools. Pools keep
//! insertion order and ignore duplicates; they are only ever appended to.

use crate::classify::{Category, Classification, SubType};
use std::collections::{BTreeMap, HashSet};

/// Identifies a candidate pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PoolKey {
    Home,
    About,
    Contact,
    Faq,
    Search,
    NewsList,
    NewsDetail,
    ProductList,
    ProductCategory,
    ProductDetail,
}

impl PoolKey {
    /// All pools, in selection emission order
    pub const ALL: [PoolKey; 10] = [
        PoolKey::Home,
        PoolKey::About,
        PoolKey::Contact,
        PoolKey::Faq,
        PoolKey::Search,
        PoolKey::NewsList,
        PoolKey::NewsDetail,
        PoolKey::ProductList,
        PoolKey::ProductCategory,
        PoolKey::ProductDetail,
    ];

    /// Routes a classified URL to its pool
    ///
    /// Returns `None` for pages classified as `Other`. Product list pages whose
    /// URL literally contains `category` go to the product-category pool.
    pub fn route(url: &str, classification: &Classification) -> Option<PoolKey> {
        let key = match (classification.category, classification.subtype) {
            (Category::Home, _) => PoolKey::Home,
            (Category::About, _) => PoolKey::About,
            (Category::Contact, _) => PoolKey::Contact,
            (Category::Faq, _) => PoolKey::Faq,
            (Category::Search, _) => PoolKey::Search,
            (Category::News, Some(SubType::List)) => PoolKey::NewsList,
            (Category::News, _) => PoolKey::NewsDetail,
            (Category::Product, Some(SubType::List)) => {
                if url.contains("category") {
                    PoolKey::ProductCategory
                } else {
                    PoolKey::ProductList
                }
            }
            (Category::Product, _) => PoolKey::ProductDetail,
            (Category::Other, _) => return None,
        };
        Some(key)
    }

    /// Category recorded on selection rows drawn from this pool
    pub fn category(&self) -> Category {
        match self {
            Self::Home => Category::Home,
            Self::About => Category::About,
            Self::Contact => Category::Contact,
            Self::Faq => Category::Faq,
            Self::Search => Category::Search,
            Self::NewsList | Self::NewsDetail => Category::News,
            Self::ProductList | Self::ProductCategory | Self::ProductDetail => Category::Product,
        }
    }

    /// Fixed page-type label for this pool
    pub fn label(&self) -> &'static str {
        match self {
            Self::Home => "Home",
            Self::About => "About",
            Self::Contact => "Contact",
            Self::Faq => "FAQ",
            Self::Search => "Search",
            Self::NewsList => "News-List",
            Self::NewsDetail => "News-Detail",
            Self::ProductList => "Product-List",
            Self::ProductCategory => "Product-Category",
            Self::ProductDetail => "Product-Detail",
        }
    }

    /// Whether selections from this pool carry a slug suffix
    pub fn is_instance(&self) -> bool {
        matches!(
            self,
            Self::NewsDetail | Self::ProductCategory | Self::ProductDetail
        )
    }

    pub fn is_detail(&self) -> bool {
        matches!(self, Self::NewsDetail | Self::ProductDetail)
    }
}

/// Ordered, duplicate-free set of candidate URLs
#[derive(Debug, Clone, Default)]
pub struct Pool {
    urls: Vec<String>,
    seen: HashSet<String>,
}

impl Pool {
    /// Appends a URL; returns false when it was already present
    pub fn push(&mut self, url: &str) -> bool {
        if !self.seen.insert(url.to_string()) {
            return false;
        }
        self.urls.push(url.to_string());
        true
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    /// Candidates sorted by (length, lexicographic order)
    pub fn sorted(&self) -> Vec<&str> {
        let mut sorted: Vec<&str> = self.urls.iter().map(String::as_str).collect();
        sorted.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
        sorted
    }
}

/// All pools for one site
#[derive(Debug, Clone, Default)]
pub struct SitePools {
    pools: BTreeMap<PoolKey, Pool>,
}

impl SitePools {
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes an already-classified URL into its pool
    ///
    /// Returns the pool the URL landed in, or `None` when it was classified
    /// as `Other` or was already present.
    pub fn add(&mut self, url: &str, classification: &Classification) -> Option<PoolKey> {
        let key = PoolKey::route(url, classification)?;
        self.insert(key, url).then_some(key)
    }

    /// Inserts a URL directly into a pool
    pub fn insert(&mut self, key: PoolKey, url: &str) -> bool {
        self.pools.entry(key).or_default().push(url)
    }

    pub fn get(&self, key: PoolKey) -> Option<&Pool> {
        self.pools.get(&key)
    }

    /// Returns true when the pool is missing or has no candidates
    pub fn is_empty(&self, key: PoolKey) -> bool {
        self.pools.get(&key).map_or(true, Pool::is_empty)
    }

    /// Total number of pooled URLs
    pub fn total(&self) -> usize {
        self.pools.values().map(Pool::len).sum()
    }

    /// Shortest candidate across several pools
    pub fn shortest_of(&self, keys: &[PoolKey]) -> Option<String> {
        let mut candidates: Vec<&str> = keys
            .iter()
            .filter_map(|k| self.pools.get(k))
            .flat_map(|p| p.urls().iter().map(String::as_str))
            .collect();
        candidates.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
        candidates.first().map(|s| s.to_string())
    }
}
