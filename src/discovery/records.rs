//! Page-record ingestion
//!
//! Classifies an existing crawl export instead of crawling live. Records are
//! filtered to successful HTML pages, grouped by site and poured into the same
//! pools live discovery fills.

use crate::classify::classify;
use crate::select::SitePools;
use crate::url::{dominant_project, resume_key, site_key};
use crate::AuditError;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};
use url::Url;

/// One exported page
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageRecord {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub h1: Option<String>,
    #[serde(default)]
    pub status_code: Option<u16>,
    #[serde(default)]
    pub content_type: Option<String>,
}

impl PageRecord {
    /// Returns false for non-200 or non-HTML rows when those fields exist
    pub fn is_auditable(&self) -> bool {
        if self.status_code.is_some_and(|status| status != 200) {
            return false;
        }
        if let Some(content_type) = &self.content_type {
            if !content_type.to_lowercase().contains("html") {
                return false;
            }
        }
        true
    }
}

/// Pools of one site built from records
#[derive(Debug, Clone)]
pub struct RecordSite {
    /// Host without `www.`
    pub site: String,
    /// `scheme://host` of the site's first record
    pub seed: String,
    pub project: String,
    pub pools: SitePools,
}

/// Result of grouping a record set
#[derive(Debug, Clone, Default)]
pub struct RecordGroups {
    pub sites: Vec<RecordSite>,
    /// Rows without a usable URL
    pub skipped: usize,
    /// Rows excluded by status or content type
    pub filtered: usize,
}

/// Reads a JSON array of page records
pub fn load_page_records(path: &Path) -> Result<Vec<PageRecord>, AuditError> {
    let content = std::fs::read_to_string(path)?;
    let records: Vec<PageRecord> = serde_json::from_str(&content)?;
    info!("Loaded {} page records from {}", records.len(), path.display());
    Ok(records)
}

struct SiteAccumulator {
    seed: String,
    titles: Vec<String>,
    pools: SitePools,
}

/// Groups records by site and classifies them
///
/// Sites come out sorted by their host. Each site's project is the brand most
/// titles end with, falling back to the host.
pub fn group_records(records: &[PageRecord]) -> RecordGroups {
    let mut groups = RecordGroups::default();
    let mut sites: BTreeMap<String, SiteAccumulator> = BTreeMap::new();

    for record in records {
        let Some(raw) = record.url.as_deref().map(str::trim).filter(|u| !u.is_empty()) else {
            groups.skipped += 1;
            continue;
        };

        let Some((url, site)) = Url::parse(raw)
            .ok()
            .and_then(|url| site_key(&url).map(|site| (url, site)))
        else {
            debug!("Skipping unparseable record URL {}", raw);
            groups.skipped += 1;
            continue;
        };

        if !record.is_auditable() {
            groups.filtered += 1;
            continue;
        }

        let entry = sites.entry(site).or_insert_with(|| SiteAccumulator {
            seed: url.origin().ascii_serialization(),
            titles: Vec::new(),
            pools: SitePools::new(),
        });

        entry.titles.push(record.title.clone().unwrap_or_default());

        let key = resume_key(raw);
        let classification = classify(&key, record.title.as_deref(), record.h1.as_deref());
        entry.pools.add(&key, &classification);
    }

    for (site, acc) in sites {
        let project = dominant_project(acc.titles.iter().map(String::as_str), &site);
        debug!("{} -> project {} ({} pooled)", site, project, acc.pools.total());
        groups.sites.push(RecordSite {
            site,
            seed: acc.seed,
            project,
            pools: acc.pools,
        });
    }

    groups
}
