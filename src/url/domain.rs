use std::collections::HashMap;
use url::Url;

/// Characters that commonly separate a page title from the site brand
const TITLE_SEPARATORS: &[char] = &['-', '|', '_', '—'];

/// Extracts the domain from a URL
///
/// This function retrieves the host portion of a URL and converts it to lowercase.
/// A leading `www.` is kept; callers that group by site use [`site_key`].
///
/// # Examples
///
/// ```
/// use url::Url;
/// use site_canon::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Returns the grouping key of a site: its lowercase host without `www.`
pub fn site_key(url: &Url) -> Option<String> {
    extract_domain(url).map(|d| d.strip_prefix("www.").map(str::to_string).unwrap_or(d))
}

/// Derives a project name from a seed URL
///
/// The first label of the host (after dropping `www.`) is capitalized, so
/// `https://www.acme-tools.com/` becomes `Acme-tools`.
///
/// # Examples
///
/// ```
/// use site_canon::url::project_name;
///
/// assert_eq!(project_name("https://www.acme.com/"), "Acme");
/// assert_eq!(project_name("not a url"), "Unknown");
/// ```
pub fn project_name(seed: &str) -> String {
    let Some(site) = Url::parse(seed).ok().as_ref().and_then(site_key) else {
        return "Unknown".to_string();
    };

    let label = site.split('.').next().unwrap_or(&site);
    capitalize(label)
}

/// Extracts a brand name from a page title
///
/// Titles are commonly written as `Page name - Brand`. The text after the last
/// separator is returned when it looks like a short brand (2 to 19 chars).
pub fn project_from_title(title: &str) -> Option<String> {
    for sep in TITLE_SEPARATORS {
        if let Some((_, candidate)) = title.rsplit_once(*sep) {
            let candidate = candidate.trim();
            let len = candidate.chars().count();
            if len > 1 && len < 20 {
                return Some(candidate.to_string());
            }
        }
    }
    None
}

/// Picks the most common brand among a site's page titles
///
/// Ties are broken alphabetically. Falls back to `fallback` when no title
/// yields a brand.
pub fn dominant_project<'a, I>(titles: I, fallback: &str) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: HashMap<String, usize> = HashMap::new();
    for title in titles {
        let name = project_from_title(title).unwrap_or_else(|| fallback.to_string());
        *counts.entry(name).or_default() += 1;
    }

    counts
        .into_iter()
        .max_by(|(a_name, a_count), (b_name, b_count)| {
            a_count.cmp(b_count).then_with(|| b_name.cmp(a_name))
        })
        .map(|(name, _)| name)
        .unwrap_or_else(|| fallback.to_string())
}

fn capitalize(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
