use crate::UrlError;
use url::Url;

/// Static asset extensions that never represent an auditable page
const IGNORED_EXTENSIONS: &[&str] = &[
    ".png", ".jpg", ".jpeg", ".gif", ".svg", ".webp", ".pdf", ".doc", ".docx", ".xls", ".xlsx",
    ".zip", ".rar", ".mp4", ".mp3", ".css", ".js", ".json", ".xml",
];

/// Normalizes a discovered link relative to the page it was found on
///
/// # Normalization Steps
///
/// 1. Resolve the href against `base`
/// 2. Reject non-HTTP(S) schemes
/// 3. Reject links whose path ends in a static asset extension
/// 4. Reject links whose host differs from the base host
/// 5. Remove the fragment and any trailing slash
///
/// # Examples
///
/// ```
/// use site_canon::url::normalize_link;
/// use url::Url;
///
/// let base = Url::parse("https://example.com/").unwrap();
/// let link = normalize_link("/about/#team", &base).unwrap();
/// assert_eq!(link, "https://example.com/about");
/// ```
pub fn normalize_link(href: &str, base: &Url) -> Result<String, UrlError> {
    let href = href.trim();
    if href.is_empty() {
        return Err(UrlError::Malformed("empty href".to_string()));
    }

    let mut url = base
        .join(href)
        .map_err(|e| UrlError::Parse(format!("{}: {}", href, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    let path = url.path().to_lowercase();
    if IGNORED_EXTENSIONS.iter().any(|ext| path.ends_with(ext)) {
        return Err(UrlError::StaticAsset(url.to_string()));
    }

    let host = url.host_str().ok_or(UrlError::MissingDomain)?;
    let base_host = base.host_str().ok_or(UrlError::MissingDomain)?;
    if !host.eq_ignore_ascii_case(base_host) {
        return Err(UrlError::ForeignHost(host.to_string()));
    }

    url.set_fragment(None);
    Ok(url.as_str().trim_end_matches('/').to_string())
}

/// Reduces a URL to the form used to match checkpoint rows on resume
///
/// The URL is trimmed, its fragment removed and trailing slashes stripped.
/// No parsing is involved, so any string has a key.
///
/// # Examples
///
/// ```
/// use site_canon::url::resume_key;
///
/// assert_eq!(resume_key(" https://example.com/page/#top "), "https://example.com/page");
/// ```
pub fn resume_key(url: &str) -> String {
    let trimmed = url.trim();
    let without_fragment = match trimmed.find('#') {
        Some(idx) => &trimmed[..idx],
        None => trimmed,
    };
    without_fragment.trim_end_matches('/').to_string()
}

/// Ensures a seed URL carries a scheme, defaulting to HTTPS
pub fn ensure_scheme(seed: &str) -> String {
    let seed = seed.trim();
    if seed.starts_with("http://") || seed.starts_with("https://") {
        seed.to_string()
    } else {
        format!("https://{}", seed)
    }
}
