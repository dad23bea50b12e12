//! Slug generation for instance labels
//!
//! A slug is a short identifier taken from the end of a URL path. It is used
//! to build unique page-type labels and, from those, stable screenshot names.

use super::rules::extract_path;

const MAX_SLUG_CHARS: usize = 30;

/// Derives a short, stable identifier from a URL
///
/// The last path segment is used. When it is numeric or shorter than three
/// characters its parent segment is prepended. A trailing file extension is
/// removed and the result is truncated to 30 characters.
///
/// # Examples
///
/// ```
/// use site_canon::classify::slug;
///
/// assert_eq!(slug("https://example.com/a/bc"), "a-bc");
/// assert_eq!(slug("https://example.com/"), "home");
/// assert_eq!(slug("https://example.com/news/launch.html"), "launch");
/// ```
pub fn slug(url: &str) -> String {
    let path = extract_path(url);
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        return "home".to_string();
    }

    let segments: Vec<&str> = trimmed.split('/').collect();
    let last = match segments.last() {
        Some(last) => *last,
        None => return "unknown".to_string(),
    };

    let needs_parent = last.chars().count() < 3 || is_all_digits(last);
    let mut slug = if needs_parent && segments.len() > 1 {
        format!("{}-{}", segments[segments.len() - 2], last)
    } else {
        last.to_string()
    };

    if let Some(dot) = slug.rfind('.') {
        slug.truncate(dot);
    }

    slug.chars().take(MAX_SLUG_CHARS).collect()
}

fn is_all_digits(segment: &str) -> bool {
    !segment.is_empty() && segment.chars().all(|c| c.is_ascii_digit())
}
