//! Ordered classification cascade
//!
//! Rules are evaluated top to bottom and the first matching rule wins. Each
//! rule is a plain table entry so it can be tested on its own.

use super::{Category, Classification, SubType};
use url::Url;

/// Paths that always identify a site's home page
const HOME_PATHS: &[&str] = &["", "/", "/index.php", "/index.html", "/default.aspx"];

const SEARCH_KEYWORDS: &[&str] = &["search", "sousuo", "搜索", "?s="];

const ABOUT_KEYWORDS: &[&str] = &[
    "about", "profile", "story", "guanyu", "company", "简介", "关于",
];

const CONTACT_KEYWORDS: &[&str] = &["contact", "lianxi", "联系", "support"];

const FAQ_KEYWORDS: &[&str] = &["faq", "help", "question", "wenti", "常见问题"];

const NEWS_KEYWORDS: &[&str] = &[
    "news", "blog", "press", "media", "insight", "article", "zixun", "dongtai", "journal",
    "资讯", "新闻", "动态",
];

const PRODUCT_KEYWORDS: &[&str] = &[
    "product",
    "item",
    "shop",
    "store",
    "collection",
    "category",
    "solution",
    "service",
    "chanpin",
    "anli",
    "产品",
    "案例",
    "服务",
    "解决方案",
];

/// Lowercased view of the classifier input
#[derive(Debug)]
pub struct Subject {
    /// Full URL, lowercased
    pub url: String,
    /// Page title, lowercased (empty when absent)
    pub title: String,
    /// URL path
    pub path: String,
}

impl Subject {
    pub fn new(url: &str, title: Option<&str>) -> Self {
        let url = url.to_lowercase();
        let title = title.map(str::to_lowercase).unwrap_or_default();
        let path = extract_path(&url);
        Self { url, title, path }
    }

    /// Number of path segments once leading and trailing slashes are removed
    pub fn depth(&self) -> usize {
        self.path.trim_matches('/').split('/').count()
    }

    fn url_has_any(&self, keywords: &[&str]) -> bool {
        keywords.iter().any(|k| self.url.contains(k))
    }

    fn url_or_title_has_any(&self, keywords: &[&str]) -> bool {
        keywords
            .iter()
            .any(|k| self.url.contains(k) || self.title.contains(k))
    }
}

/// Extracts the path of an absolute or relative URL
///
/// Relative inputs are resolved against a placeholder origin so that a bare
/// path such as `/about` still yields `/about`.
pub(crate) fn extract_path(url: &str) -> String {
    if let Ok(parsed) = Url::parse(url) {
        if parsed.cannot_be_a_base() {
            return String::new();
        }
        return parsed.path().to_string();
    }

    Url::parse("http://placeholder.invalid/")
        .and_then(|base| base.join(url))
        .map(|joined| joined.path().to_string())
        .unwrap_or_default()
}

/// How a matching rule decides the subtype
#[derive(Debug, Clone, Copy)]
pub enum SubTypeRule {
    None,
    News,
    Product,
}

impl SubTypeRule {
    fn resolve(&self, subject: &Subject) -> Option<SubType> {
        match self {
            Self::None => None,
            Self::News => {
                let marked = ["category", "tag", "list"]
                    .iter()
                    .any(|m| subject.url.contains(m))
                    || subject.path.ends_with("/news/")
                    || subject.path.ends_with("/blog/");
                if marked || subject.depth() <= 2 {
                    Some(SubType::List)
                } else {
                    Some(SubType::Detail)
                }
            }
            // Depth never forces List for products; only explicit markers do.
            Self::Product => {
                let marked = ["category", "collection", "list"]
                    .iter()
                    .any(|m| subject.url.contains(m))
                    || subject.path.ends_with("/product/")
                    || subject.path.ends_with("/products/");
                if marked {
                    Some(SubType::List)
                } else {
                    Some(SubType::Detail)
                }
            }
        }
    }
}

/// One entry of the classification cascade
pub struct Rule {
    pub name: &'static str,
    pub matches: fn(&Subject) -> bool,
    pub category: Category,
    pub subtype: SubTypeRule,
    pub score: u8,
}

impl Rule {
    /// Applies this rule, returning a classification when it matches
    pub fn apply(&self, subject: &Subject) -> Option<Classification> {
        if !(self.matches)(subject) {
            return None;
        }
        Some(Classification {
            category: self.category,
            subtype: self.subtype.resolve(subject),
            score: self.score,
        })
    }
}

/// The cascade, in evaluation order
pub static RULES: &[Rule] = &[
    Rule {
        name: "home",
        matches: |s| HOME_PATHS.contains(&s.path.as_str()),
        category: Category::Home,
        subtype: SubTypeRule::None,
        score: 100,
    },
    Rule {
        name: "search",
        matches: |s| s.url_has_any(SEARCH_KEYWORDS),
        category: Category::Search,
        subtype: SubTypeRule::None,
        score: 90,
    },
    Rule {
        name: "about",
        matches: |s| s.url_or_title_has_any(ABOUT_KEYWORDS),
        category: Category::About,
        subtype: SubTypeRule::None,
        score: 90,
    },
    Rule {
        name: "contact",
        matches: |s| s.url_or_title_has_any(CONTACT_KEYWORDS),
        category: Category::Contact,
        subtype: SubTypeRule::None,
        score: 90,
    },
    Rule {
        name: "faq",
        matches: |s| s.url_or_title_has_any(FAQ_KEYWORDS),
        category: Category::Faq,
        subtype: SubTypeRule::None,
        score: 90,
    },
    Rule {
        name: "news",
        matches: |s| s.url_has_any(NEWS_KEYWORDS),
        category: Category::News,
        subtype: SubTypeRule::News,
        score: 80,
    },
    Rule {
        name: "product",
        matches: |s| s.url_has_any(PRODUCT_KEYWORDS),
        category: Category::Product,
        subtype: SubTypeRule::Product,
        score: 80,
    },
];

/// Classifies a page into an archetype
///
/// Matching is case-insensitive. The title participates in the About,
/// Contact and FAQ rules only; the H1 is accepted but not consulted.
///
/// # Example
///
/// ```
/// use site_canon::classify::{classify, Category, SubType};
///
/// let c = classify("https://example.com/blog/2024/05/launch", None, None);
/// assert_eq!(c.category, Category::News);
/// assert_eq!(c.subtype, Some(SubType::Detail));
/// ```
pub fn classify(url: &str, title: Option<&str>, _h1: Option<&str>) -> Classification {
    let subject = Subject::new(url, title);
    RULES
        .iter()
        .find_map(|rule| rule.apply(&subject))
        .unwrap_or(Classification::OTHER)
}
