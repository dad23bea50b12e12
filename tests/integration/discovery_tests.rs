//! Integration tests for discovery
//!
//! Sites are served by the scripted browser; SEO probes hit its raw-GET map.

use crate::support::{StubBrowser, StubPages};
use site_canon::browser::ContextOptions;
use site_canon::capture::ControlToken;
use site_canon::config::DiscoveryConfig;
use site_canon::discovery::{
    discover_all, discover_site, group_records, select_from_records, PageRecord, SiteTarget,
};
use site_canon::CanonicalSelection;

fn target(seed: &str, project: &str) -> SiteTarget {
    SiteTarget {
        seed: seed.to_string(),
        project: project.to_string(),
    }
}

fn find<'a>(rows: &'a [CanonicalSelection], prefix: &str) -> Option<&'a CanonicalSelection> {
    rows.iter().find(|r| r.page_type.starts_with(prefix))
}

fn acme_pages() -> StubPages {
    StubPages::new()
        .links(
            "https://acme.com/",
            &[
                "https://acme.com/",
                "https://acme.com/about-us",
                "https://acme.com/contact",
                "https://acme.com/product-category/tools",
                "https://acme.com/news",
                "https://acme.com/logo.png",
                "https://elsewhere.org/about",
            ],
        )
        .links(
            "https://acme.com/product-category/tools",
            &[
                "https://acme.com/product/b",
                "https://acme.com/product/alpha-widget",
                "https://acme.com/about-us",
            ],
        )
        .links(
            "https://acme.com/news",
            &[
                "https://acme.com/news/2024/05/launch-day",
                "https://acme.com/news/2024/05/a",
            ],
        )
        .raw(
            "https://acme.com/robots.txt",
            200,
            "User-agent: *\nDisallow: /admin\nSitemap: https://acme.com/custom-map.xml\n",
        )
        .raw("https://acme.com/custom-map.xml", 200, "<urlset/>")
}

#[tokio::test]
async fn test_discover_site_end_to_end() {
    let browser = StubBrowser::new(acme_pages());

    let site = discover_site(
        &browser,
        &target("https://acme.com", "Acme"),
        &DiscoveryConfig::default(),
        &ContextOptions::default(),
        &ControlToken::new(),
    )
    .await;

    assert!(site.reachable);
    let rows = &site.selections;

    assert_eq!(rows.iter().filter(|r| r.category == "Home").count(), 1);
    assert_eq!(find(rows, "About").unwrap().url, "https://acme.com/about-us");
    assert_eq!(find(rows, "Contact").unwrap().url, "https://acme.com/contact");
    assert!(rows.iter().all(|r| !r.url.contains("elsewhere.org")));
    assert!(rows.iter().all(|r| !r.url.ends_with(".png")));

    // Detail pools were empty on the seed page and filled one level deeper
    let product = find(rows, "Product-Detail").unwrap();
    assert_eq!(product.url, "https://acme.com/product/alpha-widget");
    let news = find(rows, "News-Detail").unwrap();
    assert_eq!(news.url, "https://acme.com/news/2024/05/launch-day");
    assert_eq!(browser.stats.navigations_to("https://acme.com/product-category/tools"), 1);
    assert_eq!(browser.stats.navigations_to("https://acme.com/news"), 1);

    let robots = find(rows, "Robots.txt").unwrap();
    assert_eq!(robots.category, "SEO");
    assert_eq!(robots.url, "https://acme.com/robots.txt");
    let sitemap = find(rows, "Sitemap").unwrap();
    assert_eq!(sitemap.url, "https://acme.com/custom-map.xml");

    assert_eq!(browser.stats.currently_open(), 0);
}

#[tokio::test]
async fn test_no_seo_rows_when_probes_fail() {
    let browser = StubBrowser::new(StubPages::new().links("https://plain.io", &["https://plain.io/faq"]));

    let site = discover_site(
        &browser,
        &target("https://plain.io", "Plain"),
        &DiscoveryConfig::default(),
        &ContextOptions::default(),
        &ControlToken::new(),
    )
    .await;

    assert!(site.reachable);
    assert!(site.selections.iter().all(|r| !r.is_seo()));
    assert_eq!(find(&site.selections, "FAQ").unwrap().url, "https://plain.io/faq");
}

#[tokio::test]
async fn test_unreachable_seed_yields_home_row() {
    let browser = StubBrowser::new(StubPages::new().unreachable("https://down.example"));

    let site = discover_site(
        &browser,
        &target("https://down.example", "Down"),
        &DiscoveryConfig::default(),
        &ContextOptions::default(),
        &ControlToken::new(),
    )
    .await;

    assert!(!site.reachable);
    assert_eq!(
        site.selections,
        vec![CanonicalSelection::new("Down", "Home", "Home", "https://down.example")]
    );
    // One DOM-ready attempt and one retry on the load event
    assert_eq!(browser.stats.navigations_to("https://down.example"), 2);
    assert_eq!(browser.stats.currently_open(), 0);
}

#[tokio::test]
async fn test_indexability_check_drops_noindex_pages() {
    let pages = StubPages::new()
        .links(
            "https://acme.com",
            &["https://acme.com/about-us", "https://acme.com/contact"],
        )
        .html(
            "https://acme.com/contact",
            r#"<html><head><meta name="robots" content="noindex"><title>Contact</title></head></html>"#,
        )
        .raw("https://acme.com/robots.txt", 200, "User-agent: *\n");
    let browser = StubBrowser::new(pages);

    let config = DiscoveryConfig {
        check_indexability: true,
        ..DiscoveryConfig::default()
    };

    let site = discover_site(
        &browser,
        &target("https://acme.com", "Acme"),
        &config,
        &ContextOptions::default(),
        &ControlToken::new(),
    )
    .await;

    assert!(find(&site.selections, "Contact").is_none());
    assert!(find(&site.selections, "About").is_some());
    assert!(find(&site.selections, "Robots.txt").is_some());
}

#[tokio::test]
async fn test_discover_all_keeps_order_and_bounds_contexts() {
    let pages = acme_pages()
        .links("https://beta.io", &["https://beta.io/contact-us"])
        .unreachable("https://gamma.net");
    let browser = StubBrowser::new(pages);

    let targets = vec![
        target("https://acme.com", "Acme"),
        target("https://beta.io", "Beta"),
        target("https://gamma.net", "Gamma"),
    ];
    let config = DiscoveryConfig {
        concurrency: 2,
        ..DiscoveryConfig::default()
    };

    let sites = discover_all(
        &browser,
        &targets,
        &config,
        &ContextOptions::default(),
        &ControlToken::new(),
    )
    .await;

    let projects: Vec<&str> = sites.iter().map(|s| s.target.project.as_str()).collect();
    assert_eq!(projects, vec!["Acme", "Beta", "Gamma"]);
    assert!(sites[0].reachable);
    assert!(sites[1].reachable);
    assert!(!sites[2].reachable);
    assert!(browser.stats.peak_open() <= 2);
}

#[tokio::test]
async fn test_discovery_uses_configured_viewport() {
    let browser = StubBrowser::new(acme_pages());
    let viewport = ContextOptions {
        viewport_width: 1280,
        viewport_height: 720,
    };

    discover_site(
        &browser,
        &target("https://acme.com", "Acme"),
        &DiscoveryConfig::default(),
        &viewport,
        &ControlToken::new(),
    )
    .await;

    assert_eq!(browser.stats.viewports(), vec![viewport]);
}

#[tokio::test]
async fn test_discover_all_skips_sites_after_cancel() {
    let browser = StubBrowser::new(acme_pages());
    let control = ControlToken::new();
    control.cancel();

    let sites = discover_all(
        &browser,
        &[target("https://acme.com", "Acme")],
        &DiscoveryConfig::default(),
        &ContextOptions::default(),
        &control,
    )
    .await;

    assert!(sites.is_empty());
    assert_eq!(browser.stats.contexts_opened(), 0);
}

#[test]
fn test_record_ingestion_selects_median_product() {
    let record = |url: &str| PageRecord {
        url: Some(url.to_string()),
        title: Some("Catalog - Xco".to_string()),
        status_code: Some(200),
        content_type: Some("text/html".to_string()),
        ..PageRecord::default()
    };

    let records = vec![
        record("https://x.com/about-us"),
        record("https://x.com/shop/ccccccccccccccccccccc"),
        record("https://x.com/shop/a"),
        record("https://x.com/shop/bb"),
        record("https://x.com/shop/list"),
    ];

    let sites = select_from_records(&group_records(&records));
    assert_eq!(sites.len(), 1);
    assert_eq!(sites[0].target.project, "Xco");

    let rows = &sites[0].selections;
    assert_eq!(find(rows, "About").unwrap().url, "https://x.com/about-us");
    assert_eq!(find(rows, "Product-List").unwrap().url, "https://x.com/shop/list");
    assert_eq!(find(rows, "Product-Detail").unwrap().url, "https://x.com/shop/bb");
}

#[test]
fn test_record_home_fallback_keeps_port() {
    let records = vec![PageRecord {
        url: Some("http://localhost:8080/about".to_string()),
        title: Some("About".to_string()),
        ..PageRecord::default()
    }];

    let sites = select_from_records(&group_records(&records));
    assert_eq!(sites[0].target.seed, "http://localhost:8080");
    assert_eq!(find(&sites[0].selections, "Home").unwrap().url, "http://localhost:8080");
}
