//! Same-site link discovery within a page's content region

use crate::crawler::FetchedPage;
use crate::normalize::{document_base, resolve_role, Role};
use crate::site::{content_region, SiteAdapter};
use crate::url::{canonicalize, CanonicalUrl};
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeSet;

const SKIPPED_SCHEMES: &[&str] = &["javascript:", "mailto:", "tel:", "data:"];

/// Extracts crawlable links from a fetched page
///
/// Only anchors inside the site's content region count, and anchors inside
/// navigation chrome (including in-page tables of contents) are ignored.
/// Relative hrefs resolve against `<base href>` or the URL the page was
/// served from. Links to another origin than the page's are discarded.
///
/// # Arguments
///
/// * `page` - The fetched page; `final_url` is its record in the frontier
/// * `site` - Decides which same-origin URLs are worth crawling
///
/// # Returns
///
/// An ordered set, so identical input yields an identical result.
pub fn extract_links(page: &FetchedPage, site: &dyn SiteAdapter) -> BTreeSet<CanonicalUrl> {
    let page_url = &page.final_url;
    let document = Html::parse_document(&page.body);
    let mut links = BTreeSet::new();

    let Some(region) = content_region(&document, site.content_selectors()) else {
        return links;
    };
    let Ok(anchors) = Selector::parse("a[href]") else {
        return links;
    };
    let base = document_base(&document, &page.response_url);

    for anchor in region.select(&anchors) {
        if anchor.value().attr("download").is_some() || in_chrome(anchor, region, site) {
            continue;
        }

        let Some(href) = anchor.value().attr("href").map(str::trim) else {
            continue;
        };
        if href.is_empty() || href.starts_with('#') {
            continue;
        }
        let lowered = href.to_ascii_lowercase();
        if SKIPPED_SCHEMES.iter().any(|scheme| lowered.starts_with(scheme)) {
            continue;
        }

        let Ok(resolved) = base.join(href) else {
            tracing::trace!("Unresolvable link {} on {}", href, page_url);
            continue;
        };
        let Ok(url) = canonicalize(resolved) else {
            continue;
        };

        if &url != page_url && url.same_origin(page_url) && site.accepts(&url) {
            links.insert(url);
        }
    }

    links
}

/// True if the anchor or any ancestor below the region resolves to chrome
fn in_chrome(anchor: ElementRef, region: ElementRef, site: &dyn SiteAdapter) -> bool {
    let is_chrome = |element: &ElementRef| {
        resolve_role(element, site.role_overrides(), site.chrome_selectors()) == Role::Chrome
    };

    if is_chrome(&anchor) {
        return true;
    }
    anchor
        .ancestors()
        .take_while(|node| node.id() != region.id())
        .filter_map(ElementRef::wrap)
        .any(|element| is_chrome(&element))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use crate::site::ConfiguredSite;
    use chrono::Utc;
    use url::Url;

    fn site() -> ConfiguredSite {
        ConfiguredSite::from_config(&SiteConfig {
            name: "Example Docs".to_string(),
            seeds: vec!["https://docs.example.com/docs/".to_string()],
            allowed_hosts: vec![],
            include_prefixes: vec!["/docs".to_string()],
            exclude_prefixes: vec![],
            content_selectors: vec!["main".to_string()],
            chrome_selectors: vec![".sidebar".to_string()],
            roles: vec![],
        })
        .unwrap()
    }

    fn page_at(served_from: &str, html: &str) -> FetchedPage {
        let url = CanonicalUrl::parse(served_from).unwrap();
        FetchedPage {
            url: url.clone(),
            final_url: url,
            response_url: Url::parse(served_from).unwrap(),
            status: 200,
            content_type: Some("text/html".to_string()),
            body: html.to_string(),
            fetched_at: Utc::now(),
        }
    }

    fn page(html: &str) -> FetchedPage {
        page_at("https://docs.example.com/docs/guide", html)
    }

    fn strings(links: BTreeSet<CanonicalUrl>) -> Vec<String> {
        links.into_iter().map(|u| u.to_string()).collect()
    }

    #[test]
    fn test_content_region_only() {
        let html = r#"<html><body>
            <nav><a href="/docs/nav-only">Nav</a></nav>
            <main>
              <div class="sidebar"><a href="/docs/sidebar">S</a></div>
              <ul class="toc"><li><a href="/docs/toc-target">T</a></li></ul>
              <p><a href="/docs/b">B</a> and <a href="a">A</a></p>
            </main>
            <footer><a href="/docs/footer">F</a></footer>
        </body></html>"#;

        assert_eq!(
            strings(extract_links(&page(html), &site())),
            vec![
                "https://docs.example.com/docs/a".to_string(),
                "https://docs.example.com/docs/b".to_string(),
            ]
        );
    }

    #[test]
    fn test_fragments_and_self_links_are_dropped() {
        let html = r##"<main>
            <a href="#install">Install</a>
            <a href="/docs/guide#usage">Usage</a>
            <a href="/docs/other#usage">Other</a>
            <a href="/docs/other">Other again</a>
        </main>"##;

        assert_eq!(
            strings(extract_links(&page(html), &site())),
            vec!["https://docs.example.com/docs/other".to_string()]
        );
    }

    #[test]
    fn test_skipped_links() {
        let html = r#"<main>
            <a href="https://elsewhere.example.org/docs/x">Off-site</a>
            <a href="/blog/post">Outside prefix</a>
            <a href="mailto:ops@example.com">Mail</a>
            <a href="javascript:void(0)">JS</a>
            <a href="tel:+1555">Call</a>
            <a href="/docs/file.zip" download>Zip</a>
            <a href="/docs/logo.png">Asset</a>
            <a href="">Empty</a>
        </main>"#;

        assert!(extract_links(&page(html), &site()).is_empty());
    }

    #[test]
    fn test_base_href() {
        let html = r#"<html><head><base href="https://docs.example.com/docs/v2/"></head>
            <body><main><a href="intro">Intro</a></main></body></html>"#;

        assert_eq!(
            strings(extract_links(&page(html), &site())),
            vec!["https://docs.example.com/docs/v2/intro".to_string()]
        );
    }

    #[test]
    fn test_no_region_means_no_links() {
        let html = r#"<div><a href="/docs/b">B</a></div>"#;
        // Only "main" is configured, so there is no body fallback
        assert!(extract_links(&page(html), &site()).is_empty());
    }

    #[test]
    fn test_directory_page_resolves_below_itself() {
        let html = r#"<main><a href="install">Install</a><a href="../faq">FAQ</a></main>"#;
        let page = page_at("https://docs.example.com/docs/guide/", html);

        assert_eq!(
            strings(extract_links(&page, &site())),
            vec![
                "https://docs.example.com/docs/faq".to_string(),
                "https://docs.example.com/docs/guide/install".to_string(),
            ]
        );
    }

    #[test]
    fn test_cross_origin_links_are_discarded() {
        let html = r#"<main>
            <a href="http://docs.example.com/docs/b">Plain http</a>
            <a href="https://docs.example.com:8443/docs/c">Other port</a>
            <a href="https://docs.example.com/docs/d">Same origin</a>
        </main>"#;

        assert_eq!(
            strings(extract_links(&page(html), &site())),
            vec!["https://docs.example.com/docs/d".to_string()]
        );
    }
}
