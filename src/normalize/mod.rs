//! Content normalizer
//!
//! Turns the content region of a fetched page into a sequence of
//! [`ContentBlock`]s using a role-keyed dispatch, then renders that sequence
//! to Markdown. The same input always produces byte-identical output.
//!
//! # Components
//!
//! - `roles`: which role an element plays (overrides, chrome, callouts, tags)
//! - `convert`: element-to-block conversion per role
//! - `inline`: phrasing content (emphasis, code spans, links)
//! - `render`: block-to-Markdown rendering

mod blocks;
mod convert;
mod inline;
mod render;
mod roles;

pub use blocks::{CalloutKind, ContentBlock, ListItem, RenderedDocument};
pub use convert::slugify;
pub use render::render_blocks;
pub use roles::{resolve_role, Role, RoleOverride};

use crate::crawler::FetchedPage;
use crate::site::{content_region, SiteAdapter};
use crate::url::CanonicalUrl;
use convert::Context;
use scraper::{Html, Selector};
use std::sync::Arc;
use url::Url;

/// Converts fetched pages into [`RenderedDocument`]s for one site
pub struct Normalizer {
    site: Arc<dyn SiteAdapter>,
}

impl Normalizer {
    pub fn new(site: Arc<dyn SiteAdapter>) -> Self {
        Self { site }
    }

    /// Normalizes a fetched page recorded under `url`
    ///
    /// Never fails: a page without a usable content region yields a document
    /// with zero blocks and a warning.
    pub fn normalize(&self, page: &FetchedPage, url: &CanonicalUrl) -> RenderedDocument {
        let document = Html::parse_document(&page.body);
        let title = page_title(&document);
        let base = document_base(&document, &page.response_url);
        let mut warnings = Vec::new();

        let blocks = match content_region(&document, self.site.content_selectors()) {
            Some(region) => {
                let ctx = Context::new(
                    &base,
                    self.site.role_overrides(),
                    self.site.chrome_selectors(),
                );
                let blocks = convert::convert_region(region, &ctx);
                if blocks.is_empty() {
                    warnings.push("content region is empty".to_string());
                }
                blocks
            }
            None => {
                warnings.push("no content region found".to_string());
                Vec::new()
            }
        };

        for warning in &warnings {
            tracing::warn!("{}: {}", url, warning);
        }

        RenderedDocument {
            source_url: url.clone(),
            captured_at: page.fetched_at,
            title,
            blocks,
            warnings,
        }
    }
}

/// Page title: `<title>`, then the first `<h1>`, then "Untitled"
pub fn page_title(document: &Html) -> String {
    ["title", "h1"]
        .iter()
        .filter_map(|tag| Selector::parse(tag).ok())
        .find_map(|selector| {
            let element = document.select(&selector).next()?;
            let text = element.text().collect::<Vec<_>>().join(" ");
            let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
            (!text.is_empty()).then_some(text)
        })
        .unwrap_or_else(|| "Untitled".to_string())
}

/// Base URL for relative references: `<base href>` if present, else the URL
/// the page was served from
///
/// The served URL keeps its trailing slash, so `install` on `/docs/guide/`
/// resolves to `/docs/guide/install`.
pub fn document_base(document: &Html, served_from: &Url) -> Url {
    Selector::parse("base[href]")
        .ok()
        .and_then(|selector| {
            document
                .select(&selector)
                .next()
                .and_then(|base| base.value().attr("href"))
                .and_then(|href| served_from.join(href.trim()).ok())
        })
        .unwrap_or_else(|| served_from.clone())
}
