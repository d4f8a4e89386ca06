//! Output document layout: title line, provenance header, body

use crate::normalize::{render_blocks, RenderedDocument};
use chrono::SecondsFormat;

const CAPTURE_KEY: &str = "scraped_at:";

/// Renders the complete file contents for a document
///
/// ```text
/// # <Title> | <Site Name>
///
/// ---
/// source: <original URL>
/// scraped_at: <ISO-8601 UTC timestamp>
/// ---
///
/// <rendered body>
/// ```
pub fn to_markdown(doc: &RenderedDocument, site_name: &str, on_this_page: bool) -> String {
    let mut out = format!(
        "# {}\n\n---\nsource: {}\n{} {}\n---\n",
        display_title(&doc.title, site_name),
        doc.source_url,
        CAPTURE_KEY,
        doc.captured_at.to_rfc3339_opts(SecondsFormat::Secs, true)
    );

    let body = render_blocks(&doc.blocks);
    if !body.is_empty() {
        out.push('\n');
        out.push_str(&body);
    }

    if on_this_page {
        if let Some(toc) = on_this_page_section(doc) {
            out.push('\n');
            out.push_str(&toc);
        }
    }

    out
}

/// `<title> | <site>`, without repeating a site suffix the title already carries
pub fn display_title(title: &str, site_name: &str) -> String {
    let title = title.split_whitespace().collect::<Vec<_>>().join(" ");
    if site_name.is_empty() || title == site_name || title.ends_with(&format!(" | {}", site_name)) {
        title
    } else {
        format!("{} | {}", title, site_name)
    }
}

/// Anchor list of level 2 and 3 headings
fn on_this_page_section(doc: &RenderedDocument) -> Option<String> {
    let headings = doc.section_headings();
    if headings.is_empty() {
        return None;
    }

    let mut section = String::from("## On this page\n\n");
    for (level, text, anchor) in headings {
        let indent = if level == 3 { "  " } else { "" };
        section.push_str(&format!("{}- [{}](#{})\n", indent, text, anchor));
    }
    Some(section)
}

/// Drops the capture timestamp line so two captures of the same page compare equal
pub fn strip_capture_timestamp(text: &str) -> String {
    let mut stripped = false;
    text.split('\n')
        .filter(|line| {
            if !stripped && line.starts_with(CAPTURE_KEY) {
                stripped = true;
                false
            } else {
                true
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
