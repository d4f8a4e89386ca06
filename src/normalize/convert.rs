//! Role-keyed conversion of the content region into [`ContentBlock`]s

use crate::normalize::blocks::{CalloutKind, ContentBlock, ListItem};
use crate::normalize::inline::{self, inline_children};
use crate::normalize::roles::{is_callout_decoration, resolve_role, Role, RoleOverride};
use scraper::{ElementRef, Node, Selector};
use url::Url;

/// Widest colspan honored when expanding table cells
const MAX_COLSPAN: usize = 64;

/// Callout titles that only repeat the callout kind
const GENERIC_CALLOUT_TITLES: &[&str] = &[
    "note",
    "info",
    "tip",
    "hint",
    "important",
    "warning",
    "caution",
    "danger",
    "attention",
    "error",
];

/// Everything element conversion needs besides the element itself
#[derive(Clone, Copy)]
pub(crate) struct Context<'a> {
    pub base: &'a Url,
    pub overrides: &'a [RoleOverride],
    pub chrome: &'a [Selector],
    pub in_heading: bool,
}

impl<'a> Context<'a> {
    pub fn new(base: &'a Url, overrides: &'a [RoleOverride], chrome: &'a [Selector]) -> Self {
        Self {
            base,
            overrides,
            chrome,
            in_heading: false,
        }
    }

    fn heading(&self) -> Self {
        Self {
            in_heading: true,
            ..*self
        }
    }

    /// Resolves an href against the page, keeping only web and mail targets
    pub fn resolve(&self, href: &str) -> Option<String> {
        let resolved = self.base.join(href).ok()?;
        match resolved.scheme() {
            "http" | "https" | "mailto" => Some(resolved.to_string()),
            _ => None,
        }
    }
}

/// How the direct children of a container are treated
#[derive(Clone, Copy, PartialEq, Eq)]
enum Children {
    Plain,
    Callout,
    Details,
}

/// Converts the children of the content region
pub(crate) fn convert_region(region: ElementRef, ctx: &Context) -> Vec<ContentBlock> {
    let mut blocks = Vec::new();
    convert_children(region, ctx, Children::Plain, &mut blocks);
    blocks
}

fn convert_children(element: ElementRef, ctx: &Context, mode: Children, out: &mut Vec<ContentBlock>) {
    let mut pending = String::new();

    for child in element.children() {
        match child.value() {
            Node::Text(text) => inline::push_text(text, &mut pending),
            Node::Element(_) => {
                let Some(child) = ElementRef::wrap(child) else {
                    continue;
                };

                if mode == Children::Callout && is_callout_decoration(&child) {
                    flush(&mut pending, out);
                    callout_title(child, ctx, out);
                    continue;
                }
                if mode == Children::Details && child.value().name() == "summary" {
                    flush(&mut pending, out);
                    bold_paragraph(child, ctx, out);
                    continue;
                }

                match resolve_role(&child, ctx.overrides, ctx.chrome) {
                    Role::Chrome => {}
                    Role::Inline if is_block_link(&child) => {
                        flush(&mut pending, out);
                        convert_element(child, Role::Link, ctx, out);
                    }
                    Role::Inline => inline::push_element(child, ctx, &mut pending),
                    role => {
                        flush(&mut pending, out);
                        convert_element(child, role, ctx, out);
                    }
                }
            }
            _ => {}
        }
    }

    flush(&mut pending, out);
}

fn flush(pending: &mut String, out: &mut Vec<ContentBlock>) {
    let text = inline::finish(pending);
    pending.clear();
    if !text.is_empty() {
        out.push(ContentBlock::Paragraph { text });
    }
}

fn convert_element(element: ElementRef, role: Role, ctx: &Context, out: &mut Vec<ContentBlock>) {
    match role {
        Role::Heading(level) => out.extend(heading(element, level, ctx)),
        Role::Paragraph => {
            let text = inline_children(element, ctx);
            if !text.is_empty() {
                out.push(ContentBlock::Paragraph { text });
            }
        }
        Role::Code => out.push(code_fence(element, ctx)),
        Role::Table => out.extend(table(element, ctx)),
        Role::List => out.extend(list(element, ctx)),
        Role::Link => out.extend(link_block(element, ctx)),
        Role::ThematicBreak => out.push(ContentBlock::ThematicBreak),
        Role::Callout(kind) => out.extend(callout(element, kind, ctx)),
        Role::Chrome => {}
        Role::Inline => {
            let text = inline_children(element, ctx);
            if !text.is_empty() {
                out.push(ContentBlock::Paragraph { text });
            }
        }
        Role::Container => match element.value().name() {
            "details" => convert_children(element, ctx, Children::Details, out),
            "summary" | "dt" => bold_paragraph(element, ctx, out),
            _ => convert_children(element, ctx, Children::Plain, out),
        },
    }
}

fn heading(element: ElementRef, level: u8, ctx: &Context) -> Option<ContentBlock> {
    let text = inline_children(element, &ctx.heading()).replace('\n', " ");
    if text.is_empty() {
        return None;
    }

    let anchor = element
        .value()
        .id()
        .filter(|id| !id.trim().is_empty())
        .map(str::to_string)
        .or_else(|| permalink_fragment(element))
        .unwrap_or_else(|| slugify(&text));

    Some(ContentBlock::Heading {
        level,
        text,
        anchor,
    })
}

/// Fragment of the first in-page anchor inside a heading
fn permalink_fragment(element: ElementRef) -> Option<String> {
    element
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|e| e.value().name() == "a")
        .filter_map(|a| a.value().attr("href"))
        .find_map(|href| href.trim().strip_prefix('#').map(str::to_string))
        .filter(|fragment| !fragment.is_empty())
}

/// Lowercase, hyphen-separated anchor for a heading text
pub fn slugify(text: &str) -> String {
    let mut slug = String::new();
    for c in text.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            slug.push(c);
        } else if (c.is_whitespace() || c == '-' || c == '_') && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_matches('-').to_string();
    if slug.is_empty() {
        "section".to_string()
    } else {
        slug
    }
}

fn code_fence(element: ElementRef, ctx: &Context) -> ContentBlock {
    let mut code = String::new();
    push_code_text(element, ctx, &mut code);
    let code = code.replace("\r\n", "\n");
    let code = code
        .strip_prefix('\n')
        .unwrap_or(&code)
        .trim_end_matches(|c: char| c == '\n' || c == ' ' || c == '\t')
        .to_string();

    ContentBlock::CodeFence {
        language: code_language(element),
        code,
    }
}

/// Collects verbatim code text, skipping copy buttons and line-number gutters
fn push_code_text(element: ElementRef, ctx: &Context, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(_) => {
                let Some(child) = ElementRef::wrap(child) else {
                    continue;
                };
                if child.value().name() == "br" {
                    out.push('\n');
                } else if resolve_role(&child, ctx.overrides, ctx.chrome) != Role::Chrome
                    && !is_line_number_gutter(&child)
                {
                    push_code_text(child, ctx, out);
                }
            }
            _ => {}
        }
    }
}

fn is_line_number_gutter(element: &ElementRef) -> bool {
    element.value().classes().any(|c| {
        let c = c.to_ascii_lowercase();
        c.contains("lineno") || c.contains("line-number") || c == "gutter"
    })
}

/// Language from `language-*`/`lang-*` classes or `data-language` on the block or its `<code>`
fn code_language(element: ElementRef) -> Option<String> {
    let code_child = element
        .descendants()
        .filter_map(ElementRef::wrap)
        .find(|e| e.value().name() == "code");

    std::iter::once(element)
        .chain(code_child)
        .find_map(|e| {
            let from_class = e.value().classes().find_map(|class| {
                class
                    .strip_prefix("language-")
                    .or_else(|| class.strip_prefix("lang-"))
                    .map(str::to_string)
            });
            from_class.or_else(|| {
                e.value()
                    .attr("data-language")
                    .or_else(|| e.value().attr("data-lang"))
                    .map(|lang| lang.trim().to_string())
            })
        })
        .filter(|lang| !lang.is_empty() && !lang.contains(char::is_whitespace))
}

fn table(element: ElementRef, ctx: &Context) -> Option<ContentBlock> {
    let mut rows = Vec::new();
    collect_rows(element, ctx, &mut rows);

    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    if width == 0 {
        return None;
    }
    for row in rows.iter_mut() {
        row.resize(width, String::new());
    }

    let mut rows = rows.into_iter();
    let header = rows.next()?;
    Some(ContentBlock::Table {
        header,
        rows: rows.collect(),
    })
}

fn collect_rows(element: ElementRef, ctx: &Context, rows: &mut Vec<Vec<String>>) {
    for child in element.children().filter_map(ElementRef::wrap) {
        match child.value().name() {
            "thead" | "tbody" | "tfoot" => collect_rows(child, ctx, rows),
            "tr" => rows.push(table_row(child, ctx)),
            _ => {}
        }
    }
}

fn table_row(row: ElementRef, ctx: &Context) -> Vec<String> {
    let mut cells = Vec::new();
    for cell in row.children().filter_map(ElementRef::wrap) {
        if !matches!(cell.value().name(), "td" | "th") {
            continue;
        }
        cells.push(inline_children(cell, ctx));

        let span = cell
            .value()
            .attr("colspan")
            .and_then(|s| s.trim().parse::<usize>().ok())
            .unwrap_or(1)
            .clamp(1, MAX_COLSPAN);
        cells.extend(std::iter::repeat(String::new()).take(span - 1));
    }
    cells
}

fn list(element: ElementRef, ctx: &Context) -> Option<ContentBlock> {
    let name = element.value().name();
    let ordered = name == "ol";
    let start = element
        .value()
        .attr("start")
        .and_then(|s| s.trim().parse::<u32>().ok())
        .unwrap_or(1);

    let children: Vec<ElementRef> = element
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|c| resolve_role(c, ctx.overrides, ctx.chrome) != Role::Chrome)
        .collect();
    let has_li = children.iter().any(|c| c.value().name() == "li");

    let mut items: Vec<ListItem> = Vec::new();
    for child in children {
        let mut blocks = Vec::new();
        if has_li && child.value().name() != "li" {
            // A list nested directly in a list belongs to the previous item
            let role = resolve_role(&child, ctx.overrides, ctx.chrome);
            convert_element(child, role, ctx, &mut blocks);
            match items.last_mut() {
                Some(item) => item.blocks.extend(blocks),
                None if !blocks.is_empty() => items.push(ListItem { blocks }),
                None => {}
            }
            continue;
        }

        convert_children(child, ctx, Children::Plain, &mut blocks);
        if !blocks.is_empty() {
            items.push(ListItem { blocks });
        }
    }

    if items.is_empty() {
        return None;
    }
    Some(ContentBlock::List {
        ordered,
        start,
        items,
    })
}

/// An element linking a whole card or panel
fn is_block_link(element: &ElementRef) -> bool {
    element.value().name() == "a"
        && element
            .descendants()
            .filter_map(ElementRef::wrap)
            .any(|e| {
                matches!(
                    e.value().name(),
                    "p" | "div" | "section" | "article" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6"
                        | "ul" | "ol" | "table"
                )
            })
}

fn link_block(element: ElementRef, ctx: &Context) -> Option<ContentBlock> {
    let text = inline::finish(&element.text().collect::<Vec<_>>().join(" ")).replace('\n', " ");
    if text.is_empty() {
        return None;
    }

    let href = std::iter::once(element)
        .chain(element.descendants().filter_map(ElementRef::wrap))
        .find_map(|e| {
            if e.value().name() == "a" {
                e.value().attr("href")
            } else {
                None
            }
        })
        .and_then(|href| ctx.resolve(href.trim()));

    Some(match href {
        Some(href) => ContentBlock::Link { text, href },
        None => ContentBlock::Paragraph { text },
    })
}

fn callout(element: ElementRef, kind: CalloutKind, ctx: &Context) -> Option<ContentBlock> {
    let mut blocks = Vec::new();
    convert_children(element, ctx, Children::Callout, &mut blocks);
    if blocks.is_empty() {
        return None;
    }
    Some(ContentBlock::Callout { kind, blocks })
}

/// Keeps a callout title only when it says more than the callout kind
fn callout_title(element: ElementRef, ctx: &Context, out: &mut Vec<ContentBlock>) {
    let text = inline_children(element, ctx).replace('\n', " ");
    let bare = text.trim_end_matches(':').trim().to_lowercase();
    if bare.is_empty() || GENERIC_CALLOUT_TITLES.contains(&bare.as_str()) {
        return;
    }
    out.push(ContentBlock::Paragraph {
        text: format!("**{}**", text),
    });
}

fn bold_paragraph(element: ElementRef, ctx: &Context, out: &mut Vec<ContentBlock>) {
    let text = inline_children(element, ctx).replace('\n', " ");
    if !text.is_empty() {
        out.push(ContentBlock::Paragraph {
            text: format!("**{}**", text),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    fn convert(body: &str) -> Vec<ContentBlock> {
        let html = Html::parse_document(&format!("<html><body><main>{}</main></body></html>", body));
        let main = html.select(&Selector::parse("main").unwrap()).next().unwrap();
        let base = Url::parse("https://docs.example.com/guide/page").unwrap();
        let chrome = vec![Selector::parse("nav").unwrap(), Selector::parse("button").unwrap()];
        let ctx = Context::new(&base, &[], &chrome);
        convert_region(main, &ctx)
    }

    #[test]
    fn test_heading_anchor_sources() {
        let blocks = convert(
            r##"<h2 id="setup">Setup</h2>
               <h3>Install <a class="headerlink" href="#install-it">¶</a></h3>
               <h4>Next Steps!</h4>"##,
        );
        assert_eq!(
            blocks,
            vec![
                ContentBlock::Heading {
                    level: 2,
                    text: "Setup".to_string(),
                    anchor: "setup".to_string()
                },
                ContentBlock::Heading {
                    level: 3,
                    text: "Install".to_string(),
                    anchor: "install-it".to_string()
                },
                ContentBlock::Heading {
                    level: 4,
                    text: "Next Steps!".to_string(),
                    anchor: "next-steps".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_loose_text_becomes_paragraph() {
        let blocks = convert("Hello <b>bold</b> world<p>Next</p>");
        assert_eq!(
            blocks,
            vec![
                ContentBlock::Paragraph {
                    text: "Hello **bold** world".to_string()
                },
                ContentBlock::Paragraph {
                    text: "Next".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_relative_links_are_resolved() {
        let blocks = convert(r#"<p>See <a href="../api/">the API</a>.</p>"#);
        assert_eq!(
            blocks,
            vec![ContentBlock::Paragraph {
                text: "See [the API](https://docs.example.com/api/).".to_string()
            }]
        );
    }

    #[test]
    fn test_code_language_and_chrome() {
        let blocks = convert(
            r#"<pre class="language-rust"><button>Copy</button><code>fn main() {}
</code></pre>"#,
        );
        assert_eq!(
            blocks,
            vec![ContentBlock::CodeFence {
                language: Some("rust".to_string()),
                code: "fn main() {}".to_string()
            }]
        );
    }

    #[test]
    fn test_table_colspan_and_padding() {
        let blocks = convert(
            r#"<table>
                 <thead><tr><th>A</th><th>B</th><th>C</th></tr></thead>
                 <tbody>
                   <tr><td colspan="2">wide</td><td>x</td></tr>
                   <tr><td>short</td></tr>
                 </tbody>
               </table>"#,
        );
        assert_eq!(
            blocks,
            vec![ContentBlock::Table {
                header: vec!["A".into(), "B".into(), "C".into()],
                rows: vec![
                    vec!["wide".into(), "".into(), "x".into()],
                    vec!["short".into(), "".into(), "".into()],
                ],
            }]
        );
    }

    #[test]
    fn test_nested_list() {
        let blocks = convert("<ul><li>One<ul><li>Inner</li></ul></li><li>Two</li></ul>");
        let ContentBlock::List { ordered, items, .. } = &blocks[0] else {
            panic!("expected a list, got {:?}", blocks);
        };
        assert!(!ordered);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].blocks.len(), 2);
        assert!(matches!(items[0].blocks[1], ContentBlock::List { .. }));
    }

    #[test]
    fn test_callout_drops_generic_title() {
        let blocks = convert(
            r#"<div class="admonition note"><p class="admonition-title">Note</p><p>Body</p></div>"#,
        );
        assert_eq!(
            blocks,
            vec![ContentBlock::Callout {
                kind: CalloutKind::Info,
                blocks: vec![ContentBlock::Paragraph {
                    text: "Body".to_string()
                }],
            }]
        );
    }

    #[test]
    fn test_details_summary() {
        let blocks = convert("<details><summary>More</summary><p>Hidden</p></details>");
        assert_eq!(
            blocks,
            vec![
                ContentBlock::Paragraph {
                    text: "**More**".to_string()
                },
                ContentBlock::Paragraph {
                    text: "Hidden".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_nav_is_stripped() {
        let blocks = convert("<nav><a href='/x'>Menu</a></nav><p>Body</p>");
        assert_eq!(
            blocks,
            vec![ContentBlock::Paragraph {
                text: "Body".to_string()
            }]
        );
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Hello, World"), "hello-world");
        assert_eq!(slugify("  a -- b_c "), "a-b-c");
        assert_eq!(slugify("!!!"), "section");
    }
}
