//! Phrasing content: text, emphasis, code spans and links rendered to Markdown

use crate::normalize::convert::Context;
use crate::normalize::roles::{resolve_role, Role};
use scraper::{ElementRef, Node};

/// Renders the phrasing content of an element into a single paragraph text
///
/// Whitespace is collapsed the way a browser would; `<br>` survives as `\n`.
pub(crate) fn inline_children(element: ElementRef, ctx: &Context) -> String {
    let mut raw = String::new();
    push_children(element, ctx, &mut raw);
    finish(&raw)
}

/// Appends a text node, turning every whitespace character into a space
pub(crate) fn push_text(text: &str, out: &mut String) {
    out.extend(text.chars().map(|c| if c.is_whitespace() { ' ' } else { c }));
}

/// Collapses space runs on every line and drops blank lines
pub(crate) fn finish(raw: &str) -> String {
    raw.split('\n')
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn push_children(element: ElementRef, ctx: &Context, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => push_text(text, out),
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    push_element(child, ctx, out);
                }
            }
            _ => {}
        }
    }
}

/// Renders one element in an inline context
pub(crate) fn push_element(element: ElementRef, ctx: &Context, out: &mut String) {
    let role = resolve_role(&element, ctx.overrides, ctx.chrome);
    if role == Role::Chrome {
        return;
    }

    match element.value().name() {
        "br" => out.push('\n'),
        "img" => {
            if let Some(alt) = element.value().attr("alt") {
                push_text(alt, out);
            }
        }
        "code" | "kbd" | "samp" | "tt" | "pre" => {
            let text: String = element.text().collect();
            let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
            if !text.is_empty() {
                out.push_str(&code_span(&text));
            }
        }
        "strong" | "b" => push_wrapped(element, ctx, "**", out),
        "em" | "i" => push_wrapped(element, ctx, "*", out),
        "a" => push_link(element, ctx, out),
        _ if role == Role::Inline => push_children(element, ctx, out),
        // Block content met in an inline context (table cells, headings) is flattened
        _ => {
            out.push(' ');
            push_children(element, ctx, out);
            out.push(' ');
        }
    }
}

fn push_wrapped(element: ElementRef, ctx: &Context, marker: &str, out: &mut String) {
    let mut inner = String::new();
    push_children(element, ctx, &mut inner);

    let core = inner.trim();
    if core.is_empty() {
        out.push_str(&inner);
        return;
    }
    if inner.starts_with(char::is_whitespace) {
        out.push(' ');
    }
    out.push_str(marker);
    out.push_str(core);
    out.push_str(marker);
    if inner.ends_with(char::is_whitespace) {
        out.push(' ');
    }
}

fn push_link(element: ElementRef, ctx: &Context, out: &mut String) {
    let mut inner = String::new();
    push_children(element, ctx, &mut inner);
    let text = finish(&inner).replace('\n', " ");

    if text.is_empty() || is_permalink_marker(&text) {
        return;
    }

    let href = element.value().attr("href").map(str::trim).unwrap_or_default();
    let unwrap = href.is_empty()
        || (ctx.in_heading && href.starts_with('#'))
        || href.to_ascii_lowercase().starts_with("javascript:");

    match ctx.resolve(href) {
        Some(resolved) if !unwrap => {
            out.push('[');
            out.push_str(&text);
            out.push_str("](");
            out.push_str(&resolved);
            out.push(')');
        }
        _ => out.push_str(&inner),
    }
}

/// Wraps text in a code span whose fence is longer than any backtick run inside
pub(crate) fn code_span(text: &str) -> String {
    let fence = "`".repeat(longest_backtick_run(text) + 1);
    let pad = if text.starts_with('`') || text.ends_with('`') {
        " "
    } else {
        ""
    };
    format!("{fence}{pad}{text}{pad}{fence}")
}

pub(crate) fn longest_backtick_run(text: &str) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for c in text.chars() {
        if c == '`' {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

/// Heading permalinks render as a lone symbol such as `¶` or `#`
pub(crate) fn is_permalink_marker(text: &str) -> bool {
    text.chars()
        .all(|c| c.is_whitespace() || matches!(c, '¶' | '#' | '§' | '🔗' | '⚓'))
}
