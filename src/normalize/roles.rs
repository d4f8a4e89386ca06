//! Role resolution: deciding what each element of the content region becomes

use crate::normalize::blocks::CalloutKind;
use scraper::{ElementRef, Selector};

/// What an element is converted into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Heading(u8),
    Paragraph,
    Code,
    Table,
    List,
    Link,
    ThematicBreak,
    Callout(CalloutKind),
    /// Stripped together with its subtree
    Chrome,
    /// Transparent wrapper; its children are converted in its place
    Container,
    /// Phrasing content, folded into the surrounding paragraph
    Inline,
}

impl Role {
    /// Parses a role name as written in `[[site.roles]]`
    pub fn from_config_name(name: &str) -> Option<Role> {
        let role = match name {
            "heading-1" => Role::Heading(1),
            "heading-2" => Role::Heading(2),
            "heading-3" => Role::Heading(3),
            "heading-4" => Role::Heading(4),
            "heading-5" => Role::Heading(5),
            "heading-6" => Role::Heading(6),
            "paragraph" => Role::Paragraph,
            "code" => Role::Code,
            "table" => Role::Table,
            "list" => Role::List,
            "link" => Role::Link,
            "thematic-break" => Role::ThematicBreak,
            "callout-info" => Role::Callout(CalloutKind::Info),
            "callout-caution" => Role::Callout(CalloutKind::Caution),
            "callout-warning" => Role::Callout(CalloutKind::Warning),
            "chrome" => Role::Chrome,
            "container" => Role::Container,
            _ => return None,
        };
        Some(role)
    }
}

/// A site-specific selector forced to a role
#[derive(Debug, Clone)]
pub struct RoleOverride {
    pub selector: Selector,
    pub role: Role,
}

/// Class token parts that mark a callout box
const CALLOUT_MARKERS: &[&str] = &["callout", "admonition", "alert", "notice"];

/// Token parts naming a piece of a callout rather than the box itself
const CALLOUT_PARTS: &[&str] = &[
    "title", "icon", "heading", "label", "content", "body", "header", "inner", "text", "wrapper",
];

const CHROME_TAGS: &[&str] = &[
    "script", "style", "noscript", "template", "iframe", "svg", "button", "head", "link", "meta",
    "input", "select", "textarea", "canvas", "object", "embed", "form",
];

const INLINE_TAGS: &[&str] = &[
    "a", "abbr", "b", "bdi", "bdo", "br", "cite", "code", "data", "del", "dfn", "em", "i", "img",
    "ins", "kbd", "label", "mark", "q", "s", "samp", "small", "span", "strong", "sub", "sup",
    "time", "tt", "u", "var", "wbr",
];

/// Resolves the role of an element
///
/// Order: site overrides, chrome selectors, callout heuristics, tag name.
pub fn resolve_role(element: &ElementRef, overrides: &[RoleOverride], chrome: &[Selector]) -> Role {
    if let Some(o) = overrides.iter().find(|o| o.selector.matches(element)) {
        return o.role;
    }
    if chrome.iter().any(|selector| selector.matches(element)) {
        return Role::Chrome;
    }
    if let Some(kind) = callout_kind(element) {
        return Role::Callout(kind);
    }
    tag_role(element.value().name())
}

fn tag_role(tag: &str) -> Role {
    match tag {
        "h1" => Role::Heading(1),
        "h2" => Role::Heading(2),
        "h3" => Role::Heading(3),
        "h4" => Role::Heading(4),
        "h5" => Role::Heading(5),
        "h6" => Role::Heading(6),
        "p" => Role::Paragraph,
        "pre" => Role::Code,
        "table" => Role::Table,
        "ul" | "ol" => Role::List,
        "hr" => Role::ThematicBreak,
        t if CHROME_TAGS.contains(&t) => Role::Chrome,
        t if INLINE_TAGS.contains(&t) => Role::Inline,
        _ => Role::Container,
    }
}

fn class_parts(element: &ElementRef) -> Vec<String> {
    element
        .value()
        .classes()
        .flat_map(|token| {
            token
                .to_ascii_lowercase()
                .split(&['-', '_'][..])
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Detects callout boxes and their kind
pub fn callout_kind(element: &ElementRef) -> Option<CalloutKind> {
    let is_callout = element.value().name() == "aside"
        || element.value().classes().any(|token| {
            let token = token.to_ascii_lowercase();
            let mut parts = token.split(&['-', '_'][..]);
            let first_is_marker = parts
                .next()
                .map_or(false, |first| CALLOUT_MARKERS.contains(&first));
            first_is_marker && !parts.any(|part| CALLOUT_PARTS.contains(&part))
        });

    if !is_callout {
        return None;
    }

    let mut parts = class_parts(element);
    for attr in ["data-callout", "data-type", "data-kind"] {
        if let Some(value) = element.value().attr(attr) {
            parts.push(value.to_ascii_lowercase());
        }
    }

    let kind = if parts
        .iter()
        .any(|p| matches!(p.as_str(), "warning" | "danger" | "error"))
    {
        CalloutKind::Warning
    } else if parts
        .iter()
        .any(|p| matches!(p.as_str(), "caution" | "attention"))
    {
        CalloutKind::Caution
    } else {
        CalloutKind::Info
    };
    Some(kind)
}

/// Title bars and icons inside a callout box
pub fn is_callout_decoration(element: &ElementRef) -> bool {
    class_parts(element)
        .iter()
        .any(|p| matches!(p.as_str(), "title" | "icon" | "heading" | "label"))
}
