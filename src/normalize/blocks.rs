//! Canonical block structure of a normalized page

use crate::url::CanonicalUrl;
use chrono::{DateTime, Utc};
use std::fmt;

/// One block of normalized content
///
/// Every variant carries exactly what its renderer needs; inline markup
/// (emphasis, code spans, links) is already rendered into the text fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentBlock {
    Heading {
        level: u8,
        text: String,
        anchor: String,
    },
    Paragraph {
        text: String,
    },
    CodeFence {
        language: Option<String>,
        code: String,
    },
    /// Rows are padded so every row has `header.len()` cells
    Table {
        header: Vec<String>,
        rows: Vec<Vec<String>>,
    },
    List {
        ordered: bool,
        start: u32,
        items: Vec<ListItem>,
    },
    Callout {
        kind: CalloutKind,
        blocks: Vec<ContentBlock>,
    },
    Link {
        text: String,
        href: String,
    },
    ThematicBreak,
}

/// A list item holds nested blocks, which may include further lists
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListItem {
    pub blocks: Vec<ContentBlock>,
}

/// Kind of a callout box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CalloutKind {
    Info,
    Caution,
    Warning,
}

impl CalloutKind {
    /// Keyword line written above the callout content
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Caution => "caution",
            Self::Warning => "warning",
        }
    }
}

impl fmt::Display for CalloutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A page after normalization, ready to be written once
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub source_url: CanonicalUrl,
    pub captured_at: DateTime<Utc>,
    pub title: String,
    pub blocks: Vec<ContentBlock>,
    /// Data-quality problems found while normalizing
    pub warnings: Vec<String>,
}

impl RenderedDocument {
    /// Level 2 and 3 headings as `(level, text, anchor)`
    pub fn section_headings(&self) -> Vec<(u8, &str, &str)> {
        let mut found = Vec::new();
        collect_headings(&self.blocks, &mut found);
        found
    }
}

fn collect_headings<'a>(blocks: &'a [ContentBlock], found: &mut Vec<(u8, &'a str, &'a str)>) {
    for block in blocks {
        match block {
            ContentBlock::Heading {
                level,
                text,
                anchor,
            } if *level == 2 || *level == 3 => found.push((*level, text, anchor)),
            ContentBlock::Callout { blocks, .. } => collect_headings(blocks, found),
            _ => {}
        }
    }
}
