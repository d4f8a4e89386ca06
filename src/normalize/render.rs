//! Deterministic Markdown rendering of a block sequence
//!
//! Blocks render to lines tagged with whether they belong to a code fence.
//! Blank-line collapsing only touches untagged lines, so fence contents stay
//! verbatim whatever the surrounding text looks like.

use crate::normalize::blocks::{ContentBlock, ListItem};
use crate::normalize::inline::longest_backtick_run;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Line {
    text: String,
    code: bool,
}

impl Line {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            code: false,
        }
    }

    fn code(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            code: true,
        }
    }

    fn blank() -> Self {
        Self::text("")
    }

    fn is_blank(&self) -> bool {
        !self.code && self.text.trim().is_empty()
    }
}

/// Renders blocks into a Markdown body
///
/// Blocks are separated by one blank line, consecutive blank lines outside
/// code fences are collapsed, and a non-empty body ends with a newline.
pub fn render_blocks(blocks: &[ContentBlock]) -> String {
    let lines = collapse_blank_lines(join_blocks(blocks));
    if lines.is_empty() {
        return String::new();
    }
    let mut body = lines
        .iter()
        .map(|line| line.text.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    body.push('\n');
    body
}

fn join_blocks(blocks: &[ContentBlock]) -> Vec<Line> {
    let mut out = Vec::new();
    for lines in blocks.iter().map(render_block).filter(|l| !l.is_empty()) {
        if !out.is_empty() {
            out.push(Line::blank());
        }
        out.extend(lines);
    }
    out
}

/// Plain text split into untagged lines; empty text yields no lines
fn text_lines(text: &str) -> Vec<Line> {
    if text.is_empty() {
        return Vec::new();
    }
    text.split('\n').map(Line::text).collect()
}

fn render_block(block: &ContentBlock) -> Vec<Line> {
    match block {
        ContentBlock::Heading { level, text, .. } => {
            vec![Line::text(format!(
                "{} {}",
                "#".repeat(usize::from((*level).clamp(1, 6))),
                text
            ))]
        }
        ContentBlock::Paragraph { text } => text_lines(text),
        ContentBlock::CodeFence { language, code } => render_code(language.as_deref(), code),
        ContentBlock::Table { header, rows } => render_table(header, rows),
        ContentBlock::List {
            ordered,
            start,
            items,
        } => render_list(*ordered, *start, items),
        ContentBlock::Callout { kind, blocks } => {
            let mut lines = vec![Line::text(kind.as_str()), Line::blank()];
            lines.extend(join_blocks(blocks));
            lines
        }
        ContentBlock::Link { text, href } => vec![Line::text(format!("[{}]({})", text, href))],
        ContentBlock::ThematicBreak => vec![Line::text("---")],
    }
}

fn render_code(language: Option<&str>, code: &str) -> Vec<Line> {
    let fence = "`".repeat((longest_backtick_run(code) + 1).max(3));
    let mut lines = vec![Line::code(format!("{}{}", fence, language.unwrap_or_default()))];
    if !code.is_empty() {
        lines.extend(code.split('\n').map(Line::code));
    }
    lines.push(Line::code(fence));
    lines
}

fn render_table(header: &[String], rows: &[Vec<String>]) -> Vec<Line> {
    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(Line::text(table_line(header)));
    lines.push(Line::text(format!("|{}|", vec![" --- "; header.len()].join("|"))));
    lines.extend(rows.iter().map(|row| Line::text(table_line(row))));
    lines
}

fn table_line(cells: &[String]) -> String {
    let cells: Vec<String> = cells
        .iter()
        .map(|cell| cell.replace('|', "\\|").replace('\n', "<br>"))
        .collect();
    format!("| {} |", cells.join(" | "))
}

fn render_list(ordered: bool, start: u32, items: &[ListItem]) -> Vec<Line> {
    items
        .iter()
        .enumerate()
        .flat_map(|(i, item)| {
            let marker = if ordered {
                format!("{}.", start.saturating_add(i as u32))
            } else {
                "-".to_string()
            };
            indent_item(&marker, render_item(item))
        })
        .collect()
}

/// Blocks of one item; a nested list follows its paragraph without a blank line
fn render_item(item: &ListItem) -> Vec<Line> {
    let mut out = Vec::new();
    for block in &item.blocks {
        let lines = render_block(block);
        if lines.is_empty() {
            continue;
        }
        if !out.is_empty() && !matches!(block, ContentBlock::List { .. }) {
            out.push(Line::blank());
        }
        out.extend(lines);
    }
    if out.is_empty() {
        out.push(Line::blank());
    }
    out
}

/// Prefixes the first line with the marker and indents the rest to match
fn indent_item(marker: &str, body: Vec<Line>) -> Vec<Line> {
    let indent = " ".repeat(marker.len() + 1);
    body.into_iter()
        .enumerate()
        .map(|(i, line)| {
            let text = if i == 0 {
                format!("{} {}", marker, line.text)
            } else if line.text.is_empty() {
                String::new()
            } else {
                format!("{}{}", indent, line.text)
            };
            Line { text, code: line.code }
        })
        .collect()
}

/// Collapses runs of blank lines to one and trims blank lines at both ends
///
/// Lines inside code fences are kept exactly as rendered.
fn collapse_blank_lines(lines: Vec<Line>) -> Vec<Line> {
    let mut out: Vec<Line> = Vec::with_capacity(lines.len());
    for mut line in lines {
        if line.is_blank() {
            if out.last().map_or(true, Line::is_blank) {
                continue;
            }
            line.text.clear();
        } else if !line.code {
            let trimmed = line.text.trim_end().len();
            line.text.truncate(trimmed);
        }
        out.push(line);
    }
    while out.last().map_or(false, Line::is_blank) {
        out.pop();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::blocks::CalloutKind;

    fn paragraph(text: &str) -> ContentBlock {
        ContentBlock::Paragraph {
            text: text.to_string(),
        }
    }

    #[test]
    fn test_heading_and_paragraph() {
        let blocks = vec![
            ContentBlock::Heading {
                level: 2,
                text: "Setup".to_string(),
                anchor: "setup".to_string(),
            },
            paragraph("Run it."),
        ];
        assert_eq!(render_blocks(&blocks), "## Setup\n\nRun it.\n");
    }

    #[test]
    fn test_callout_keyword_line() {
        let blocks = vec![
            paragraph("Before"),
            ContentBlock::Callout {
                kind: CalloutKind::Info,
                blocks: vec![paragraph("Remember this.")],
            },
            paragraph("After"),
        ];
        let rendered = render_blocks(&blocks);
        assert_eq!(rendered, "Before\n\ninfo\n\nRemember this.\n\nAfter\n");

        let lines: Vec<&str> = rendered.lines().collect();
        let info = lines.iter().position(|l| *l == "info").unwrap();
        let next = lines[info + 1..].iter().find(|l| !l.is_empty()).unwrap();
        assert_eq!(*next, "Remember this.");
    }

    #[test]
    fn test_table_line_count_and_escaping() {
        let table = ContentBlock::Table {
            header: vec!["Name".into(), "Notes".into()],
            rows: vec![
                vec!["a|b".into(), "line1\nline2".into()],
                vec!["c".into(), "".into()],
            ],
        };
        let rendered = render_blocks(&[table]);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "| Name | Notes |");
        assert_eq!(lines[1], "| --- | --- |");
        assert_eq!(lines[2], "| a\\|b | line1<br>line2 |");
        for line in &lines {
            assert_eq!(line.matches(" | ").count() + 1, 2, "line: {}", line);
        }
    }

    #[test]
    fn test_code_fence_escalation() {
        let block = ContentBlock::CodeFence {
            language: Some("markdown".to_string()),
            code: "```rust\nfn x() {}\n```".to_string(),
        };
        assert_eq!(
            render_blocks(&[block]),
            "````markdown\n```rust\nfn x() {}\n```\n````\n"
        );

        let plain = ContentBlock::CodeFence {
            language: None,
            code: "a\n\n\n\nb".to_string(),
        };
        assert_eq!(render_blocks(&[plain]), "```\na\n\n\n\nb\n```\n");
    }

    #[test]
    fn test_nested_list_indentation() {
        let inner = ContentBlock::List {
            ordered: false,
            start: 1,
            items: vec![ListItem {
                blocks: vec![paragraph("Inner")],
            }],
        };
        let list = ContentBlock::List {
            ordered: true,
            start: 1,
            items: vec![
                ListItem {
                    blocks: vec![paragraph("One"), inner],
                },
                ListItem {
                    blocks: vec![paragraph("Two")],
                },
            ],
        };
        assert_eq!(render_blocks(&[list]), "1. One\n   - Inner\n2. Two\n");
    }

    #[test]
    fn test_blank_lines_collapsed() {
        let blocks = vec![paragraph("a\n\n\n"), paragraph(""), paragraph("b")];
        assert_eq!(render_blocks(&blocks), "a\n\nb\n");
    }

    #[test]
    fn test_backtick_paragraph_does_not_open_a_fence() {
        let blocks = vec![
            paragraph("```x``` is inline code\n\n\n"),
            paragraph("next"),
            ContentBlock::CodeFence {
                language: None,
                code: "a\n\n\nb".to_string(),
            },
            paragraph("after\n\n\n"),
            paragraph("end"),
        ];
        assert_eq!(
            render_blocks(&blocks),
            "```x``` is inline code\n\nnext\n\n```\na\n\n\nb\n```\n\nafter\n\nend\n"
        );
    }

    #[test]
    fn test_code_inside_list_keeps_blank_lines() {
        let list = ContentBlock::List {
            ordered: false,
            start: 1,
            items: vec![ListItem {
                blocks: vec![
                    paragraph("Step"),
                    ContentBlock::CodeFence {
                        language: Some("sh".to_string()),
                        code: "one\n\n\ntwo".to_string(),
                    },
                ],
            }],
        };
        assert_eq!(
            render_blocks(&[list]),
            "- Step\n\n  ```sh\n  one\n\n\n  two\n  ```\n"
        );
    }

    #[test]
    fn test_empty_body() {
        assert_eq!(render_blocks(&[]), "");
    }
}
