//! Plain-text rendering of the normalized element tree
//!
//! Walks the element tree directly rather than the document tree, so a
//! defect in one renderer cannot corrupt the other.

use super::collapse_whitespace;
use super::dom::{self, kind_of, Element, ElementKind, Node};
use super::macros::{self, MacroRendering};
use super::MAX_DEPTH;

const INDENT: &str = "  ";

#[derive(Default)]
struct Sink {
    lines: Vec<String>,
    current: String,
}

impl Sink {
    fn push_text(&mut self, text: &str) {
        let collapsed = collapse_whitespace(text);
        if self.current.is_empty() || self.current.ends_with(' ') {
            self.current.push_str(collapsed.trim_start());
        } else {
            self.current.push_str(&collapsed);
        }
    }

    fn end_line(&mut self) {
        let line = std::mem::take(&mut self.current);
        let line = line.trim();
        if !line.is_empty() {
            self.lines.push(line.to_string());
        }
    }

    fn blank(&mut self) {
        self.end_line();
        if matches!(self.lines.last(), Some(last) if !last.is_empty()) {
            self.lines.push(String::new());
        }
    }

    fn push_line(&mut self, line: String) {
        self.end_line();
        self.lines.push(line);
    }

    fn push_block_lines(&mut self, lines: Vec<String>) {
        self.blank();
        for line in lines {
            self.push_line(line);
        }
        self.blank();
    }

    fn into_lines(mut self) -> Vec<String> {
        self.end_line();
        normalize_lines(self.lines)
    }
}

/// Trim trailing whitespace, collapse blank runs, drop blank edges
fn normalize_lines(lines: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    for line in lines {
        let line = line.trim_end().to_string();
        if line.is_empty() && out.last().map_or(true, |l| l.is_empty()) {
            continue;
        }
        out.push(line);
    }
    while out.last().is_some_and(|l| l.is_empty()) {
        out.pop();
    }
    out
}

/// Render a parsed, namespace-normalized element tree as plain text
pub fn render(root: &Element) -> String {
    let mut sink = Sink::default();
    walk_children(root, &mut sink, 0);
    sink.into_lines().join("\n")
}

fn walk_children(element: &Element, sink: &mut Sink, depth: usize) {
    for child in &element.children {
        walk(child, sink, depth + 1);
    }
}

fn walk(node: &Node, sink: &mut Sink, depth: usize) {
    let element = match node {
        Node::Text(text) => {
            sink.push_text(text);
            return;
        }
        Node::Element(e) => e,
    };

    if depth > MAX_DEPTH {
        sink.push_text(&element.text_content());
        return;
    }

    match kind_of(element) {
        ElementKind::Paragraph | ElementKind::Section => {
            sink.blank();
            walk_children(element, sink, depth);
            sink.blank();
        }
        ElementKind::Heading(level) => {
            let text = fragment_lines(&element.children, depth)
                .into_iter()
                .filter(|l| !l.is_empty())
                .collect::<Vec<_>>()
                .join(" ");
            if text.is_empty() {
                sink.blank();
            } else {
                sink.push_block_lines(vec![format!("{} {}", "#".repeat(level as usize), text)]);
            }
        }
        ElementKind::BulletList => sink.push_block_lines(list_lines(element, false, depth)),
        ElementKind::OrderedList => sink.push_block_lines(list_lines(element, true, depth)),
        ElementKind::TaskList => sink.push_block_lines(task_lines(element, depth)),
        ElementKind::Table => sink.push_block_lines(table_lines(element, depth)),
        ElementKind::Preformatted => {
            sink.push_block_lines(code_lines(element.text_content().trim_matches('\n')))
        }
        ElementKind::BlockQuote => {
            let quoted = fragment_lines(&element.children, depth)
                .into_iter()
                .map(|l| {
                    if l.is_empty() {
                        ">".to_string()
                    } else {
                        format!("> {}", l)
                    }
                })
                .collect();
            sink.push_block_lines(quoted);
        }
        ElementKind::Rule => sink.push_block_lines(vec!["-----".to_string()]),
        ElementKind::LineBreak => sink.end_line(),
        ElementKind::Macro => match macros::resolve(element) {
            MacroRendering::Elided => {}
            MacroRendering::Placeholder { summary, .. } => sink.push_block_lines(vec![summary]),
            MacroRendering::Body(body) => {
                sink.blank();
                walk_children(body, sink, depth);
                sink.blank();
            }
            MacroRendering::Code { text, .. } => sink.push_block_lines(code_lines(&text)),
            MacroRendering::Unsupported { summary, body, .. } => {
                sink.push_block_lines(vec![summary]);
                if let Some(body) = body {
                    walk_children(body, sink, depth);
                    sink.blank();
                }
            }
        },
        ElementKind::PageLink => {
            if let Some(text) = dom::link_text(element) {
                sink.push_text(&text);
            }
        }
        ElementKind::Image => sink.push_text(&dom::image_text(element)),
        ElementKind::Time => match element.attr("datetime") {
            Some(when) => sink.push_text(when),
            None => walk_children(element, sink, depth),
        },
        ElementKind::Hidden => {}
        ElementKind::Inline => walk_children(element, sink, depth),
    }
}

fn fragment_lines(nodes: &[Node], depth: usize) -> Vec<String> {
    let mut sink = Sink::default();
    for node in nodes {
        walk(node, &mut sink, depth + 1);
    }
    sink.into_lines()
}

fn code_lines(text: &str) -> Vec<String> {
    text.lines().map(str::to_string).collect()
}

/// Prefix the first line with the marker and indent the rest
fn push_item(lines: &mut Vec<String>, marker: &str, body: Vec<String>) {
    let mut body = body.into_iter().filter(|l| !l.is_empty());
    match body.next() {
        Some(first) => lines.push(format!("{}{}", marker, first)),
        None => lines.push(marker.trim_end().to_string()),
    }
    for line in body {
        lines.push(format!("{}{}", INDENT, line));
    }
}

fn list_lines(list: &Element, ordered: bool, depth: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut number = 0;

    for child in &list.children {
        match child {
            Node::Element(e) if e.name == "li" => {
                number += 1;
                let marker = if ordered {
                    format!("{}. ", number)
                } else {
                    "- ".to_string()
                };
                push_item(&mut lines, &marker, fragment_lines(&e.children, depth + 1));
            }
            Node::Element(e)
                if matches!(kind_of(e), ElementKind::BulletList | ElementKind::OrderedList) =>
            {
                for line in fragment_lines(std::slice::from_ref(child), depth) {
                    if !line.is_empty() {
                        lines.push(format!("{}{}", INDENT, line));
                    }
                }
            }
            other => {
                let body = fragment_lines(std::slice::from_ref(other), depth);
                if !body.is_empty() {
                    number += 1;
                    let marker = if ordered {
                        format!("{}. ", number)
                    } else {
                        "- ".to_string()
                    };
                    push_item(&mut lines, &marker, body);
                }
            }
        }
    }

    lines
}

fn task_lines(list: &Element, depth: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for task in list.child_elements().filter(|e| e.name == "ac-task") {
        let (done, body) = dom::task_parts(task);
        let marker = if done { "- [x] " } else { "- [ ] " };
        let body = body
            .map(|b| fragment_lines(&b.children, depth + 1))
            .unwrap_or_default();
        push_item(&mut lines, marker, body);
    }
    lines
}

fn table_lines(table: &Element, depth: usize) -> Vec<String> {
    let mut rows: Vec<Vec<String>> = Vec::new();
    collect_rows(table, depth, &mut rows);

    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    let mut widths = vec![0usize; columns];
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    rows.iter()
        .map(|row| {
            row.iter()
                .enumerate()
                .map(|(i, cell)| {
                    let pad = widths[i].saturating_sub(cell.chars().count());
                    format!("{}{}", cell, " ".repeat(pad))
                })
                .collect::<Vec<_>>()
                .join(" | ")
                .trim_end()
                .to_string()
        })
        .collect()
}

fn collect_rows(element: &Element, depth: usize, rows: &mut Vec<Vec<String>>) {
    for child in element.child_elements() {
        match child.name.as_str() {
            "thead" | "tbody" | "tfoot" => collect_rows(child, depth + 1, rows),
            "tr" => {
                let cells: Vec<String> = child
                    .child_elements()
                    .filter(|c| c.name == "td" || c.name == "th")
                    .map(|c| {
                        fragment_lines(&c.children, depth + 1)
                            .into_iter()
                            .filter(|l| !l.is_empty())
                            .collect::<Vec<_>>()
                            .join(" ")
                    })
                    .collect();
                if !cells.is_empty() {
                    rows.push(cells);
                }
            }
            _ => {}
        }
    }
}
