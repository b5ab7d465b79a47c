use std::collections::BTreeSet;

use super::collapse_whitespace;
use super::dom::{self, kind_of, Element, ElementKind, Node};
use super::macros::{self, MacroRendering};
use super::tree::{Block, CellKind, DocumentTree, Inline, ListItem, Mark, TableCell, TableRow};
use super::MAX_DEPTH;

type MarkSet = BTreeSet<Mark>;

/// What a run of pending inline content becomes once flushed
#[derive(Clone, Copy)]
enum Wrap {
    Paragraph,
    Heading(u8),
}

/// Accumulates blocks, plus inline runs waiting for their enclosing block
struct Flow {
    blocks: Vec<Block>,
    pending: Vec<Inline>,
    wrap: Wrap,
}

impl Flow {
    fn new() -> Self {
        Self {
            blocks: Vec::new(),
            pending: Vec::new(),
            wrap: Wrap::Paragraph,
        }
    }

    fn push_text(&mut self, text: &str, marks: &MarkSet) {
        let collapsed = collapse_whitespace(text);
        let at_boundary = match self.pending.last() {
            None => true,
            Some(last) => last.text.ends_with(' ') || last.text.ends_with('\n'),
        };
        let text = if at_boundary {
            collapsed.trim_start()
        } else {
            collapsed.as_str()
        };
        if !text.is_empty() {
            self.push_run(text, marks);
        }
    }

    fn push_break(&mut self, marks: &MarkSet) {
        if let Some(last) = self.pending.last_mut() {
            let keep = last.text.trim_end_matches(' ').len();
            last.text.truncate(keep);
        }
        self.push_run("\n", marks);
    }

    fn push_run(&mut self, text: &str, marks: &MarkSet) {
        if let Some(last) = self.pending.last_mut() {
            if &last.marks == marks {
                last.text.push_str(text);
                return;
            }
        }
        self.pending.push(Inline {
            text: text.to_string(),
            marks: marks.clone(),
        });
    }

    fn push_block(&mut self, block: Block) {
        self.flush();
        self.blocks.push(block);
    }

    /// Turn pending runs into a block, dropping them if they are blank
    fn flush(&mut self) {
        let mut runs = std::mem::take(&mut self.pending);

        while let Some(first) = runs.first_mut() {
            let trimmed = first.text.trim_start();
            if trimmed.is_empty() {
                runs.remove(0);
            } else {
                first.text = trimmed.to_string();
                break;
            }
        }
        while let Some(last) = runs.last_mut() {
            let trimmed = last.text.trim_end();
            if trimmed.is_empty() {
                runs.pop();
            } else {
                last.text = trimmed.to_string();
                break;
            }
        }
        if runs.is_empty() {
            return;
        }

        let content = merge_runs(runs);
        self.blocks.push(match self.wrap {
            Wrap::Paragraph => Block::Paragraph { content },
            Wrap::Heading(level) => Block::Heading { level, content },
        });
    }

    fn into_blocks(mut self) -> Vec<Block> {
        self.flush();
        self.blocks
    }
}

fn merge_runs(runs: Vec<Inline>) -> Vec<Inline> {
    let mut merged: Vec<Inline> = Vec::with_capacity(runs.len());
    for run in runs {
        match merged.last_mut() {
            Some(last) if last.marks == run.marks => last.text.push_str(&run.text),
            _ => merged.push(run),
        }
    }
    merged
}

/// Build the document tree for a parsed, namespace-normalized element tree
pub fn build(root: &Element) -> DocumentTree {
    let mut flow = Flow::new();
    walk_children(root, &MarkSet::new(), &mut flow, 0);
    DocumentTree {
        blocks: flow.into_blocks(),
    }
}

fn walk_children(element: &Element, marks: &MarkSet, flow: &mut Flow, depth: usize) {
    for child in &element.children {
        walk(child, marks, flow, depth + 1);
    }
}

fn walk(node: &Node, marks: &MarkSet, flow: &mut Flow, depth: usize) {
    let element = match node {
        Node::Text(text) => {
            flow.push_text(text, marks);
            return;
        }
        Node::Element(e) => e,
    };

    if depth > MAX_DEPTH {
        flow.push_text(&element.text_content(), marks);
        return;
    }

    match kind_of(element) {
        ElementKind::Paragraph => with_wrap(flow, Wrap::Paragraph, |flow| {
            walk_children(element, marks, flow, depth)
        }),
        ElementKind::Heading(level) => with_wrap(flow, Wrap::Heading(level), |flow| {
            walk_children(element, marks, flow, depth)
        }),
        ElementKind::BulletList => flow.push_block(Block::BulletList {
            items: list_items(element, marks, depth),
        }),
        ElementKind::OrderedList => flow.push_block(Block::OrderedList {
            items: list_items(element, marks, depth),
        }),
        ElementKind::TaskList => flow.push_block(Block::BulletList {
            items: task_items(element, marks, depth),
        }),
        ElementKind::Table => {
            let rows = table_rows(element, marks, depth);
            if !rows.is_empty() {
                flow.push_block(Block::Table { rows });
            }
        }
        ElementKind::Preformatted => flow.push_block(Block::CodeBlock {
            language: None,
            text: element.text_content().trim_matches('\n').to_string(),
        }),
        ElementKind::BlockQuote => flow.push_block(Block::BlockQuote {
            children: fragment_blocks(&element.children, marks, depth),
        }),
        ElementKind::Rule => flow.push_block(Block::HorizontalRule),
        ElementKind::LineBreak => flow.push_break(marks),
        ElementKind::Section => {
            flow.flush();
            walk_children(element, marks, flow, depth);
            flow.flush();
        }
        ElementKind::Macro => match macros::resolve(element) {
            MacroRendering::Elided => {}
            MacroRendering::Placeholder { name, summary } => {
                flow.push_block(Block::MacroPlaceholder { name, summary })
            }
            MacroRendering::Body(body) => {
                flow.flush();
                walk_children(body, marks, flow, depth);
                flow.flush();
            }
            MacroRendering::Code { language, text } => {
                flow.push_block(Block::CodeBlock { language, text })
            }
            MacroRendering::Unsupported {
                name,
                summary,
                body,
            } => {
                flow.push_block(Block::MacroPlaceholder { name, summary });
                if let Some(body) = body {
                    walk_children(body, marks, flow, depth);
                    flow.flush();
                }
            }
        },
        ElementKind::PageLink => {
            if let Some(text) = dom::link_text(element) {
                flow.push_text(&text, marks);
            }
        }
        ElementKind::Image => flow.push_text(&dom::image_text(element), marks),
        ElementKind::Time => match element.attr("datetime") {
            Some(when) => flow.push_text(when, marks),
            None => walk_children(element, marks, flow, depth),
        },
        ElementKind::Hidden => {}
        ElementKind::Inline => match element_mark(element) {
            Some(mark) => {
                let mut inner = marks.clone();
                inner.insert(mark);
                walk_children(element, &inner, flow, depth);
            }
            None => walk_children(element, marks, flow, depth),
        },
    }
}

fn with_wrap(flow: &mut Flow, wrap: Wrap, f: impl FnOnce(&mut Flow)) {
    flow.flush();
    let saved = std::mem::replace(&mut flow.wrap, wrap);
    f(flow);
    flow.flush();
    flow.wrap = saved;
}

/// Blocks for a run of sibling nodes in their own container
fn fragment_blocks(nodes: &[Node], marks: &MarkSet, depth: usize) -> Vec<Block> {
    let mut flow = Flow::new();
    for node in nodes {
        walk(node, marks, &mut flow, depth + 1);
    }
    flow.into_blocks()
}

fn list_items(list: &Element, marks: &MarkSet, depth: usize) -> Vec<ListItem> {
    let mut items: Vec<ListItem> = Vec::new();

    for child in &list.children {
        match child {
            Node::Element(e) if e.name == "li" => items.push(ListItem {
                children: fragment_blocks(&e.children, marks, depth + 1),
            }),
            Node::Element(e)
                if matches!(kind_of(e), ElementKind::BulletList | ElementKind::OrderedList) =>
            {
                // a list nested directly in a list belongs to the previous item
                let blocks = fragment_blocks(std::slice::from_ref(child), marks, depth);
                match items.last_mut() {
                    Some(last) => last.children.extend(blocks),
                    None => items.push(ListItem { children: blocks }),
                }
            }
            other => {
                let blocks = fragment_blocks(std::slice::from_ref(other), marks, depth);
                if !blocks.is_empty() {
                    items.push(ListItem { children: blocks });
                }
            }
        }
    }

    items
}

fn task_items(list: &Element, marks: &MarkSet, depth: usize) -> Vec<ListItem> {
    list.child_elements()
        .filter(|e| e.name == "ac-task")
        .map(|task| {
            let (done, body) = dom::task_parts(task);
            let mut flow = Flow::new();
            flow.push_text(if done { "[x] " } else { "[ ] " }, marks);
            if let Some(body) = body {
                walk_children(body, marks, &mut flow, depth + 1);
            }
            ListItem {
                children: flow.into_blocks(),
            }
        })
        .collect()
}

fn table_rows(table: &Element, marks: &MarkSet, depth: usize) -> Vec<TableRow> {
    let mut rows = Vec::new();
    collect_rows(table, marks, depth, &mut rows);
    rows
}

fn collect_rows(element: &Element, marks: &MarkSet, depth: usize, rows: &mut Vec<TableRow>) {
    for child in element.child_elements() {
        match child.name.as_str() {
            "thead" | "tbody" | "tfoot" => collect_rows(child, marks, depth + 1, rows),
            "tr" => {
                let cells: Vec<TableCell> = child
                    .child_elements()
                    .filter(|c| c.name == "td" || c.name == "th")
                    .map(|c| TableCell {
                        kind: if c.name == "th" {
                            CellKind::Header
                        } else {
                            CellKind::Data
                        },
                        children: fragment_blocks(&c.children, marks, depth + 1),
                    })
                    .collect();
                if !cells.is_empty() {
                    rows.push(TableRow { cells });
                }
            }
            _ => {}
        }
    }
}

fn element_mark(element: &Element) -> Option<Mark> {
    match element.name.as_str() {
        "strong" | "b" => Some(Mark::Bold),
        "em" | "i" => Some(Mark::Italic),
        "u" | "ins" => Some(Mark::Underline),
        "s" | "strike" | "del" => Some(Mark::Strikethrough),
        "code" | "kbd" | "tt" | "samp" => Some(Mark::Code),
        "a" => element
            .attr("href")
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .map(|href| Mark::Link {
                href: href.to_string(),
            }),
        "span" => element.attr("style").and_then(style_mark),
        _ => None,
    }
}

fn style_mark(style: &str) -> Option<Mark> {
    let style: String = style
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase();
    if style.contains("line-through") {
        Some(Mark::Strikethrough)
    } else if style.contains("underline") {
        Some(Mark::Underline)
    } else if style.contains("font-weight:bold") || style.contains("font-weight:700") {
        Some(Mark::Bold)
    } else if style.contains("font-style:italic") {
        Some(Mark::Italic)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::dom::parse;
    use crate::markup::normalize::normalize_namespaces;

    fn tree(markup: &str) -> DocumentTree {
        build(&parse(&normalize_namespaces(markup)).unwrap())
    }

    fn marks(list: &[Mark]) -> MarkSet {
        list.iter().cloned().collect()
    }

    #[test]
    fn test_paragraph_and_heading() {
        let t = tree("<h2>Intro</h2><p>Some   text\n here</p>");
        assert_eq!(
            t.blocks,
            vec![
                Block::Heading {
                    level: 2,
                    content: vec![Inline::plain("Intro")]
                },
                Block::Paragraph {
                    content: vec![Inline::plain("Some text here")]
                },
            ]
        );
    }

    #[test]
    fn test_marks_compose() {
        let t = tree(r#"<p>a <a href="/x"><strong>b</strong></a> c</p>"#);
        let Block::Paragraph { content } = &t.blocks[0] else {
            panic!("expected paragraph");
        };
        assert_eq!(content.len(), 3);
        assert_eq!(content[0], Inline::plain("a "));
        assert_eq!(
            content[1].marks,
            marks(&[
                Mark::Bold,
                Mark::Link {
                    href: "/x".to_string()
                }
            ])
        );
        assert_eq!(content[1].text, "b");
        assert_eq!(content[2], Inline::plain(" c"));
    }

    #[test]
    fn test_adjacent_equal_marks_merge() {
        let t = tree("<p><b>one</b><strong> two</strong></p>");
        let Block::Paragraph { content } = &t.blocks[0] else {
            panic!("expected paragraph");
        };
        assert_eq!(content.len(), 1);
        assert_eq!(content[0].text, "one two");
    }

    #[test]
    fn test_line_break_in_run() {
        let t = tree("<p>one <br/> two</p>");
        assert_eq!(
            t.blocks,
            vec![Block::Paragraph {
                content: vec![Inline::plain("one\ntwo")]
            }]
        );
    }

    #[test]
    fn test_nested_lists() {
        let t = tree("<ul><li>a<ul><li>b</li></ul></li><li>c</li></ul>");
        let Block::BulletList { items } = &t.blocks[0] else {
            panic!("expected list");
        };
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].children.len(), 2);
        assert!(matches!(items[0].children[1], Block::BulletList { .. }));
    }

    #[test]
    fn test_table_header_only_when_marked() {
        let t = tree("<table><tr><td>h1</td><td>h2</td></tr><tr><td>1</td><td>2</td></tr></table>");
        let Block::Table { rows } = &t.blocks[0] else {
            panic!("expected table");
        };
        assert_eq!(rows.len(), 2);
        assert!(rows
            .iter()
            .flat_map(|r| r.cells.iter())
            .all(|c| c.kind == CellKind::Data));

        let t = tree("<table><tbody><tr><th>Name</th></tr><tr><td>x</td></tr></tbody></table>");
        let Block::Table { rows } = &t.blocks[0] else {
            panic!("expected table");
        };
        assert_eq!(rows[0].cells[0].kind, CellKind::Header);
        assert_eq!(rows[1].cells[0].kind, CellKind::Data);
    }

    #[test]
    fn test_block_inside_paragraph_splits_it() {
        let t = tree(r#"<p>before<ac:structured-macro ac:name="toc"/>after</p>"#);
        assert_eq!(
            t.blocks,
            vec![
                Block::Paragraph {
                    content: vec![Inline::plain("before")]
                },
                Block::MacroPlaceholder {
                    name: "toc".to_string(),
                    summary: "[Table of contents]".to_string()
                },
                Block::Paragraph {
                    content: vec![Inline::plain("after")]
                },
            ]
        );
    }

    #[test]
    fn test_rich_body_macro_renders_in_place() {
        let t = tree(
            r#"<ac:structured-macro ac:name="tip"><ac:rich-text-body><p>Hello</p></ac:rich-text-body></ac:structured-macro>"#,
        );
        assert_eq!(
            t.blocks,
            vec![Block::Paragraph {
                content: vec![Inline::plain("Hello")]
            }]
        );
    }

    #[test]
    fn test_code_macro_and_pre() {
        let t = tree(
            r#"<ac:structured-macro ac:name="code"><ac:parameter ac:name="language">sql</ac:parameter><ac:plain-text-body><![CDATA[select 1;]]></ac:plain-text-body></ac:structured-macro><pre>raw  text</pre>"#,
        );
        assert_eq!(
            t.blocks,
            vec![
                Block::CodeBlock {
                    language: Some("sql".to_string()),
                    text: "select 1;".to_string()
                },
                Block::CodeBlock {
                    language: None,
                    text: "raw  text".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_task_list() {
        let t = tree(
            "<ac:task-list><ac:task><ac:task-status>complete</ac:task-status><ac:task-body>ship it</ac:task-body></ac:task></ac:task-list>",
        );
        let Block::BulletList { items } = &t.blocks[0] else {
            panic!("expected list");
        };
        assert_eq!(
            items[0].children,
            vec![Block::Paragraph {
                content: vec![Inline::plain("[x] ship it")]
            }]
        );
    }

    #[test]
    fn test_loose_text_wrapped_in_paragraph() {
        let t = tree("loose <blockquote>quoted</blockquote><hr>");
        assert_eq!(
            t.blocks,
            vec![
                Block::Paragraph {
                    content: vec![Inline::plain("loose")]
                },
                Block::BlockQuote {
                    children: vec![Block::Paragraph {
                        content: vec![Inline::plain("quoted")]
                    }]
                },
                Block::HorizontalRule,
            ]
        );
    }

    #[test]
    fn test_unknown_macro_body_follows_placeholder() {
        let t = tree(
            r#"<ac:structured-macro ac:name="custom-callout"><ac:rich-text-body><p>Important rollback step</p></ac:rich-text-body></ac:structured-macro>"#,
        );
        assert_eq!(
            t.blocks,
            vec![
                Block::MacroPlaceholder {
                    name: "custom-callout".to_string(),
                    summary: "[Unsupported content: custom-callout]".to_string()
                },
                Block::Paragraph {
                    content: vec![Inline::plain("Important rollback step")]
                },
            ]
        );
    }

    #[test]
    fn test_deep_nesting_flattens_to_text() {
        for depth in [MAX_DEPTH + 10, 100_000] {
            let markup = format!("{}deep{}", "<div>".repeat(depth), "</div>".repeat(depth));
            let t = tree(&markup);
            assert_eq!(
                t.blocks,
                vec![Block::Paragraph {
                    content: vec![Inline::plain("deep")]
                }]
            );
        }
    }
}
