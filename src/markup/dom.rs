//! Lenient element tree for storage-format markup
//!
//! Built from `quick-xml` events with HTML leniency on top: void elements
//! never open a scope, stray or mismatched end tags close the nearest
//! matching open element (or are ignored), unclosed elements are closed at
//! end of input, and the common HTML named entities are resolved.
//! Elements nested deeper than `MAX_DEPTH` are folded into their nearest
//! kept ancestor as text, so no walk over the tree can run unbounded.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::macros;
use super::MAX_DEPTH;

const ROOT: &str = "#root";

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// A node of the element tree
#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
}

/// An element with lowercased name and attribute keys
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Element {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
    }

    /// First direct child element with the given name
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.child_elements().find(|e| e.name == name)
    }

    /// First descendant (depth-first, pre-order) matching the predicate
    pub fn find<F>(&self, pred: F) -> Option<&Element>
    where
        F: Fn(&Element) -> bool + Copy,
    {
        for child in self.child_elements() {
            if pred(child) {
                return Some(child);
            }
            if let Some(found) = child.find(pred) {
                return Some(found);
            }
        }
        None
    }

    /// Concatenated text of all descendants
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                Node::Text(t) => out.push_str(t),
                Node::Element(e) => e.collect_text(out),
            }
        }
    }
}

/// Parse markup into a synthetic root element
pub fn parse(markup: &str) -> Result<Element, String> {
    let mut reader = Reader::from_str(markup);
    {
        let config = reader.config_mut();
        config.check_end_names = false;
        config.allow_unmatched_ends = true;
        config.expand_empty_elements = false;
    }

    let mut stack: Vec<Element> = vec![Element::named(ROOT)];
    // open elements past the depth limit, tracked by count only
    let mut folded = 0usize;

    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) => {
                let element = element_from(&start);
                if element.name.is_empty() {
                    continue;
                }
                if stack.len() > MAX_DEPTH {
                    if !is_void(&element.name) {
                        folded += 1;
                    }
                    append_space(&mut stack);
                } else if is_void(&element.name) {
                    append(&mut stack, Node::Element(element));
                } else {
                    stack.push(element);
                }
            }
            Ok(Event::Empty(start)) => {
                let element = element_from(&start);
                if element.name.is_empty() {
                    continue;
                }
                if stack.len() > MAX_DEPTH {
                    append_space(&mut stack);
                } else {
                    append(&mut stack, Node::Element(element));
                }
            }
            Ok(Event::End(end)) => {
                if folded > 0 {
                    folded -= 1;
                    append_space(&mut stack);
                    continue;
                }
                let name = String::from_utf8_lossy(end.name().as_ref()).to_lowercase();
                close(&mut stack, &name);
            }
            Ok(Event::Text(text)) => {
                let decoded = match text.unescape_with(resolve_entity) {
                    Ok(s) => s.into_owned(),
                    Err(_) => String::from_utf8_lossy(&text).into_owned(),
                };
                append(&mut stack, Node::Text(decoded));
            }
            Ok(Event::CData(cdata)) => {
                let raw = String::from_utf8_lossy(&cdata.into_inner()).into_owned();
                append(&mut stack, Node::Text(raw));
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(format!(
                    "markup parse error at byte {}: {}",
                    reader.buffer_position(),
                    e
                ))
            }
        }
    }

    while stack.len() > 1 {
        if let Some(open) = stack.pop() {
            append(&mut stack, Node::Element(open));
        }
    }
    stack
        .pop()
        .ok_or_else(|| "element stack underflow".to_string())
}

/// Rendering role of an element, shared by the tree builder and text walker
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElementKind {
    Paragraph,
    Heading(u8),
    BulletList,
    OrderedList,
    TaskList,
    Table,
    Preformatted,
    BlockQuote,
    Rule,
    LineBreak,
    /// Block-level wrapper whose children flow as blocks
    Section,
    Macro,
    PageLink,
    Image,
    Time,
    /// Metadata with no visible content
    Hidden,
    /// Anything else: children flow inline
    Inline,
}

pub fn kind_of(element: &Element) -> ElementKind {
    if macros::is_macro(element) {
        return ElementKind::Macro;
    }
    match element.name.as_str() {
        "p" => ElementKind::Paragraph,
        "h1" => ElementKind::Heading(1),
        "h2" => ElementKind::Heading(2),
        "h3" => ElementKind::Heading(3),
        "h4" => ElementKind::Heading(4),
        "h5" => ElementKind::Heading(5),
        "h6" => ElementKind::Heading(6),
        "ul" => ElementKind::BulletList,
        "ol" => ElementKind::OrderedList,
        "ac-task-list" => ElementKind::TaskList,
        "table" => ElementKind::Table,
        "pre" => ElementKind::Preformatted,
        "blockquote" => ElementKind::BlockQuote,
        "hr" => ElementKind::Rule,
        "br" => ElementKind::LineBreak,
        "div" | "section" | "article" | "header" | "footer" | "main" | "nav" | "aside"
        | "body" | "html" | "li" | "dl" | "dd" | "dt" | "figure" | "figcaption" | "tr"
        | "td" | "th" | "ac-layout" | "ac-layout-section" | "ac-layout-cell"
        | "ac-rich-text-body" => ElementKind::Section,
        "ac-link" => ElementKind::PageLink,
        "ac-image" | "img" => ElementKind::Image,
        "time" => ElementKind::Time,
        "head" | "title" | "script" | "style" | "colgroup" | "col" | "ac-parameter"
        | "ac-placeholder" | "ac-emoticon" => ElementKind::Hidden,
        name if name.starts_with("ri-") => ElementKind::Hidden,
        _ => ElementKind::Inline,
    }
}

/// Inline text for a page link: its link body, else the linked resource's name
pub fn link_text(element: &Element) -> Option<String> {
    if let Some(body) = element
        .child("ac-plain-text-link-body")
        .or_else(|| element.child("ac-link-body"))
    {
        let text = body.text_content();
        if !text.trim().is_empty() {
            return Some(text);
        }
    }
    let page = element.child("ri-page").and_then(|p| p.attr("ri-content-title"));
    let attachment = element
        .child("ri-attachment")
        .and_then(|a| a.attr("ri-filename"));
    page.or(attachment).map(str::to_string)
}

/// Placeholder text for an image
pub fn image_text(element: &Element) -> String {
    let source = element
        .find(|e| e.name == "ri-attachment")
        .and_then(|a| a.attr("ri-filename"))
        .or_else(|| {
            element
                .find(|e| e.name == "ri-url")
                .and_then(|u| u.attr("ri-value"))
        })
        .or_else(|| element.attr("alt"))
        .or_else(|| element.attr("ac-alt"))
        .filter(|s| !s.trim().is_empty());
    match source {
        Some(name) => format!("[Image: {}]", name),
        None => "[Image]".to_string(),
    }
}

/// Task status and body of an `ac:task` element
pub fn task_parts(task: &Element) -> (bool, Option<&Element>) {
    let done = task
        .child("ac-task-status")
        .map(|s| s.text_content().trim() == "complete")
        .unwrap_or(false);
    (done, task.child("ac-task-body"))
}

fn element_from(start: &BytesStart<'_>) -> Element {
    let name = String::from_utf8_lossy(start.name().as_ref()).to_lowercase();
    let mut attrs = Vec::new();
    for attr in start.html_attributes().with_checks(false).flatten() {
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_lowercase();
        let value = match attr.unescape_value_with(resolve_entity) {
            Ok(v) => v.into_owned(),
            Err(_) => String::from_utf8_lossy(&attr.value).into_owned(),
        };
        attrs.push((key, value));
    }
    Element {
        name,
        attrs,
        children: Vec::new(),
    }
}

fn is_void(name: &str) -> bool {
    VOID_ELEMENTS.contains(&name)
}

fn append(stack: &mut [Element], node: Node) {
    if let Some(top) = stack.last_mut() {
        top.children.push(node);
    }
}

/// Separate folded content from its neighbours without piling up nodes
fn append_space(stack: &mut [Element]) {
    if let Some(top) = stack.last_mut() {
        match top.children.last_mut() {
            Some(Node::Text(t)) if t.ends_with(' ') => {}
            Some(Node::Text(t)) => t.push(' '),
            _ => top.children.push(Node::Text(" ".to_string())),
        }
    }
}

/// Close the nearest open element named `name`, closing anything opened inside it
fn close(stack: &mut Vec<Element>, name: &str) {
    let Some(pos) = stack.iter().rposition(|e| e.name == name) else {
        return;
    };
    if pos == 0 {
        return;
    }
    while stack.len() > pos {
        if let Some(open) = stack.pop() {
            append(stack, Node::Element(open));
        }
    }
}

fn resolve_entity(name: &str) -> Option<&'static str> {
    let resolved = match name {
        "nbsp" => "\u{a0}",
        "ndash" => "\u{2013}",
        "mdash" => "\u{2014}",
        "hellip" => "\u{2026}",
        "lsquo" => "\u{2018}",
        "rsquo" => "\u{2019}",
        "ldquo" => "\u{201c}",
        "rdquo" => "\u{201d}",
        "laquo" => "\u{ab}",
        "raquo" => "\u{bb}",
        "bull" => "\u{2022}",
        "middot" => "\u{b7}",
        "copy" => "\u{a9}",
        "reg" => "\u{ae}",
        "trade" => "\u{2122}",
        "deg" => "\u{b0}",
        "times" => "\u{d7}",
        "euro" => "\u{20ac}",
        "pound" => "\u{a3}",
        "sect" => "\u{a7}",
        "para" => "\u{b6}",
        "rarr" => "\u{2192}",
        "larr" => "\u{2190}",
        _ => return None,
    };
    Some(resolved)
}
