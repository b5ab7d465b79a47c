//! Closed table of embedded-macro handling
//!
//! Every macro name maps to exactly one strategy. Names not in the table
//! become an `[Unsupported content: <name>]` placeholder followed by their
//! rich body, if they have one.

use super::dom::Element;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MacroStrategy {
    /// Decorative; contributes nothing
    Elide,
    /// Fixed summary text
    Placeholder(&'static str),
    /// Diagram produced by an external tool
    Diagram(&'static str),
    /// Embedded attachment, summarized by file name
    Attachment,
    /// Issue tracker reference, summarized by issue key
    Issue,
    /// Status lozenge, summarized by its title
    Status,
    /// Wrapper whose rich body is rendered in place
    RichBody,
    /// Source listing rendered as a code block
    Code,
}

const MACRO_TABLE: &[(&str, MacroStrategy)] = &[
    ("carousel", MacroStrategy::Elide),
    ("gallery", MacroStrategy::Elide),
    ("profile-picture", MacroStrategy::Elide),
    ("user-profile", MacroStrategy::Elide),
    ("navmap", MacroStrategy::Elide),
    ("anchor", MacroStrategy::Elide),
    ("drawio", MacroStrategy::Diagram("drawio")),
    ("gliffy", MacroStrategy::Diagram("gliffy")),
    ("lucidchart", MacroStrategy::Diagram("lucidchart")),
    ("toc", MacroStrategy::Placeholder("[Table of contents]")),
    ("children", MacroStrategy::Placeholder("[Child pages]")),
    ("pagetree", MacroStrategy::Placeholder("[Page tree]")),
    ("view-file", MacroStrategy::Attachment),
    ("viewpdf", MacroStrategy::Attachment),
    ("view-pdf", MacroStrategy::Attachment),
    ("multimedia", MacroStrategy::Attachment),
    ("jira", MacroStrategy::Issue),
    ("status", MacroStrategy::Status),
    ("info", MacroStrategy::RichBody),
    ("note", MacroStrategy::RichBody),
    ("tip", MacroStrategy::RichBody),
    ("warning", MacroStrategy::RichBody),
    ("panel", MacroStrategy::RichBody),
    ("expand", MacroStrategy::RichBody),
    ("section", MacroStrategy::RichBody),
    ("column", MacroStrategy::RichBody),
    ("details", MacroStrategy::RichBody),
    ("excerpt", MacroStrategy::RichBody),
    ("code", MacroStrategy::Code),
    ("noformat", MacroStrategy::Code),
];

/// Look up the strategy for a macro name
pub fn strategy_for(name: &str) -> Option<MacroStrategy> {
    MACRO_TABLE
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, s)| *s)
}

/// How one macro element renders
#[derive(Debug, PartialEq)]
pub enum MacroRendering<'a> {
    Elided,
    Placeholder { name: String, summary: String },
    /// Render these children as if they appeared in place of the macro
    Body(&'a Element),
    Code { language: Option<String>, text: String },
    /// Macro missing from the table; its rich body still renders after the placeholder
    Unsupported {
        name: String,
        summary: String,
        body: Option<&'a Element>,
    },
}

pub fn is_macro(element: &Element) -> bool {
    element.name == "ac-structured-macro" || element.name == "ac-macro"
}

pub fn macro_name(element: &Element) -> String {
    element
        .attr("ac-name")
        .unwrap_or("unknown")
        .trim()
        .to_lowercase()
}

/// Value of a named `ac:parameter` child
pub fn parameter(element: &Element, name: &str) -> Option<String> {
    element
        .child_elements()
        .find(|e| e.name == "ac-parameter" && e.attr("ac-name") == Some(name))
        .map(|e| e.text_content().trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Resolve a macro element against the table
pub fn resolve(element: &Element) -> MacroRendering<'_> {
    let name = macro_name(element);

    let Some(strategy) = strategy_for(&name) else {
        return MacroRendering::Unsupported {
            summary: format!("[Unsupported content: {}]", name),
            name,
            body: element.child("ac-rich-text-body"),
        };
    };

    match strategy {
        MacroStrategy::Elide => MacroRendering::Elided,
        MacroStrategy::Placeholder(summary) => MacroRendering::Placeholder {
            name,
            summary: summary.to_string(),
        },
        MacroStrategy::Diagram(tool) => MacroRendering::Placeholder {
            name,
            summary: format!("[Diagram: {}]", tool),
        },
        MacroStrategy::Attachment => {
            let filename = element
                .find(|e| e.name == "ri-attachment")
                .and_then(|a| a.attr("ri-filename"))
                .map(str::to_string)
                .or_else(|| parameter(element, "name"));
            let summary = match filename {
                Some(f) => format!("[Attachment: {}]", f),
                None => "[Attachment]".to_string(),
            };
            MacroRendering::Placeholder { name, summary }
        }
        MacroStrategy::Issue => {
            let summary = match parameter(element, "key") {
                Some(key) => format!("[Issue: {}]", key),
                None => "[Issue]".to_string(),
            };
            MacroRendering::Placeholder { name, summary }
        }
        MacroStrategy::Status => {
            let summary = match parameter(element, "title") {
                Some(title) => format!("[Status: {}]", title),
                None => "[Status]".to_string(),
            };
            MacroRendering::Placeholder { name, summary }
        }
        MacroStrategy::RichBody => match element.child("ac-rich-text-body") {
            Some(body) => MacroRendering::Body(body),
            None => MacroRendering::Elided,
        },
        MacroStrategy::Code => {
            let text = element
                .child("ac-plain-text-body")
                .or_else(|| element.child("ac-rich-text-body"))
                .map(|b| b.text_content())
                .unwrap_or_default();
            MacroRendering::Code {
                language: parameter(element, "language"),
                text: text.trim_matches('\n').to_string(),
            }
        }
    }
}
