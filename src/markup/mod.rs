//! Markup converter
//!
//! Turns namespaced, macro-laden storage markup into a [`DocumentTree`] and
//! a plain-text rendering. Conversion is total: input the element tree
//! cannot be built from degrades to a single placeholder block and a
//! tag-stripped text, with the parser error kept as a warning.

mod builder;
mod dom;
mod macros;
mod normalize;
mod text;
mod tree;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub use macros::{strategy_for, MacroStrategy};
pub use normalize::normalize_namespaces;
pub use tree::{Block, CellKind, DocumentTree, Inline, ListItem, Mark, TableCell, TableRow};

/// Element nesting beyond this depth is flattened to text
pub(crate) const MAX_DEPTH: usize = 64;

const UNPARSEABLE: &str = "[Unparseable content]";

static ANY_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").expect("tag pattern is valid"));

/// Result of converting one page body
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Conversion {
    pub tree: DocumentTree,
    pub plain_text: String,
    /// Set when the markup could not be parsed and the fallback was used
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl Conversion {
    pub fn is_fallback(&self) -> bool {
        self.warning.is_some()
    }
}

/// Convert raw storage markup
pub fn convert(raw: &str) -> Conversion {
    if raw.trim().is_empty() {
        return Conversion::default();
    }

    let normalized = normalize_namespaces(raw);
    match dom::parse(&normalized) {
        Ok(root) => Conversion {
            tree: builder::build(&root),
            plain_text: text::render(&root),
            warning: None,
        },
        Err(reason) => {
            debug!(%reason, "markup conversion fell back to stripped text");
            fallback(raw, reason)
        }
    }
}

fn fallback(raw: &str, reason: String) -> Conversion {
    let stripped = ANY_TAG.replace_all(raw, " ");
    Conversion {
        tree: DocumentTree {
            blocks: vec![Block::MacroPlaceholder {
                name: "unparseable".to_string(),
                summary: UNPARSEABLE.to_string(),
            }],
        },
        plain_text: stripped.split_whitespace().collect::<Vec<_>>().join(" "),
        warning: Some(reason),
    }
}

/// Fold whitespace runs into single spaces, keeping a leading or trailing one
pub(crate) fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for ch in text.chars() {
        if ch.is_whitespace() {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(ch);
            in_space = false;
        }
    }
    out
}
