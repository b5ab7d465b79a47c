//! Namespace normalization for storage-format markup
//!
//! Element and attribute names of the form `prefix:name` are rewritten to
//! `prefix-name` so the element tree treats them as ordinary elements and
//! keeps descending into their children. Comments and CDATA sections are
//! passed through untouched, as is everything outside of tags.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static MARKUP_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?s)<!\[CDATA\[.*?\]\]>|<!--.*?-->|</?[A-Za-z](?:[^>"']|"[^"]*"|'[^']*')*>"#,
    )
    .expect("tag pattern is valid")
});

/// Rewrite every namespaced element and attribute name to its hyphenated form
pub fn normalize_namespaces(markup: &str) -> String {
    MARKUP_TAG
        .replace_all(markup, |caps: &Captures| {
            let tag = &caps[0];
            if tag.starts_with("<!") {
                tag.to_string()
            } else {
                rewrite_tag(tag)
            }
        })
        .into_owned()
}

/// Replace name-internal colons in a single tag, leaving quoted values alone
fn rewrite_tag(tag: &str) -> String {
    let chars: Vec<char> = tag.chars().collect();
    let mut out = String::with_capacity(tag.len());
    let mut quote: Option<char> = None;

    for (i, &ch) in chars.iter().enumerate() {
        match quote {
            Some(q) => {
                if ch == q {
                    quote = None;
                }
                out.push(ch);
            }
            None => {
                if ch == '"' || ch == '\'' {
                    quote = Some(ch);
                    out.push(ch);
                } else if ch == ':' && is_name_colon(&chars, i) {
                    out.push('-');
                } else {
                    out.push(ch);
                }
            }
        }
    }

    out
}

fn is_name_colon(chars: &[char], i: usize) -> bool {
    let before = i.checked_sub(1).map(|j| chars[j]);
    let after = chars.get(i + 1).copied();
    matches!(before, Some(c) if c.is_alphanumeric() || c == '_' || c == '-' || c == '.')
        && matches!(after, Some(c) if c.is_alphabetic() || c == '_')
}
