use chrono::{DateTime, Utc};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::markup::{self, Conversion, DocumentTree};

/// Opaque document identifier
pub type DocumentId = String;

/// One captured page
///
/// Everything but the derived conversion is fixed at load time. The
/// conversion of `raw_body` is computed on first access and memoized;
/// concurrent first accesses are safe and observe the same value.
#[derive(Clone, Debug)]
pub struct Document {
    pub id: DocumentId,
    pub title: String,
    pub container_key: String,
    pub container_name: String,
    pub updated_at: DateTime<Utc>,
    pub parent_id: Option<DocumentId>,
    pub hierarchy_level: u32,
    pub raw_body: String,
    conversion: OnceCell<Conversion>,
}

impl Document {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        container_key: impl Into<String>,
        raw_body: impl Into<String>,
    ) -> Self {
        let container_key = container_key.into();
        Self {
            id: id.into(),
            title: title.into(),
            container_name: container_key.clone(),
            container_key,
            updated_at: DateTime::<Utc>::default(),
            parent_id: None,
            hierarchy_level: 0,
            raw_body: raw_body.into(),
            conversion: OnceCell::new(),
        }
    }

    pub fn with_container_name(mut self, name: impl Into<String>) -> Self {
        self.container_name = name.into();
        self
    }

    pub fn with_updated_at(mut self, updated_at: DateTime<Utc>) -> Self {
        self.updated_at = updated_at;
        self
    }

    pub fn with_parent(mut self, parent_id: Option<String>) -> Self {
        self.parent_id = parent_id;
        self
    }

    pub fn with_hierarchy_level(mut self, level: u32) -> Self {
        self.hierarchy_level = level;
        self
    }

    /// Converted body, computed once
    pub fn conversion(&self) -> &Conversion {
        self.conversion.get_or_init(|| {
            let conversion = markup::convert(&self.raw_body);
            if let Some(reason) = &conversion.warning {
                warn!(doc_id = %self.id, %reason, "markup conversion fell back");
            }
            conversion
        })
    }

    pub fn plain_text(&self) -> &str {
        &self.conversion().plain_text
    }

    pub fn document_tree(&self) -> &DocumentTree {
        &self.conversion().tree
    }

    /// Fallback warning of an already memoized conversion
    ///
    /// Returns `None` when the body has not been converted yet.
    pub fn memoized_warning(&self) -> Option<&str> {
        self.conversion.get().and_then(|c| c.warning.as_deref())
    }

    pub fn summary(&self) -> PageSummary {
        PageSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            container_key: self.container_key.clone(),
            parent_id: self.parent_id.clone(),
            hierarchy_level: self.hierarchy_level,
            updated_at: self.updated_at,
        }
    }

    pub fn view(&self) -> DocumentView {
        let conversion = self.conversion();
        DocumentView {
            id: self.id.clone(),
            title: self.title.clone(),
            container_key: self.container_key.clone(),
            container_name: self.container_name.clone(),
            updated_at: self.updated_at,
            parent_id: self.parent_id.clone(),
            hierarchy_level: self.hierarchy_level,
            plain_text: conversion.plain_text.clone(),
            document_tree: conversion.tree.clone(),
        }
    }
}

/// Listing entry for a page, without its body
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PageSummary {
    pub id: DocumentId,
    pub title: String,
    pub container_key: String,
    pub parent_id: Option<DocumentId>,
    pub hierarchy_level: u32,
    pub updated_at: DateTime<Utc>,
}

/// A page with its derived renderings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DocumentView {
    pub id: DocumentId,
    pub title: String,
    pub container_key: String,
    pub container_name: String,
    pub updated_at: DateTime<Utc>,
    pub parent_id: Option<DocumentId>,
    pub hierarchy_level: u32,
    pub plain_text: String,
    pub document_tree: DocumentTree,
}

/// Derived renderings of one page
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Hydrated {
    pub document_tree: DocumentTree,
    pub plain_text: String,
}

/// Summary of one container
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    pub key: String,
    pub name: String,
    pub document_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_document_defaults() {
        let doc = Document::new("1", "Home", "OPS", "<p>hi</p>");
        assert_eq!(doc.container_name, "OPS");
        assert_eq!(doc.hierarchy_level, 0);
        assert!(doc.parent_id.is_none());
        assert_eq!(doc.updated_at.timestamp(), 0);
    }

    #[test]
    fn test_conversion_is_memoized() {
        let doc = Document::new("1", "Home", "OPS", "<p>hello <b>world</b></p>");
        assert!(doc.memoized_warning().is_none());
        let first = doc.plain_text() as *const str;
        let second = doc.plain_text() as *const str;
        assert_eq!(first, second);
        assert_eq!(doc.plain_text(), "hello world");
    }

    #[test]
    fn test_concurrent_first_access() {
        let doc = Arc::new(Document::new("1", "Home", "OPS", "<h1>Title</h1><p>body</p>"));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let doc = Arc::clone(&doc);
                thread::spawn(move || doc.plain_text().to_string())
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), "# Title\n\nbody");
        }
    }

    #[test]
    fn test_fallback_warning_after_conversion() {
        let doc = Document::new("1", "Broken", "OPS", "<p>x</p><!-- open");
        assert!(doc.memoized_warning().is_none());
        let _ = doc.document_tree();
        assert!(doc.memoized_warning().is_some());
    }

    #[test]
    fn test_view_carries_renderings() {
        let doc = Document::new("7", "Page", "ENG", "<p>text</p>")
            .with_container_name("Engineering")
            .with_parent(Some("3".to_string()))
            .with_hierarchy_level(2);
        let view = doc.view();
        assert_eq!(view.container_name, "Engineering");
        assert_eq!(view.parent_id.as_deref(), Some("3"));
        assert_eq!(view.plain_text, "text");
        assert_eq!(view.document_tree.blocks.len(), 1);
    }
}
