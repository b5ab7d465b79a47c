use std::collections::HashMap;

use chrono::{DateTime, Utc};
use roaring::RoaringBitmap;

use crate::query::TextField;
use crate::tokenizer::Tokenizer;

/// Dense document number within one snapshot
pub type DocNo = u32;

/// Fields kept per document for filtering and hit rendering
///
/// The body is never stored.
#[derive(Clone, Debug, PartialEq)]
pub struct StoredFields {
    pub id: String,
    pub container_key: String,
    pub title: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Posting {
    pub docno: DocNo,
    pub tf: u32,
}

/// Postings of one tokenized field, each list sorted by docno
#[derive(Debug, Default)]
pub struct FieldPostings {
    terms: HashMap<String, Vec<Posting>>,
}

impl FieldPostings {
    pub(crate) fn push(&mut self, term: String, posting: Posting) {
        self.terms.entry(term).or_default().push(posting);
    }

    pub fn postings(&self, term: &str) -> &[Posting] {
        self.terms.get(term).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn term_count(&self) -> usize {
        self.terms.len()
    }
}

/// Immutable inverted index over one store snapshot
pub struct IndexSnapshot {
    pub(crate) stored: Vec<StoredFields>,
    pub(crate) title: FieldPostings,
    pub(crate) body: FieldPostings,
    pub(crate) containers: HashMap<String, RoaringBitmap>,
    pub(crate) all: RoaringBitmap,
    pub(crate) tokenizer: Tokenizer,
    pub(crate) title_boost: f32,
    pub(crate) body_boost: f32,
    built_at: DateTime<Utc>,
}

impl IndexSnapshot {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        stored: Vec<StoredFields>,
        title: FieldPostings,
        body: FieldPostings,
        containers: HashMap<String, RoaringBitmap>,
        tokenizer: Tokenizer,
        title_boost: f32,
        body_boost: f32,
    ) -> Self {
        let mut all = RoaringBitmap::new();
        if !stored.is_empty() {
            all.insert_range(0..stored.len() as u32);
        }
        Self {
            stored,
            title,
            body,
            containers,
            all,
            tokenizer,
            title_boost,
            body_boost,
            built_at: Utc::now(),
        }
    }

    pub fn len(&self) -> usize {
        self.stored.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stored.is_empty()
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    pub fn stored(&self, docno: DocNo) -> Option<&StoredFields> {
        self.stored.get(docno as usize)
    }

    pub fn field(&self, field: TextField) -> &FieldPostings {
        match field {
            TextField::Title => &self.title,
            TextField::Body => &self.body,
        }
    }

    pub fn boost(&self, field: TextField) -> f32 {
        match field {
            TextField::Title => self.title_boost,
            TextField::Body => self.body_boost,
        }
    }

    /// Documents in a container
    pub fn container_docs(&self, key: &str) -> Option<&RoaringBitmap> {
        self.containers.get(key)
    }
}
