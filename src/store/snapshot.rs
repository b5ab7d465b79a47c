use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::models::{Container, Document};

/// Parent chains longer than this are cut off
pub const MAX_ANCESTOR_DEPTH: usize = 64;

/// One page of a container listing
#[derive(Clone, Debug)]
pub struct ContainerPage {
    pub items: Vec<Arc<Document>>,
    /// Documents in the container, independent of paging
    pub total: usize,
}

/// Conversion fallbacks among documents converted so far
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub documents: usize,
    pub fallback_count: usize,
    pub fallback_ids: Vec<String>,
}

/// Immutable, fully indexed set of documents from one load
#[derive(Debug, Default)]
pub struct StoreSnapshot {
    documents: Vec<Arc<Document>>,
    by_id: HashMap<String, usize>,
    by_title: HashMap<(String, String), usize>,
    /// Container key to positions in listing order
    by_container: BTreeMap<String, Vec<usize>>,
    containers: Vec<Container>,
}

impl StoreSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Index a batch of documents
    ///
    /// Duplicate ids keep the first record. A repeated (title, container)
    /// pair keeps the first record for title lookup.
    pub fn build(records: Vec<Document>) -> Self {
        let mut documents = Vec::with_capacity(records.len());
        let mut by_id = HashMap::with_capacity(records.len());
        let mut by_title = HashMap::with_capacity(records.len());

        for doc in records {
            if by_id.contains_key(&doc.id) {
                warn!(doc_id = %doc.id, "duplicate document id in snapshot, keeping first");
                continue;
            }
            let pos = documents.len();
            by_id.insert(doc.id.clone(), pos);
            let title_key = (doc.container_key.clone(), doc.title.clone());
            if by_title.contains_key(&title_key) {
                warn!(
                    doc_id = %doc.id,
                    title = %doc.title,
                    container = %doc.container_key,
                    "duplicate title in container, title lookup keeps first"
                );
            } else {
                by_title.insert(title_key, pos);
            }
            documents.push(Arc::new(doc));
        }

        let mut by_container: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (pos, doc) in documents.iter().enumerate() {
            by_container
                .entry(doc.container_key.clone())
                .or_default()
                .push(pos);
        }
        for positions in by_container.values_mut() {
            positions.sort_by(|&a, &b| {
                let (a, b) = (&documents[a], &documents[b]);
                a.hierarchy_level
                    .cmp(&b.hierarchy_level)
                    .then_with(|| a.title.cmp(&b.title))
                    .then_with(|| a.id.cmp(&b.id))
            });
        }

        let containers = by_container
            .iter()
            .map(|(key, positions)| {
                // name from the first loaded document of the container
                let name = positions
                    .iter()
                    .min()
                    .map(|&p| documents[p].container_name.clone())
                    .unwrap_or_else(|| key.clone());
                Container {
                    key: key.clone(),
                    name,
                    document_count: positions.len(),
                }
            })
            .collect();

        Self {
            documents,
            by_id,
            by_title,
            by_container,
            containers,
        }
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// All documents in load order
    pub fn documents(&self) -> &[Arc<Document>] {
        &self.documents
    }

    pub fn get_by_id(&self, id: &str) -> Option<Arc<Document>> {
        self.by_id.get(id).map(|&p| Arc::clone(&self.documents[p]))
    }

    pub fn get_by_title(&self, title: &str, container_key: &str) -> Option<Arc<Document>> {
        self.by_title
            .get(&(container_key.to_string(), title.to_string()))
            .map(|&p| Arc::clone(&self.documents[p]))
    }

    /// Documents of a container ordered by hierarchy level, title, then id
    pub fn list_in_container(&self, key: &str, offset: usize, limit: usize) -> ContainerPage {
        let Some(positions) = self.by_container.get(key) else {
            return ContainerPage {
                items: Vec::new(),
                total: 0,
            };
        };
        let items = positions
            .iter()
            .skip(offset)
            .take(limit)
            .map(|&p| Arc::clone(&self.documents[p]))
            .collect();
        ContainerPage {
            items,
            total: positions.len(),
        }
    }

    /// Container summaries sorted by key
    pub fn list_containers(&self) -> Vec<Container> {
        self.containers.clone()
    }

    /// Parent chain of a document, nearest parent first
    ///
    /// Stops at a missing parent, a repeated id or [`MAX_ANCESTOR_DEPTH`].
    pub fn ancestors(&self, id: &str) -> Vec<Arc<Document>> {
        let mut chain = Vec::new();
        let Some(start) = self.get_by_id(id) else {
            return chain;
        };

        let mut seen: HashSet<String> = HashSet::new();
        seen.insert(start.id.clone());
        let mut next = start.parent_id.clone();

        while let Some(parent_id) = next {
            if chain.len() >= MAX_ANCESTOR_DEPTH || !seen.insert(parent_id.clone()) {
                break;
            }
            let Some(parent) = self.get_by_id(&parent_id) else {
                break;
            };
            next = parent.parent_id.clone();
            chain.push(parent);
        }

        chain
    }

    /// Case-insensitive substring match on titles, ordered by title then id
    pub fn search_titles(&self, fragment: &str, limit: usize) -> Vec<Arc<Document>> {
        let needle = fragment.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        let mut matches: Vec<&Arc<Document>> = self
            .documents
            .iter()
            .filter(|d| d.title.to_lowercase().contains(&needle))
            .collect();
        matches.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.id.cmp(&b.id)));
        matches.into_iter().take(limit).cloned().collect()
    }

    pub fn diagnostics(&self) -> Diagnostics {
        let fallback_ids: Vec<String> = self
            .documents
            .iter()
            .filter(|d| d.memoized_warning().is_some())
            .map(|d| d.id.clone())
            .collect();
        Diagnostics {
            documents: self.documents.len(),
            fallback_count: fallback_ids.len(),
            fallback_ids,
        }
    }
}
