//! In-memory document store
//!
//! A load builds a complete [`StoreSnapshot`] off to the side and then
//! publishes it with a single atomic pointer swap, so readers see either
//! the old store or the new one and never a partial load.

mod snapshot;

pub use snapshot::{ContainerPage, Diagnostics, StoreSnapshot, MAX_ANCESTOR_DEPTH};

use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::info;

use crate::models::{Container, Document};

pub struct DocumentStore {
    current: ArcSwap<StoreSnapshot>,
}

impl Default for DocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentStore {
    pub fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(StoreSnapshot::empty()),
        }
    }

    /// Replace all state with the given documents
    pub fn load(&self, documents: Vec<Document>) -> Arc<StoreSnapshot> {
        let received = documents.len();
        let snapshot = Arc::new(StoreSnapshot::build(documents));
        self.current.store(Arc::clone(&snapshot));
        info!(
            received,
            loaded = snapshot.len(),
            containers = snapshot.list_containers().len(),
            "document store loaded"
        );
        snapshot
    }

    /// The currently published snapshot
    pub fn snapshot(&self) -> Arc<StoreSnapshot> {
        self.current.load_full()
    }

    pub fn len(&self) -> usize {
        self.current.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.load().is_empty()
    }

    pub fn get_by_id(&self, id: &str) -> Option<Arc<Document>> {
        self.current.load().get_by_id(id)
    }

    pub fn get_by_title(&self, title: &str, container_key: &str) -> Option<Arc<Document>> {
        self.current.load().get_by_title(title, container_key)
    }

    pub fn list_in_container(&self, key: &str, offset: usize, limit: usize) -> ContainerPage {
        self.current.load().list_in_container(key, offset, limit)
    }

    pub fn list_containers(&self) -> Vec<Container> {
        self.current.load().list_containers()
    }

    pub fn ancestors(&self, id: &str) -> Vec<Arc<Document>> {
        self.current.load().ancestors(id)
    }

    pub fn search_titles(&self, fragment: &str, limit: usize) -> Vec<Arc<Document>> {
        self.current.load().search_titles(fragment, limit)
    }

    pub fn diagnostics(&self) -> Diagnostics {
        self.current.load().diagnostics()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str, title: &str, container: &str, level: u32) -> Document {
        Document::new(id, title, container, format!("<p>{}</p>", title)).with_hierarchy_level(level)
    }

    fn sample() -> Vec<Document> {
        vec![
            doc("3", "Runbook", "OPS", 1).with_parent(Some("1".to_string())),
            doc("1", "Home", "OPS", 0).with_container_name("Operations"),
            doc("2", "Alerts", "OPS", 1).with_parent(Some("1".to_string())),
            doc("4", "Design", "ENG", 0),
            doc("5", "Alerts", "OPS", 1),
        ]
    }

    #[test]
    fn test_lookup_by_id_and_title() {
        let store = DocumentStore::new();
        store.load(sample());

        assert_eq!(store.get_by_id("4").unwrap().title, "Design");
        assert!(store.get_by_id("missing").is_none());
        // first of the duplicate titles wins
        assert_eq!(store.get_by_title("Alerts", "OPS").unwrap().id, "2");
        assert!(store.get_by_title("Alerts", "ENG").is_none());
    }

    #[test]
    fn test_duplicate_ids_keep_first() {
        let store = DocumentStore::new();
        store.load(vec![doc("1", "First", "A", 0), doc("1", "Second", "A", 0)]);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get_by_id("1").unwrap().title, "First");
    }

    #[test]
    fn test_listing_order_and_paging() {
        let store = DocumentStore::new();
        store.load(sample());

        let all = store.list_in_container("OPS", 0, 10);
        assert_eq!(all.total, 4);
        let ids: Vec<&str> = all.items.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "5", "3"]);

        let page = store.list_in_container("OPS", 1, 2);
        assert_eq!(page.total, 4);
        let ids: Vec<&str> = page.items.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "5"]);

        let past_end = store.list_in_container("OPS", 10, 5);
        assert!(past_end.items.is_empty());
        assert_eq!(past_end.total, 4);

        assert_eq!(store.list_in_container("NOPE", 0, 5).total, 0);
    }

    #[test]
    fn test_containers_sorted_with_counts() {
        let store = DocumentStore::new();
        store.load(sample());
        let containers = store.list_containers();
        assert_eq!(
            containers,
            vec![
                Container {
                    key: "ENG".to_string(),
                    name: "ENG".to_string(),
                    document_count: 1
                },
                Container {
                    key: "OPS".to_string(),
                    name: "OPS".to_string(),
                    document_count: 4
                },
            ]
        );
    }

    #[test]
    fn test_ancestors_stop_on_cycle() {
        let store = DocumentStore::new();
        store.load(vec![
            doc("a", "A", "X", 0).with_parent(Some("c".to_string())),
            doc("b", "B", "X", 1).with_parent(Some("a".to_string())),
            doc("c", "C", "X", 2).with_parent(Some("b".to_string())),
        ]);
        let chain: Vec<String> = store.ancestors("c").iter().map(|d| d.id.clone()).collect();
        assert_eq!(chain, vec!["b", "a"]);
        assert!(store.ancestors("missing").is_empty());
    }

    #[test]
    fn test_ancestors_bounded() {
        let docs: Vec<Document> = (0..200)
            .map(|i| {
                let parent = if i == 0 { None } else { Some((i - 1).to_string()) };
                doc(&i.to_string(), &format!("P{}", i), "X", i).with_parent(parent)
            })
            .collect();
        let store = DocumentStore::new();
        store.load(docs);
        assert_eq!(store.ancestors("199").len(), MAX_ANCESTOR_DEPTH);
    }

    #[test]
    fn test_search_titles() {
        let store = DocumentStore::new();
        store.load(sample());
        let ids: Vec<String> = store
            .search_titles("ALER", 10)
            .iter()
            .map(|d| d.id.clone())
            .collect();
        assert_eq!(ids, vec!["2", "5"]);
        assert!(store.search_titles("  ", 10).is_empty());
    }

    #[test]
    fn test_load_replaces_and_old_snapshot_survives() {
        let store = DocumentStore::new();
        store.load(sample());
        let before = store.snapshot();
        store.load(vec![doc("9", "Fresh", "NEW", 0)]);

        assert_eq!(before.len(), 5);
        assert!(before.get_by_id("1").is_some());
        assert!(store.get_by_id("1").is_none());
        assert_eq!(store.get_by_id("9").unwrap().title, "Fresh");
    }

    #[test]
    fn test_diagnostics_count_memoized_fallbacks() {
        let store = DocumentStore::new();
        store.load(vec![
            Document::new("ok", "Ok", "X", "<p>fine</p>"),
            Document::new("bad", "Bad", "X", "<p>x</p><!-- open"),
        ]);
        assert_eq!(store.diagnostics().fallback_count, 0);

        for d in store.snapshot().documents() {
            let _ = d.plain_text();
        }
        let diagnostics = store.diagnostics();
        assert_eq!(diagnostics.documents, 2);
        assert_eq!(diagnostics.fallback_ids, vec!["bad".to_string()]);
    }
}
