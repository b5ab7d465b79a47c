//! Full-text index
//!
//! Snapshots are immutable once built. [`TextIndex`] publishes them with an
//! atomic swap; a query holds its own `Arc` to the snapshot it started on,
//! so a concurrent swap never changes its results.

mod builder;
mod executor;
mod snapshot;

pub use builder::{build, build_with_progress};
pub use executor::{execute, RankedPage};
pub use snapshot::{DocNo, FieldPostings, IndexSnapshot, Posting, StoredFields};

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use tracing::info;

use crate::error::PagedexError;
use crate::Result;

/// Holder of the published index snapshot
pub struct TextIndex {
    current: ArcSwapOption<IndexSnapshot>,
}

impl Default for TextIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl TextIndex {
    pub fn new() -> Self {
        Self {
            current: ArcSwapOption::empty(),
        }
    }

    /// Publish a snapshot, returning the one it replaces
    pub fn swap(&self, snapshot: Arc<IndexSnapshot>) -> Option<Arc<IndexSnapshot>> {
        let documents = snapshot.len();
        let previous = self.current.swap(Some(snapshot));
        info!(
            documents,
            replaced = previous.is_some(),
            "index snapshot published"
        );
        previous
    }

    /// The active snapshot, or `IndexUnavailable` before the first build
    pub fn current(&self) -> Result<Arc<IndexSnapshot>> {
        self.current.load_full().ok_or(PagedexError::IndexUnavailable)
    }

    pub fn is_ready(&self) -> bool {
        self.current.load().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IndexSettings;
    use crate::models::Document;
    use crate::query::QueryPlan;
    use std::sync::atomic::AtomicBool;

    fn snapshot_of(ids: &[&str]) -> Arc<IndexSnapshot> {
        let docs: Vec<Arc<Document>> = ids
            .iter()
            .map(|id| Arc::new(Document::new(*id, *id, "X", "<p>body</p>")))
            .collect();
        Arc::new(build(&docs, &IndexSettings::default(), &AtomicBool::new(false)).unwrap())
    }

    #[test]
    fn test_unavailable_before_first_swap() {
        let index = TextIndex::new();
        assert!(!index.is_ready());
        assert!(index.current().err().unwrap().is_empty_corpus());
    }

    #[test]
    fn test_swap_keeps_in_flight_snapshot() {
        let index = TextIndex::new();
        assert!(index.swap(snapshot_of(&["a", "b"])).is_none());

        let held = index.current().unwrap();
        let previous = index.swap(snapshot_of(&["c"]));
        assert!(previous.is_some());

        let old = execute(&QueryPlan::MatchAll, &held, 10, 0, None).unwrap();
        assert_eq!(old.total, 2);
        let new = execute(&QueryPlan::MatchAll, &index.current().unwrap(), 10, 0, None).unwrap();
        assert_eq!(new.total, 1);
        assert_eq!(new.hits[0].id, "c");
    }
}
