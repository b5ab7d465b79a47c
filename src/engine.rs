//! Query engine
//!
//! Owns the document store and text index and serializes their writers
//! behind one lock. Readers never take that lock: they work on whatever
//! snapshots were published when they started.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::PagedexError;
use crate::index::{self, IndexSnapshot, TextIndex};
use crate::models::{
    Container, Document, DocumentView, Hydrated, LookupRequest, PageSummary, SearchRequest,
    SearchResponse,
};
use crate::query::{self, QueryPlan};
use crate::snapshot::{self, SnapshotRecord};
use crate::store::{ContainerPage, Diagnostics, DocumentStore};
use crate::Result;

pub struct QueryEngine {
    config: EngineConfig,
    store: DocumentStore,
    index: TextIndex,
    writer: Mutex<()>,
}

/// Background index build started by [`QueryEngine::spawn_reindex`]
pub struct ReindexHandle {
    cancel: Arc<AtomicBool>,
    join: JoinHandle<Result<usize>>,
}

impl ReindexHandle {
    /// Ask the build to stop at its next checkpoint
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Relaxed);
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Wait for the build; returns the number of indexed documents
    pub fn wait(self) -> Result<usize> {
        self.join
            .join()
            .map_err(|_| PagedexError::Internal("reindex thread panicked".to_string()))?
    }
}

impl Default for QueryEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl QueryEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            store: DocumentStore::new(),
            index: TextIndex::new(),
            writer: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Replace the store contents; the index is left as it was
    pub fn load_snapshot(&self, documents: Vec<Document>) -> usize {
        let _writer = self.writer.lock();
        self.store.load(documents).len()
    }

    /// Replace the store contents from raw snapshot records
    pub fn load_records(&self, records: Vec<SnapshotRecord>) -> usize {
        self.load_snapshot(snapshot::into_documents(records))
    }

    /// Build an index from the current store and publish it
    pub fn reindex(&self) -> Result<usize> {
        let _writer = self.writer.lock();
        self.build_and_swap(&AtomicBool::new(false), |_| {})
    }

    /// Build and publish an index on a background thread
    pub fn spawn_reindex(self: &Arc<Self>) -> ReindexHandle {
        let cancel = Arc::new(AtomicBool::new(false));
        let engine = Arc::clone(self);
        let flag = Arc::clone(&cancel);
        let join = thread::spawn(move || {
            let _writer = engine.writer.lock();
            let result = engine.build_and_swap(&flag, |processed| {
                debug!(processed, "background reindex checkpoint");
            });
            if let Err(e) = &result {
                warn!(error = %e, "background reindex did not publish");
            }
            result
        });
        ReindexHandle { cancel, join }
    }

    fn build_and_swap(&self, cancel: &AtomicBool, on_checkpoint: impl FnMut(usize)) -> Result<usize> {
        let store = self.store.snapshot();
        let built =
            index::build_with_progress(store.documents(), &self.config.index, cancel, on_checkpoint)?;
        let documents = built.len();
        self.index.swap(Arc::new(built));
        Ok(documents)
    }

    /// Run a filter query against the published index
    pub fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        let started = Instant::now();

        let mut plan = query::translate(&request.query)?;
        if let Some(key) = &request.container_filter {
            plan = plan.and(QueryPlan::container(key.clone()));
        }

        let limit = self.config.effective_limit(request.limit);
        let deadline = request
            .timeout_ms
            .or(self.config.query.default_timeout_ms)
            .map(|ms| started + Duration::from_millis(ms));

        let snapshot = self.index.current()?;
        let page = index::execute(&plan, &snapshot, limit, request.offset, deadline)?;

        let took_ms = started.elapsed().as_millis() as u64;
        debug!(
            query = %request.query,
            total = page.total,
            returned = page.hits.len(),
            took_ms,
            "search executed"
        );

        Ok(SearchResponse {
            total_estimate: page.total,
            hits: page.hits,
            took_ms,
        })
    }

    /// Derived renderings of a page
    pub fn hydrate(&self, id: &str) -> Option<Hydrated> {
        self.store.get_by_id(id).map(|doc| {
            let conversion = doc.conversion();
            Hydrated {
                document_tree: conversion.tree.clone(),
                plain_text: conversion.plain_text.clone(),
            }
        })
    }

    pub fn lookup(&self, request: &LookupRequest) -> Option<DocumentView> {
        let doc = match request {
            LookupRequest::Id { id } => self.store.get_by_id(id),
            LookupRequest::Title {
                title,
                container_key,
            } => self.store.get_by_title(title, container_key),
        };
        doc.map(|d| d.view())
    }

    pub fn list_pages(&self, container_key: &str, offset: usize, limit: usize) -> ContainerPage {
        self.store.list_in_container(container_key, offset, limit)
    }

    pub fn list_containers(&self) -> Vec<Container> {
        self.store.list_containers()
    }

    /// Parent chain of a page, nearest parent first
    pub fn ancestors(&self, id: &str) -> Vec<PageSummary> {
        self.store
            .ancestors(id)
            .iter()
            .map(|d| d.summary())
            .collect()
    }

    pub fn diagnostics(&self) -> Diagnostics {
        self.store.diagnostics()
    }

    /// Case-insensitive title substring search over the store
    pub fn search_titles(&self, fragment: &str, limit: usize) -> Vec<PageSummary> {
        let limit = self.config.effective_limit(limit);
        self.store
            .search_titles(fragment, limit)
            .iter()
            .map(|d| d.summary())
            .collect()
    }

    /// The published index snapshot
    pub fn index_snapshot(&self) -> Result<Arc<IndexSnapshot>> {
        self.index.current()
    }

    pub fn document_count(&self) -> usize {
        self.store.len()
    }

    pub fn is_index_ready(&self) -> bool {
        self.index.is_ready()
    }

    /// Load, index and log a snapshot file in one step
    pub fn open(config: EngineConfig, path: impl AsRef<std::path::Path>) -> Result<Self> {
        let engine = Self::new(config);
        let loaded = engine.load_snapshot(snapshot::read_snapshot_file(path)?);
        let indexed = engine.reindex()?;
        info!(loaded, indexed, "engine ready");
        Ok(engine)
    }
}
