use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use crossbeam::channel;
use roaring::RoaringBitmap;
use tracing::{debug, info};

use super::snapshot::{DocNo, FieldPostings, IndexSnapshot, Posting, StoredFields};
use crate::config::IndexSettings;
use crate::error::PagedexError;
use crate::models::Document;
use crate::tokenizer::Tokenizer;
use crate::Result;

/// Term frequencies of one analyzed document
struct Analyzed {
    title: HashMap<String, u32>,
    body: HashMap<String, u32>,
}

/// Build an index snapshot from documents
///
/// Tokenization runs on `settings.build_workers` threads. The cancel flag
/// is checked every `settings.checkpoint_interval` documents; a cancelled
/// build returns [`PagedexError::BuildCancelled`] and publishes nothing.
pub fn build(
    documents: &[Arc<Document>],
    settings: &IndexSettings,
    cancel: &AtomicBool,
) -> Result<IndexSnapshot> {
    build_with_progress(documents, settings, cancel, |_| {})
}

/// [`build`], calling `on_checkpoint` with the number of analyzed documents
/// at every checkpoint, before the cancel flag is read
pub fn build_with_progress(
    documents: &[Arc<Document>],
    settings: &IndexSettings,
    cancel: &AtomicBool,
    mut on_checkpoint: impl FnMut(usize),
) -> Result<IndexSnapshot> {
    let started = Instant::now();
    let total = documents.len();
    if total > DocNo::MAX as usize {
        return Err(PagedexError::Internal(format!(
            "{} documents exceed the index capacity",
            total
        )));
    }
    if cancel.load(Ordering::Relaxed) {
        return Err(PagedexError::BuildCancelled { processed: 0 });
    }

    let workers = settings.build_workers.max(1).min(total.max(1));
    let interval = settings.checkpoint_interval.max(1);
    let mut slots: Vec<Option<Analyzed>> = (0..total).map(|_| None).collect();
    let mut processed = 0usize;

    let (job_tx, job_rx) = channel::unbounded::<(usize, &Arc<Document>)>();
    let (result_tx, result_rx) = channel::unbounded::<(usize, Analyzed)>();
    for job in documents.iter().enumerate() {
        // receiver is alive until the scope below ends
        let _ = job_tx.send(job);
    }
    drop(job_tx);

    thread::scope(|scope| {
        for _ in 0..workers {
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();
            scope.spawn(move || {
                // Dedicated tokenizer per worker
                let tokenizer = Tokenizer::new(&settings.tokenizer);
                while let Ok((docno, doc)) = job_rx.recv() {
                    if cancel.load(Ordering::Relaxed) {
                        break;
                    }
                    let analyzed = Analyzed {
                        title: tokenizer.compute_term_frequencies(&doc.title),
                        body: tokenizer.compute_term_frequencies(doc.plain_text()),
                    };
                    if result_tx.send((docno, analyzed)).is_err() {
                        break;
                    }
                }
            });
        }
        drop(result_tx);

        for (docno, analyzed) in result_rx.iter() {
            slots[docno] = Some(analyzed);
            processed += 1;
            if processed % interval == 0 {
                on_checkpoint(processed);
                if cancel.load(Ordering::Relaxed) {
                    debug!(processed, total, "index build saw cancellation at checkpoint");
                    break;
                }
            }
        }
        drop(result_rx);
    });

    if processed < total {
        return Err(PagedexError::BuildCancelled { processed });
    }

    let tokenizer = Tokenizer::new(&settings.tokenizer);
    let mut stored = Vec::with_capacity(total);
    let mut title = FieldPostings::default();
    let mut body = FieldPostings::default();
    let mut containers: HashMap<String, RoaringBitmap> = HashMap::new();

    for (position, (doc, slot)) in documents.iter().zip(slots).enumerate() {
        let Some(analyzed) = slot else {
            return Err(PagedexError::Internal(format!(
                "document {} was not analyzed",
                doc.id
            )));
        };
        let docno = position as DocNo;
        for (term, tf) in analyzed.title {
            title.push(term, Posting { docno, tf });
        }
        for (term, tf) in analyzed.body {
            body.push(term, Posting { docno, tf });
        }
        containers
            .entry(doc.container_key.clone())
            .or_default()
            .insert(docno);
        stored.push(StoredFields {
            id: doc.id.clone(),
            container_key: doc.container_key.clone(),
            title: doc.title.clone(),
            updated_at: doc.updated_at,
        });
    }

    let snapshot = IndexSnapshot::new(
        stored,
        title,
        body,
        containers,
        tokenizer,
        settings.title_boost,
        settings.body_boost,
    );
    info!(
        documents = snapshot.len(),
        title_terms = snapshot.title.term_count(),
        body_terms = snapshot.body.term_count(),
        workers,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "index snapshot built"
    );
    Ok(snapshot)
}
