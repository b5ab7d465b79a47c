use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::time::Instant;

use chrono::{DateTime, Utc};
use ordered_float::OrderedFloat;
use roaring::RoaringBitmap;

use super::snapshot::{DocNo, IndexSnapshot};
use crate::error::PagedexError;
use crate::models::SearchHit;
use crate::query::{ExactField, QueryPlan, TextField};
use crate::Result;

/// Documents between deadline checks while ranking
const DEADLINE_CHECK_INTERVAL: u64 = 1024;

/// One page of ranked hits
#[derive(Clone, Debug, PartialEq)]
pub struct RankedPage {
    /// Number of matching documents before paging
    pub total: usize,
    pub hits: Vec<SearchHit>,
}

/// Matching documents of a plan node and their accumulated scores
struct Matches {
    docs: RoaringBitmap,
    scores: HashMap<DocNo, f32>,
}

impl Matches {
    fn unscored(docs: RoaringBitmap) -> Self {
        Self {
            docs,
            scores: HashMap::new(),
        }
    }

    fn none() -> Self {
        Self::unscored(RoaringBitmap::new())
    }

    fn score(&self, docno: DocNo) -> f32 {
        self.scores.get(&docno).copied().unwrap_or(0.0)
    }
}

struct Deadline {
    started: Instant,
    until: Option<Instant>,
}

impl Deadline {
    fn check(&self) -> Result<()> {
        match self.until {
            Some(until) if Instant::now() >= until => Err(PagedexError::Timeout {
                elapsed_ms: self.started.elapsed().as_millis() as u64,
            }),
            _ => Ok(()),
        }
    }
}

/// Execute a plan against one snapshot
///
/// Hits are ranked by score descending, then `updated_at` descending, then
/// id ascending, which is a total order.
pub fn execute(
    plan: &QueryPlan,
    snapshot: &IndexSnapshot,
    limit: usize,
    offset: usize,
    deadline: Option<Instant>,
) -> Result<RankedPage> {
    let deadline = Deadline {
        started: Instant::now(),
        until: deadline,
    };
    deadline.check()?;

    let matches = evaluate(plan, snapshot, &deadline)?;
    let total = matches.docs.len() as usize;
    let hits = rank(&matches, snapshot, limit, offset, &deadline)?;

    Ok(RankedPage { total, hits })
}

fn evaluate(plan: &QueryPlan, snapshot: &IndexSnapshot, deadline: &Deadline) -> Result<Matches> {
    deadline.check()?;

    match plan {
        QueryPlan::MatchAll => Ok(Matches::unscored(snapshot.all.clone())),
        QueryPlan::Exact {
            field: ExactField::ContainerKey,
            value,
        } => Ok(snapshot
            .container_docs(value)
            .cloned()
            .map(Matches::unscored)
            .unwrap_or_else(Matches::none)),
        QueryPlan::Text { field, phrase } => Ok(text_matches(*field, phrase, snapshot)),
        QueryPlan::And { children } => {
            let mut iter = children.iter();
            let Some(first) = iter.next() else {
                return Ok(Matches::unscored(snapshot.all.clone()));
            };
            let mut acc = evaluate(first, snapshot, deadline)?;
            for child in iter {
                if acc.docs.is_empty() {
                    break;
                }
                let next = evaluate(child, snapshot, deadline)?;
                acc.docs &= &next.docs;
                let mut scores = HashMap::with_capacity(acc.docs.len() as usize);
                for docno in acc.docs.iter() {
                    let score = acc.score(docno) + next.score(docno);
                    if score != 0.0 {
                        scores.insert(docno, score);
                    }
                }
                acc.scores = scores;
            }
            Ok(acc)
        }
        QueryPlan::Or { children } => {
            let mut acc = Matches::none();
            for child in children {
                let next = evaluate(child, snapshot, deadline)?;
                acc.docs |= &next.docs;
                for (docno, score) in next.scores {
                    *acc.scores.entry(docno).or_insert(0.0) += score;
                }
            }
            Ok(acc)
        }
    }
}

/// Documents containing every token of the phrase, scored by summed tf × boost
fn text_matches(field: TextField, phrase: &str, snapshot: &IndexSnapshot) -> Matches {
    let terms = snapshot.tokenizer.unique_terms(phrase);
    if terms.is_empty() {
        return Matches::none();
    }

    let postings = snapshot.field(field);
    let boost = snapshot.boost(field);
    let mut docs: Option<RoaringBitmap> = None;
    let mut scores: HashMap<DocNo, f32> = HashMap::new();

    for term in &terms {
        let list = postings.postings(term);
        if list.is_empty() {
            return Matches::none();
        }
        let term_docs: RoaringBitmap = list.iter().map(|p| p.docno).collect();
        docs = Some(match docs {
            Some(acc) => acc & term_docs,
            None => term_docs,
        });
        for posting in list {
            *scores.entry(posting.docno).or_insert(0.0) += posting.tf as f32 * boost;
        }
    }

    let docs = docs.unwrap_or_default();
    scores.retain(|docno, _| docs.contains(*docno));
    Matches { docs, scores }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct RankKey<'a> {
    score: OrderedFloat<f32>,
    updated_at: DateTime<Utc>,
    id: Reverse<&'a str>,
    docno: Reverse<DocNo>,
}

fn rank(
    matches: &Matches,
    snapshot: &IndexSnapshot,
    limit: usize,
    offset: usize,
    deadline: &Deadline,
) -> Result<Vec<SearchHit>> {
    let wanted = offset.saturating_add(limit);
    if limit == 0 || wanted == 0 || matches.docs.is_empty() {
        return Ok(Vec::new());
    }

    // min-heap holding the best `wanted` entries
    let mut heap: BinaryHeap<Reverse<RankKey<'_>>> = BinaryHeap::with_capacity(wanted.min(4096));
    for (seen, docno) in matches.docs.iter().enumerate() {
        if seen as u64 % DEADLINE_CHECK_INTERVAL == 0 {
            deadline.check()?;
        }
        let Some(stored) = snapshot.stored(docno) else {
            continue;
        };
        let key = RankKey {
            score: OrderedFloat(matches.score(docno)),
            updated_at: stored.updated_at,
            id: Reverse(stored.id.as_str()),
            docno: Reverse(docno),
        };
        if heap.len() < wanted {
            heap.push(Reverse(key));
        } else if let Some(min) = heap.peek() {
            if key > min.0 {
                heap.pop();
                heap.push(Reverse(key));
            }
        }
    }

    let mut ranked: Vec<RankKey<'_>> = heap.into_iter().map(|r| r.0).collect();
    ranked.sort_by(|a, b| b.cmp(a));

    Ok(ranked
        .into_iter()
        .skip(offset)
        .filter_map(|key| {
            let docno = key.docno.0;
            snapshot.stored(docno).map(|stored| SearchHit {
                id: stored.id.clone(),
                title: stored.title.clone(),
                container_key: stored.container_key.clone(),
                updated_at: stored.updated_at,
                score: key.score.into_inner(),
            })
        })
        .collect())
}
