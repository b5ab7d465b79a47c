//! Properties that must hold for any corpus: conversion purity, stable
//! pagination, deterministic ranking and snapshot isolation.

use std::sync::Arc;
use std::thread;

use pagedex::index;
use pagedex::markup::normalize_namespaces;
use pagedex::{
    convert, translate, Document, EngineConfig, LookupRequest, PagedexError, QueryEngine,
    QueryPlan, SearchRequest,
};

const TIP: &str = r#"<ac:structured-macro ac:name="tip"><ac:rich-text-body><p>Hello</p></ac:rich-text-body></ac:structured-macro>"#;

const RICH: &str = r#"<h2>Rollout</h2>
<p>Steps for <strong>the <em>new</em></strong> cluster:</p>
<ol><li>drain</li><li>upgrade<ul><li>control plane</li></ul></li></ol>
<table><tbody><tr><th>Owner</th><th>Status</th></tr><tr><td>ops</td><td><ac:structured-macro ac:name="status"><ac:parameter ac:name="title">DONE</ac:parameter></ac:structured-macro></td></tr></tbody></table>
<ac:structured-macro ac:name="code"><ac:parameter ac:name="language">bash</ac:parameter><ac:plain-text-body><![CDATA[kubectl drain node-1]]></ac:plain-text-body></ac:structured-macro>
<ac:structured-macro ac:name="mystery-widget"/>"#;

fn corpus(count: usize) -> Vec<Document> {
    (0..count)
        .map(|i| {
            let container = if i % 3 == 0 { "ENG" } else { "OPS" };
            Document::new(
                format!("doc-{i:03}"),
                format!("Page {}", i % 7),
                container,
                format!("<p>shared words and item{i}</p>"),
            )
            .with_hierarchy_level((i % 4) as u32)
        })
        .collect()
}

fn ready_engine(docs: Vec<Document>) -> QueryEngine {
    let engine = QueryEngine::default();
    engine.load_snapshot(docs);
    engine.reindex().unwrap();
    engine
}

#[test]
fn test_convert_is_pure_and_idempotent() {
    let first = convert(RICH);
    let second = convert(RICH);
    assert_eq!(first, second);
    assert!(first.warning.is_none());
    assert!(first.plain_text.contains("## Rollout"));
    assert!(first.plain_text.contains("[Status: DONE]"));
    assert!(first.plain_text.contains("kubectl drain node-1"));
    assert!(first.plain_text.contains("[Unsupported content: mystery-widget]"));
}

#[test]
fn test_namespace_normalization_round_trip() {
    let normalized = normalize_namespaces(RICH);
    assert!(!normalized.contains("<ac:"));
    assert_eq!(normalize_namespaces(&normalized), normalized);
    assert_eq!(convert(&normalized), convert(RICH));
}

#[test]
fn test_unknown_macro_keeps_its_body_text() {
    let raw = r#"<ac:structured-macro ac:name="custom-callout"><ac:rich-text-body><p>Important rollback step</p></ac:rich-text-body></ac:structured-macro>"#;
    let conversion = convert(raw);
    assert!(conversion.plain_text.starts_with("[Unsupported content: custom-callout]"));
    assert!(conversion.plain_text.contains("Important rollback step"));
    assert_eq!(conversion.tree.blocks.len(), 2);

    let engine = ready_engine(vec![Document::new("cc", "Callout", "DOC", raw)]);
    let response = engine.search(&SearchRequest::new("text ~ rollback")).unwrap();
    assert_eq!(response.total_estimate, 1);
}

#[test]
fn test_deeply_nested_markup_converts() {
    let levels = 100_000;
    let raw = format!("{}deep{}", "<div>".repeat(levels), "</div>".repeat(levels));
    let conversion = convert(&raw);
    assert!(conversion.warning.is_none());
    assert_eq!(conversion.plain_text, "deep");
}

#[test]
fn test_tip_macro_text_is_kept() {
    let engine = ready_engine(vec![Document::new("tip", "Tips", "DOC", TIP)]);
    let view = engine.lookup(&LookupRequest::by_id("tip")).unwrap();
    assert!(view.plain_text.contains("Hello"));

    let response = engine.search(&SearchRequest::new("text ~ hello")).unwrap();
    assert_eq!(response.hits.len(), 1);
}

#[test]
fn test_pagination_is_stable() {
    let engine = ready_engine(corpus(40));
    let (n, m) = (7, 9);

    let head = engine.list_pages("OPS", 0, n);
    let tail = engine.list_pages("OPS", n, m);
    let whole = engine.list_pages("OPS", 0, n + m);

    let ids = |items: &[Arc<Document>]| items.iter().map(|d| d.id.clone()).collect::<Vec<_>>();
    let mut joined = ids(&head.items);
    joined.extend(ids(&tail.items));
    assert_eq!(joined, ids(&whole.items));
    assert_eq!(head.total, whole.total);

    let search_head = engine
        .search(&SearchRequest::new("text ~ shared").with_limit(n))
        .unwrap();
    let search_tail = engine
        .search(&SearchRequest::new("text ~ shared").with_limit(m).with_offset(n))
        .unwrap();
    let search_whole = engine
        .search(&SearchRequest::new("text ~ shared").with_limit(n + m))
        .unwrap();
    let mut joined = search_head.hits.clone();
    joined.extend(search_tail.hits);
    assert_eq!(joined, search_whole.hits);
}

#[test]
fn test_query_is_deterministic() {
    let engine = ready_engine(corpus(60));
    let request = SearchRequest::new("text ~ shared OR title ~ page AND space = OPS").with_limit(30);
    let first = engine.search(&request).unwrap();
    for _ in 0..5 {
        assert_eq!(engine.search(&request).unwrap().hits, first.hits);
    }
}

#[test]
fn test_in_flight_query_keeps_its_snapshot() {
    let engine = ready_engine(corpus(10));
    let held = engine.index_snapshot().unwrap();

    engine.load_snapshot(corpus(3));
    engine.reindex().unwrap();

    let old = index::execute(&QueryPlan::MatchAll, &held, 100, 0, None).unwrap();
    assert_eq!(old.total, 10);
    let new = engine.search(&SearchRequest::new("").with_limit(100)).unwrap();
    assert_eq!(new.total_estimate, 3);
}

#[test]
fn test_readers_during_rebuild_see_whole_snapshots() {
    let engine = Arc::new(ready_engine(corpus(20)));

    let reader = {
        let engine = Arc::clone(&engine);
        thread::spawn(move || {
            for _ in 0..200 {
                let total = engine
                    .search(&SearchRequest::new("type = page").with_limit(1))
                    .unwrap()
                    .total_estimate;
                assert!(total == 20 || total == 5, "saw partial snapshot of {total}");
            }
        })
    };

    engine.load_snapshot(corpus(5));
    engine.spawn_reindex().wait().unwrap();
    reader.join().unwrap();
}

#[test]
fn test_unterminated_quote_is_a_syntax_error() {
    let err = translate(r#"title ~ "foo"#).unwrap_err();
    match err {
        PagedexError::QuerySyntax { message, position, .. } => {
            assert_eq!(message, "unterminated quoted string");
            assert_eq!(position, 8);
        }
        other => panic!("unexpected error: {other}"),
    }

    let engine = ready_engine(corpus(5));
    let err = engine
        .search(&SearchRequest::new(r#"title ~ "foo"#))
        .unwrap_err();
    assert!(err.is_user_error());
}

#[test]
fn test_diagnostics_count_fallbacks() {
    let engine = ready_engine(vec![
        Document::new("ok", "Fine", "A", "<p>fine</p>"),
        Document::new("bad", "Broken", "A", "<p>x</p><!-- unterminated"),
    ]);
    let diagnostics = engine.diagnostics();
    assert_eq!(diagnostics.documents, 2);
    assert_eq!(diagnostics.fallback_count, 1);
    assert_eq!(diagnostics.fallback_ids, vec!["bad".to_string()]);
}

#[test]
fn test_independent_engines_do_not_share_state() {
    let a = ready_engine(corpus(4));
    let b = QueryEngine::new(EngineConfig::default());
    assert!(a.is_index_ready());
    assert!(!b.is_index_ready());
    assert!(b.search(&SearchRequest::new("")).unwrap_err().is_empty_corpus());
}
