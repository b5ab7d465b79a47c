use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use pagedex::config::IndexSettings;
use pagedex::{convert, index, translate, Document, QueryEngine, SearchRequest};

const WORDS: &[&str] = &[
    "outage", "deploy", "database", "cache", "review", "rollback", "incident", "latency",
    "queue", "release", "runbook", "capacity",
];

const PAGE: &str = r#"<h2>Incident review</h2>
<p>During the <strong>database</strong> outage the <em>cache</em> layer served stale reads.</p>
<ac:structured-macro ac:name="info"><ac:rich-text-body><p>Follow the runbook.</p></ac:rich-text-body></ac:structured-macro>
<table><tbody><tr><th>Step</th><th>Owner</th></tr><tr><td>rollback</td><td>ops</td></tr></tbody></table>
<ul><li>check latency<ul><li>p99</li></ul></li><li>page the owner</li></ul>"#;

fn make_doc(i: usize) -> Document {
    let body: Vec<&str> = (0..24).map(|j| WORDS[(i * 7 + j * 3) % WORDS.len()]).collect();
    let container = ["OPS", "ENG", "SEC", "DOC"][i % 4];
    Document::new(
        format!("page-{i}"),
        format!("{} notes {i}", WORDS[i % WORDS.len()]),
        container,
        format!("<p>{}</p>", body.join(" ")),
    )
}

fn corpus(count: usize) -> Vec<Arc<Document>> {
    (0..count).map(|i| Arc::new(make_doc(i))).collect()
}

fn bench_convert(c: &mut Criterion) {
    c.bench_function("convert_page", |b| b.iter(|| convert(black_box(PAGE))));
}

fn bench_translate(c: &mut Criterion) {
    c.bench_function("translate_query", |b| {
        b.iter(|| translate(black_box(r#"text ~ "database outage" AND space = OPS OR title ~ runbook"#)))
    });
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("index_build");
    for &count in &[1_000usize, 5_000] {
        let docs = corpus(count);
        // warm the memoized conversions so the bench measures indexing
        for doc in &docs {
            black_box(doc.plain_text());
        }
        group.bench_with_input(BenchmarkId::from_parameter(count), &docs, |b, docs| {
            b.iter(|| {
                index::build(docs, &IndexSettings::default(), &AtomicBool::new(false))
                    .map(|snapshot| snapshot.len())
            })
        });
    }
    group.finish();
}

fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("search");
    for &count in &[1_000usize, 10_000] {
        let engine = QueryEngine::default();
        engine.load_snapshot((0..count).map(make_doc).collect());
        if engine.reindex().is_err() {
            continue;
        }

        for query in [
            "text ~ outage",
            "text ~ \"database cache\" AND space = OPS",
            "title ~ runbook OR text ~ rollback",
        ] {
            let request = SearchRequest::new(query).with_limit(25);
            group.bench_with_input(
                BenchmarkId::new(query, count),
                &request,
                |b, request| b.iter(|| engine.search(black_box(request))),
            );
        }
    }
    group.finish();
}

criterion_group!(benches, bench_convert, bench_translate, bench_build, bench_search);
criterion_main!(benches);
