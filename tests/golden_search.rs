use chrono::{TimeZone, Utc};

use pagedex::query::{ExactField, TextField};
use pagedex::{translate, Document, EngineConfig, QueryEngine, QueryPlan, SearchRequest};

fn fixture() -> Vec<Document> {
    let day = |d| Utc.with_ymd_and_hms(2024, 5, d, 9, 0, 0).unwrap();
    vec![
        Document::new(
            "101",
            "Incident notes",
            "OPS",
            "<p>Database outage at night.</p><p>Second outage after failover.</p>",
        )
        .with_updated_at(day(1)),
        Document::new("202", "Team page", "ENG", "<p>We discussed the outage.</p>")
            .with_updated_at(day(9)),
        Document::new("303", "Runbook", "OPS", "<p>Restart the service.</p>")
            .with_updated_at(day(5)),
    ]
}

fn engine() -> QueryEngine {
    let engine = QueryEngine::new(EngineConfig::default().with_build_workers(2));
    engine.load_snapshot(fixture());
    engine.reindex().unwrap();
    engine
}

#[test]
fn golden_outage_in_ops_translates_to_and_of_text_and_space() {
    let plan = translate(r#"text ~ "outage" AND space = OPS"#).unwrap();
    assert_eq!(
        plan,
        QueryPlan::And {
            children: vec![
                QueryPlan::Text {
                    field: TextField::Body,
                    phrase: "outage".to_string(),
                },
                QueryPlan::Exact {
                    field: ExactField::ContainerKey,
                    value: "OPS".to_string(),
                },
            ]
        }
    );
}

#[test]
fn golden_outage_in_ops_ranks_only_the_ops_page() {
    let engine = engine();
    let response = engine
        .search(&SearchRequest::new(r#"text ~ "outage" AND space = OPS"#))
        .unwrap();

    assert_eq!(response.total_estimate, 1);
    assert_eq!(response.hits.len(), 1);
    let hit = &response.hits[0];
    assert_eq!(hit.id, "101");
    assert_eq!(hit.container_key, "OPS");
    assert_eq!(hit.score, 2.0);
}

#[test]
fn golden_outage_everywhere_ranks_by_frequency() {
    let engine = engine();
    let response = engine.search(&SearchRequest::new("text ~ outage")).unwrap();

    let ids: Vec<&str> = response.hits.iter().map(|h| h.id.as_str()).collect();
    assert_eq!(ids, vec!["101", "202"]);
    assert!(response.hits[0].score > response.hits[1].score);
}

#[test]
fn golden_container_filter_matches_space_clause() {
    let engine = engine();
    let filtered = engine
        .search(&SearchRequest::new("text ~ outage").with_container("OPS"))
        .unwrap();
    let clause = engine
        .search(&SearchRequest::new("text ~ outage AND space = OPS"))
        .unwrap();
    assert_eq!(filtered.hits, clause.hits);
}

#[test]
fn golden_match_all_orders_by_recency() {
    let engine = engine();
    let response = engine.search(&SearchRequest::new("type = page")).unwrap();
    let ids: Vec<&str> = response.hits.iter().map(|h| h.id.as_str()).collect();
    assert_eq!(ids, vec!["202", "303", "101"]);
}
