use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::document::DocumentId;

/// Filter-query search request
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    /// Restrict hits to one container, on top of the query
    #[serde(default)]
    pub container_filter: Option<String>,
    /// Page size; 0 means the configured default
    #[serde(default)]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
    /// Per-request deadline; `None` uses the configured default
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    pub fn with_container(mut self, key: impl Into<String>) -> Self {
        self.container_filter = Some(key.into());
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }
}

/// One ranked hit
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: DocumentId,
    pub title: String,
    pub container_key: String,
    pub updated_at: DateTime<Utc>,
    pub score: f32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Number of matching documents before paging
    pub total_estimate: usize,
    pub hits: Vec<SearchHit>,
    pub took_ms: u64,
}

/// Direct page lookup
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "by", rename_all = "snake_case")]
pub enum LookupRequest {
    Id { id: DocumentId },
    Title { title: String, container_key: String },
}

impl LookupRequest {
    pub fn by_id(id: impl Into<String>) -> Self {
        Self::Id { id: id.into() }
    }

    pub fn by_title(title: impl Into<String>, container_key: impl Into<String>) -> Self {
        Self::Title {
            title: title.into(),
            container_key: container_key.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_request_builder() {
        let req = SearchRequest::new("text ~ outage")
            .with_container("OPS")
            .with_limit(5)
            .with_offset(10)
            .with_timeout_ms(100);
        assert_eq!(req.container_filter.as_deref(), Some("OPS"));
        assert_eq!(req.limit, 5);
        assert_eq!(req.offset, 10);
        assert_eq!(req.timeout_ms, Some(100));
    }

    #[test]
    fn test_search_request_defaults_from_json() {
        let req: SearchRequest = serde_json::from_str(r#"{"query":"type = page"}"#).unwrap();
        assert_eq!(req.limit, 0);
        assert!(req.container_filter.is_none());
        assert!(req.timeout_ms.is_none());
    }

    #[test]
    fn test_lookup_request_json() {
        let req: LookupRequest =
            serde_json::from_str(r#"{"by":"title","title":"Home","container_key":"OPS"}"#).unwrap();
        assert_eq!(req, LookupRequest::by_title("Home", "OPS"));
    }
}
