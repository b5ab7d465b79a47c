pub mod document;
pub mod search;

pub use document::{Container, Document, DocumentId, DocumentView, Hydrated, PageSummary};
pub use search::{LookupRequest, SearchHit, SearchRequest, SearchResponse};
