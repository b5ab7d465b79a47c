//! Snapshot input records
//!
//! Crawler output is loosely shaped: fields may be missing, renamed, or
//! nested the way the origin API returns them. [`SnapshotRecord`] accepts
//! all of those shapes and [`SnapshotRecord::into_document`] applies the
//! defaults in one place, so the store only ever sees complete documents.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::PagedexError;
use crate::models::Document;
use crate::Result;

/// A string or integer field
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Text(String),
    Integer(i64),
}

impl Scalar {
    fn into_string(self) -> String {
        match self {
            Scalar::Text(s) => s.trim().to_string(),
            Scalar::Integer(n) => n.to_string(),
        }
    }
}

/// Page body, either inline or in the origin's `storage` wrapper
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum BodyField {
    Text(String),
    Wrapped { storage: StorageField },
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum StorageField {
    Text(String),
    Value { value: String },
}

impl BodyField {
    fn into_markup(self) -> String {
        match self {
            BodyField::Text(s) => s,
            BodyField::Wrapped {
                storage: StorageField::Text(s),
            }
            | BodyField::Wrapped {
                storage: StorageField::Value { value: s },
            } => s,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SpaceRef {
    pub key: Option<String>,
    pub name: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct VersionRef {
    pub when: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct AncestorRef {
    pub id: Scalar,
}

/// One crawled page as found in a snapshot file
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SnapshotRecord {
    pub id: Option<Scalar>,
    pub title: Option<String>,
    #[serde(alias = "space_key")]
    pub container_key: Option<String>,
    #[serde(alias = "space_name")]
    pub container_name: Option<String>,
    #[serde(alias = "when")]
    pub updated_at: Option<String>,
    pub parent_id: Option<Scalar>,
    #[serde(alias = "level")]
    pub hierarchy_level: Option<u32>,
    #[serde(alias = "body")]
    pub raw_body: Option<BodyField>,
    pub space: Option<SpaceRef>,
    pub version: Option<VersionRef>,
    pub ancestors: Vec<AncestorRef>,
}

impl SnapshotRecord {
    /// Apply defaults; `None` when the record has no usable id
    pub fn into_document(self) -> Option<Document> {
        let id = self.id.map(Scalar::into_string).filter(|id| !id.is_empty())?;

        let space = self.space.unwrap_or_default();
        let container_key = self.container_key.or(space.key).unwrap_or_default();
        let container_name = self
            .container_name
            .or(space.name)
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| container_key.clone());

        let when = self
            .updated_at
            .or_else(|| self.version.and_then(|v| v.when));
        let updated_at = match when.as_deref().map(str::trim).filter(|w| !w.is_empty()) {
            Some(raw) => parse_timestamp(raw).unwrap_or_else(|| {
                warn!(doc_id = %id, timestamp = raw, "unparseable timestamp, using epoch");
                DateTime::<Utc>::default()
            }),
            None => DateTime::<Utc>::default(),
        };

        let hierarchy_level = self
            .hierarchy_level
            .unwrap_or(self.ancestors.len() as u32);
        let parent_id = self
            .parent_id
            .or_else(|| self.ancestors.into_iter().last().map(|a| a.id))
            .map(Scalar::into_string)
            .filter(|p| !p.is_empty());

        let raw_body = self.raw_body.map(BodyField::into_markup).unwrap_or_default();

        Some(
            Document::new(id, self.title.unwrap_or_default(), container_key, raw_body)
                .with_container_name(container_name)
                .with_updated_at(updated_at)
                .with_parent(parent_id)
                .with_hierarchy_level(hierarchy_level),
        )
    }
}

/// Parse RFC 3339 timestamps, or naive ISO 8601 ones taken as UTC
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
}

/// Read records from a JSON array or JSON Lines
pub fn read_snapshot<R: Read>(mut reader: R) -> Result<Vec<SnapshotRecord>> {
    let mut input = String::new();
    reader.read_to_string(&mut input)?;

    let trimmed = input.trim_start();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    if trimmed.starts_with('[') {
        return Ok(serde_json::from_str(trimmed)?);
    }

    let mut records = Vec::new();
    for (n, line) in input.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let record = serde_json::from_str(line).map_err(|e| PagedexError::SnapshotFormat {
            line: n + 1,
            message: e.to_string(),
        })?;
        records.push(record);
    }
    Ok(records)
}

/// Turn records into documents, skipping those without an id
pub fn into_documents(records: Vec<SnapshotRecord>) -> Vec<Document> {
    let total = records.len();
    let documents: Vec<Document> = records
        .into_iter()
        .filter_map(SnapshotRecord::into_document)
        .collect();
    if documents.len() < total {
        warn!(
            skipped = total - documents.len(),
            "snapshot records without an id were skipped"
        );
    }
    documents
}

/// Read a snapshot file into documents
pub fn read_snapshot_file(path: impl AsRef<Path>) -> Result<Vec<Document>> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let records = read_snapshot(BufReader::new(file))?;
    let documents = into_documents(records);
    info!(path = %path.display(), documents = documents.len(), "snapshot read");
    Ok(documents)
}
