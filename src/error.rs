use thiserror::Error;

/// Main error type for pagedex operations
#[derive(Error, Debug)]
pub enum PagedexError {
    #[error("Query syntax error at position {position} near '{token}': {message}")]
    QuerySyntax {
        message: String,
        token: String,
        position: usize,
    },

    #[error("Index unavailable: no index snapshot has been published yet")]
    IndexUnavailable,

    #[error("Query timed out after {elapsed_ms} ms")]
    Timeout { elapsed_ms: u64 },

    #[error("Index build cancelled after {processed} documents")]
    BuildCancelled { processed: usize },

    #[error("Malformed snapshot at line {line}: {message}")]
    SnapshotFormat { line: usize, message: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for pagedex operations
pub type Result<T> = std::result::Result<T, PagedexError>;

impl PagedexError {
    pub(crate) fn syntax(message: impl Into<String>, token: impl Into<String>, position: usize) -> Self {
        PagedexError::QuerySyntax {
            message: message.into(),
            token: token.into(),
            position,
        }
    }

    /// Whether callers should treat this outcome as an empty corpus
    pub fn is_empty_corpus(&self) -> bool {
        matches!(self, PagedexError::IndexUnavailable)
    }

    /// Whether the query ran past its deadline
    pub fn is_timeout(&self) -> bool {
        matches!(self, PagedexError::Timeout { .. })
    }

    /// Check if the error is the caller's to fix (surfaced verbatim)
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            PagedexError::QuerySyntax { .. } | PagedexError::InvalidRequest(_)
        )
    }
}
