use serde::{Deserialize, Serialize};

/// Tokenizer configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TokenizerConfig {
    pub lowercase: bool,
    pub remove_stopwords: bool,
    pub stem: bool,
    pub min_token_length: usize,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            lowercase: true,
            remove_stopwords: false,
            stem: false,
            min_token_length: 2,
        }
    }
}

/// Index build and scoring settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IndexSettings {
    /// Score multiplier for title matches
    pub title_boost: f32,
    /// Score multiplier for body matches
    pub body_boost: f32,
    /// Tokenizer worker threads used during a build
    pub build_workers: usize,
    /// Documents between cancellation checks during a build
    pub checkpoint_interval: usize,
    pub tokenizer: TokenizerConfig,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            title_boost: 2.0,
            body_boost: 1.0,
            build_workers: num_cpus::get().clamp(1, 8),
            checkpoint_interval: 256,
            tokenizer: TokenizerConfig::default(),
        }
    }
}

/// Query-side limits
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QuerySettings {
    pub default_limit: usize,
    pub max_limit: usize,
    /// Deadline applied when a request does not carry its own
    pub default_timeout_ms: Option<u64>,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            default_limit: 25,
            max_limit: 250,
            default_timeout_ms: Some(5_000),
        }
    }
}

/// Top-level engine configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    pub index: IndexSettings,
    pub query: QuerySettings,
}

impl EngineConfig {
    /// Set the number of index build workers
    pub fn with_build_workers(mut self, workers: usize) -> Self {
        self.index.build_workers = workers.max(1);
        self
    }

    /// Set how often a build checks for cancellation
    pub fn with_checkpoint_interval(mut self, interval: usize) -> Self {
        self.index.checkpoint_interval = interval.max(1);
        self
    }

    /// Set the default query deadline
    pub fn with_default_timeout_ms(mut self, timeout_ms: Option<u64>) -> Self {
        self.query.default_timeout_ms = timeout_ms;
        self
    }

    pub fn with_tokenizer(mut self, tokenizer: TokenizerConfig) -> Self {
        self.index.tokenizer = tokenizer;
        self
    }

    /// Resolve a requested page size against the configured limits
    pub fn effective_limit(&self, requested: usize) -> usize {
        if requested == 0 {
            self.query.default_limit
        } else {
            requested.min(self.query.max_limit)
        }
    }
}
