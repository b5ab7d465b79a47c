pub mod config;
pub mod engine;
pub mod error;
pub mod index;
pub mod markup;
pub mod models;
pub mod query;
pub mod snapshot;
pub mod store;
pub mod tokenizer;

pub use config::{EngineConfig, IndexSettings, QuerySettings, TokenizerConfig};
pub use engine::{QueryEngine, ReindexHandle};
pub use error::{PagedexError, Result};
pub use markup::{convert, Conversion, DocumentTree};
pub use models::*;
pub use query::{translate, QueryPlan};
pub use snapshot::{read_snapshot, read_snapshot_file, SnapshotRecord};
pub use tokenizer::Tokenizer;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
