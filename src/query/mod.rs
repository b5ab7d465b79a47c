//! Filter-query language
//!
//! Supports queries like:
//! - `text ~ "outage" AND space = OPS`
//! - `title ~ runbook OR title ~ playbook`
//! - `type = page`
//!
//! # Example
//!
//! ```rust
//! use pagedex::query::{translate, QueryPlan, TextField};
//!
//! let plan = translate(r#"title ~ "release notes""#).unwrap();
//! assert_eq!(plan, QueryPlan::text(TextField::Title, "release notes"));
//! ```

pub mod lexer;
pub mod parser;
pub mod plan;

pub use lexer::{Lexer, Spanned, Token};
pub use parser::{translate, QueryTranslator};
pub use plan::{ExactField, QueryPlan, TextField};
