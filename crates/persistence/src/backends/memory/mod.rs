//! In-memory backend.
//!
//! Evaluates the filter documents produced by the
//! [`MongoTranslator`](crate::backends::MongoTranslator) against
//! `serde_json::Value` documents. Useful for tests and small in-process
//! collections, and as a reference for the document-store semantics the
//! other backends are checked against.
//!
//! ```
//! use serde_json::json;
//! use sieve_persistence::backends::memory::MemoryCollection;
//!
//! let mut people = MemoryCollection::new();
//! people.insert(json!({"name": "Ada", "age": 36}));
//! people.insert(json!({"name": "Alan", "age": 41}));
//!
//! let found = people.find(&json!({"age": {"$gt": 40}})).unwrap();
//! assert_eq!(found.len(), 1);
//! ```

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

mod collection;
mod matcher;

use thiserror::Error;

pub use collection::MemoryCollection;
pub use matcher::DocumentMatcher;

/// A filter document that cannot be compiled.
#[derive(Error, Debug)]
pub enum MatchError {
    #[error("unknown operator '{operator}'")]
    UnknownOperator { operator: String },

    #[error("invalid operand for '{operator}': {message}")]
    InvalidOperand { operator: String, message: String },

    #[error("invalid regular expression: {0}")]
    Regex(#[from] regex::Error),
}
