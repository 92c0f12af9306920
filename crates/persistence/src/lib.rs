//! Sieve Persistence Layer
//!
//! This crate translates bound filter expressions from `sieve-filter` into
//! the native filter representation of each storage backend, without
//! semantic drift between them.
//!
//! # Features
//!
//! - **Multiple Backends**: MongoDB filter documents, SQL for SQLite and
//!   PostgreSQL, Elasticsearch Query DSL
//! - **Capability Checks**: Reject filters a backend cannot express before
//!   translating them
//! - **External Constants**: `@name` placeholders resolved per request
//! - **In-memory Matching**: Evaluate document filters against JSON values
//!
//! Enable SQLite parameter binding with the `sqlite` feature (default):
//!
//! ```toml
//! [dependencies]
//! sieve-persistence = { version = "0.1", features = ["sqlite"] }
//! ```
//!
//! # Architecture
//!
//! - [`core`] - Translator trait, capabilities and the shared lowered form
//! - [`backends`] - Backend translators and the in-memory matcher
//! - [`error`] - Error types, with HTTP status mapping
//!
//! # Quick Start
//!
//! ```
//! use sieve_filter::{AcceptanceRules, ComplexType, DataType, Field, FieldRule, ParseOptions};
//! use sieve_persistence::backends::{EsQueryBuilder, MongoTranslator};
//! use sieve_persistence::core::{TranslationContext, translate_filter};
//! use sieve_persistence::error::QueryError;
//! use serde_json::json;
//!
//! let schema = ComplexType::new("Customer")
//!     .with_field(Field::new("status", DataType::String))
//!     .with_field(Field::new("age", DataType::Integer))
//!     .with_field(Field::new("limit", DataType::Integer));
//! let rules = AcceptanceRules::new(vec![
//!     FieldRule::new("status"),
//!     FieldRule::new("age"),
//!     FieldRule::new("limit"),
//! ]);
//! let options = ParseOptions::default();
//! let ctx = TranslationContext::new();
//!
//! let doc = translate_filter(
//!     &MongoTranslator::new(),
//!     "status = 'active' and age >= 18",
//!     &options,
//!     &schema,
//!     &rules,
//!     &ctx,
//! )
//! .unwrap();
//! assert_eq!(
//!     doc,
//!     json!({"$and": [{"status": {"$eq": "active"}}, {"age": {"$gte": 18}}]})
//! );
//!
//! // Elasticsearch cannot compare two fields
//! let err = translate_filter(&EsQueryBuilder::new(), "age < limit", &options, &schema, &rules, &ctx)
//!     .unwrap_err();
//! assert!(matches!(err, QueryError::Translation(_)));
//! assert_eq!(err.status_code(), 400);
//! assert_eq!(err.issue_code(), "not-supported");
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod backends;
pub mod core;
pub mod error;

pub use crate::core::{
    BackendKind, FilterCapability, FilterTranslator, TranslationContext, translate_filter,
};
pub use error::{QueryError, TranslationError, TranslationResult};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
