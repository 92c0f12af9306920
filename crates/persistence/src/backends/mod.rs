//! Backend translator implementations.
//!
//! # Available Backends
//!
//! | Backend | Translator | Output |
//! |---------|------------|--------|
//! | MongoDB | [`MongoTranslator`] | Filter document (`serde_json::Value`) |
//! | SQLite / PostgreSQL | [`RelationalTranslator`] | [`SqlExpr`], rendered to [`SqlFragment`] |
//! | Elasticsearch | [`EsQueryBuilder`] | Query DSL (`serde_json::Value`) |
//! | In-memory | [`DocumentMatcher`] | Evaluates MongoDB filter documents |
//!
//! # Capabilities
//!
//! | Capability | MongoDB | Relational | Elasticsearch |
//! |------------|---------|------------|---------------|
//! | computed-comparison | ✓ | ✓ | ✗ |
//! | field-comparison | ✓ | ✓ | ✗ |
//! | pattern-match | ✓ | ✓ | ✓ |
//! | case-insensitive-pattern | ✓ | ✓ | ✓ |
//! | negation | ✓ | ✓ | ✓ |
//! | infinity-literal | ✓ | ✓ | ✗ |

pub mod elasticsearch;
pub mod memory;
pub mod mongodb;
pub mod relational;

pub use elasticsearch::EsQueryBuilder;
pub use memory::{DocumentMatcher, MatchError, MemoryCollection};
pub use mongodb::MongoTranslator;
pub use relational::{RelationalTranslator, SqlDialect, SqlExpr, SqlFragment, SqlParam};
