//! Elasticsearch backend.
//!
//! Translates bound filters into Query DSL for use in a `query` or
//! `post_filter` clause. Comparisons map to `term`, `terms`, `range`,
//! `wildcard`, `regexp` (for `ilike`) and `exists`; logical operators map to
//! `bool` queries.
//!
//! The search index cannot compare two fields, evaluate arithmetic on
//! stored values, or represent infinite bounds, so filters that need
//! those fail with [`TranslationError::UnsupportedCapability`](crate::error::TranslationError::UnsupportedCapability).

mod query_builder;

pub use query_builder::EsQueryBuilder;
