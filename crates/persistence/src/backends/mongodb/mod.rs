//! MongoDB backend.
//!
//! Translates bound filters into MongoDB query filter documents, emitted as
//! extended JSON (`serde_json::Value`) so they can be handed to any driver or
//! evaluated by the in-memory [`DocumentMatcher`](crate::backends::memory::DocumentMatcher).
//!
//! | Filter | Document |
//! |--------|----------|
//! | `age >= 18` | `{"age": {"$gte": 18}}` |
//! | `status in ['a', 'b']` | `{"status": {"$in": ["a", "b"]}}` |
//! | `name ilike 'jo%'` | `{"name": {"$regex": "(?s)^[jJ][oO].*\\z"}}` |
//! | `name !like 'jo%'` | `{"name": {"$not": {"$regex": "(?s)^jo.*\\z"}}}` |
//! | `not a = 1` | `{"$nor": [{"a": {"$eq": 1}}]}` |
//! | `a + 1 > 10` | `{"$expr": {"$and": [{"$gt": [{"$add": ["$a", 1]}, null]}, {"$gt": [{"$add": ["$a", 1]}, 10]}]}}` |
//!
//! `ilike` folds ASCII letters only. Comparisons inside `$expr` are guarded
//! so that null and missing operands never match, as in SQL.

mod translator;

pub use translator::{MongoTranslator, literal_to_json};
