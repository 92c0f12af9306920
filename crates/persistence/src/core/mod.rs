//! Core translation traits and abstractions.
//!
//! - [`BackendKind`] - Which storage engine a translator targets
//! - [`FilterCapability`] - Filter features that vary between backends
//! - [`FilterTranslator`] - Bound filter to backend-native filter
//! - [`Predicate`] - Backend-neutral lowered form shared by translators
//! - [`LikePattern`] - `like` pattern conversion to regex, wildcard, glob and SQL
//!
//! # Translation Flow
//!
//! ```text
//! BoundFilter ──check──► required capabilities vs. FilterTranslator::capabilities()
//!      │
//!      └──lower──► Predicate ──► MongoDB document / SqlExpr / Elasticsearch query
//! ```
//!
//! # Backend Capabilities
//!
//! Not every backend can express every filter. Use
//! [`FilterTranslator::check`] to reject a filter before translating it:
//!
//! ```ignore
//! use sieve_persistence::core::{FilterCapability, FilterTranslator};
//!
//! fn explain<T: FilterTranslator>(translator: &T, filter: &BoundFilter<'_>) {
//!     if let Err(e) = translator.check(filter) {
//!         println!("{} cannot run this filter: {}", translator.kind(), e);
//!     }
//!     if !translator.supports(FilterCapability::FieldComparison) {
//!         println!("field-to-field comparisons are unavailable");
//!     }
//! }
//! ```

pub mod backend;
pub mod capabilities;
pub mod lowering;
pub mod pattern;
pub mod translator;

pub use backend::BackendKind;
pub use capabilities::{FilterCapability, required_capabilities};
pub use lowering::{Comparison, Operand, Predicate, fold, lower};
pub use pattern::{LikePattern, PatternPart};
pub use translator::{FilterTranslator, TranslationContext, translate_filter};
