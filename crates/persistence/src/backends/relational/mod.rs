//! Relational backend.
//!
//! Filters are translated into a dialect-neutral [`SqlExpr`] tree, which a
//! [`SqlDialect`] renders into a [`SqlFragment`] suitable for a `WHERE`
//! clause. Values are always bound as parameters.
//!
//! ```
//! use sieve_filter::{AcceptanceRules, ComplexType, DataType, Field, ParseOptions};
//! use sieve_persistence::backends::relational::{RelationalTranslator, SqlDialect};
//! use sieve_persistence::core::{TranslationContext, translate_filter};
//!
//! let schema = ComplexType::new("Customer")
//!     .with_field(Field::new("status", DataType::String))
//!     .with_field(Field::new("age", DataType::Integer));
//! let translator = RelationalTranslator::new(SqlDialect::Postgres);
//!
//! let expr = translate_filter(
//!     &translator,
//!     "status = 'active' and age >= 18",
//!     &ParseOptions::default(),
//!     &schema,
//!     &AcceptanceRules::unrestricted(),
//!     &TranslationContext::new(),
//! )
//! .unwrap();
//! let fragment = translator.render(&expr, 0);
//! assert_eq!(fragment.sql, "(\"status\" = $1) AND (\"age\" >= $2)");
//! ```
//!
//! Negated operators (`!=`, `!in`, `!like`, `!ilike`, `not`) also match rows
//! where the column is `NULL`, the same as the document store.

mod dialect;
mod sql;
mod translator;

pub use dialect::{SqlDialect, quote_identifier};
pub use sql::{SqlCompareOp, SqlExpr, SqlFragment, SqlParam};
pub use translator::{DEFAULT_PATH_SEPARATOR, RelationalTranslator, literal_to_param};
