//! Sieve filter expression language
//!
//! This crate implements the filter language that collection endpoints
//! accept in a single query parameter: lexing, parsing into a schema-agnostic
//! AST, and binding that AST against a typed field schema with per-endpoint
//! operator whitelists.
//!
//! # Pipeline
//!
//! ```text
//! filter text ─► lexer ─► parser ─► FilterAst ─► binder ─► BoundFilter ─► translators
//!                                      ▲                      (sieve-persistence)
//!                                   cache
//! ```
//!
//! - [`lexer`] - Filter text to tokens
//! - [`parser`] - Tokens to [`FilterAst`], with depth and size limits
//! - [`ast`] - Closed sum type shared by raw and bound trees
//! - [`render`] - Canonical filter text for any tree
//! - [`schema`] - Field types and literal decoding
//! - [`acceptance`] - Per-endpoint field and operator whitelists
//! - [`binder`] - Path resolution, acceptance checks and literal coercion
//! - [`cache`] - Parse-once cache of filter trees
//! - [`builder`] - Programmatic tree construction
//!
//! # Quick Start
//!
//! ```
//! use sieve_filter::{
//!     AcceptanceRules, ComparisonOperator, ComplexType, DataType, Field, FieldRule,
//!     bind, parse_filter,
//! };
//!
//! let schema = ComplexType::new("Customer")
//!     .with_field(Field::new("status", DataType::String))
//!     .with_field(Field::new("age", DataType::Integer));
//!
//! let rules = AcceptanceRules::new(vec![
//!     FieldRule::new("status"),
//!     FieldRule::new("age").with_operators([ComparisonOperator::Eq, ComparisonOperator::Ge]),
//! ]);
//!
//! let ast = parse_filter("status = 'active' and age >= '18'").unwrap();
//! let bound = bind(&ast, &schema, &rules).unwrap();
//!
//! // '18' was decoded as an integer for the integer field
//! assert_eq!(bound.to_string(), "status = 'active' and age >= 18");
//!
//! let rejected = parse_filter("age < 18").unwrap();
//! assert!(bind(&rejected, &schema, &rules).is_err());
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod acceptance;
pub mod ast;
pub mod binder;
pub mod builder;
pub mod cache;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod render;
pub mod schema;
pub mod token;

pub use acceptance::{AcceptanceRules, FieldRule};
pub use ast::{
    ArithmeticExpression, ArithmeticItem, ArithmeticOperator, ArrayExpression,
    ComparisonExpression, ComparisonOperator, Expression, ExternalConstant, FilterAst, Literal,
    LiteralKind, LogicalExpression, LogicalOperator, Number, QualifiedIdentifier,
};
pub use binder::{Binder, BoundFilter, BoundIdentifier, bind};
pub use cache::FilterCache;
pub use error::{
    BindResult, DecodeError, FilterBindingError, FilterError, ParseResult, SyntaxError,
};
pub use lexer::tokenize;
pub use parser::{ParseOptions, parse_filter, parse_filter_with};
pub use schema::{ComplexType, DataType, Field};

/// Parses and binds a filter in one step.
pub fn compile<'s>(
    input: &str,
    options: &ParseOptions,
    schema: &'s ComplexType,
    rules: &AcceptanceRules,
) -> Result<BoundFilter<'s>, FilterError> {
    let ast = parse_filter_with(input, options)?;
    Ok(bind(&ast, schema, rules)?)
}

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
