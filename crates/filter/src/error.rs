//! Error types for the filter pipeline.
//!
//! Every error here is caused by client input: a malformed filter string
//! ([`SyntaxError`]) or a filter that does not fit the endpoint's schema and
//! acceptance rules ([`FilterBindingError`]).

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use thiserror::Error;

use crate::ast::ComparisonOperator;

/// Malformed filter text, raised by the lexer and the parser.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("syntax error at position {position}: {message}")]
pub struct SyntaxError {
    /// Byte offset of the first offending character.
    pub position: usize,
    /// Human-readable description.
    pub message: String,
}

impl SyntaxError {
    /// Creates a syntax error at the given byte offset.
    pub fn new(position: usize, message: impl Into<String>) -> Self {
        Self {
            position,
            message: message.into(),
        }
    }
}

/// A literal could not be decoded as a field's data type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct DecodeError {
    pub message: String,
}

impl DecodeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A filter that parsed but does not fit the schema or the endpoint's rules.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FilterBindingError {
    /// A path segment does not name a field of its type.
    #[error("unknown field '{path}' in type '{type_name}'")]
    UnknownField { path: String, type_name: String },

    /// A path descends through a field that has no sub-fields.
    #[error("cannot resolve '{path}': field '{field}' is not a complex type")]
    NotComplex { path: String, field: String },

    /// The field has no acceptance rule for this endpoint.
    #[error("field '{field}' is not available for filtering")]
    NotFilterable { field: String },

    /// The field's acceptance rule does not allow the operator.
    #[error("operator '{operator}' is not allowed for field '{field}' (allowed: {allowed})")]
    OperatorNotAllowed {
        field: String,
        operator: ComparisonOperator,
        allowed: String,
    },

    /// The operator cannot be applied to the field's data type.
    #[error("operator '{operator}' cannot be applied to field '{field}' of type {data_type}")]
    OperatorNotApplicable {
        field: String,
        operator: ComparisonOperator,
        data_type: String,
    },

    /// A literal could not be decoded as the field's data type.
    #[error("invalid value {value} for field '{field}' of type {expected}: {reason}")]
    IncompatibleValue {
        field: String,
        expected: String,
        value: String,
        reason: String,
    },
}

impl FilterBindingError {
    /// Returns the offending field path.
    pub fn field(&self) -> &str {
        match self {
            FilterBindingError::UnknownField { path, .. }
            | FilterBindingError::NotComplex { path, .. } => path,
            FilterBindingError::NotFilterable { field }
            | FilterBindingError::OperatorNotAllowed { field, .. }
            | FilterBindingError::OperatorNotApplicable { field, .. }
            | FilterBindingError::IncompatibleValue { field, .. } => field,
        }
    }

    /// Returns the offending operator, when the error is about one.
    pub fn operator(&self) -> Option<ComparisonOperator> {
        match self {
            FilterBindingError::OperatorNotAllowed { operator, .. }
            | FilterBindingError::OperatorNotApplicable { operator, .. } => Some(*operator),
            _ => None,
        }
    }
}

/// Any error raised while turning filter text into a bound filter.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error(transparent)]
    Binding(#[from] FilterBindingError),
}

/// Result type alias for parsing.
pub type ParseResult<T> = Result<T, SyntaxError>;

/// Result type alias for binding.
pub type BindResult<T> = Result<T, FilterBindingError>;
