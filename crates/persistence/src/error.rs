//! Error types for filter translation.
//!
//! [`TranslationError`] covers failures while turning a bound filter into a
//! backend-native filter. [`QueryError`] is the umbrella a request handler
//! sees: it adds the syntax and binding errors of `sieve-filter` and maps
//! every variant to an HTTP status and a short issue code.

// Error enum variant fields are self-documenting via their #[error(...)] messages
#![allow(missing_docs)]

use sieve_filter::{FilterBindingError, FilterError, LiteralKind, SyntaxError};
use thiserror::Error;

use crate::core::{BackendKind, FilterCapability};

/// Errors raised by backend translators.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TranslationError {
    /// The filter needs a feature the backend cannot express.
    #[error("backend '{backend}' does not support {capability}")]
    UnsupportedCapability {
        backend: BackendKind,
        capability: FilterCapability,
    },

    /// A logical expression without items.
    #[error("empty '{operator}' expression")]
    EmptyLogicalExpression { operator: String },

    /// An `@name` constant missing from the translation context.
    #[error("unresolved external constant '@{name}'")]
    UnresolvedExternal { name: String },

    /// Constant folding divided by zero.
    #[error("division by zero")]
    DivisionByZero,

    /// A literal that cannot be used in this position.
    #[error("{kind} literal is not supported in {context}")]
    UnsupportedLiteral { kind: LiteralKind, context: String },

    /// An operand combination the translator cannot represent.
    #[error("invalid operand: {message}")]
    InvalidOperand { message: String },
}

impl TranslationError {
    /// Creates an [`TranslationError::InvalidOperand`].
    pub fn invalid_operand(message: impl Into<String>) -> Self {
        TranslationError::InvalidOperand {
            message: message.into(),
        }
    }
}

/// Any error raised between filter text and a backend filter.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error(transparent)]
    Binding(#[from] FilterBindingError),

    #[error(transparent)]
    Translation(#[from] TranslationError),
}

impl From<FilterError> for QueryError {
    fn from(err: FilterError) -> Self {
        match err {
            FilterError::Syntax(e) => QueryError::Syntax(e),
            FilterError::Binding(e) => QueryError::Binding(e),
        }
    }
}

impl QueryError {
    /// HTTP status for the error. Every filter error is a client error.
    pub fn status_code(&self) -> u16 {
        match self {
            QueryError::Syntax(_) | QueryError::Binding(_) | QueryError::Translation(_) => 400,
        }
    }

    /// Short machine-readable code for API error bodies.
    pub fn issue_code(&self) -> &'static str {
        match self {
            QueryError::Syntax(_) => "syntax",
            QueryError::Binding(e) => match e {
                FilterBindingError::UnknownField { .. }
                | FilterBindingError::NotComplex { .. }
                | FilterBindingError::NotFilterable { .. } => "invalid-field",
                FilterBindingError::OperatorNotAllowed { .. }
                | FilterBindingError::OperatorNotApplicable { .. } => "invalid-operator",
                FilterBindingError::IncompatibleValue { .. } => "invalid-value",
            },
            QueryError::Translation(e) => match e {
                TranslationError::UnsupportedCapability { .. }
                | TranslationError::UnsupportedLiteral { .. } => "not-supported",
                TranslationError::DivisionByZero | TranslationError::InvalidOperand { .. } => {
                    "invalid-value"
                }
                TranslationError::EmptyLogicalExpression { .. }
                | TranslationError::UnresolvedExternal { .. } => "invalid-filter",
            },
        }
    }
}

/// Result type alias for translation.
pub type TranslationResult<T> = Result<T, TranslationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translation_error_display() {
        let err = TranslationError::UnsupportedCapability {
            backend: BackendKind::Elasticsearch,
            capability: FilterCapability::FieldComparison,
        };
        assert_eq!(
            err.to_string(),
            "backend 'elasticsearch' does not support field-comparison"
        );

        let err = TranslationError::UnresolvedExternal {
            name: "user.id".to_string(),
        };
        assert_eq!(err.to_string(), "unresolved external constant '@user.id'");
    }

    #[test]
    fn test_query_error_codes() {
        let syntax: QueryError = SyntaxError::new(3, "unexpected token").into();
        assert_eq!(syntax.status_code(), 400);
        assert_eq!(syntax.issue_code(), "syntax");

        let binding: QueryError = FilterBindingError::NotFilterable {
            field: "ssn".to_string(),
        }
        .into();
        assert_eq!(binding.issue_code(), "invalid-field");

        let translation: QueryError = TranslationError::DivisionByZero.into();
        assert_eq!(translation.status_code(), 400);
        assert_eq!(translation.issue_code(), "invalid-value");
    }

    #[test]
    fn test_from_filter_error() {
        let err = FilterError::Syntax(SyntaxError::new(0, "empty filter"));
        assert!(matches!(QueryError::from(err), QueryError::Syntax(_)));
    }
}
