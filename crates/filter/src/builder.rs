//! Programmatic filter construction.
//!
//! Builds raw filter trees in code, typically to produce query strings for
//! clients or tests:
//!
//! ```
//! use sieve_filter::builder::{and, field, or};
//!
//! let filter = and([
//!     field("status").eq("active"),
//!     or([field("age").ge(18), field("verified").eq(true)]),
//! ]);
//! assert_eq!(
//!     filter.to_string(),
//!     "status = 'active' and (age >= 18 or verified = true)"
//! );
//! ```
//!
//! The trees match what the parser produces for the rendered text.

use crate::ast::{
    ArrayExpression, ComparisonExpression, ComparisonOperator, Expression, FilterAst, Literal,
    LogicalExpression, LogicalOperator, QualifiedIdentifier,
};

/// Starts a comparison on a dotted field path.
pub fn field(path: &str) -> FieldRef {
    FieldRef {
        ident: QualifiedIdentifier::from_path(path),
    }
}

/// Left side of a comparison under construction.
#[derive(Debug, Clone)]
pub struct FieldRef {
    ident: QualifiedIdentifier,
}

impl FieldRef {
    /// `field op value`.
    pub fn compare(self, op: ComparisonOperator, value: impl Into<Literal>) -> FilterAst {
        self.compare_with(op, Expression::Literal(value.into()))
    }

    fn compare_with(self, op: ComparisonOperator, right: FilterAst) -> FilterAst {
        Expression::Comparison(ComparisonExpression {
            left: Box::new(Expression::Identifier(self.ident)),
            op,
            right: Box::new(right),
        })
    }

    /// `field = value`.
    pub fn eq(self, value: impl Into<Literal>) -> FilterAst {
        self.compare(ComparisonOperator::Eq, value)
    }

    /// `field != value`.
    pub fn ne(self, value: impl Into<Literal>) -> FilterAst {
        self.compare(ComparisonOperator::Ne, value)
    }

    /// `field > value`.
    pub fn gt(self, value: impl Into<Literal>) -> FilterAst {
        self.compare(ComparisonOperator::Gt, value)
    }

    /// `field >= value`.
    pub fn ge(self, value: impl Into<Literal>) -> FilterAst {
        self.compare(ComparisonOperator::Ge, value)
    }

    /// `field < value`.
    pub fn lt(self, value: impl Into<Literal>) -> FilterAst {
        self.compare(ComparisonOperator::Lt, value)
    }

    /// `field <= value`.
    pub fn le(self, value: impl Into<Literal>) -> FilterAst {
        self.compare(ComparisonOperator::Le, value)
    }

    /// `field like pattern`.
    pub fn like(self, pattern: impl Into<String>) -> FilterAst {
        self.compare(ComparisonOperator::Like, Literal::String(pattern.into()))
    }

    /// `field ilike pattern`.
    pub fn ilike(self, pattern: impl Into<String>) -> FilterAst {
        self.compare(ComparisonOperator::ILike, Literal::String(pattern.into()))
    }

    /// `field in [values]`.
    pub fn in_list<V: Into<Literal>>(self, values: impl IntoIterator<Item = V>) -> FilterAst {
        self.compare_with(ComparisonOperator::In, array(values))
    }

    /// `field !in [values]`.
    pub fn not_in_list<V: Into<Literal>>(self, values: impl IntoIterator<Item = V>) -> FilterAst {
        self.compare_with(ComparisonOperator::NotIn, array(values))
    }

    /// `field = null`.
    pub fn is_null(self) -> FilterAst {
        self.compare(ComparisonOperator::Eq, Literal::Null)
    }
}

fn array<V: Into<Literal>>(values: impl IntoIterator<Item = V>) -> FilterAst {
    Expression::Array(ArrayExpression {
        items: values
            .into_iter()
            .map(|v| Expression::Literal(v.into()))
            .collect(),
    })
}

/// Conjunction. Nested conjunctions are flattened and disjunctions are
/// parenthesized.
pub fn and(items: impl IntoIterator<Item = FilterAst>) -> FilterAst {
    logical(LogicalOperator::And, items)
}

/// Disjunction. Nested disjunctions are flattened.
pub fn or(items: impl IntoIterator<Item = FilterAst>) -> FilterAst {
    logical(LogicalOperator::Or, items)
}

/// Logical negation. Logical operands are parenthesized.
pub fn not(item: FilterAst) -> FilterAst {
    let operand = match item {
        logical @ Expression::Logical(_) => Expression::Parenthesized(Box::new(logical)),
        other => other,
    };
    Expression::Not(Box::new(operand))
}

fn logical(op: LogicalOperator, items: impl IntoIterator<Item = FilterAst>) -> FilterAst {
    let mut flat = Vec::new();
    for item in items {
        match item {
            Expression::Logical(inner) if inner.op == op => flat.extend(inner.items),
            Expression::Logical(inner)
                if op == LogicalOperator::And && inner.op == LogicalOperator::Or =>
            {
                flat.push(Expression::Parenthesized(Box::new(Expression::Logical(inner))));
            }
            other => flat.push(other),
        }
    }

    if flat.len() == 1 {
        if let Some(only) = flat.pop() {
            return only;
        }
    }
    Expression::Logical(LogicalExpression { op, items: flat })
}
