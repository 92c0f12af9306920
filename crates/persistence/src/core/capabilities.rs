//! Filter capabilities.
//!
//! Backends differ in what they can express natively. Each translator
//! declares the [`FilterCapability`] values it supports, and
//! [`required_capabilities`] computes what a bound filter needs, so callers
//! can reject a filter for a backend before translating it.

use std::collections::HashSet;
use std::fmt;

use sieve_filter::{BoundFilter, ComparisonOperator, Expression, Literal};

/// A filter feature that not every backend supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FilterCapability {
    /// Arithmetic or negation over a field (`a + b > 10`).
    ComputedComparison,
    /// A field on the value side (`a < b`).
    FieldComparison,
    /// `like` / `!like`.
    PatternMatch,
    /// `ilike` / `!ilike`.
    CaseInsensitivePattern,
    /// `not <expression>`.
    Negation,
    /// `Infinity` / `-Infinity` literals.
    InfinityLiteral,
}

impl FilterCapability {
    /// All capabilities, in a fixed order.
    pub fn all() -> &'static [FilterCapability] {
        &[
            FilterCapability::ComputedComparison,
            FilterCapability::FieldComparison,
            FilterCapability::PatternMatch,
            FilterCapability::CaseInsensitivePattern,
            FilterCapability::Negation,
            FilterCapability::InfinityLiteral,
        ]
    }
}

impl fmt::Display for FilterCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FilterCapability::ComputedComparison => "computed-comparison",
            FilterCapability::FieldComparison => "field-comparison",
            FilterCapability::PatternMatch => "pattern-match",
            FilterCapability::CaseInsensitivePattern => "case-insensitive-pattern",
            FilterCapability::Negation => "negation",
            FilterCapability::InfinityLiteral => "infinity-literal",
        };
        write!(f, "{}", name)
    }
}

/// Computes the capabilities a bound filter needs.
pub fn required_capabilities(filter: &BoundFilter<'_>) -> HashSet<FilterCapability> {
    let mut required = HashSet::new();
    collect_predicate(filter, &mut required);
    required
}

fn collect_predicate(expr: &BoundFilter<'_>, required: &mut HashSet<FilterCapability>) {
    match expr {
        Expression::Comparison(cmp) => {
            match cmp.op {
                ComparisonOperator::Like | ComparisonOperator::NotLike => {
                    required.insert(FilterCapability::PatternMatch);
                }
                ComparisonOperator::ILike | ComparisonOperator::NotILike => {
                    required.insert(FilterCapability::PatternMatch);
                    required.insert(FilterCapability::CaseInsensitivePattern);
                }
                _ => {}
            }
            collect_value(&cmp.left, required);
            collect_value(&cmp.right, required);
            // A constant compared with a field is swapped to `field op constant`
            // during lowering when the operator has a mirror.
            if contains_field(&cmp.right)
                && (contains_field(&cmp.left) || cmp.op.mirrored().is_none())
            {
                required.insert(FilterCapability::FieldComparison);
            }
        }
        Expression::Logical(logical) => {
            for item in &logical.items {
                collect_predicate(item, required);
            }
        }
        Expression::Parenthesized(inner) => collect_predicate(inner, required),
        Expression::Not(inner) => {
            required.insert(FilterCapability::Negation);
            collect_predicate(inner, required);
        }
        Expression::Literal(_)
        | Expression::Identifier(_)
        | Expression::External(_)
        | Expression::Array(_)
        | Expression::Arithmetic(_)
        | Expression::Negative(_) => collect_value(expr, required),
    }
}

/// Records literal-driven capabilities and computed value sides.
fn collect_value(expr: &BoundFilter<'_>, required: &mut HashSet<FilterCapability>) {
    match expr {
        Expression::Literal(Literal::Infinity { .. }) => {
            required.insert(FilterCapability::InfinityLiteral);
        }
        Expression::Arithmetic(arith) => {
            if arith.items.iter().any(|item| contains_field(&item.expression)) {
                required.insert(FilterCapability::ComputedComparison);
            }
            for item in &arith.items {
                collect_value(&item.expression, required);
            }
        }
        Expression::Negative(inner) => {
            if contains_field(inner) {
                required.insert(FilterCapability::ComputedComparison);
            }
            collect_value(inner, required);
        }
        Expression::Array(array) => {
            for item in &array.items {
                collect_value(item, required);
            }
        }
        Expression::Parenthesized(inner) => collect_value(inner, required),
        _ => {}
    }
}

fn contains_field(expr: &BoundFilter<'_>) -> bool {
    let mut found = false;
    expr.for_each_identifier(&mut |_| found = true);
    found
}
