//! Schema binding.
//!
//! Binding resolves every identifier of a raw [`FilterAst`] against a
//! [`ComplexType`], enforces the endpoint's [`AcceptanceRules`] and coerces
//! compared literals to the field's type. The result is a [`BoundFilter`]:
//! the same tree shape with identifiers replaced by [`BoundIdentifier`]s
//! that borrow the schema.
//!
//! The raw tree is never modified, so one parse can be bound against many
//! schemas or rule sets.
//!
//! # Path resolution
//!
//! Segments are resolved strictly left to right, matching field names
//! case-insensitively. Each intermediate field must be complex. When a
//! segment is not declared and the type at that point allows additional
//! fields, the rest of the path is accepted as an *open* field of type
//! [`DataType::Any`].

use std::fmt;

use tracing::{debug, warn};

use crate::acceptance::AcceptanceRules;
use crate::ast::{
    ArithmeticExpression, ArithmeticItem, ArrayExpression, ComparisonExpression,
    ComparisonOperator, Expression, FilterAst, Literal, LogicalExpression, QualifiedIdentifier,
};
use crate::error::{BindResult, FilterBindingError};
use crate::schema::{ANY_TYPE, ComplexType, DataType, Field};

/// A filter whose identifiers are resolved against a schema.
pub type BoundFilter<'s> = Expression<BoundIdentifier<'s>>;

/// An identifier resolved against a schema.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundIdentifier<'s> {
    /// Path segments: declared field names, followed by the open remainder
    /// as written.
    pub segments: Vec<String>,
    /// The resolved field; `None` for open fields.
    pub field: Option<&'s Field>,
    /// Type of the value at the end of the path.
    pub data_type: &'s DataType,
}

impl<'s> BoundIdentifier<'s> {
    /// Dotted path, as used for acceptance rules and backend field names.
    pub fn path(&self) -> String {
        self.segments.join(".")
    }

    /// Returns true for undeclared fields under an open type.
    pub fn is_open(&self) -> bool {
        self.field.is_none()
    }

    /// Returns true if the resolved field holds a list of values.
    pub fn is_array(&self) -> bool {
        self.field.is_some_and(|field| field.is_array)
    }
}

impl fmt::Display for BoundIdentifier<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Binds a raw filter against a schema and acceptance rules.
pub fn bind<'s>(
    ast: &FilterAst,
    schema: &'s ComplexType,
    rules: &AcceptanceRules,
) -> BindResult<BoundFilter<'s>> {
    Binder::new(schema, rules).bind(ast)
}

/// How an identifier is used, which decides the acceptance checks.
#[derive(Debug, Clone, Copy)]
enum Role {
    /// Anywhere in the left side of a comparison, including inside
    /// arithmetic and negation; the operator must be allowed.
    Compared(ComparisonOperator),
    /// Any other position; the field must be filterable.
    Referenced,
}

/// Binds filters against one schema and rule set.
pub struct Binder<'s, 'r> {
    schema: &'s ComplexType,
    rules: &'r AcceptanceRules,
}

impl<'s, 'r> Binder<'s, 'r> {
    /// Creates a binder.
    pub fn new(schema: &'s ComplexType, rules: &'r AcceptanceRules) -> Self {
        Self { schema, rules }
    }

    /// Binds a raw filter.
    pub fn bind(&self, ast: &FilterAst) -> BindResult<BoundFilter<'s>> {
        match self.bind_expression(ast, Role::Referenced) {
            Ok(bound) => {
                debug!(schema = %self.schema.name, filter = %bound, "bound filter");
                Ok(bound)
            }
            Err(e) => {
                warn!(schema = %self.schema.name, field = e.field(), error = %e, "rejected filter");
                Err(e)
            }
        }
    }

    /// Resolves a dotted path against the schema.
    pub fn resolve(&self, ident: &QualifiedIdentifier) -> BindResult<BoundIdentifier<'s>> {
        let mut current: &'s ComplexType = self.schema;
        let mut segments = Vec::with_capacity(ident.segments.len());
        let mut resolved: Option<&'s Field> = None;

        for (i, segment) in ident.segments.iter().enumerate() {
            if let Some(parent) = resolved {
                current = parent
                    .data_type
                    .as_complex()
                    .ok_or_else(|| FilterBindingError::NotComplex {
                        path: ident.path(),
                        field: segments.join("."),
                    })?;
            }

            match current.find_field(segment) {
                Some(field) => {
                    segments.push(field.name.clone());
                    resolved = Some(field);
                }
                None if current.additional_fields => {
                    segments.extend(ident.segments[i..].iter().cloned());
                    return Ok(BoundIdentifier {
                        segments,
                        field: None,
                        data_type: &ANY_TYPE,
                    });
                }
                None => {
                    return Err(FilterBindingError::UnknownField {
                        path: ident.path(),
                        type_name: current.name.clone(),
                    });
                }
            }
        }

        match resolved {
            Some(field) => Ok(BoundIdentifier {
                segments,
                field: Some(field),
                data_type: &field.data_type,
            }),
            None => Err(FilterBindingError::UnknownField {
                path: ident.path(),
                type_name: current.name.clone(),
            }),
        }
    }

    fn bind_expression(&self, expr: &FilterAst, role: Role) -> BindResult<BoundFilter<'s>> {
        Ok(match expr {
            Expression::Literal(literal) => Expression::Literal(literal.clone()),
            Expression::External(external) => Expression::External(external.clone()),
            Expression::Identifier(ident) => {
                let bound = self.resolve(ident)?;
                self.check_rule(&bound, role)?;
                Expression::Identifier(bound)
            }
            Expression::Array(array) => Expression::Array(ArrayExpression {
                items: self.bind_all(&array.items)?,
            }),
            Expression::Arithmetic(arith) => {
                let items = arith
                    .items
                    .iter()
                    .map(|item| {
                        Ok(ArithmeticItem {
                            op: item.op,
                            expression: self.bind_expression(&item.expression, role)?,
                        })
                    })
                    .collect::<BindResult<Vec<_>>>()?;
                Expression::Arithmetic(ArithmeticExpression { items })
            }
            Expression::Comparison(cmp) => Expression::Comparison(self.bind_comparison(cmp)?),
            Expression::Logical(logical) => Expression::Logical(LogicalExpression {
                op: logical.op,
                items: self.bind_all(&logical.items)?,
            }),
            Expression::Parenthesized(inner) => {
                Expression::Parenthesized(Box::new(self.bind_expression(inner, role)?))
            }
            Expression::Negative(inner) => {
                Expression::Negative(Box::new(self.bind_expression(inner, role)?))
            }
            Expression::Not(inner) => {
                Expression::Not(Box::new(self.bind_expression(inner, Role::Referenced)?))
            }
        })
    }

    fn bind_all(&self, items: &[FilterAst]) -> BindResult<Vec<BoundFilter<'s>>> {
        items
            .iter()
            .map(|item| self.bind_expression(item, Role::Referenced))
            .collect()
    }

    fn check_rule(&self, ident: &BoundIdentifier<'s>, role: Role) -> BindResult<()> {
        if self.rules.is_unrestricted() {
            return Ok(());
        }
        let path = ident.path();
        let rule = self
            .rules
            .find(&path)
            .ok_or_else(|| FilterBindingError::NotFilterable {
                field: path.clone(),
            })?;
        if let Role::Compared(op) = role {
            if !rule.allows(op) {
                return Err(FilterBindingError::OperatorNotAllowed {
                    field: path,
                    operator: op,
                    allowed: rule.allowed_operators(),
                });
            }
        }
        Ok(())
    }

    fn bind_comparison(
        &self,
        cmp: &ComparisonExpression<QualifiedIdentifier>,
    ) -> BindResult<ComparisonExpression<BoundIdentifier<'s>>> {
        let op = cmp.op;
        let left = self.bind_expression(&cmp.left, Role::Compared(op))?;

        let target = match left.unwrap_parens() {
            Expression::Identifier(ident) => Some(ident),
            _ => None,
        };

        if op.is_pattern() {
            match target {
                Some(ident) if ident.data_type.is_string_like() => {}
                Some(ident) => {
                    return Err(FilterBindingError::OperatorNotApplicable {
                        field: ident.path(),
                        operator: op,
                        data_type: ident.data_type.to_string(),
                    });
                }
                None => {
                    return Err(FilterBindingError::OperatorNotApplicable {
                        field: left.to_string(),
                        operator: op,
                        data_type: DataType::Number.to_string(),
                    });
                }
            }
        }

        let mut right = self.bind_expression(&cmp.right, Role::Referenced)?;
        let pattern_type = DataType::String;
        let number_type = DataType::Number;
        let value_type = match left.unwrap_parens() {
            Expression::Identifier(ident) if ident.is_open() => None,
            Expression::Identifier(ident) if op.is_pattern() => Some((ident.path(), &pattern_type)),
            Expression::Identifier(ident) => Some((ident.path(), ident.data_type)),
            // Arithmetic and negation always produce a number
            Expression::Arithmetic(_) | Expression::Negative(_) => {
                Some((left.to_string(), &number_type))
            }
            _ => None,
        };
        if let Some((field, value_type)) = value_type {
            right = coerce(right, &field, value_type)?;
        }

        Ok(ComparisonExpression {
            left: Box::new(left),
            op,
            right: Box::new(right),
        })
    }
}

/// Decodes the literals of a comparison's value side as `value_type`.
/// `field` names the compared side in errors.
fn coerce<'s>(
    expr: BoundFilter<'s>,
    field: &str,
    value_type: &DataType,
) -> BindResult<BoundFilter<'s>> {
    Ok(match expr {
        Expression::Literal(literal) => Expression::Literal(decode(&literal, field, value_type)?),
        Expression::Array(array) => Expression::Array(ArrayExpression {
            items: array
                .items
                .into_iter()
                .map(|item| coerce(item, field, value_type))
                .collect::<BindResult<Vec<_>>>()?,
        }),
        Expression::Parenthesized(inner) => {
            Expression::Parenthesized(Box::new(coerce(*inner, field, value_type)?))
        }
        other => other,
    })
}

fn decode(literal: &Literal, field: &str, value_type: &DataType) -> BindResult<Literal> {
    value_type
        .decode(literal)
        .map_err(|e| FilterBindingError::IncompatibleValue {
            field: field.to_string(),
            expected: value_type.to_string(),
            value: literal.to_string(),
            reason: e.message,
        })
}
