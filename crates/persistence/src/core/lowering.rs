//! Backend-neutral predicate form.
//!
//! Every translator starts by lowering the bound tree into a [`Predicate`]:
//! parentheses disappear, external constants are resolved and decoded as
//! the compared field's type, constant arithmetic is folded, a constant on
//! the left of a field is moved to the right, scalar membership operands
//! become one-item lists, and the operand checks shared by all backends run
//! once here.

use sieve_filter::{
    ArithmeticOperator, BoundFilter, BoundIdentifier, ComparisonOperator, DataType, Expression,
    Literal, LogicalOperator, Number,
};
use tracing::trace;

use crate::core::translator::TranslationContext;
use crate::error::{TranslationError, TranslationResult};

/// A boolean filter node.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate<'a> {
    /// `left op right`.
    Compare(Comparison<'a>),
    /// Conjunction.
    And(Vec<Predicate<'a>>),
    /// Disjunction.
    Or(Vec<Predicate<'a>>),
    /// Negation.
    Not(Box<Predicate<'a>>),
}

/// A lowered comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison<'a> {
    /// Compared side.
    pub left: Operand<'a>,
    /// Operator.
    pub op: ComparisonOperator,
    /// Value side. Always an [`Operand::List`] for `in` / `!in`.
    pub right: Operand<'a>,
}

impl<'a> Comparison<'a> {
    /// Returns the field and value of a plain `field op literal` comparison.
    pub fn field_value(&self) -> Option<(&'a BoundIdentifier<'a>, &Literal)> {
        match (&self.left, &self.right) {
            (Operand::Field(field), Operand::Value(value)) => Some((*field, value)),
            _ => None,
        }
    }

    /// Returns the field and values of a `field in [literals]` comparison.
    pub fn field_values(&self) -> Option<(&'a BoundIdentifier<'a>, Vec<&Literal>)> {
        match (&self.left, &self.right) {
            (Operand::Field(field), Operand::List(items)) => items
                .iter()
                .map(|item| match item {
                    Operand::Value(value) => Some(value),
                    _ => None,
                })
                .collect::<Option<Vec<_>>>()
                .map(|values| (*field, values)),
            _ => None,
        }
    }

    /// Returns the pattern text of a pattern comparison.
    pub fn pattern(&self) -> Option<&str> {
        match &self.right {
            Operand::Value(Literal::String(s)) if self.op.is_pattern() => Some(s),
            _ => None,
        }
    }
}

/// A value-producing node.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand<'a> {
    /// Field reference.
    Field(&'a BoundIdentifier<'a>),
    /// Literal, including resolved external constants and folded arithmetic.
    Value(Literal),
    /// Binary arithmetic with at least one non-literal side.
    Arithmetic {
        /// Left operand.
        left: Box<Operand<'a>>,
        /// Operator.
        op: ArithmeticOperator,
        /// Right operand.
        right: Box<Operand<'a>>,
    },
    /// Arithmetic negation of a non-literal.
    Negate(Box<Operand<'a>>),
    /// Membership list.
    List(Vec<Operand<'a>>),
}

impl Operand<'_> {
    /// Returns true for field references and literals.
    pub fn is_simple(&self) -> bool {
        matches!(self, Operand::Field(_) | Operand::Value(_))
    }

    /// Returns true if the operand is the `null` literal.
    pub fn is_null(&self) -> bool {
        matches!(self, Operand::Value(Literal::Null))
    }
}

/// Lowers a bound filter. The root must be a boolean expression.
pub fn lower<'a>(
    filter: &'a BoundFilter<'a>,
    ctx: &TranslationContext,
) -> TranslationResult<Predicate<'a>> {
    let predicate = lower_predicate(filter, ctx)?;
    trace!(predicate = ?predicate, "lowered filter");
    Ok(predicate)
}

fn lower_predicate<'a>(
    expr: &'a BoundFilter<'a>,
    ctx: &TranslationContext,
) -> TranslationResult<Predicate<'a>> {
    match expr {
        Expression::Comparison(cmp) => {
            let left = lower_value(&cmp.left, ctx, value_type(&cmp.right, false).as_ref())?;
            let right =
                lower_value(&cmp.right, ctx, value_type(&cmp.left, cmp.op.is_pattern()).as_ref())?;
            lower_comparison(left, cmp.op, right).map(Predicate::Compare)
        }
        Expression::Logical(logical) => {
            if logical.items.is_empty() {
                return Err(TranslationError::EmptyLogicalExpression {
                    operator: logical.op.to_string(),
                });
            }
            let items = logical
                .items
                .iter()
                .map(|item| lower_predicate(item, ctx))
                .collect::<TranslationResult<Vec<_>>>()?;
            Ok(match logical.op {
                LogicalOperator::And => Predicate::And(items),
                LogicalOperator::Or => Predicate::Or(items),
            })
        }
        Expression::Parenthesized(inner) => lower_predicate(inner, ctx),
        Expression::Not(inner) => Ok(Predicate::Not(Box::new(lower_predicate(inner, ctx)?))),
        Expression::Literal(_)
        | Expression::Identifier(_)
        | Expression::External(_)
        | Expression::Array(_)
        | Expression::Arithmetic(_)
        | Expression::Negative(_) => Err(TranslationError::invalid_operand(format!(
            "expected a boolean expression but found '{}'",
            expr
        ))),
    }
}

/// The type external constants compared with `side` decode as.
struct ValueType {
    field: String,
    data_type: DataType,
}

fn value_type(side: &BoundFilter<'_>, pattern: bool) -> Option<ValueType> {
    match side.unwrap_parens() {
        Expression::Identifier(ident) if ident.is_open() => None,
        Expression::Identifier(ident) => Some(ValueType {
            field: ident.path(),
            data_type: if pattern {
                DataType::String
            } else {
                ident.data_type.clone()
            },
        }),
        Expression::Arithmetic(_) | Expression::Negative(_) => Some(ValueType {
            field: side.to_string(),
            data_type: DataType::Number,
        }),
        _ => None,
    }
}

/// Lowers one side of a comparison, decoding external constants that sit
/// directly on it (or in its list) as `target`.
fn lower_value<'a>(
    expr: &'a BoundFilter<'a>,
    ctx: &TranslationContext,
    target: Option<&ValueType>,
) -> TranslationResult<Operand<'a>> {
    match (expr, target) {
        (Expression::External(external), Some(target)) => {
            let literal = ctx.resolve(external)?;
            target.data_type.decode(&literal).map(Operand::Value).map_err(|e| {
                TranslationError::invalid_operand(format!(
                    "external constant '@{}' cannot be compared with '{}' ({}): {}",
                    external.name, target.field, target.data_type, e.message
                ))
            })
        }
        (Expression::Array(array), Some(_)) => array
            .items
            .iter()
            .map(|item| lower_value(item, ctx, target))
            .collect::<TranslationResult<Vec<_>>>()
            .map(Operand::List),
        (Expression::Parenthesized(inner), Some(_)) => lower_value(inner, ctx, target),
        _ => lower_operand(expr, ctx),
    }
}

fn lower_comparison<'a>(
    left: Operand<'a>,
    op: ComparisonOperator,
    right: Operand<'a>,
) -> TranslationResult<Comparison<'a>> {
    // `constant op field` becomes `field op' constant`
    let (left, op, right) = match (left, op.mirrored()) {
        (Operand::Value(value), Some(mirrored))
            if matches!(
                right,
                Operand::Field(_) | Operand::Arithmetic { .. } | Operand::Negate(_)
            ) =>
        {
            (right, mirrored, Operand::Value(value))
        }
        (left, _) => (left, op, right),
    };

    if matches!(left, Operand::List(_)) {
        return Err(TranslationError::invalid_operand(
            "a list cannot be compared",
        ));
    }

    let right = match right {
        Operand::List(items) if op.is_membership() => Operand::List(items),
        Operand::List(_) => {
            return Err(TranslationError::invalid_operand(format!(
                "operator '{}' cannot take a list",
                op
            )));
        }
        scalar if op.is_membership() => Operand::List(vec![scalar]),
        scalar => scalar,
    };

    if (left.is_null() || right.is_null())
        && !matches!(op, ComparisonOperator::Eq | ComparisonOperator::Ne)
    {
        return Err(TranslationError::invalid_operand(format!(
            "null can only be compared with '=' or '!=', not '{}'",
            op
        )));
    }

    if op.is_pattern() && !matches!(right, Operand::Value(Literal::String(_))) {
        return Err(TranslationError::invalid_operand(format!(
            "operator '{}' requires a string pattern",
            op
        )));
    }

    Ok(Comparison { left, op, right })
}

fn lower_operand<'a>(
    expr: &'a BoundFilter<'a>,
    ctx: &TranslationContext,
) -> TranslationResult<Operand<'a>> {
    match expr {
        Expression::Literal(literal) => Ok(Operand::Value(literal.clone())),
        Expression::Identifier(ident) => Ok(Operand::Field(ident)),
        Expression::External(external) => ctx.resolve(external).map(Operand::Value),
        Expression::Array(array) => array
            .items
            .iter()
            .map(|item| lower_operand(item, ctx))
            .collect::<TranslationResult<Vec<_>>>()
            .map(Operand::List),
        Expression::Arithmetic(arith) => {
            let mut items = arith.items.iter();
            let first = items
                .next()
                .ok_or_else(|| TranslationError::invalid_operand("empty arithmetic expression"))?;
            let mut acc = arithmetic_operand(lower_operand(&first.expression, ctx)?)?;
            for item in items {
                let right = arithmetic_operand(lower_operand(&item.expression, ctx)?)?;
                acc = combine(acc, item.op, right)?;
            }
            Ok(acc)
        }
        Expression::Negative(inner) => match arithmetic_operand(lower_operand(inner, ctx)?)? {
            Operand::Value(literal) => negate(&literal).map(Operand::Value),
            other => Ok(Operand::Negate(Box::new(other))),
        },
        Expression::Parenthesized(inner) => lower_operand(inner, ctx),
        Expression::Comparison(_) | Expression::Logical(_) | Expression::Not(_) => Err(
            TranslationError::invalid_operand(format!("expected a value but found '{}'", expr)),
        ),
    }
}

/// Rejects operands that cannot take part in arithmetic.
fn arithmetic_operand(operand: Operand<'_>) -> TranslationResult<Operand<'_>> {
    match &operand {
        Operand::Value(Literal::Number(_) | Literal::Infinity { .. }) => Ok(operand),
        Operand::Value(other) => Err(TranslationError::UnsupportedLiteral {
            kind: other.kind(),
            context: "arithmetic".to_string(),
        }),
        Operand::List(_) => Err(TranslationError::invalid_operand(
            "a list cannot be used in arithmetic",
        )),
        Operand::Field(_) | Operand::Arithmetic { .. } | Operand::Negate(_) => Ok(operand),
    }
}

fn combine<'a>(
    left: Operand<'a>,
    op: ArithmeticOperator,
    right: Operand<'a>,
) -> TranslationResult<Operand<'a>> {
    match (left, right) {
        (Operand::Value(l), Operand::Value(r)) => fold(&l, op, &r).map(Operand::Value),
        (left, right) => Ok(Operand::Arithmetic {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }),
    }
}

fn number(literal: &Literal) -> TranslationResult<Number> {
    match literal {
        Literal::Number(n) => Ok(*n),
        Literal::Infinity { negative: false } => Ok(Number::Float(f64::INFINITY)),
        Literal::Infinity { negative: true } => Ok(Number::Float(f64::NEG_INFINITY)),
        other => Err(TranslationError::UnsupportedLiteral {
            kind: other.kind(),
            context: "arithmetic".to_string(),
        }),
    }
}

/// Folds `left op right` for numeric literals.
///
/// Integer arithmetic stays integral while it is exact and does not
/// overflow; everything else is computed in `f64`.
pub fn fold(left: &Literal, op: ArithmeticOperator, right: &Literal) -> TranslationResult<Literal> {
    let (l, r) = (number(left)?, number(right)?);

    if let (Number::Integer(a), Number::Integer(b)) = (l, r) {
        let exact = match op {
            ArithmeticOperator::Add => a.checked_add(b),
            ArithmeticOperator::Subtract => a.checked_sub(b),
            ArithmeticOperator::Multiply => a.checked_mul(b),
            ArithmeticOperator::Divide => {
                if b == 0 {
                    return Err(TranslationError::DivisionByZero);
                }
                match a.checked_rem(b) {
                    Some(0) => a.checked_div(b),
                    _ => None,
                }
            }
        };
        if let Some(value) = exact {
            return Ok(Literal::Number(Number::Integer(value)));
        }
    }

    let (a, b) = (l.as_f64(), r.as_f64());
    let value = match op {
        ArithmeticOperator::Add => a + b,
        ArithmeticOperator::Subtract => a - b,
        ArithmeticOperator::Multiply => a * b,
        ArithmeticOperator::Divide => {
            if b == 0.0 {
                return Err(TranslationError::DivisionByZero);
            }
            a / b
        }
    };
    if value.is_nan() {
        return Err(TranslationError::invalid_operand(format!(
            "'{} {} {}' is not a number",
            left, op, right
        )));
    }
    Ok(Literal::from(value))
}

fn negate(literal: &Literal) -> TranslationResult<Literal> {
    match literal {
        Literal::Number(n) => Ok(Literal::Number(n.negate())),
        Literal::Infinity { negative } => Ok(Literal::Infinity {
            negative: !negative,
        }),
        other => Err(TranslationError::UnsupportedLiteral {
            kind: other.kind(),
            context: "negation".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sieve_filter::{AcceptanceRules, ComplexType, DataType, Field, LiteralKind, bind, parse_filter};

    fn schema() -> ComplexType {
        ComplexType::new("Item")
            .with_field(Field::new("a", DataType::Number))
            .with_field(Field::new("b", DataType::Number))
            .with_field(Field::new("name", DataType::String))
            .open()
    }

    fn lowered(input: &str, ctx: &TranslationContext) -> TranslationResult<String> {
        let schema = schema();
        let rules = AcceptanceRules::unrestricted();
        let ast = parse_filter(input).unwrap();
        let bound = bind(&ast, &schema, &rules).unwrap();
        lower(&bound, ctx).map(|p| format!("{:?}", p))
    }

    fn with_ctx_bound<R>(
        input: &str,
        ctx: &TranslationContext,
        f: impl FnOnce(TranslationResult<Predicate<'_>>) -> R,
    ) -> R {
        let schema = schema();
        let rules = AcceptanceRules::unrestricted();
        let ast = parse_filter(input).unwrap();
        let bound = bind(&ast, &schema, &rules).unwrap();
        f(lower(&bound, ctx))
    }

    fn lower_str(input: &str) -> TranslationResult<String> {
        lowered(input, &TranslationContext::new())
    }

    fn with_bound<R>(input: &str, f: impl FnOnce(TranslationResult<Predicate<'_>>) -> R) -> R {
        with_ctx_bound(input, &TranslationContext::new(), f)
    }

    #[test]
    fn test_constant_folding() {
        with_bound("a = 1 + 2 * 3", |p| match p.unwrap() {
            Predicate::Compare(cmp) => assert_eq!(cmp.right, Operand::Value(Literal::from(7))),
            other => panic!("unexpected {:?}", other),
        });
        with_bound("a = 7 / 2", |p| match p.unwrap() {
            Predicate::Compare(cmp) => assert_eq!(cmp.right, Operand::Value(Literal::from(3.5))),
            other => panic!("unexpected {:?}", other),
        });
        with_bound("a = 8 / 2", |p| match p.unwrap() {
            Predicate::Compare(cmp) => assert_eq!(cmp.right, Operand::Value(Literal::from(4))),
            other => panic!("unexpected {:?}", other),
        });
        with_bound("a = -(2 - 5)", |p| match p.unwrap() {
            Predicate::Compare(cmp) => assert_eq!(cmp.right, Operand::Value(Literal::from(3))),
            other => panic!("unexpected {:?}", other),
        });
    }

    #[test]
    fn test_fold_overflow_and_infinity() {
        assert_eq!(
            fold(&Literal::from(i64::MAX), ArithmeticOperator::Add, &Literal::from(1)).unwrap(),
            Literal::from(i64::MAX as f64 + 1.0)
        );
        assert_eq!(
            fold(&Literal::from(1e308), ArithmeticOperator::Multiply, &Literal::from(10)).unwrap(),
            Literal::Infinity { negative: false }
        );
        assert!(matches!(
            fold(
                &Literal::Infinity { negative: false },
                ArithmeticOperator::Subtract,
                &Literal::Infinity { negative: false }
            ),
            Err(TranslationError::InvalidOperand { .. })
        ));
    }

    #[test]
    fn test_division_by_zero() {
        assert_eq!(lower_str("a = 1 / 0"), Err(TranslationError::DivisionByZero));
        assert_eq!(lower_str("a = 1.5 / 0.0"), Err(TranslationError::DivisionByZero));
    }

    #[test]
    fn test_non_numeric_arithmetic() {
        assert_eq!(
            lower_str("a = 1 + 'x'"),
            Err(TranslationError::UnsupportedLiteral {
                kind: LiteralKind::String,
                context: "arithmetic".to_string()
            })
        );
    }

    #[test]
    fn test_field_arithmetic_is_kept() {
        with_bound("a + 1 > b * 2", |p| match p.unwrap() {
            Predicate::Compare(cmp) => {
                assert!(matches!(cmp.left, Operand::Arithmetic { op: ArithmeticOperator::Add, .. }));
                assert!(matches!(
                    cmp.right,
                    Operand::Arithmetic { op: ArithmeticOperator::Multiply, .. }
                ));
                assert!(cmp.field_value().is_none());
            }
            other => panic!("unexpected {:?}", other),
        });
    }

    #[test]
    fn test_scalar_membership_becomes_list() {
        with_bound("name in 'x'", |p| match p.unwrap() {
            Predicate::Compare(cmp) => {
                let (field, values) = cmp.field_values().unwrap();
                assert_eq!(field.path(), "name");
                assert_eq!(values, vec![&Literal::from("x")]);
            }
            other => panic!("unexpected {:?}", other),
        });
    }

    #[test]
    fn test_invalid_operands() {
        assert!(matches!(
            lower_str("a = [1, 2]"),
            Err(TranslationError::InvalidOperand { .. })
        ));
        assert!(matches!(
            lower_str("a > null"),
            Err(TranslationError::InvalidOperand { .. })
        ));
        assert!(matches!(
            lower_str("extra like 5"),
            Err(TranslationError::InvalidOperand { .. })
        ));
    }

    #[test]
    fn test_externals_resolved() {
        let ctx = TranslationContext::new().with_external("min", 10);
        assert!(lowered("a > @min + 1", &ctx).unwrap().contains("Integer(11)"));
        assert_eq!(
            lower_str("a > @min"),
            Err(TranslationError::UnresolvedExternal {
                name: "min".to_string()
            })
        );
    }

    #[test]
    fn test_externals_decoded_as_field_type() {
        let ctx = TranslationContext::new()
            .with_external("min", "10")
            .with_external("word", "abc")
            .with_external("n", 5);
        with_ctx_bound("a > @min", &ctx, |p| match p.unwrap() {
            Predicate::Compare(cmp) => assert_eq!(cmp.right, Operand::Value(Literal::from(10))),
            other => panic!("unexpected {:?}", other),
        });
        with_ctx_bound("a in [@min, 2]", &ctx, |p| match p.unwrap() {
            Predicate::Compare(cmp) => {
                let (_, values) = cmp.field_values().unwrap();
                assert_eq!(values, vec![&Literal::from(10), &Literal::from(2)]);
            }
            other => panic!("unexpected {:?}", other),
        });
        with_ctx_bound("name = @n", &ctx, |p| match p.unwrap() {
            Predicate::Compare(cmp) => assert_eq!(cmp.right, Operand::Value(Literal::from("5"))),
            other => panic!("unexpected {:?}", other),
        });

        let err = lowered("a = @word", &ctx).unwrap_err();
        assert!(matches!(err, TranslationError::InvalidOperand { .. }));
        assert!(err.to_string().contains("'@word'"));
        assert!(matches!(
            lowered("a + 1 < @word", &ctx),
            Err(TranslationError::InvalidOperand { .. })
        ));
        assert!(matches!(
            lowered("@word >= b", &ctx),
            Err(TranslationError::InvalidOperand { .. })
        ));
        // open fields take the value as given
        assert!(lowered("extra = @word", &ctx).is_ok());
    }

    #[test]
    fn test_constant_left_side_is_swapped() {
        with_bound("1 + 2 = a", |p| match p.unwrap() {
            Predicate::Compare(cmp) => {
                let (field, value) = cmp.field_value().unwrap();
                assert_eq!(field.path(), "a");
                assert_eq!(cmp.op, ComparisonOperator::Eq);
                assert_eq!(*value, Literal::from(3));
            }
            other => panic!("unexpected {:?}", other),
        });
        with_bound("10 < a", |p| match p.unwrap() {
            Predicate::Compare(cmp) => {
                assert_eq!(cmp.op, ComparisonOperator::Gt);
                assert!(cmp.field_value().is_some());
            }
            other => panic!("unexpected {:?}", other),
        });
        with_bound("null != a", |p| match p.unwrap() {
            Predicate::Compare(cmp) => {
                assert_eq!(cmp.op, ComparisonOperator::Ne);
                assert!(cmp.right.is_null());
            }
            other => panic!("unexpected {:?}", other),
        });
        with_bound("3 >= a * 2", |p| match p.unwrap() {
            Predicate::Compare(cmp) => {
                assert_eq!(cmp.op, ComparisonOperator::Le);
                assert!(matches!(cmp.left, Operand::Arithmetic { .. }));
            }
            other => panic!("unexpected {:?}", other),
        });
        with_bound("1 in a", |p| match p.unwrap() {
            Predicate::Compare(cmp) => assert_eq!(cmp.left, Operand::Value(Literal::from(1))),
            other => panic!("unexpected {:?}", other),
        });
    }

    #[test]
    fn test_parentheses_and_not() {
        with_bound("not (a = 1 or (b = 2))", |p| match p.unwrap() {
            Predicate::Not(inner) => match *inner {
                Predicate::Or(items) => {
                    assert_eq!(items.len(), 2);
                    assert!(items.iter().all(|i| matches!(i, Predicate::Compare(_))));
                }
                other => panic!("unexpected {:?}", other),
            },
            other => panic!("unexpected {:?}", other),
        });
    }
}
