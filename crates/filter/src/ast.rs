//! Abstract syntax tree for filter expressions.
//!
//! The tree is a closed sum type. It is generic over the identifier
//! representation so that the raw tree produced by the parser
//! ([`FilterAst`], identifiers are [`QualifiedIdentifier`]) and the tree
//! produced by schema binding (identifiers carry field references) share a
//! single definition and every traversal stays an exhaustive `match`.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A parsed filter, before binding.
pub type FilterAst = Expression<QualifiedIdentifier>;

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonOperator {
    /// `=`
    Eq,
    /// `!=`
    Ne,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `in`
    In,
    /// `!in`
    NotIn,
    /// `like` (case-sensitive pattern)
    Like,
    /// `!like`
    NotLike,
    /// `ilike` (case-insensitive pattern)
    ILike,
    /// `!ilike`
    NotILike,
}

impl ComparisonOperator {
    /// Returns the operator as written in filter text.
    pub fn as_str(&self) -> &'static str {
        match self {
            ComparisonOperator::Eq => "=",
            ComparisonOperator::Ne => "!=",
            ComparisonOperator::Gt => ">",
            ComparisonOperator::Ge => ">=",
            ComparisonOperator::Lt => "<",
            ComparisonOperator::Le => "<=",
            ComparisonOperator::In => "in",
            ComparisonOperator::NotIn => "!in",
            ComparisonOperator::Like => "like",
            ComparisonOperator::NotLike => "!like",
            ComparisonOperator::ILike => "ilike",
            ComparisonOperator::NotILike => "!ilike",
        }
    }

    /// Parses an operator from its textual form (keywords are case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "=" => Some(ComparisonOperator::Eq),
            "!=" => Some(ComparisonOperator::Ne),
            ">" => Some(ComparisonOperator::Gt),
            ">=" => Some(ComparisonOperator::Ge),
            "<" => Some(ComparisonOperator::Lt),
            "<=" => Some(ComparisonOperator::Le),
            "in" => Some(ComparisonOperator::In),
            "!in" => Some(ComparisonOperator::NotIn),
            "like" => Some(ComparisonOperator::Like),
            "!like" => Some(ComparisonOperator::NotLike),
            "ilike" => Some(ComparisonOperator::ILike),
            "!ilike" => Some(ComparisonOperator::NotILike),
            _ => None,
        }
    }

    /// All comparison operators.
    pub fn all() -> &'static [ComparisonOperator] {
        &[
            ComparisonOperator::Eq,
            ComparisonOperator::Ne,
            ComparisonOperator::Gt,
            ComparisonOperator::Ge,
            ComparisonOperator::Lt,
            ComparisonOperator::Le,
            ComparisonOperator::In,
            ComparisonOperator::NotIn,
            ComparisonOperator::Like,
            ComparisonOperator::NotLike,
            ComparisonOperator::ILike,
            ComparisonOperator::NotILike,
        ]
    }

    /// Returns the operator that gives the same result with the sides
    /// swapped, or `None` for membership and pattern operators.
    pub fn mirrored(&self) -> Option<ComparisonOperator> {
        match self {
            ComparisonOperator::Eq => Some(ComparisonOperator::Eq),
            ComparisonOperator::Ne => Some(ComparisonOperator::Ne),
            ComparisonOperator::Gt => Some(ComparisonOperator::Lt),
            ComparisonOperator::Ge => Some(ComparisonOperator::Le),
            ComparisonOperator::Lt => Some(ComparisonOperator::Gt),
            ComparisonOperator::Le => Some(ComparisonOperator::Ge),
            _ => None,
        }
    }

    /// Returns true for the pattern operators (`like`, `ilike` and negations).
    pub fn is_pattern(&self) -> bool {
        matches!(
            self,
            ComparisonOperator::Like
                | ComparisonOperator::NotLike
                | ComparisonOperator::ILike
                | ComparisonOperator::NotILike
        )
    }

    /// Returns true for `in` and `!in`.
    pub fn is_membership(&self) -> bool {
        matches!(self, ComparisonOperator::In | ComparisonOperator::NotIn)
    }

    /// Returns true for `<`, `<=`, `>` and `>=`.
    pub fn is_range(&self) -> bool {
        matches!(
            self,
            ComparisonOperator::Gt
                | ComparisonOperator::Ge
                | ComparisonOperator::Lt
                | ComparisonOperator::Le
        )
    }

    /// Returns true for the negated forms (`!=`, `!in`, `!like`, `!ilike`).
    pub fn is_negated(&self) -> bool {
        matches!(
            self,
            ComparisonOperator::Ne
                | ComparisonOperator::NotIn
                | ComparisonOperator::NotLike
                | ComparisonOperator::NotILike
        )
    }
}

impl fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComparisonOperator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ComparisonOperator::parse(s.trim()).ok_or_else(|| format!("unknown operator '{}'", s))
    }
}

impl Serialize for ComparisonOperator {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ComparisonOperator {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Logical combinators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalOperator {
    /// Conjunction.
    And,
    /// Disjunction.
    Or,
}

impl fmt::Display for LogicalOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalOperator::And => write!(f, "and"),
            LogicalOperator::Or => write!(f, "or"),
        }
    }
}

/// Arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithmeticOperator {
    /// `+`
    Add,
    /// `-`
    Subtract,
    /// `*`
    Multiply,
    /// `/`
    Divide,
}

impl ArithmeticOperator {
    /// Returns the operator symbol.
    pub fn as_str(&self) -> &'static str {
        match self {
            ArithmeticOperator::Add => "+",
            ArithmeticOperator::Subtract => "-",
            ArithmeticOperator::Multiply => "*",
            ArithmeticOperator::Divide => "/",
        }
    }

    /// Returns true for `*` and `/`.
    pub fn is_multiplicative(&self) -> bool {
        matches!(self, ArithmeticOperator::Multiply | ArithmeticOperator::Divide)
    }
}

impl fmt::Display for ArithmeticOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A numeric literal value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    /// Integral value that fits in `i64`.
    Integer(i64),
    /// Any other finite number.
    Float(f64),
}

impl Number {
    /// Returns the value as `f64`.
    pub fn as_f64(&self) -> f64 {
        match self {
            Number::Integer(i) => *i as f64,
            Number::Float(f) => *f,
        }
    }

    /// Returns the negated number, widening to float on overflow.
    pub fn negate(self) -> Number {
        match self {
            Number::Integer(i) => i
                .checked_neg()
                .map(Number::Integer)
                .unwrap_or(Number::Float(-(i as f64))),
            Number::Float(f) => Number::Float(-f),
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Integer(i) => write!(f, "{}", i),
            // Debug output always keeps a '.' or exponent, so floats stay floats when re-lexed
            Number::Float(v) => write!(f, "{:?}", v),
        }
    }
}

/// Lexical kind of a literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LiteralKind {
    /// Numeric literal.
    Number,
    /// Quoted string.
    String,
    /// `true` / `false`.
    Boolean,
    /// `null`.
    Null,
    /// `YYYY-MM-DD`.
    Date,
    /// `HH:MM[:SS[.fff]]`.
    Time,
    /// Date and time with optional offset.
    DateTime,
    /// `Infinity` / `-Infinity`.
    Infinity,
}

impl fmt::Display for LiteralKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LiteralKind::Number => "number",
            LiteralKind::String => "string",
            LiteralKind::Boolean => "boolean",
            LiteralKind::Null => "null",
            LiteralKind::Date => "date",
            LiteralKind::Time => "time",
            LiteralKind::DateTime => "datetime",
            LiteralKind::Infinity => "infinity",
        };
        f.write_str(name)
    }
}

/// A typed literal value.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// Number.
    Number(Number),
    /// String.
    String(String),
    /// Boolean.
    Boolean(bool),
    /// Null.
    Null,
    /// Calendar date.
    Date(NaiveDate),
    /// Time of day.
    Time(NaiveTime),
    /// Instant with offset. Literals written without an offset are UTC.
    DateTime(DateTime<FixedOffset>),
    /// Positive or negative infinity.
    Infinity {
        /// True for `-Infinity`.
        negative: bool,
    },
}

impl Literal {
    /// Returns the lexical kind of this literal.
    pub fn kind(&self) -> LiteralKind {
        match self {
            Literal::Number(_) => LiteralKind::Number,
            Literal::String(_) => LiteralKind::String,
            Literal::Boolean(_) => LiteralKind::Boolean,
            Literal::Null => LiteralKind::Null,
            Literal::Date(_) => LiteralKind::Date,
            Literal::Time(_) => LiteralKind::Time,
            Literal::DateTime(_) => LiteralKind::DateTime,
            Literal::Infinity { .. } => LiteralKind::Infinity,
        }
    }

    /// Returns the numeric value for numbers and infinities.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Literal::Number(n) => Some(n.as_f64()),
            Literal::Infinity { negative: false } => Some(f64::INFINITY),
            Literal::Infinity { negative: true } => Some(f64::NEG_INFINITY),
            _ => None,
        }
    }

    /// Returns the string value for string literals.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Literal::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns true for `null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Literal::Null)
    }
}

impl From<&str> for Literal {
    fn from(s: &str) -> Self {
        Literal::String(s.to_string())
    }
}

impl From<String> for Literal {
    fn from(s: String) -> Self {
        Literal::String(s)
    }
}

impl From<i64> for Literal {
    fn from(i: i64) -> Self {
        Literal::Number(Number::Integer(i))
    }
}

impl From<i32> for Literal {
    fn from(i: i32) -> Self {
        Literal::Number(Number::Integer(i64::from(i)))
    }
}

impl From<f64> for Literal {
    fn from(f: f64) -> Self {
        if f.is_infinite() {
            Literal::Infinity {
                negative: f.is_sign_negative(),
            }
        } else {
            Literal::Number(Number::Float(f))
        }
    }
}

impl From<bool> for Literal {
    fn from(b: bool) -> Self {
        Literal::Boolean(b)
    }
}

impl From<NaiveDate> for Literal {
    fn from(d: NaiveDate) -> Self {
        Literal::Date(d)
    }
}

/// A dotted field path such as `address.city`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QualifiedIdentifier {
    /// Path segments, in order.
    pub segments: Vec<String>,
}

impl QualifiedIdentifier {
    /// Creates an identifier from its segments.
    pub fn new(segments: Vec<String>) -> Self {
        Self { segments }
    }

    /// Splits a dotted path into an identifier.
    pub fn from_path(path: &str) -> Self {
        Self {
            segments: path.split('.').map(str::to_string).collect(),
        }
    }

    /// Returns the dotted path.
    pub fn path(&self) -> String {
        self.segments.join(".")
    }
}

/// A placeholder resolved by the caller's execution context (`@name`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExternalConstant {
    /// Name without the `@` marker.
    pub name: String,
}

/// A bracketed list of items.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayExpression<I> {
    /// Items in source order.
    pub items: Vec<Expression<I>>,
}

/// One operand of an arithmetic expression, with the operator preceding it.
///
/// The first item of an [`ArithmeticExpression`] always carries
/// [`ArithmeticOperator::Add`].
#[derive(Debug, Clone, PartialEq)]
pub struct ArithmeticItem<I> {
    /// Operator applied between the running value and this operand.
    pub op: ArithmeticOperator,
    /// The operand.
    pub expression: Expression<I>,
}

/// A left-associative chain of operands at one precedence level.
#[derive(Debug, Clone, PartialEq)]
pub struct ArithmeticExpression<I> {
    /// Operands with their leading operators.
    pub items: Vec<ArithmeticItem<I>>,
}

impl<I> ArithmeticExpression<I> {
    /// Starts a chain with its first operand.
    pub fn new(first: Expression<I>) -> Self {
        Self {
            items: vec![ArithmeticItem {
                op: ArithmeticOperator::Add,
                expression: first,
            }],
        }
    }

    /// Appends an operand.
    pub fn push(&mut self, op: ArithmeticOperator, expression: Expression<I>) {
        self.items.push(ArithmeticItem { op, expression });
    }
}

/// `left op right`.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonExpression<I> {
    /// Field, arithmetic or negation being compared.
    pub left: Box<Expression<I>>,
    /// Operator.
    pub op: ComparisonOperator,
    /// Value side.
    pub right: Box<Expression<I>>,
}

/// `a and b and ...` / `a or b or ...`.
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalExpression<I> {
    /// Combinator.
    pub op: LogicalOperator,
    /// Combined expressions.
    pub items: Vec<Expression<I>>,
}

/// A filter expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression<I> {
    /// Typed literal.
    Literal(Literal),
    /// Field path.
    Identifier(I),
    /// `@name` placeholder.
    External(ExternalConstant),
    /// `[a, b, c]`.
    Array(ArrayExpression<I>),
    /// `a + b * c`.
    Arithmetic(ArithmeticExpression<I>),
    /// `a = b`.
    Comparison(ComparisonExpression<I>),
    /// `a and b` / `a or b`.
    Logical(LogicalExpression<I>),
    /// `( expression )`.
    Parenthesized(Box<Expression<I>>),
    /// Unary arithmetic negation, `-expression`.
    Negative(Box<Expression<I>>),
    /// Logical negation, `not expression`.
    Not(Box<Expression<I>>),
}

impl<I> Expression<I> {
    /// Returns true if the node evaluates to a boolean (a predicate).
    pub fn is_boolean(&self) -> bool {
        match self {
            Expression::Comparison(_) | Expression::Logical(_) | Expression::Not(_) => true,
            Expression::Parenthesized(inner) => inner.is_boolean(),
            Expression::Literal(_)
            | Expression::Identifier(_)
            | Expression::External(_)
            | Expression::Array(_)
            | Expression::Arithmetic(_)
            | Expression::Negative(_) => false,
        }
    }

    /// Strips any number of enclosing parentheses.
    pub fn unwrap_parens(&self) -> &Expression<I> {
        match self {
            Expression::Parenthesized(inner) => inner.unwrap_parens(),
            other => other,
        }
    }

    /// Visits every identifier in the tree, depth first.
    pub fn for_each_identifier<'a>(&'a self, visit: &mut impl FnMut(&'a I)) {
        match self {
            Expression::Identifier(ident) => visit(ident),
            Expression::Literal(_) | Expression::External(_) => {}
            Expression::Array(array) => {
                for item in &array.items {
                    item.for_each_identifier(visit);
                }
            }
            Expression::Arithmetic(arith) => {
                for item in &arith.items {
                    item.expression.for_each_identifier(visit);
                }
            }
            Expression::Comparison(cmp) => {
                cmp.left.for_each_identifier(visit);
                cmp.right.for_each_identifier(visit);
            }
            Expression::Logical(logical) => {
                for item in &logical.items {
                    item.for_each_identifier(visit);
                }
            }
            Expression::Parenthesized(inner)
            | Expression::Negative(inner)
            | Expression::Not(inner) => inner.for_each_identifier(visit),
        }
    }
}
