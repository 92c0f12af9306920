//! Canonical filter text.
//!
//! `Display` for the AST renders the text a client would send. Rendering a
//! parser-produced tree and parsing the result yields the same tree, which
//! makes the rendered form usable as a cache key and for building query
//! strings programmatically.

use std::fmt;

use chrono::SecondsFormat;

use crate::ast::{ExternalConstant, Expression, Literal, QualifiedIdentifier};

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Number(n) => write!(f, "{}", n),
            Literal::String(s) => write_quoted(f, s),
            Literal::Boolean(b) => write!(f, "{}", b),
            Literal::Null => f.write_str("null"),
            Literal::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Literal::Time(t) => write!(f, "{}", t.format("%H:%M:%S%.f")),
            Literal::DateTime(dt) => f.write_str(&dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            Literal::Infinity { negative: false } => f.write_str("Infinity"),
            Literal::Infinity { negative: true } => f.write_str("-Infinity"),
        }
    }
}

fn write_quoted(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    f.write_str("'")?;
    for c in s.chars() {
        match c {
            '\\' => f.write_str("\\\\")?,
            '\'' => f.write_str("\\'")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            c => write!(f, "{}", c)?,
        }
    }
    f.write_str("'")
}

impl fmt::Display for QualifiedIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

impl fmt::Display for ExternalConstant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.name)
    }
}

impl<I: fmt::Display> fmt::Display for Expression<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Literal(literal) => write!(f, "{}", literal),
            Expression::Identifier(ident) => write!(f, "{}", ident),
            Expression::External(external) => write!(f, "{}", external),
            Expression::Array(array) => {
                f.write_str("[")?;
                for (i, item) in array.items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            Expression::Arithmetic(arith) => {
                for (i, item) in arith.items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " {} ", item.op)?;
                    }
                    write!(f, "{}", item.expression)?;
                }
                Ok(())
            }
            Expression::Comparison(cmp) => write!(f, "{} {} {}", cmp.left, cmp.op, cmp.right),
            Expression::Logical(logical) => {
                for (i, item) in logical.items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " {} ", logical.op)?;
                    }
                    write!(f, "{}", item)?;
                }
                Ok(())
            }
            Expression::Parenthesized(inner) => write!(f, "({})", inner),
            Expression::Negative(inner) => write!(f, "-{}", inner),
            Expression::Not(inner) => write!(f, "not {}", inner),
        }
    }
}
