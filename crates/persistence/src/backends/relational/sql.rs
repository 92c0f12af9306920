//! SQL expression tree and rendered fragments.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sieve_filter::ArithmeticOperator;

use crate::core::LikePattern;

/// A SQL boolean or value expression.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlExpr {
    /// Column reference (unquoted name).
    Column(String),
    /// Bound parameter.
    Param(SqlParam),
    /// `TRUE` / `FALSE`.
    Bool(bool),
    /// `left op right`.
    Compare {
        /// Left operand.
        left: Box<SqlExpr>,
        /// Operator.
        op: SqlCompareOp,
        /// Right operand.
        right: Box<SqlExpr>,
    },
    /// `expr IN (list)`. `NULL` items are tested with `IS NULL`.
    InList {
        /// Tested value.
        expr: Box<SqlExpr>,
        /// Candidate values.
        list: Vec<SqlExpr>,
    },
    /// Pattern match.
    Like {
        /// Tested value.
        expr: Box<SqlExpr>,
        /// Parsed `like` pattern; the dialect picks the SQL form.
        pattern: LikePattern,
        /// `ilike` semantics.
        case_insensitive: bool,
    },
    /// `expr IS [NOT] NULL`.
    IsNull {
        /// Tested value.
        expr: Box<SqlExpr>,
        /// `IS NOT NULL` when true.
        negated: bool,
    },
    /// Conjunction.
    And(Vec<SqlExpr>),
    /// Disjunction.
    Or(Vec<SqlExpr>),
    /// Negation that treats an unknown result as false before negating.
    Not(Box<SqlExpr>),
    /// `left op right`.
    Arithmetic {
        /// Left operand.
        left: Box<SqlExpr>,
        /// Operator.
        op: ArithmeticOperator,
        /// Right operand.
        right: Box<SqlExpr>,
    },
    /// `-expr`.
    Negate(Box<SqlExpr>),
}

impl SqlExpr {
    /// Column reference.
    pub fn column(name: impl Into<String>) -> Self {
        SqlExpr::Column(name.into())
    }

    /// Bound parameter.
    pub fn param(param: SqlParam) -> Self {
        SqlExpr::Param(param)
    }

    /// `left op right`.
    pub fn compare(left: SqlExpr, op: SqlCompareOp, right: SqlExpr) -> Self {
        SqlExpr::Compare {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    /// Negation.
    pub fn not(inner: SqlExpr) -> Self {
        SqlExpr::Not(Box::new(inner))
    }
}

/// SQL comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlCompareOp {
    /// `=`
    Eq,
    /// `>`
    Gt,
    /// `>=`
    Ge,
    /// `<`
    Lt,
    /// `<=`
    Le,
}

impl SqlCompareOp {
    /// SQL spelling.
    pub fn as_sql(&self) -> &'static str {
        match self {
            SqlCompareOp::Eq => "=",
            SqlCompareOp::Gt => ">",
            SqlCompareOp::Ge => ">=",
            SqlCompareOp::Lt => "<",
            SqlCompareOp::Le => "<=",
        }
    }
}

/// A bound SQL parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum SqlParam {
    /// Text parameter.
    Text(String),
    /// Integer parameter.
    Integer(i64),
    /// Float parameter.
    Float(f64),
    /// Boolean parameter.
    Bool(bool),
    /// Timestamp parameter.
    Timestamp(DateTime<Utc>),
    /// Null parameter.
    Null,
}

impl SqlParam {
    /// Creates a text parameter.
    pub fn text(s: impl Into<String>) -> Self {
        SqlParam::Text(s.into())
    }

    /// Returns true for [`SqlParam::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, SqlParam::Null)
    }
}

#[cfg(feature = "sqlite")]
impl rusqlite::ToSql for SqlParam {
    fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
        use rusqlite::types::{ToSqlOutput, Value};

        Ok(match self {
            SqlParam::Text(s) => ToSqlOutput::from(s.as_str()),
            SqlParam::Integer(i) => ToSqlOutput::from(*i),
            SqlParam::Float(f) => ToSqlOutput::from(*f),
            SqlParam::Bool(b) => ToSqlOutput::from(*b),
            SqlParam::Timestamp(ts) => ToSqlOutput::from(
                ts.to_rfc3339_opts(chrono::SecondsFormat::AutoSi, true),
            ),
            SqlParam::Null => ToSqlOutput::Owned(Value::Null),
        })
    }
}

/// A SQL fragment with its bound parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SqlFragment {
    /// The SQL clause.
    pub sql: String,
    /// Bound parameter values, in placeholder order.
    pub params: Vec<SqlParam>,
}

impl SqlFragment {
    /// Creates a fragment with parameters.
    pub fn with_params(sql: impl Into<String>, params: Vec<SqlParam>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }

    /// Returns true if this fragment is empty.
    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }
}
