//! Bound filter to [`SqlExpr`] translation.

use chrono::Utc;
use sieve_filter::{BoundFilter, BoundIdentifier, ComparisonOperator, Literal, Number};
use tracing::debug;

use super::dialect::SqlDialect;
use super::sql::{SqlCompareOp, SqlExpr, SqlFragment, SqlParam};
use crate::core::{
    BackendKind, Comparison, FilterCapability, FilterTranslator, LikePattern, Operand, Predicate,
    TranslationContext, lower,
};
use crate::error::{TranslationError, TranslationResult};

/// Default separator between path segments in column names.
pub const DEFAULT_PATH_SEPARATOR: &str = "_";

/// Translates bound filters into SQL expression trees.
///
/// Nested paths map to flattened column names: `address.city` becomes the
/// column `address_city`.
#[derive(Debug, Clone)]
pub struct RelationalTranslator {
    dialect: SqlDialect,
    path_separator: String,
}

impl RelationalTranslator {
    /// Creates a translator for a dialect.
    pub fn new(dialect: SqlDialect) -> Self {
        Self {
            dialect,
            path_separator: DEFAULT_PATH_SEPARATOR.to_string(),
        }
    }

    /// Sets the separator used to flatten nested paths into column names.
    pub fn with_path_separator(mut self, separator: impl Into<String>) -> Self {
        self.path_separator = separator.into();
        self
    }

    /// The target dialect.
    pub fn dialect(&self) -> SqlDialect {
        self.dialect
    }

    /// Column name for a field path.
    pub fn column_name(&self, field: &BoundIdentifier<'_>) -> String {
        field.segments.join(&self.path_separator)
    }

    /// Renders a translated expression in this translator's dialect.
    pub fn render(&self, expr: &SqlExpr, param_offset: usize) -> SqlFragment {
        self.dialect.render(expr, param_offset)
    }

    /// Translates and renders in one step.
    pub fn translate_to_sql(
        &self,
        filter: &BoundFilter<'_>,
        ctx: &TranslationContext,
        param_offset: usize,
    ) -> TranslationResult<SqlFragment> {
        let expr = self.translate(filter, ctx)?;
        Ok(self.render(&expr, param_offset))
    }

    fn predicate(&self, predicate: &Predicate<'_>) -> TranslationResult<SqlExpr> {
        Ok(match predicate {
            Predicate::Compare(cmp) => self.comparison(cmp)?,
            Predicate::And(items) => SqlExpr::And(self.predicates(items)?),
            Predicate::Or(items) => SqlExpr::Or(self.predicates(items)?),
            Predicate::Not(inner) => SqlExpr::not(self.predicate(inner)?),
        })
    }

    fn predicates(&self, items: &[Predicate<'_>]) -> TranslationResult<Vec<SqlExpr>> {
        items.iter().map(|item| self.predicate(item)).collect()
    }

    fn comparison(&self, cmp: &Comparison<'_>) -> TranslationResult<SqlExpr> {
        let left = self.operand(&cmp.left)?;

        if cmp.right.is_null() {
            return Ok(SqlExpr::IsNull {
                expr: Box::new(left),
                negated: cmp.op == ComparisonOperator::Ne,
            });
        }

        if let Some(pattern) = cmp.pattern() {
            let like = SqlExpr::Like {
                expr: Box::new(left),
                pattern: LikePattern::parse(pattern),
                case_insensitive: matches!(
                    cmp.op,
                    ComparisonOperator::ILike | ComparisonOperator::NotILike
                ),
            };
            return Ok(negate_if(cmp.op.is_negated(), like));
        }

        if cmp.op.is_membership() {
            let list = match &cmp.right {
                Operand::List(items) => items
                    .iter()
                    .map(|item| self.operand(item))
                    .collect::<TranslationResult<Vec<_>>>()?,
                other => vec![self.operand(other)?],
            };
            let membership = SqlExpr::InList {
                expr: Box::new(left),
                list,
            };
            return Ok(negate_if(cmp.op.is_negated(), membership));
        }

        let right = self.operand(&cmp.right)?;
        let (op, negated) = match cmp.op {
            ComparisonOperator::Eq => (SqlCompareOp::Eq, false),
            ComparisonOperator::Ne => (SqlCompareOp::Eq, true),
            ComparisonOperator::Gt => (SqlCompareOp::Gt, false),
            ComparisonOperator::Ge => (SqlCompareOp::Ge, false),
            ComparisonOperator::Lt => (SqlCompareOp::Lt, false),
            ComparisonOperator::Le => (SqlCompareOp::Le, false),
            ComparisonOperator::In
            | ComparisonOperator::NotIn
            | ComparisonOperator::Like
            | ComparisonOperator::NotLike
            | ComparisonOperator::ILike
            | ComparisonOperator::NotILike => unreachable!("handled above"),
        };
        Ok(negate_if(negated, SqlExpr::compare(left, op, right)))
    }

    fn operand(&self, operand: &Operand<'_>) -> TranslationResult<SqlExpr> {
        Ok(match operand {
            Operand::Field(field) => SqlExpr::Column(self.column_name(field)),
            Operand::Value(literal) => SqlExpr::Param(literal_to_param(literal)),
            Operand::Arithmetic { left, op, right } => SqlExpr::Arithmetic {
                left: Box::new(self.operand(left)?),
                op: *op,
                right: Box::new(self.operand(right)?),
            },
            Operand::Negate(inner) => SqlExpr::Negate(Box::new(self.operand(inner)?)),
            Operand::List(_) => {
                return Err(TranslationError::invalid_operand(
                    "a list is only valid on the right of 'in'",
                ));
            }
        })
    }
}

impl FilterTranslator for RelationalTranslator {
    type Output = SqlExpr;

    fn kind(&self) -> BackendKind {
        match self.dialect {
            SqlDialect::Sqlite => BackendKind::Sqlite,
            SqlDialect::Postgres => BackendKind::Postgres,
        }
    }

    fn capabilities(&self) -> &'static [FilterCapability] {
        FilterCapability::all()
    }

    fn translate(
        &self,
        filter: &BoundFilter<'_>,
        ctx: &TranslationContext,
    ) -> TranslationResult<SqlExpr> {
        self.check(filter)?;
        let predicate = lower(filter, ctx)?;
        let expr = self.predicate(&predicate)?;
        debug!(backend = %self.kind(), filter = %filter, "translated filter");
        Ok(expr)
    }
}

fn negate_if(negated: bool, expr: SqlExpr) -> SqlExpr {
    if negated { SqlExpr::not(expr) } else { expr }
}

/// Converts a literal to a bound parameter.
pub fn literal_to_param(literal: &Literal) -> SqlParam {
    match literal {
        Literal::Number(Number::Integer(i)) => SqlParam::Integer(*i),
        Literal::Number(Number::Float(f)) => SqlParam::Float(*f),
        Literal::String(s) => SqlParam::Text(s.clone()),
        Literal::Boolean(b) => SqlParam::Bool(*b),
        Literal::Null => SqlParam::Null,
        Literal::Date(d) => SqlParam::Text(d.format("%Y-%m-%d").to_string()),
        Literal::Time(t) => SqlParam::Text(t.format("%H:%M:%S%.f").to_string()),
        Literal::DateTime(dt) => SqlParam::Timestamp(dt.with_timezone(&Utc)),
        Literal::Infinity { negative: false } => SqlParam::Float(f64::INFINITY),
        Literal::Infinity { negative: true } => SqlParam::Float(f64::NEG_INFINITY),
    }
}
