//! Dialect-specific SQL rendering.

use std::fmt;
use std::str::FromStr;

use sieve_filter::ArithmeticOperator;

use super::sql::{SqlExpr, SqlFragment, SqlParam};

/// SQL dialects the relational translator renders for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlDialect {
    /// SQLite: `?N` placeholders, `GLOB` for case-sensitive patterns.
    Sqlite,
    /// PostgreSQL: `$N` placeholders, `LIKE`, ASCII-folded `translate()` for `ilike`.
    Postgres,
}

impl SqlDialect {
    /// Placeholder for the 1-based parameter index.
    pub fn placeholder(&self, index: usize) -> String {
        match self {
            SqlDialect::Sqlite => format!("?{}", index),
            SqlDialect::Postgres => format!("${}", index),
        }
    }

    /// Renders an expression. Placeholders are numbered after
    /// `param_offset` existing parameters.
    pub fn render(&self, expr: &SqlExpr, param_offset: usize) -> SqlFragment {
        let mut renderer = Renderer {
            dialect: *self,
            offset: param_offset,
            params: Vec::new(),
        };
        let sql = renderer.expr(expr);
        SqlFragment::with_params(sql, renderer.params)
    }
}

impl fmt::Display for SqlDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlDialect::Sqlite => write!(f, "sqlite"),
            SqlDialect::Postgres => write!(f, "postgres"),
        }
    }
}

impl FromStr for SqlDialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sqlite" => Ok(SqlDialect::Sqlite),
            "postgres" | "postgresql" => Ok(SqlDialect::Postgres),
            other => Err(format!("unknown SQL dialect '{}'", other)),
        }
    }
}

/// Quotes an identifier, doubling embedded quotes.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

struct Renderer {
    dialect: SqlDialect,
    offset: usize,
    params: Vec<SqlParam>,
}

impl Renderer {
    fn bind(&mut self, param: SqlParam) -> String {
        self.params.push(param);
        self.dialect.placeholder(self.offset + self.params.len())
    }

    fn expr(&mut self, expr: &SqlExpr) -> String {
        match expr {
            SqlExpr::Column(name) => quote_identifier(name),
            SqlExpr::Param(param) => self.bind(param.clone()),
            SqlExpr::Bool(true) => "TRUE".to_string(),
            SqlExpr::Bool(false) => "FALSE".to_string(),
            SqlExpr::Compare { left, op, right } => {
                format!("{} {} {}", self.expr(left), op.as_sql(), self.expr(right))
            }
            SqlExpr::InList { expr, list } => self.in_list(expr, list),
            SqlExpr::Like {
                expr,
                pattern,
                case_insensitive,
            } => {
                let target = self.expr(expr);
                match (self.dialect, case_insensitive) {
                    (SqlDialect::Sqlite, false) => {
                        let p = self.bind(SqlParam::Text(pattern.to_glob()));
                        format!("{} GLOB {}", target, p)
                    }
                    // SQLite's LOWER folds ASCII letters only
                    (SqlDialect::Sqlite, true) => {
                        let p = self.bind(SqlParam::Text(pattern.to_sql_like()));
                        format!("LOWER({}) LIKE LOWER({}) ESCAPE '\\'", target, p)
                    }
                    (SqlDialect::Postgres, false) => {
                        let p = self.bind(SqlParam::Text(pattern.to_sql_like()));
                        format!("{} LIKE {} ESCAPE '\\'", target, p)
                    }
                    // ILIKE and LOWER follow the database locale; translate() folds ASCII only
                    (SqlDialect::Postgres, true) => {
                        let p = self.bind(SqlParam::Text(pattern.to_ascii_lowercase().to_sql_like()));
                        format!(
                            "translate({}, '{}', '{}') LIKE {} ESCAPE '\\'",
                            target, ASCII_UPPER, ASCII_LOWER, p
                        )
                    }
                }
            }
            SqlExpr::IsNull { expr, negated } => {
                let target = self.expr(expr);
                if *negated {
                    format!("{} IS NOT NULL", target)
                } else {
                    format!("{} IS NULL", target)
                }
            }
            SqlExpr::And(items) => self.junction(items, "AND", "TRUE"),
            SqlExpr::Or(items) => self.junction(items, "OR", "FALSE"),
            SqlExpr::Not(inner) => format!("NOT COALESCE({}, FALSE)", self.expr(inner)),
            SqlExpr::Arithmetic { left, op, right } => {
                let (l, r) = (self.expr(left), self.expr(right));
                match op {
                    // Force real division for integer columns
                    ArithmeticOperator::Divide => format!("({} * 1.0 / {})", l, r),
                    op => format!("({} {} {})", l, op.as_str(), r),
                }
            }
            SqlExpr::Negate(inner) => format!("(-{})", self.expr(inner)),
        }
    }

    fn junction(&mut self, items: &[SqlExpr], keyword: &str, empty: &str) -> String {
        match items {
            [] => empty.to_string(),
            [only] => self.expr(only),
            items => items
                .iter()
                .map(|item| format!("({})", self.expr(item)))
                .collect::<Vec<_>>()
                .join(&format!(" {} ", keyword)),
        }
    }

    fn in_list(&mut self, expr: &SqlExpr, list: &[SqlExpr]) -> String {
        let has_null = list
            .iter()
            .any(|item| matches!(item, SqlExpr::Param(p) if p.is_null()));
        let values: Vec<&SqlExpr> = list
            .iter()
            .filter(|item| !matches!(item, SqlExpr::Param(p) if p.is_null()))
            .collect();

        match (has_null, values.is_empty()) {
            (false, true) => "FALSE".to_string(),
            (true, true) => format!("{} IS NULL", self.expr(expr)),
            (has_null, false) => {
                let null_test = if has_null {
                    Some(format!("{} IS NULL", self.expr(expr)))
                } else {
                    None
                };
                let target = self.expr(expr);
                let items: Vec<String> = values.into_iter().map(|v| self.expr(v)).collect();
                let membership = format!("{} IN ({})", target, items.join(", "));
                match null_test {
                    Some(null_test) => format!("({} OR {})", null_test, membership),
                    None => membership,
                }
            }
        }
    }
}

const ASCII_UPPER: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const ASCII_LOWER: &str = "abcdefghijklmnopqrstuvwxyz";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::relational::SqlCompareOp;
    use crate::core::LikePattern;

    fn col(name: &str) -> Box<SqlExpr> {
        Box::new(SqlExpr::column(name))
    }

    #[test]
    fn test_placeholders_and_offset() {
        let expr = SqlExpr::And(vec![
            SqlExpr::compare(
                SqlExpr::column("age"),
                SqlCompareOp::Ge,
                SqlExpr::param(SqlParam::Integer(18)),
            ),
            SqlExpr::compare(
                SqlExpr::column("status"),
                SqlCompareOp::Eq,
                SqlExpr::param(SqlParam::text("active")),
            ),
        ]);
        let sqlite = SqlDialect::Sqlite.render(&expr, 0);
        assert_eq!(sqlite.sql, "(\"age\" >= ?1) AND (\"status\" = ?2)");
        assert_eq!(sqlite.params.len(), 2);

        let postgres = SqlDialect::Postgres.render(&expr, 2);
        assert_eq!(postgres.sql, "(\"age\" >= $3) AND (\"status\" = $4)");
    }

    #[test]
    fn test_patterns_per_dialect() {
        let like = SqlExpr::Like {
            expr: col("name"),
            pattern: LikePattern::parse("Jo%"),
            case_insensitive: false,
        };
        let ilike = SqlExpr::Like {
            expr: col("name"),
            pattern: LikePattern::parse("JÖ_"),
            case_insensitive: true,
        };

        let f = SqlDialect::Sqlite.render(&like, 0);
        assert_eq!(f.sql, "\"name\" GLOB ?1");
        assert_eq!(f.params, vec![SqlParam::text("Jo*")]);
        let f = SqlDialect::Sqlite.render(&ilike, 0);
        assert_eq!(f.sql, "LOWER(\"name\") LIKE LOWER(?1) ESCAPE '\\'");
        assert_eq!(f.params, vec![SqlParam::text("JÖ_")]);

        let f = SqlDialect::Postgres.render(&like, 0);
        assert_eq!(f.sql, "\"name\" LIKE $1 ESCAPE '\\'");
        assert_eq!(f.params, vec![SqlParam::text("Jo%")]);
        let f = SqlDialect::Postgres.render(&ilike, 0);
        assert_eq!(
            f.sql,
            "translate(\"name\", 'ABCDEFGHIJKLMNOPQRSTUVWXYZ', 'abcdefghijklmnopqrstuvwxyz') \
             LIKE $1 ESCAPE '\\'"
        );
        assert_eq!(f.params, vec![SqlParam::text("jÖ_")]);
    }

    #[test]
    fn test_in_list_nulls() {
        let render = |list: Vec<SqlExpr>| {
            SqlDialect::Sqlite
                .render(&SqlExpr::InList { expr: col("a"), list }, 0)
                .sql
        };
        assert_eq!(render(vec![]), "FALSE");
        assert_eq!(render(vec![SqlExpr::param(SqlParam::Null)]), "\"a\" IS NULL");
        assert_eq!(
            render(vec![
                SqlExpr::param(SqlParam::Integer(1)),
                SqlExpr::param(SqlParam::Null)
            ]),
            "(\"a\" IS NULL OR \"a\" IN (?1))"
        );
    }

    #[test]
    fn test_not_arithmetic_and_quoting() {
        let expr = SqlExpr::not(SqlExpr::compare(
            SqlExpr::Arithmetic {
                left: col("a"),
                op: ArithmeticOperator::Divide,
                right: Box::new(SqlExpr::Negate(col("b\"x"))),
            },
            SqlCompareOp::Lt,
            SqlExpr::param(SqlParam::Float(0.5)),
        ));
        assert_eq!(
            SqlDialect::Postgres.render(&expr, 0).sql,
            "NOT COALESCE((\"a\" * 1.0 / (-\"b\"\"x\")) < $1, FALSE)"
        );
        assert_eq!(SqlDialect::Sqlite.render(&SqlExpr::Or(vec![]), 0).sql, "FALSE");
    }
}
