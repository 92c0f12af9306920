//! MongoDB-style filter evaluation over JSON documents.

use std::cmp::Ordering;

use chrono::{DateTime, NaiveDate, Utc};
use regex::{Regex, RegexBuilder};
use serde_json::{Map, Value};

use super::MatchError;

/// A compiled filter document.
///
/// Supports the query operators the MongoDB translator emits: `$and`, `$or`,
/// `$nor`, `$eq`, `$ne`, `$gt`, `$gte`, `$lt`, `$lte`, `$in`, `$nin`,
/// `$regex` (with `$options`), `$not` and `$expr` with `$add`, `$subtract`,
/// `$multiply`, `$divide`, `$and`, `$or`, `$in`, `$not`, `$regexMatch` and
/// `$literal`.
///
/// Query operators compare values only within one category (numbers,
/// strings, booleans, dates, null). Inside `$expr` every pair of values is
/// ordered, by type first (missing, null, numbers, strings, objects, arrays,
/// booleans, dates) and then by value, and a missing field is distinct
/// from `null`. Strings compared with `{"$date": ...}` values are parsed as
/// RFC 3339 instants or `YYYY-MM-DD` dates.
#[derive(Debug, Clone)]
pub struct DocumentMatcher {
    root: Condition,
}

impl DocumentMatcher {
    /// Compiles a filter document.
    pub fn new(filter: &Value) -> Result<Self, MatchError> {
        Ok(Self {
            root: compile_document(filter)?,
        })
    }

    /// Returns true if the document satisfies the filter.
    pub fn matches(&self, document: &Value) -> bool {
        self.root.matches(document)
    }
}

#[derive(Debug, Clone)]
enum Condition {
    All(Vec<Condition>),
    Any(Vec<Condition>),
    NoneOf(Vec<Condition>),
    Field { path: Vec<String>, ops: Vec<FieldOp> },
    Expr(Expr),
}

impl Condition {
    fn matches(&self, document: &Value) -> bool {
        match self {
            Condition::All(items) => items.iter().all(|c| c.matches(document)),
            Condition::Any(items) => items.iter().any(|c| c.matches(document)),
            Condition::NoneOf(items) => !items.iter().any(|c| c.matches(document)),
            Condition::Field { path, ops } => {
                let mut found = Vec::new();
                collect_values(document, path, &mut found);
                let candidates: Vec<Val> = found.into_iter().map(Val::from_json).collect();
                ops.iter().all(|op| op.matches(&candidates))
            }
            Condition::Expr(expr) => expr.eval(document).is_truthy(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum RangeOp {
    Gt,
    Gte,
    Lt,
    Lte,
}

impl RangeOp {
    fn accepts(self, ordering: Ordering) -> bool {
        match self {
            RangeOp::Gt => ordering == Ordering::Greater,
            RangeOp::Gte => ordering != Ordering::Less,
            RangeOp::Lt => ordering == Ordering::Less,
            RangeOp::Lte => ordering != Ordering::Greater,
        }
    }

    fn parse(op: &str) -> Option<Self> {
        match op {
            "$gt" => Some(RangeOp::Gt),
            "$gte" => Some(RangeOp::Gte),
            "$lt" => Some(RangeOp::Lt),
            "$lte" => Some(RangeOp::Lte),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
enum FieldOp {
    Eq(Val),
    Ne(Val),
    Range(RangeOp, Val),
    In(Vec<Val>),
    Nin(Vec<Val>),
    Regex(Regex),
    Not(Vec<FieldOp>),
}

impl FieldOp {
    fn matches(&self, candidates: &[Val]) -> bool {
        match self {
            FieldOp::Eq(value) => equals_any(candidates, value),
            FieldOp::Ne(value) => !equals_any(candidates, value),
            FieldOp::Range(op, value) => candidates
                .iter()
                .any(|c| c.compare(value).is_some_and(|o| op.accepts(o))),
            FieldOp::In(values) => values.iter().any(|v| equals_any(candidates, v)),
            FieldOp::Nin(values) => !values.iter().any(|v| equals_any(candidates, v)),
            FieldOp::Regex(regex) => candidates
                .iter()
                .any(|c| matches!(c, Val::String(s) if regex.is_match(s))),
            FieldOp::Not(ops) => !ops.iter().all(|op| op.matches(candidates)),
        }
    }
}

/// A missing field equals `null`.
fn equals_any(candidates: &[Val], value: &Val) -> bool {
    if candidates.is_empty() {
        return matches!(value, Val::Null);
    }
    candidates.iter().any(|c| c.equals(value))
}

#[derive(Debug, Clone, Copy)]
enum ArithOp {
    Add,
    Subtract,
    Multiply,
    Divide,
}

#[derive(Debug, Clone, Copy)]
enum CompareOp {
    Eq,
    Ne,
    Range(RangeOp),
}

#[derive(Debug, Clone)]
enum Expr {
    Field(Vec<String>),
    Literal(Val),
    Array(Vec<Expr>),
    Arithmetic(ArithOp, Vec<Expr>),
    Compare(CompareOp, Box<Expr>, Box<Expr>),
    In(Box<Expr>, Box<Expr>),
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Not(Box<Expr>),
    RegexMatch(Box<Expr>, Regex),
}

impl Expr {
    fn eval(&self, document: &Value) -> Val {
        match self {
            Expr::Field(path) => lookup(document, path).map_or(Val::Missing, Val::from_json),
            Expr::Literal(value) => value.clone(),
            Expr::Array(items) => Val::Array(items.iter().map(|e| e.eval(document)).collect()),
            Expr::Arithmetic(op, args) => {
                let mut numbers = Vec::with_capacity(args.len());
                for arg in args {
                    match arg.eval(document) {
                        Val::Number(n) => numbers.push(n),
                        _ => return Val::Null,
                    }
                }
                arithmetic(*op, &numbers).map_or(Val::Null, Val::Number)
            }
            Expr::Compare(op, left, right) => {
                let (l, r) = (left.eval(document), right.eval(document));
                let ordering = l.aggregate_cmp(&r);
                Val::Bool(match op {
                    CompareOp::Eq => ordering == Ordering::Equal,
                    CompareOp::Ne => ordering != Ordering::Equal,
                    CompareOp::Range(range) => range.accepts(ordering),
                })
            }
            Expr::In(item, list) => {
                let item = item.eval(document).or_null();
                match list.eval(document) {
                    Val::Array(values) => Val::Bool(
                        values
                            .into_iter()
                            .any(|v| v.or_null().aggregate_cmp(&item) == Ordering::Equal),
                    ),
                    _ => Val::Bool(false),
                }
            }
            Expr::And(items) => Val::Bool(items.iter().all(|e| e.eval(document).is_truthy())),
            Expr::Or(items) => Val::Bool(items.iter().any(|e| e.eval(document).is_truthy())),
            Expr::Not(inner) => Val::Bool(!inner.eval(document).is_truthy()),
            Expr::RegexMatch(input, regex) => match input.eval(document) {
                Val::String(s) => Val::Bool(regex.is_match(&s)),
                _ => Val::Bool(false),
            },
        }
    }
}

fn arithmetic(op: ArithOp, numbers: &[f64]) -> Option<f64> {
    let (first, rest) = numbers.split_first()?;
    match op {
        ArithOp::Add => Some(first + rest.iter().sum::<f64>()),
        ArithOp::Multiply => Some(first * rest.iter().product::<f64>()),
        ArithOp::Subtract => match rest {
            [second] => Some(first - second),
            _ => None,
        },
        ArithOp::Divide => match rest {
            [second] if *second != 0.0 => Some(first / second),
            _ => None,
        },
    }
}

/// A JSON value viewed for comparison.
#[derive(Debug, Clone, PartialEq)]
enum Val {
    /// An absent field inside `$expr`.
    Missing,
    Null,
    Number(f64),
    String(String),
    Bool(bool),
    Date(DateTime<Utc>),
    Array(Vec<Val>),
    Other(Value),
}

impl Val {
    fn from_json(value: &Value) -> Val {
        match value {
            Value::Null => Val::Null,
            Value::Bool(b) => Val::Bool(*b),
            Value::Number(n) => n.as_f64().map_or(Val::Null, Val::Number),
            Value::String(s) => Val::String(s.clone()),
            Value::Array(items) => Val::Array(items.iter().map(Val::from_json).collect()),
            Value::Object(map) => match wrapped_value(map) {
                Some(val) => val,
                None => Val::Other(value.clone()),
            },
        }
    }

    fn compare(&self, other: &Val) -> Option<Ordering> {
        match (self, other) {
            (Val::Null, Val::Null) => Some(Ordering::Equal),
            (Val::Number(a), Val::Number(b)) => a.partial_cmp(b),
            (Val::String(a), Val::String(b)) => Some(a.cmp(b)),
            (Val::Bool(a), Val::Bool(b)) => Some(a.cmp(b)),
            (Val::Date(a), Val::Date(b)) => Some(a.cmp(b)),
            (Val::Date(a), Val::String(s)) => parse_instant(s).map(|b| a.cmp(&b)),
            (Val::String(s), Val::Date(b)) => parse_instant(s).map(|a| a.cmp(b)),
            _ => None,
        }
    }

    /// Total order used by aggregation expressions.
    fn aggregate_cmp(&self, other: &Val) -> Ordering {
        match (self, other) {
            (Val::Number(a), Val::Number(b)) => {
                a.partial_cmp(b).unwrap_or_else(|| b.is_nan().cmp(&a.is_nan()))
            }
            (Val::Array(a), Val::Array(b)) => a
                .iter()
                .zip(b)
                .map(|(x, y)| x.aggregate_cmp(y))
                .find(|o| o.is_ne())
                .unwrap_or_else(|| a.len().cmp(&b.len())),
            (Val::Other(a), Val::Other(b)) if a == b => Ordering::Equal,
            (Val::Other(a), Val::Other(b)) => a.to_string().cmp(&b.to_string()),
            _ => self
                .compare(other)
                .unwrap_or_else(|| self.type_rank().cmp(&other.type_rank())),
        }
    }

    fn type_rank(&self) -> u8 {
        match self {
            Val::Missing => 0,
            Val::Null => 1,
            Val::Number(_) => 2,
            Val::String(_) => 3,
            Val::Other(_) => 4,
            Val::Array(_) => 5,
            Val::Bool(_) => 6,
            Val::Date(_) => 7,
        }
    }

    fn or_null(self) -> Val {
        match self {
            Val::Missing => Val::Null,
            other => other,
        }
    }

    fn equals(&self, other: &Val) -> bool {
        match (self, other) {
            (Val::Array(a), Val::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.equals(y))
            }
            (Val::Other(a), Val::Other(b)) => a == b,
            _ => self.compare(other) == Some(Ordering::Equal),
        }
    }

    fn is_truthy(&self) -> bool {
        match self {
            Val::Missing | Val::Null => false,
            Val::Bool(b) => *b,
            Val::Number(n) => *n != 0.0,
            _ => true,
        }
    }
}

/// Extended JSON wrappers: `{"$date": ...}` and `{"$numberDouble": ...}`.
fn wrapped_value(map: &Map<String, Value>) -> Option<Val> {
    if map.len() != 1 {
        return None;
    }
    match map.iter().next() {
        Some((key, Value::String(s))) if key == "$date" => parse_instant(s).map(Val::Date),
        Some((key, Value::String(s))) if key == "$numberDouble" => match s.as_str() {
            "Infinity" => Some(Val::Number(f64::INFINITY)),
            "-Infinity" => Some(Val::Number(f64::NEG_INFINITY)),
            other => other.parse().ok().map(Val::Number),
        },
        _ => None,
    }
}

fn is_wrapper(map: &Map<String, Value>) -> bool {
    map.len() == 1 && (map.contains_key("$date") || map.contains_key("$numberDouble"))
}

fn parse_instant(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|dt| dt.and_utc())
        })
}

fn split_path(path: &str) -> Vec<String> {
    path.split('.').map(str::to_string).collect()
}

/// Collects the values at a path, descending into arrays. A leaf array
/// contributes itself and its elements.
fn collect_values<'d>(value: &'d Value, path: &[String], out: &mut Vec<&'d Value>) {
    match path.split_first() {
        None => {
            out.push(value);
            if let Value::Array(items) = value {
                out.extend(items.iter());
            }
        }
        Some((head, rest)) => match value {
            Value::Object(map) => {
                if let Some(child) = map.get(head) {
                    collect_values(child, rest, out);
                }
            }
            Value::Array(items) => {
                for item in items {
                    collect_values(item, path, out);
                }
            }
            _ => {}
        },
    }
}

fn lookup<'d>(value: &'d Value, path: &[String]) -> Option<&'d Value> {
    path.iter().try_fold(value, |current, segment| current.get(segment))
}

fn compile_document(filter: &Value) -> Result<Condition, MatchError> {
    let map = filter
        .as_object()
        .ok_or_else(|| invalid("filter", "expected an object"))?;

    let mut conditions = Vec::with_capacity(map.len());
    for (key, value) in map {
        conditions.push(match key.as_str() {
            "$and" => Condition::All(compile_list(key, value)?),
            "$or" => Condition::Any(compile_list(key, value)?),
            "$nor" => Condition::NoneOf(compile_list(key, value)?),
            "$expr" => Condition::Expr(compile_expr(value)?),
            op if op.starts_with('$') => {
                return Err(MatchError::UnknownOperator {
                    operator: op.to_string(),
                });
            }
            path => Condition::Field {
                path: split_path(path),
                ops: compile_field(value)?,
            },
        });
    }

    Ok(match conditions.len() {
        1 => conditions.remove(0),
        _ => Condition::All(conditions),
    })
}

fn compile_list(operator: &str, value: &Value) -> Result<Vec<Condition>, MatchError> {
    value
        .as_array()
        .ok_or_else(|| invalid(operator, "expected an array of filters"))?
        .iter()
        .map(compile_document)
        .collect()
}

fn compile_field(value: &Value) -> Result<Vec<FieldOp>, MatchError> {
    match value {
        Value::Object(map)
            if !map.is_empty() && !is_wrapper(map) && map.keys().all(|k| k.starts_with('$')) =>
        {
            compile_ops(map)
        }
        literal => Ok(vec![FieldOp::Eq(Val::from_json(literal))]),
    }
}

fn compile_ops(map: &Map<String, Value>) -> Result<Vec<FieldOp>, MatchError> {
    let options = map.get("$options").and_then(Value::as_str).unwrap_or("");
    let mut ops = Vec::with_capacity(map.len());
    for (op, operand) in map {
        let compiled = match op.as_str() {
            "$eq" => FieldOp::Eq(Val::from_json(operand)),
            "$ne" => FieldOp::Ne(Val::from_json(operand)),
            "$in" => FieldOp::In(compile_values(op, operand)?),
            "$nin" => FieldOp::Nin(compile_values(op, operand)?),
            "$regex" => {
                let pattern = operand
                    .as_str()
                    .ok_or_else(|| invalid(op, "expected a string"))?;
                FieldOp::Regex(build_regex(pattern, options)?)
            }
            "$options" => continue,
            "$not" => match operand {
                Value::Object(inner) => FieldOp::Not(compile_ops(inner)?),
                _ => return Err(invalid(op, "expected an operator document")),
            },
            other => match RangeOp::parse(other) {
                Some(range) => FieldOp::Range(range, Val::from_json(operand)),
                None => {
                    return Err(MatchError::UnknownOperator {
                        operator: other.to_string(),
                    });
                }
            },
        };
        ops.push(compiled);
    }
    Ok(ops)
}

fn compile_values(operator: &str, value: &Value) -> Result<Vec<Val>, MatchError> {
    Ok(value
        .as_array()
        .ok_or_else(|| invalid(operator, "expected an array"))?
        .iter()
        .map(Val::from_json)
        .collect())
}

fn build_regex(pattern: &str, options: &str) -> Result<Regex, MatchError> {
    Ok(RegexBuilder::new(pattern)
        .case_insensitive(options.contains('i'))
        .build()?)
}

fn compile_expr(value: &Value) -> Result<Expr, MatchError> {
    match value {
        Value::String(s) if s.starts_with('$') => Ok(Expr::Field(split_path(&s[1..]))),
        Value::Array(items) => items
            .iter()
            .map(compile_expr)
            .collect::<Result<Vec<_>, _>>()
            .map(Expr::Array),
        Value::Object(map) if map.len() == 1 && !is_wrapper(map) => {
            let Some((op, operand)) = map.iter().next() else {
                return Err(invalid("$expr", "empty expression"));
            };
            compile_expr_operator(op, operand)
        }
        literal => Ok(Expr::Literal(Val::from_json(literal))),
    }
}

fn compile_expr_operator(op: &str, operand: &Value) -> Result<Expr, MatchError> {
    let compare = |cmp: CompareOp| -> Result<Expr, MatchError> {
        let [left, right] = expr_args::<2>(op, operand)?;
        Ok(Expr::Compare(cmp, Box::new(left), Box::new(right)))
    };

    match op {
        "$literal" => Ok(Expr::Literal(Val::from_json(operand))),
        "$add" => Ok(Expr::Arithmetic(ArithOp::Add, expr_list(op, operand)?)),
        "$multiply" => Ok(Expr::Arithmetic(ArithOp::Multiply, expr_list(op, operand)?)),
        "$subtract" => Ok(Expr::Arithmetic(
            ArithOp::Subtract,
            expr_args::<2>(op, operand)?.into(),
        )),
        "$divide" => Ok(Expr::Arithmetic(
            ArithOp::Divide,
            expr_args::<2>(op, operand)?.into(),
        )),
        "$and" => Ok(Expr::And(expr_list(op, operand)?)),
        "$or" => Ok(Expr::Or(expr_list(op, operand)?)),
        "$eq" => compare(CompareOp::Eq),
        "$ne" => compare(CompareOp::Ne),
        "$in" => {
            let [item, list] = expr_args::<2>(op, operand)?;
            Ok(Expr::In(Box::new(item), Box::new(list)))
        }
        "$not" => {
            let inner = match operand {
                Value::Array(_) => {
                    let [inner] = expr_args::<1>(op, operand)?;
                    inner
                }
                other => compile_expr(other)?,
            };
            Ok(Expr::Not(Box::new(inner)))
        }
        "$regexMatch" => {
            let args = operand
                .as_object()
                .ok_or_else(|| invalid(op, "expected an object"))?;
            let input = args
                .get("input")
                .ok_or_else(|| invalid(op, "missing 'input'"))?;
            let pattern = args
                .get("regex")
                .and_then(Value::as_str)
                .ok_or_else(|| invalid(op, "missing 'regex'"))?;
            let options = args.get("options").and_then(Value::as_str).unwrap_or("");
            Ok(Expr::RegexMatch(
                Box::new(compile_expr(input)?),
                build_regex(pattern, options)?,
            ))
        }
        other => match RangeOp::parse(other) {
            Some(range) => compare(CompareOp::Range(range)),
            None => Err(MatchError::UnknownOperator {
                operator: other.to_string(),
            }),
        },
    }
}

fn expr_list(op: &str, operand: &Value) -> Result<Vec<Expr>, MatchError> {
    operand
        .as_array()
        .ok_or_else(|| invalid(op, "expected an array of arguments"))?
        .iter()
        .map(compile_expr)
        .collect()
}

fn expr_args<const N: usize>(op: &str, operand: &Value) -> Result<[Expr; N], MatchError> {
    expr_list(op, operand)?
        .try_into()
        .map_err(|_| invalid(op, format!("expected {} arguments", N)))
}

fn invalid(operator: &str, message: impl Into<String>) -> MatchError {
    MatchError::InvalidOperand {
        operator: operator.to_string(),
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn matches(filter: Value, document: Value) -> bool {
        DocumentMatcher::new(&filter).unwrap().matches(&document)
    }

    #[test]
    fn test_field_operators() {
        let doc = json!({"age": 30, "name": "Ada", "tags": ["a", "b"]});
        assert!(matches(json!({"age": {"$gte": 18, "$lt": 40}}), doc.clone()));
        assert!(!matches(json!({"age": {"$gt": 30}}), doc.clone()));
        assert!(matches(json!({"name": "Ada"}), doc.clone()));
        assert!(matches(json!({"tags": {"$eq": "b"}}), doc.clone()));
        assert!(matches(json!({"age": {"$in": [1, 30]}}), doc.clone()));
        assert!(matches(json!({"age": {"$nin": [1, 2]}}), doc.clone()));
        assert!(!matches(json!({"age": {"$gt": "20"}}), doc));
    }

    #[test]
    fn test_missing_fields_and_nulls() {
        let doc = json!({"name": null});
        assert!(matches(json!({"name": {"$eq": null}}), doc.clone()));
        assert!(matches(json!({"age": {"$eq": null}}), doc.clone()));
        assert!(matches(json!({"age": {"$ne": 5}}), doc.clone()));
        assert!(!matches(json!({"age": {"$lt": 5}}), doc.clone()));
        assert!(matches(json!({"age": {"$nin": [5]}}), doc.clone()));
        assert!(!matches(json!({"age": {"$nin": [5, null]}}), doc));
    }

    #[test]
    fn test_regex_and_not() {
        let doc = json!({"name": "Johnson"});
        assert!(matches(json!({"name": {"$regex": "^Jo.*$"}}), doc.clone()));
        assert!(!matches(json!({"name": {"$regex": "^jo.*$"}}), doc.clone()));
        assert!(matches(
            json!({"name": {"$regex": "^jo.*$", "$options": "i"}}),
            doc.clone()
        ));
        assert!(matches(json!({"name": {"$not": {"$regex": "^x"}}}), doc.clone()));
        assert!(matches(json!({"other": {"$not": {"$regex": "^x"}}}), doc));

        let doc = json!({"name": "A\nB"});
        assert!(matches(json!({"name": {"$regex": "(?s)^A.B\\z"}}), doc.clone()));
        assert!(!matches(json!({"name": {"$regex": "^A.B$"}}), doc));
    }

    #[test]
    fn test_logical_operators() {
        let doc = json!({"a": 1, "b": 2});
        assert!(matches(json!({"$and": [{"a": 1}, {"b": 2}]}), doc.clone()));
        assert!(matches(json!({"$or": [{"a": 5}, {"b": 2}]}), doc.clone()));
        assert!(matches(json!({"$nor": [{"a": 5}]}), doc.clone()));
        assert!(!matches(json!({"$nor": [{"a": 1}]}), doc));
    }

    #[test]
    fn test_nested_paths() {
        let doc = json!({"address": {"city": "Oslo"}, "orders": [{"total": 5}, {"total": 50}]});
        assert!(matches(json!({"address.city": "Oslo"}), doc.clone()));
        assert!(matches(json!({"orders.total": {"$gt": 10}}), doc.clone()));
        assert!(!matches(json!({"orders.total": {"$gt": 100}}), doc));
    }

    #[test]
    fn test_expr() {
        let doc = json!({"a": 4, "b": 10, "name": "$x"});
        assert!(matches(
            json!({"$expr": {"$gt": [{"$add": ["$a", 7]}, "$b"]}}),
            doc.clone()
        ));
        assert!(matches(
            json!({"$expr": {"$lte": [{"$multiply": [-1, "$a"]}, {"$divide": ["$b", 2]}]}}),
            doc.clone()
        ));
        assert!(matches(
            json!({"$expr": {"$in": ["$name", [{"$literal": "$x"}, "$b"]]}}),
            doc.clone()
        ));
        assert!(matches(
            json!({"$expr": {"$not": [{"$in": ["$a", [1, "$b"]]}]}}),
            doc.clone()
        ));
        assert!(!matches(
            json!({"$expr": {"$gt": [{"$add": ["$missing", 1]}, 0]}}),
            doc.clone()
        ));
        assert!(matches(
            json!({"$expr": {"$and": [{"$gt": ["$a", null]}, {"$or": [false, {"$eq": ["$b", 10]}]}]}}),
            doc
        ));
    }

    #[test]
    fn test_expr_orders_across_types() {
        let doc = json!({"a": null, "n": 3, "s": "x", "t": true});
        // null and missing sort below every number
        assert!(matches(json!({"$expr": {"$lt": ["$a", 0]}}), doc.clone()));
        assert!(matches(json!({"$expr": {"$lt": ["$missing", 0]}}), doc.clone()));
        assert!(matches(json!({"$expr": {"$lt": ["$missing", "$a"]}}), doc.clone()));
        assert!(matches(json!({"$expr": {"$eq": ["$a", null]}}), doc.clone()));
        assert!(!matches(json!({"$expr": {"$eq": ["$missing", null]}}), doc.clone()));
        assert!(!matches(json!({"$expr": {"$gt": ["$missing", null]}}), doc.clone()));
        assert!(!matches(json!({"$expr": {"$gt": ["$a", null]}}), doc.clone()));
        assert!(matches(json!({"$expr": {"$gt": ["$n", null]}}), doc.clone()));
        assert!(matches(json!({"$expr": {"$gt": ["$s", "$n"]}}), doc.clone()));
        assert!(matches(json!({"$expr": {"$gt": ["$t", "$s"]}}), doc.clone()));
        assert!(matches(json!({"$expr": {"$ne": ["$missing", "$a"]}}), doc.clone()));
        assert!(matches(json!({"$expr": {"$in": ["$missing", [null]]}}), doc));
    }

    #[test]
    fn test_extended_json_values() {
        let doc = json!({"seen": "2024-01-02T03:04:05Z", "score": 1e300});
        assert!(matches(
            json!({"seen": {"$gt": {"$date": "2024-01-01T00:00:00.000Z"}}}),
            doc.clone()
        ));
        assert!(matches(
            json!({"score": {"$lt": {"$numberDouble": "Infinity"}}}),
            doc
        ));
    }

    #[test]
    fn test_compile_errors() {
        assert!(matches!(
            DocumentMatcher::new(&json!({"$where": "x"})),
            Err(MatchError::UnknownOperator { .. })
        ));
        assert!(matches!(
            DocumentMatcher::new(&json!({"a": {"$in": 5}})),
            Err(MatchError::InvalidOperand { .. })
        ));
        assert!(matches!(
            DocumentMatcher::new(&json!({"a": {"$regex": "("}})),
            Err(MatchError::Regex(_))
        ));
        assert!(DocumentMatcher::new(&json!([1])).is_err());
    }
}
