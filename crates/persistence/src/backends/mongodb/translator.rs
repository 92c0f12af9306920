//! MongoDB filter document builder.

use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value, json};
use sieve_filter::{ArithmeticOperator, BoundFilter, ComparisonOperator, Literal, Number};
use tracing::debug;

use crate::core::{
    BackendKind, Comparison, FilterCapability, FilterTranslator, LikePattern, Operand, Predicate,
    TranslationContext, lower,
};
use crate::error::TranslationResult;

/// Translates bound filters into MongoDB filter documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct MongoTranslator;

impl MongoTranslator {
    /// Creates a translator.
    pub fn new() -> Self {
        Self
    }

    fn predicate(&self, predicate: &Predicate<'_>) -> TranslationResult<Value> {
        match predicate {
            Predicate::Compare(cmp) => self.comparison(cmp),
            Predicate::And(items) => Ok(json!({ "$and": self.predicates(items)? })),
            Predicate::Or(items) => Ok(json!({ "$or": self.predicates(items)? })),
            Predicate::Not(inner) => Ok(json!({ "$nor": [self.predicate(inner)?] })),
        }
    }

    fn predicates(&self, items: &[Predicate<'_>]) -> TranslationResult<Vec<Value>> {
        items.iter().map(|item| self.predicate(item)).collect()
    }

    fn comparison(&self, cmp: &Comparison<'_>) -> TranslationResult<Value> {
        if let Some((field, value)) = cmp.field_value() {
            let condition = match cmp.pattern() {
                Some(pattern) => {
                    let regex = json!({ "$regex": pattern_regex(pattern, cmp.op) });
                    if cmp.op.is_negated() {
                        json!({ "$not": regex })
                    } else {
                        regex
                    }
                }
                None => {
                    let mut condition = Map::new();
                    condition.insert(query_operator(cmp.op).to_string(), literal_to_json(value));
                    Value::Object(condition)
                }
            };
            return Ok(single(field.path(), condition));
        }

        if let Some((field, values)) = cmp.field_values() {
            let values: Vec<Value> = values.into_iter().map(literal_to_json).collect();
            let mut condition = Map::new();
            condition.insert(query_operator(cmp.op).to_string(), Value::Array(values));
            return Ok(single(field.path(), Value::Object(condition)));
        }

        Ok(json!({ "$expr": self.expr_comparison(cmp)? }))
    }

    /// Aggregation-expression form, used for computed and field comparisons.
    ///
    /// Aggregation orders `null` and missing values below every other value,
    /// so equality, range and membership tests carry a `$gt: [operand, null]`
    /// guard for each non-literal operand. A null operand then never matches,
    /// and `!=` / `!in` negate the guarded test. Comparisons against the
    /// `null` literal are left unguarded.
    fn expr_comparison(&self, cmp: &Comparison<'_>) -> TranslationResult<Value> {
        let left = self.expr_operand(&cmp.left);
        let right = self.expr_operand(&cmp.right);

        if let Some(pattern) = cmp.pattern() {
            let matched = json!({ "$regexMatch": {
                "input": left,
                "regex": pattern_regex(pattern, cmp.op),
            }});
            return Ok(if cmp.op.is_negated() {
                json!({ "$not": [matched] })
            } else {
                matched
            });
        }

        let null_literal = cmp.left.is_null()
            || cmp.right.is_null()
            || matches!(&cmp.right, Operand::List(items) if items.iter().any(Operand::is_null));
        let mut guards = Vec::new();
        if !null_literal {
            if !matches!(cmp.left, Operand::Value(_)) {
                guards.push(json!({ "$gt": [left.clone(), null] }));
            }
            if !cmp.op.is_membership() && !matches!(cmp.right, Operand::Value(_)) {
                guards.push(json!({ "$gt": [right.clone(), null] }));
            }
        }

        let (op, negated) = match cmp.op {
            ComparisonOperator::Ne if !guards.is_empty() => (ComparisonOperator::Eq, true),
            ComparisonOperator::NotIn => (ComparisonOperator::In, true),
            op => (op, false),
        };
        let mut test = Map::new();
        test.insert(query_operator(op).to_string(), json!([left, right]));
        let test = if guards.is_empty() {
            Value::Object(test)
        } else {
            guards.push(Value::Object(test));
            json!({ "$and": guards })
        };
        Ok(if negated {
            json!({ "$not": [test] })
        } else {
            test
        })
    }

    fn expr_operand(&self, operand: &Operand<'_>) -> Value {
        match operand {
            Operand::Field(field) => Value::String(format!("${}", field.path())),
            Operand::Value(Literal::String(s)) if s.starts_with('$') => {
                json!({ "$literal": s })
            }
            Operand::Value(literal) => literal_to_json(literal),
            Operand::Arithmetic { left, op, right } => {
                let mut expr = Map::new();
                expr.insert(
                    arithmetic_operator(*op).to_string(),
                    json!([self.expr_operand(left), self.expr_operand(right)]),
                );
                Value::Object(expr)
            }
            Operand::Negate(inner) => json!({ "$multiply": [-1, self.expr_operand(inner)] }),
            Operand::List(items) => {
                Value::Array(items.iter().map(|item| self.expr_operand(item)).collect())
            }
        }
    }
}

impl FilterTranslator for MongoTranslator {
    type Output = Value;

    fn kind(&self) -> BackendKind {
        BackendKind::MongoDB
    }

    fn capabilities(&self) -> &'static [FilterCapability] {
        FilterCapability::all()
    }

    fn translate(
        &self,
        filter: &BoundFilter<'_>,
        ctx: &TranslationContext,
    ) -> TranslationResult<Value> {
        self.check(filter)?;
        let predicate = lower(filter, ctx)?;
        let document = self.predicate(&predicate)?;
        debug!(backend = %self.kind(), filter = %filter, "translated filter");
        Ok(document)
    }
}

fn single(key: String, value: Value) -> Value {
    let mut map = Map::new();
    map.insert(key, value);
    Value::Object(map)
}

/// Anchored regex for a pattern operator. `ilike` folds ASCII letters only.
fn pattern_regex(pattern: &str, op: ComparisonOperator) -> String {
    let case_insensitive = matches!(op, ComparisonOperator::ILike | ComparisonOperator::NotILike);
    LikePattern::parse(pattern).to_regex(case_insensitive)
}

fn query_operator(op: ComparisonOperator) -> &'static str {
    match op {
        ComparisonOperator::Eq => "$eq",
        ComparisonOperator::Ne => "$ne",
        ComparisonOperator::Gt => "$gt",
        ComparisonOperator::Ge => "$gte",
        ComparisonOperator::Lt => "$lt",
        ComparisonOperator::Le => "$lte",
        ComparisonOperator::In => "$in",
        ComparisonOperator::NotIn => "$nin",
        ComparisonOperator::Like | ComparisonOperator::ILike => "$regex",
        ComparisonOperator::NotLike | ComparisonOperator::NotILike => "$not",
    }
}

fn arithmetic_operator(op: ArithmeticOperator) -> &'static str {
    match op {
        ArithmeticOperator::Add => "$add",
        ArithmeticOperator::Subtract => "$subtract",
        ArithmeticOperator::Multiply => "$multiply",
        ArithmeticOperator::Divide => "$divide",
    }
}

/// Converts a literal to MongoDB extended JSON.
///
/// Dates and times of day are stored as ISO strings; instants become
/// `{"$date": ...}` in UTC with millisecond precision.
pub fn literal_to_json(literal: &Literal) -> Value {
    match literal {
        Literal::Number(Number::Integer(i)) => json!(i),
        Literal::Number(Number::Float(f)) => json!(f),
        Literal::String(s) => Value::String(s.clone()),
        Literal::Boolean(b) => Value::Bool(*b),
        Literal::Null => Value::Null,
        Literal::Date(d) => Value::String(d.format("%Y-%m-%d").to_string()),
        Literal::Time(t) => Value::String(t.format("%H:%M:%S%.f").to_string()),
        Literal::DateTime(dt) => json!({
            "$date": dt.with_timezone(&Utc).to_rfc3339_opts(SecondsFormat::Millis, true)
        }),
        Literal::Infinity { negative } => json!({
            "$numberDouble": if *negative { "-Infinity" } else { "Infinity" }
        }),
    }
}
