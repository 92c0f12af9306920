//! Elasticsearch Query DSL builder.
//!
//! Translates bound filters into a `query` clause.

use chrono::{SecondsFormat, Utc};
use serde_json::{Value, json};
use sieve_filter::{BoundFilter, BoundIdentifier, ComparisonOperator, Literal, Number};
use tracing::debug;

use crate::core::{
    BackendKind, Comparison, FilterCapability, FilterTranslator, LikePattern, Operand, Predicate,
    TranslationContext, lower,
};
use crate::error::{TranslationError, TranslationResult};

const CAPABILITIES: &[FilterCapability] = &[
    FilterCapability::PatternMatch,
    FilterCapability::CaseInsensitivePattern,
    FilterCapability::Negation,
];

/// Translates bound filters into Elasticsearch queries.
#[derive(Debug, Clone, Copy, Default)]
pub struct EsQueryBuilder;

impl EsQueryBuilder {
    /// Creates a query builder.
    pub fn new() -> Self {
        Self
    }

    /// Wraps a translated query into a search request body.
    pub fn search_body(&self, query: Value) -> Value {
        json!({ "query": query })
    }

    fn predicate(&self, predicate: &Predicate<'_>) -> TranslationResult<Value> {
        match predicate {
            Predicate::Compare(cmp) => self.comparison(cmp),
            Predicate::And(items) => Ok(json!({ "bool": { "filter": self.predicates(items)? } })),
            Predicate::Or(items) => Ok(any_of(self.predicates(items)?)),
            Predicate::Not(inner) => Ok(must_not(self.predicate(inner)?)),
        }
    }

    fn predicates(&self, items: &[Predicate<'_>]) -> TranslationResult<Vec<Value>> {
        items.iter().map(|item| self.predicate(item)).collect()
    }

    fn comparison(&self, cmp: &Comparison<'_>) -> TranslationResult<Value> {
        if let Some((field, value)) = cmp.field_value() {
            return self.value_comparison(field, cmp.op, value, cmp.pattern());
        }
        if let Some((field, values)) = cmp.field_values() {
            let query = self.membership(field, &values)?;
            return Ok(if cmp.op.is_negated() {
                must_not(query)
            } else {
                query
            });
        }

        let capability = if matches!(cmp.left, Operand::Field(_)) {
            FilterCapability::FieldComparison
        } else {
            FilterCapability::ComputedComparison
        };
        Err(self.unsupported(capability))
    }

    fn value_comparison(
        &self,
        field: &BoundIdentifier<'_>,
        op: ComparisonOperator,
        value: &Literal,
        pattern: Option<&str>,
    ) -> TranslationResult<Value> {
        let path = field.path();

        if let Some(pattern) = pattern {
            let pattern = LikePattern::parse(pattern);
            // `case_insensitive` on wildcard folds Unicode, so ilike spells out ASCII cases
            let query = if matches!(op, ComparisonOperator::ILike | ComparisonOperator::NotILike) {
                json!({ "regexp": { path: { "value": pattern.to_folded_regexp(), "flags": "NONE" } } })
            } else {
                json!({ "wildcard": { path: { "value": pattern.to_wildcard() } } })
            };
            return Ok(if op.is_negated() { must_not(query) } else { query });
        }

        if value.is_null() {
            let exists = json!({ "exists": { "field": path } });
            return Ok(match op {
                ComparisonOperator::Ne => exists,
                _ => must_not(exists),
            });
        }

        let value = self.value(value)?;
        Ok(match op {
            ComparisonOperator::Eq => json!({ "term": { path: value } }),
            ComparisonOperator::Ne => must_not(json!({ "term": { path: value } })),
            ComparisonOperator::Gt => json!({ "range": { path: { "gt": value } } }),
            ComparisonOperator::Ge => json!({ "range": { path: { "gte": value } } }),
            ComparisonOperator::Lt => json!({ "range": { path: { "lt": value } } }),
            ComparisonOperator::Le => json!({ "range": { path: { "lte": value } } }),
            ComparisonOperator::In
            | ComparisonOperator::NotIn
            | ComparisonOperator::Like
            | ComparisonOperator::NotLike
            | ComparisonOperator::ILike
            | ComparisonOperator::NotILike => unreachable!("lowered to a list or pattern"),
        })
    }

    fn membership(&self, field: &BoundIdentifier<'_>, values: &[&Literal]) -> TranslationResult<Value> {
        let path = field.path();
        let has_null = values.iter().any(|v| v.is_null());
        let terms = values
            .iter()
            .filter(|v| !v.is_null())
            .map(|v| self.value(v))
            .collect::<TranslationResult<Vec<_>>>()?;

        let missing = must_not(json!({ "exists": { "field": path } }));
        Ok(match (terms.is_empty(), has_null) {
            (true, false) => must_not(json!({ "match_all": {} })),
            (true, true) => missing,
            (false, false) => json!({ "terms": { path: terms } }),
            (false, true) => any_of(vec![json!({ "terms": { path: terms } }), missing]),
        })
    }

    fn value(&self, literal: &Literal) -> TranslationResult<Value> {
        Ok(match literal {
            Literal::Number(Number::Integer(i)) => json!(i),
            Literal::Number(Number::Float(f)) => json!(f),
            Literal::String(s) => Value::String(s.clone()),
            Literal::Boolean(b) => Value::Bool(*b),
            Literal::Null => Value::Null,
            Literal::Date(d) => Value::String(d.format("%Y-%m-%d").to_string()),
            Literal::Time(t) => Value::String(t.format("%H:%M:%S%.f").to_string()),
            Literal::DateTime(dt) => Value::String(
                dt.with_timezone(&Utc)
                    .to_rfc3339_opts(SecondsFormat::Millis, true),
            ),
            Literal::Infinity { .. } => {
                return Err(self.unsupported(FilterCapability::InfinityLiteral));
            }
        })
    }

    fn unsupported(&self, capability: FilterCapability) -> TranslationError {
        TranslationError::UnsupportedCapability {
            backend: self.kind(),
            capability,
        }
    }
}

impl FilterTranslator for EsQueryBuilder {
    type Output = Value;

    fn kind(&self) -> BackendKind {
        BackendKind::Elasticsearch
    }

    fn capabilities(&self) -> &'static [FilterCapability] {
        CAPABILITIES
    }

    fn translate(
        &self,
        filter: &BoundFilter<'_>,
        ctx: &TranslationContext,
    ) -> TranslationResult<Value> {
        self.check(filter)?;
        let predicate = lower(filter, ctx)?;
        let query = self.predicate(&predicate)?;
        debug!(backend = %self.kind(), filter = %filter, "translated filter");
        Ok(query)
    }
}

fn must_not(query: Value) -> Value {
    json!({ "bool": { "must_not": [query] } })
}

fn any_of(queries: Vec<Value>) -> Value {
    json!({ "bool": { "should": queries, "minimum_should_match": 1 } })
}
