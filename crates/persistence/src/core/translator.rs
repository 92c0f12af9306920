//! Backend translator trait.
//!
//! A [`FilterTranslator`] turns a [`BoundFilter`] into the native filter
//! representation of one storage engine. Translators are stateless and
//! `Send + Sync`, so one instance can serve every request.
//!
//! # Example
//!
//! ```
//! use sieve_filter::{AcceptanceRules, ComplexType, DataType, Field, ParseOptions};
//! use sieve_persistence::backends::MongoTranslator;
//! use sieve_persistence::core::{TranslationContext, translate_filter};
//!
//! let schema = ComplexType::new("Customer").with_field(Field::new("age", DataType::Integer));
//! let rules = AcceptanceRules::unrestricted();
//!
//! let doc = translate_filter(
//!     &MongoTranslator::new(),
//!     "age >= 18",
//!     &ParseOptions::default(),
//!     &schema,
//!     &rules,
//!     &TranslationContext::new(),
//! )
//! .unwrap();
//! assert_eq!(doc, serde_json::json!({"age": {"$gte": 18}}));
//! ```

use std::collections::HashMap;

use serde_json::Value;
use sieve_filter::{
    AcceptanceRules, BoundFilter, ComplexType, ExternalConstant, Literal, Number, ParseOptions,
};
use tracing::warn;

use crate::core::backend::BackendKind;
use crate::core::capabilities::{FilterCapability, required_capabilities};
use crate::error::{QueryError, TranslationError, TranslationResult};

/// Translates bound filters into a backend's native filter value.
pub trait FilterTranslator: Send + Sync {
    /// The native filter representation.
    type Output;

    /// The backend this translator targets.
    fn kind(&self) -> BackendKind;

    /// Capabilities the backend can express.
    fn capabilities(&self) -> &'static [FilterCapability];

    /// Returns true if the backend supports the capability.
    fn supports(&self, capability: FilterCapability) -> bool {
        self.capabilities().contains(&capability)
    }

    /// Checks that the backend can express the filter, without translating it.
    ///
    /// Reports the first missing capability in [`FilterCapability::all`] order.
    fn check(&self, filter: &BoundFilter<'_>) -> TranslationResult<()> {
        let required = required_capabilities(filter);
        match FilterCapability::all()
            .iter()
            .find(|cap| required.contains(cap) && !self.supports(**cap))
        {
            Some(capability) => Err(TranslationError::UnsupportedCapability {
                backend: self.kind(),
                capability: *capability,
            }),
            None => Ok(()),
        }
    }

    /// Translates a bound filter. Implementations run [`check`](Self::check) first.
    fn translate(
        &self,
        filter: &BoundFilter<'_>,
        ctx: &TranslationContext,
    ) -> TranslationResult<Self::Output>;
}

/// Values for `@name` constants, supplied by the caller per request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TranslationContext {
    externals: HashMap<String, Literal>,
}

impl TranslationContext {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a constant.
    pub fn with_external(mut self, name: impl Into<String>, value: impl Into<Literal>) -> Self {
        self.insert(name, value);
        self
    }

    /// Adds or replaces a constant.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Literal>) {
        self.externals.insert(name.into(), value.into());
    }

    /// Number of constants.
    pub fn len(&self) -> usize {
        self.externals.len()
    }

    /// Returns true if no constants are defined.
    pub fn is_empty(&self) -> bool {
        self.externals.is_empty()
    }

    /// Looks up a constant.
    pub fn resolve(&self, external: &ExternalConstant) -> TranslationResult<Literal> {
        self.externals
            .get(&external.name)
            .cloned()
            .ok_or_else(|| TranslationError::UnresolvedExternal {
                name: external.name.clone(),
            })
    }

    /// Builds a context from a JSON object. Nested objects define dotted
    /// names, so `{"user": {"id": 7}}` defines `@user.id`.
    pub fn from_json(value: &Value) -> TranslationResult<Self> {
        let mut ctx = Self::new();
        match value {
            Value::Object(map) => {
                for (key, value) in map {
                    ctx.insert_json(key.clone(), value)?;
                }
                Ok(ctx)
            }
            other => Err(TranslationError::invalid_operand(format!(
                "external constants must be a JSON object, found {}",
                other
            ))),
        }
    }

    fn insert_json(&mut self, name: String, value: &Value) -> TranslationResult<()> {
        let literal = match value {
            Value::Null => Literal::Null,
            Value::Bool(b) => Literal::Boolean(*b),
            Value::String(s) => Literal::String(s.clone()),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Literal::Number(Number::Integer(i)),
                None => n.as_f64().map(Literal::from).ok_or_else(|| {
                    TranslationError::invalid_operand(format!(
                        "external constant '@{}' is not a representable number",
                        name
                    ))
                })?,
            },
            Value::Object(map) => {
                for (key, value) in map {
                    self.insert_json(format!("{}.{}", name, key), value)?;
                }
                return Ok(());
            }
            Value::Array(_) => {
                return Err(TranslationError::invalid_operand(format!(
                    "external constant '@{}' cannot be a list",
                    name
                )));
            }
        };
        self.externals.insert(name, literal);
        Ok(())
    }
}

/// Parses, binds and translates a filter in one step.
pub fn translate_filter<T: FilterTranslator>(
    translator: &T,
    input: &str,
    options: &ParseOptions,
    schema: &ComplexType,
    rules: &AcceptanceRules,
    ctx: &TranslationContext,
) -> Result<T::Output, QueryError> {
    let bound = sieve_filter::compile(input, options, schema, rules)?;
    // `translate` runs the capability check and logs the result
    let output = translator
        .translate(&bound, ctx)
        .inspect_err(|e| warn!(backend = %translator.kind(), error = %e, "translation failed"))?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sieve_filter::{DataType, Field};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts capability checks and echoes the canonical filter.
    #[derive(Default)]
    struct CountingTranslator {
        checks: AtomicUsize,
    }

    impl FilterTranslator for CountingTranslator {
        type Output = String;

        fn kind(&self) -> BackendKind {
            BackendKind::Sqlite
        }

        fn capabilities(&self) -> &'static [FilterCapability] {
            FilterCapability::all()
        }

        fn check(&self, _filter: &BoundFilter<'_>) -> TranslationResult<()> {
            self.checks.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn translate(
            &self,
            filter: &BoundFilter<'_>,
            _ctx: &TranslationContext,
        ) -> TranslationResult<String> {
            self.check(filter)?;
            Ok(filter.to_string())
        }
    }

    #[test]
    fn test_translate_filter_checks_once() {
        let translator = CountingTranslator::default();
        let schema = ComplexType::new("Item").with_field(Field::new("a", DataType::Integer));
        let output = translate_filter(
            &translator,
            "a>1",
            &ParseOptions::default(),
            &schema,
            &AcceptanceRules::unrestricted(),
            &TranslationContext::new(),
        )
        .unwrap();
        assert_eq!(output, "a > 1");
        assert_eq!(translator.checks.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_resolve_external() {
        let ctx = TranslationContext::new().with_external("tenant", "acme");
        let external = ExternalConstant {
            name: "tenant".to_string(),
        };
        assert_eq!(ctx.resolve(&external).unwrap(), Literal::from("acme"));

        let missing = ExternalConstant {
            name: "user".to_string(),
        };
        assert_eq!(
            ctx.resolve(&missing),
            Err(TranslationError::UnresolvedExternal {
                name: "user".to_string()
            })
        );
    }

    #[test]
    fn test_context_from_json() {
        let ctx = TranslationContext::from_json(&json!({
            "user": {"id": 7, "name": "ada"},
            "ratio": 0.5,
            "active": true,
            "none": null
        }))
        .unwrap();
        assert_eq!(ctx.len(), 5);
        let id = ExternalConstant {
            name: "user.id".to_string(),
        };
        assert_eq!(ctx.resolve(&id).unwrap(), Literal::from(7));

        assert!(TranslationContext::from_json(&json!({"ids": [1, 2]})).is_err());
        assert!(TranslationContext::from_json(&json!("x")).is_err());
    }
}
