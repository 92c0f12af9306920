//! Per-endpoint field acceptance rules.
//!
//! An endpoint declares which fields a filter may compare and, optionally,
//! which operators each field accepts. Rules are keyed by the normalized
//! dotted path (`address.city`) and matched case-insensitively.

use serde::{Deserialize, Serialize};

use crate::ast::ComparisonOperator;

/// One filterable field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldRule {
    /// Dotted field path.
    pub field: String,
    /// Allowed operators; `None` allows all of them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operators: Option<Vec<ComparisonOperator>>,
    /// Free-form notes shown in API documentation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl FieldRule {
    /// A rule allowing every operator.
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            operators: None,
            notes: None,
        }
    }

    /// Restricts the rule to the given operators.
    pub fn with_operators(mut self, operators: impl IntoIterator<Item = ComparisonOperator>) -> Self {
        self.operators = Some(operators.into_iter().collect());
        self
    }

    /// Attaches documentation notes.
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Returns true if the rule allows the operator.
    pub fn allows(&self, op: ComparisonOperator) -> bool {
        self.operators
            .as_ref()
            .is_none_or(|operators| operators.contains(&op))
    }

    /// Comma-separated list of allowed operators, for error messages.
    pub fn allowed_operators(&self) -> String {
        let operators = self
            .operators
            .as_deref()
            .unwrap_or(ComparisonOperator::all());
        operators
            .iter()
            .map(ComparisonOperator::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// The acceptance rules of one endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<FieldRule>", into = "Vec<FieldRule>")]
pub struct AcceptanceRules {
    rules: Vec<FieldRule>,
    unrestricted: bool,
}

impl AcceptanceRules {
    /// Creates a rule set.
    pub fn new(rules: Vec<FieldRule>) -> Self {
        Self {
            rules,
            unrestricted: false,
        }
    }

    /// Accepts every field with every operator.
    pub fn unrestricted() -> Self {
        Self {
            rules: Vec::new(),
            unrestricted: true,
        }
    }

    /// Returns true for [`AcceptanceRules::unrestricted`].
    pub fn is_unrestricted(&self) -> bool {
        self.unrestricted
    }

    /// Declared rules.
    pub fn rules(&self) -> &[FieldRule] {
        &self.rules
    }

    /// Adds a rule.
    pub fn with_rule(mut self, rule: FieldRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Looks up the rule for a normalized path.
    pub fn find(&self, path: &str) -> Option<&FieldRule> {
        self.rules
            .iter()
            .find(|rule| rule.field.eq_ignore_ascii_case(path))
    }

    /// Returns true if the path may appear in a filter at all.
    pub fn accepts_field(&self, path: &str) -> bool {
        self.unrestricted || self.find(path).is_some()
    }
}

impl From<Vec<FieldRule>> for AcceptanceRules {
    fn from(rules: Vec<FieldRule>) -> Self {
        Self::new(rules)
    }
}

impl From<AcceptanceRules> for Vec<FieldRule> {
    fn from(rules: AcceptanceRules) -> Self {
        rules.rules
    }
}
