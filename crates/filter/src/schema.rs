//! Typed field schema consulted by the binder.
//!
//! A schema is a tree of [`ComplexType`]s. Each [`Field`] has a [`DataType`];
//! complex fields point at a nested type shared through `Arc`, so one type
//! can be reused under several parents. Schemas are immutable after
//! construction and are normally loaded from JSON:
//!
//! ```json
//! {
//!   "name": "Customer",
//!   "fields": [
//!     { "name": "age", "type": "integer" },
//!     { "name": "status", "type": { "enum": ["active", "inactive"] } },
//!     { "name": "address", "type": { "complex": {
//!         "name": "Address",
//!         "fields": [{ "name": "city", "type": "string" }]
//!     } } }
//!   ]
//! }
//! ```

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::ast::{Literal, Number};
use crate::error::DecodeError;
use crate::lexer::{parse_datetime, parse_time};

/// Type of open fields (undeclared fields under a type that allows them).
pub static ANY_TYPE: DataType = DataType::Any;

/// Data type of a schema field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// Untyped; literals pass through unchanged.
    Any,
    /// Text.
    String,
    /// Integer or floating point number.
    Number,
    /// Whole number.
    Integer,
    /// Exact decimal; literals are validated through `rust_decimal`.
    Decimal,
    /// `true` / `false`.
    Boolean,
    /// Calendar date.
    Date,
    /// Time of day.
    Time,
    /// Instant with offset.
    DateTime,
    /// String restricted to the listed values.
    Enum(Vec<String>),
    /// Nested object.
    Complex(Arc<ComplexType>),
}

impl DataType {
    /// Short name used in error messages.
    pub fn name(&self) -> &str {
        match self {
            DataType::Any => "any",
            DataType::String => "string",
            DataType::Number => "number",
            DataType::Integer => "integer",
            DataType::Decimal => "decimal",
            DataType::Boolean => "boolean",
            DataType::Date => "date",
            DataType::Time => "time",
            DataType::DateTime => "datetime",
            DataType::Enum(_) => "enum",
            DataType::Complex(complex) => &complex.name,
        }
    }

    /// Returns the nested type of a complex field.
    pub fn as_complex(&self) -> Option<&ComplexType> {
        match self {
            DataType::Complex(complex) => Some(complex),
            _ => None,
        }
    }

    /// Returns true for types that pattern operators apply to.
    pub fn is_string_like(&self) -> bool {
        matches!(self, DataType::String | DataType::Enum(_) | DataType::Any)
    }

    /// Returns true for number-like types.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            DataType::Number | DataType::Integer | DataType::Decimal | DataType::Any
        )
    }

    /// Decodes a literal as a value of this type.
    ///
    /// `null` decodes for every type. Strings are parsed into the target
    /// type where that is lossless (`'18'` for an integer field becomes
    /// `18`), and scalar values are rendered as text for string fields.
    pub fn decode(&self, literal: &Literal) -> Result<Literal, DecodeError> {
        if literal.is_null() {
            return Ok(Literal::Null);
        }

        match self {
            DataType::Any => Ok(literal.clone()),
            DataType::String => decode_string(literal),
            DataType::Number => decode_number(literal),
            DataType::Integer => decode_integer(literal),
            DataType::Decimal => decode_decimal(literal),
            DataType::Boolean => decode_boolean(literal),
            DataType::Date => decode_date(literal),
            DataType::Time => decode_time(literal),
            DataType::DateTime => decode_datetime(literal),
            DataType::Enum(values) => {
                let value = decode_string(literal)?;
                match value.as_str() {
                    Some(s) if values.iter().any(|v| v == s) => Ok(value),
                    _ => Err(DecodeError::new(format!(
                        "expected one of [{}]",
                        values.join(", ")
                    ))),
                }
            }
            DataType::Complex(complex) => Err(DecodeError::new(format!(
                "'{}' values can only be compared with null",
                complex.name
            ))),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Enum(values) => write!(f, "enum[{}]", values.join(", ")),
            other => f.write_str(other.name()),
        }
    }
}

fn mismatch(literal: &Literal, expected: &str) -> DecodeError {
    DecodeError::new(format!("expected {} but found {}", expected, literal.kind()))
}

fn decode_string(literal: &Literal) -> Result<Literal, DecodeError> {
    match literal {
        Literal::String(_) => Ok(literal.clone()),
        Literal::Number(n) => Ok(Literal::String(n.to_string())),
        Literal::Boolean(b) => Ok(Literal::String(b.to_string())),
        Literal::Date(d) => Ok(Literal::String(d.format("%Y-%m-%d").to_string())),
        Literal::Time(_) | Literal::DateTime(_) | Literal::Infinity { .. } => {
            Ok(Literal::String(literal.to_string()))
        }
        Literal::Null => Ok(Literal::Null),
    }
}

/// Parses numeric text the way the lexer reads number literals.
fn parse_number_text(text: &str) -> Option<Literal> {
    let text = text.trim();
    match text {
        "Infinity" | "+Infinity" => return Some(Literal::Infinity { negative: false }),
        "-Infinity" => return Some(Literal::Infinity { negative: true }),
        _ => {}
    }
    if let Ok(i) = text.parse::<i64>() {
        return Some(Literal::Number(Number::Integer(i)));
    }
    text.parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .map(|f| Literal::Number(Number::Float(f)))
}

fn decode_number(literal: &Literal) -> Result<Literal, DecodeError> {
    match literal {
        Literal::Number(_) | Literal::Infinity { .. } => Ok(literal.clone()),
        Literal::String(s) => {
            parse_number_text(s).ok_or_else(|| DecodeError::new(format!("'{}' is not a number", s)))
        }
        other => Err(mismatch(other, "number")),
    }
}

fn decode_integer(literal: &Literal) -> Result<Literal, DecodeError> {
    let number = decode_number(literal).map_err(|_| mismatch(literal, "integer"))?;
    match number {
        Literal::Number(Number::Float(f)) => {
            if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
                Ok(Literal::Number(Number::Integer(f as i64)))
            } else {
                Err(DecodeError::new(format!("{} is not an integer", f)))
            }
        }
        other => Ok(other),
    }
}

fn decode_decimal(literal: &Literal) -> Result<Literal, DecodeError> {
    let decimal = match literal {
        Literal::Infinity { .. } => return Ok(literal.clone()),
        Literal::Number(Number::Integer(i)) => Decimal::from(*i),
        Literal::Number(Number::Float(f)) => Decimal::try_from(*f)
            .map_err(|e| DecodeError::new(format!("{} is not a valid decimal: {}", f, e)))?,
        Literal::String(s) => Decimal::from_str(s.trim())
            .or_else(|_| Decimal::from_scientific(s.trim()))
            .map_err(|_| DecodeError::new(format!("'{}' is not a valid decimal", s)))?,
        other => return Err(mismatch(other, "decimal")),
    };

    if decimal.fract().is_zero() {
        if let Some(i) = decimal.to_i64() {
            return Ok(Literal::Number(Number::Integer(i)));
        }
    }
    decimal
        .to_f64()
        .map(|f| Literal::Number(Number::Float(f)))
        .ok_or_else(|| DecodeError::new(format!("{} is out of range", decimal)))
}

fn decode_boolean(literal: &Literal) -> Result<Literal, DecodeError> {
    match literal {
        Literal::Boolean(_) => Ok(literal.clone()),
        Literal::Number(Number::Integer(1)) => Ok(Literal::Boolean(true)),
        Literal::Number(Number::Integer(0)) => Ok(Literal::Boolean(false)),
        Literal::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Ok(Literal::Boolean(true)),
            "false" | "0" => Ok(Literal::Boolean(false)),
            _ => Err(DecodeError::new(format!("'{}' is not a boolean", s))),
        },
        other => Err(mismatch(other, "boolean")),
    }
}

fn decode_date(literal: &Literal) -> Result<Literal, DecodeError> {
    match literal {
        Literal::Date(_) => Ok(literal.clone()),
        Literal::DateTime(dt) => Ok(Literal::Date(dt.date_naive())),
        Literal::String(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map(Literal::Date)
            .map_err(|_| DecodeError::new(format!("'{}' is not a date (YYYY-MM-DD)", s))),
        other => Err(mismatch(other, "date")),
    }
}

fn decode_time(literal: &Literal) -> Result<Literal, DecodeError> {
    match literal {
        Literal::Time(_) => Ok(literal.clone()),
        Literal::String(s) => parse_time(s.trim())
            .map(Literal::Time)
            .ok_or_else(|| DecodeError::new(format!("'{}' is not a time (HH:MM[:SS])", s))),
        other => Err(mismatch(other, "time")),
    }
}

fn decode_datetime(literal: &Literal) -> Result<Literal, DecodeError> {
    match literal {
        Literal::DateTime(_) => Ok(literal.clone()),
        Literal::Date(d) => Ok(Literal::DateTime(midnight_utc(*d))),
        Literal::String(s) => {
            let s = s.trim();
            if let Some(dt) = parse_datetime(s) {
                return Ok(Literal::DateTime(dt));
            }
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map(|d| Literal::DateTime(midnight_utc(d)))
                .map_err(|_| DecodeError::new(format!("'{}' is not a datetime", s)))
        }
        other => Err(mismatch(other, "datetime")),
    }
}

fn midnight_utc(date: NaiveDate) -> chrono::DateTime<chrono::FixedOffset> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)).fixed_offset()
}

/// A named object type with fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplexType {
    /// Type name, used in error messages.
    pub name: String,
    /// Declared fields.
    #[serde(default)]
    pub fields: Vec<Field>,
    /// Whether undeclared fields may be referenced (they bind as `any`).
    #[serde(default)]
    pub additional_fields: bool,
    /// Human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ComplexType {
    /// Creates an empty closed type.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            additional_fields: false,
            description: None,
        }
    }

    /// Adds a field.
    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    /// Allows undeclared fields.
    pub fn open(mut self) -> Self {
        self.additional_fields = true;
        self
    }

    /// Finds a field by name, ignoring ASCII case.
    pub fn find_field(&self, name: &str) -> Option<&Field> {
        self.fields
            .iter()
            .find(|field| field.name.eq_ignore_ascii_case(name))
    }
}

/// A field of a [`ComplexType`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    /// Field name as stored in the backend.
    pub name: String,
    /// Element type (for arrays, the type of each element).
    #[serde(rename = "type")]
    pub data_type: DataType,
    /// Whether the field holds a list of values.
    #[serde(default)]
    pub is_array: bool,
    /// Human-readable description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Field {
    /// Creates a scalar field.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            is_array: false,
            description: None,
        }
    }

    /// Creates a field holding a nested type.
    pub fn complex(name: impl Into<String>, complex: ComplexType) -> Self {
        Self::new(name, DataType::Complex(Arc::new(complex)))
    }

    /// Marks the field as an array.
    pub fn array(mut self) -> Self {
        self.is_array = true;
        self
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}
