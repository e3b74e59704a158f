//! Type coercions applied by `Cast` pipeline stages.

use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

use crate::value::{Value, DATETIME_FORMAT};

/// A coercion of a value into one target type.
///
/// `apply` hands the original value back on failure so the caller can
/// describe what it got.
///
/// # Example
///
/// ```rust
/// use docmodels::{Cast, Value};
///
/// assert_eq!(Cast::Integer.apply(Value::from(" 111 ")), Ok(Value::Int(111)));
/// assert!(Cast::Integer.apply(Value::from("eleven")).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cast {
    Integer,
    Float,
    Decimal,
    String,
    Boolean,
    DateTime { format: String },
}

impl Cast {
    /// A datetime cast using the default layout.
    pub fn datetime() -> Self {
        Cast::DateTime {
            format: DATETIME_FORMAT.to_string(),
        }
    }

    /// A datetime cast with a custom `chrono` layout.
    pub fn datetime_format(format: impl Into<String>) -> Self {
        Cast::DateTime {
            format: format.into(),
        }
    }

    /// Name of the target type, as reported in type mismatches.
    pub fn expected(&self) -> String {
        match self {
            Cast::Integer => "integer".to_string(),
            Cast::Float => "float".to_string(),
            Cast::Decimal => "decimal".to_string(),
            Cast::String => "string".to_string(),
            Cast::Boolean => "boolean".to_string(),
            Cast::DateTime { format } => format!("datetime in format {}", format),
        }
    }

    /// Coerces `value`, returning it unchanged in `Err` when it cannot be cast.
    pub fn apply(&self, value: Value) -> Result<Value, Value> {
        let cast = match self {
            Cast::Integer => to_integer(&value),
            Cast::Float => to_float(&value),
            Cast::Decimal => to_decimal(&value),
            Cast::String => to_string(&value),
            Cast::Boolean => to_boolean(&value),
            Cast::DateTime { format } => to_datetime(&value, format),
        };
        cast.ok_or(value)
    }
}

fn to_integer(value: &Value) -> Option<Value> {
    let int = match value {
        Value::Int(i) => *i,
        Value::Bool(b) => i64::from(*b),
        Value::Float(f) if f.is_finite() && f.fract() == 0.0 => f.to_i64()?,
        Value::Decimal(d) if d.fract().is_zero() => d.to_i64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    Some(Value::Int(int))
}

fn to_float(value: &Value) -> Option<Value> {
    let float = match value {
        Value::Float(f) => *f,
        Value::Int(i) => *i as f64,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Decimal(d) => d.to_f64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    Some(Value::Float(float))
}

fn to_decimal(value: &Value) -> Option<Value> {
    let decimal = match value {
        Value::Decimal(d) => *d,
        Value::Int(i) => Decimal::from(*i),
        // The shortest text form keeps 0.1 as 0.1 instead of its binary expansion.
        Value::Float(f) if f.is_finite() => {
            Decimal::from_str(&f.to_string()).ok().or_else(|| Decimal::from_f64(*f))?
        }
        Value::String(s) => {
            let s = s.trim();
            Decimal::from_str(s)
                .or_else(|_| Decimal::from_scientific(s))
                .ok()?
        }
        _ => return None,
    };
    Some(Value::Decimal(decimal))
}

fn to_string(value: &Value) -> Option<Value> {
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Int(_) | Value::Float(_) | Value::Decimal(_) | Value::Bool(_) => {
            value.to_string()
        }
        Value::DateTime(dt) => dt.format(DATETIME_FORMAT).to_string(),
        _ => return None,
    };
    Some(Value::String(text))
}

fn to_boolean(value: &Value) -> Option<Value> {
    let flag = match value {
        Value::Bool(b) => *b,
        Value::Int(i) => *i != 0,
        Value::Float(f) => *f != 0.0,
        Value::Decimal(d) => !d.is_zero(),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => true,
            "false" | "no" | "off" | "0" | "" => false,
            _ => return None,
        },
        _ => return None,
    };
    Some(Value::Bool(flag))
}

fn to_datetime(value: &Value, format: &str) -> Option<Value> {
    match value {
        Value::DateTime(dt) => Some(Value::DateTime(*dt)),
        Value::String(s) => {
            let s = s.trim();
            NaiveDateTime::parse_from_str(s, format)
                .ok()
                .or_else(|| {
                    NaiveDate::parse_from_str(s, format)
                        .ok()
                        .and_then(|date| date.and_hms_opt(0, 0, 0))
                })
                .map(Value::DateTime)
        }
        _ => None,
    }
}
