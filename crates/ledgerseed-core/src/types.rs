use std::fmt;

use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Logical column type, independent of the storage engine's spelling.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LogicalType {
    Integer,
    Decimal { precision: u8, scale: u8 },
    Text,
    Date,
    Boolean,
    Binary,
}

impl LogicalType {
    pub fn scale(&self) -> Option<u8> {
        match self {
            LogicalType::Decimal { scale, .. } => Some(*scale),
            _ => None,
        }
    }
}

/// A single stored value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Decimal(f64),
    Text(String),
    Date(NaiveDate),
    Bytes(Vec<u8>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(value) => Some(*value as f64),
            Value::Decimal(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(value) => Some(*value),
            _ => None,
        }
    }

    /// Text length in characters, for textual values.
    pub fn char_len(&self) -> Option<usize> {
        self.as_str().map(|value| value.chars().count())
    }

    /// Stable string key used for identity comparisons (PK/FK/unique lookups).
    pub fn key(&self) -> String {
        match self {
            Value::Null => "<null>".to_string(),
            Value::Bool(value) => value.to_string(),
            Value::Int(value) => value.to_string(),
            Value::Decimal(value) => value.to_string(),
            Value::Text(value) => value.clone(),
            Value::Date(value) => value.format("%Y-%m-%d").to_string(),
            Value::Bytes(value) => String::from_utf8_lossy(value).into_owned(),
        }
    }

    /// Render the value as text; decimals use `scale` fraction digits when given.
    pub fn render(&self, scale: Option<u8>) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Decimal(value) => Some(match scale {
                Some(scale) => {
                    let scale = scale as usize;
                    format!("{value:.scale$}")
                }
                None => value.to_string(),
            }),
            Value::Date(value) => Some(value.format("%Y-%m-%d").to_string()),
            Value::Bytes(value) => Some(String::from_utf8_lossy(value).into_owned()),
            other => Some(other.to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(value) => write!(f, "{value}"),
            Value::Int(value) => write!(f, "{value}"),
            Value::Decimal(value) => write!(f, "{value}"),
            Value::Text(value) => f.write_str(value),
            Value::Date(value) => write!(f, "{}", value.format("%Y-%m-%d")),
            Value::Bytes(value) => f.write_str(&String::from_utf8_lossy(value)),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Decimal(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<NaiveDate> for Value {
    fn from(value: NaiveDate) -> Self {
        Value::Date(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_uses_decimal_scale() {
        assert_eq!(Value::Decimal(100.0).render(Some(2)).as_deref(), Some("100.00"));
        assert_eq!(Value::Null.render(Some(2)), None);
    }

    #[test]
    fn dates_render_iso() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(Value::Date(date).render(None).as_deref(), Some("2024-02-29"));
    }

    #[test]
    fn bytes_decode_lossy() {
        let value = Value::Bytes(vec![b'o', b'k', 0xff]);
        assert_eq!(value.render(None).as_deref(), Some("ok\u{fffd}"));
    }
}
