//! Host-side values exchanged with code blocks.

use serde::{Deserialize, Serialize};
use serde_json::{Value as Json, json};
use std::fmt;

/// Value passed into a block as a variable or returned from it as a result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// UTF-8 string.
    String(String),
    /// Signed integer.
    Integer(i64),
    /// Floating-point number.
    Float(f64),
    /// Boolean.
    Boolean(bool),
    /// Bare word the interpreter printed without quotes (identifiers,
    /// rationals, polynomials, ...).
    Symbol(String),
    /// Ordered sequence; a list of lists is a table.
    List(Vec<Value>),
    /// Horizontal separator row inside a table.
    Hline,
}

impl Value {
    /// Shorthand for [`Value::String`].
    pub fn string(text: impl Into<String>) -> Self {
        Value::String(text.into())
    }

    /// Shorthand for [`Value::Symbol`].
    pub fn symbol(text: impl Into<String>) -> Self {
        Value::Symbol(text.into())
    }

    /// Borrow string or symbol text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(text) | Value::Symbol(text) => Some(text),
            _ => None,
        }
    }

    /// Borrow list items.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Whether this value is a list whose every row is itself a list or an
    /// [`Value::Hline`].
    pub fn is_table(&self) -> bool {
        match self {
            Value::List(rows) => {
                !rows.is_empty()
                    && rows
                        .iter()
                        .all(|row| matches!(row, Value::List(_) | Value::Hline))
            }
            _ => false,
        }
    }

    /// Render as JSON for frontends that do not speak [`Value`].
    pub fn to_json(&self) -> Json {
        match self {
            Value::String(text) => Json::String(text.clone()),
            Value::Integer(num) => json!(num),
            Value::Float(num) => json!(num),
            Value::Boolean(flag) => Json::Bool(*flag),
            Value::Symbol(sym) => json!({ "symbol": sym }),
            Value::List(items) => Json::Array(items.iter().map(Value::to_json).collect()),
            Value::Hline => json!("hline"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(text) | Value::Symbol(text) => f.write_str(text),
            Value::Integer(num) => write!(f, "{num}"),
            Value::Float(num) => write!(f, "{num:?}"),
            Value::Boolean(flag) => write!(f, "{flag}"),
            Value::List(items) => {
                f.write_str("[")?;
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Value::Hline => Ok(()),
        }
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::String(text.to_string())
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Value::String(text)
    }
}

impl From<i64> for Value {
    fn from(num: i64) -> Self {
        Value::Integer(num)
    }
}

impl From<f64> for Value {
    fn from(num: f64) -> Self {
        Value::Float(num)
    }
}

impl From<bool> for Value {
    fn from(flag: bool) -> Self {
        Value::Boolean(flag)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_tables() {
        let table = Value::from(vec![vec![1i64, 2], vec![3, 4]]);
        assert!(table.is_table());
        assert!(!Value::from(vec![1i64, 2]).is_table());
        assert!(!Value::List(Vec::new()).is_table());

        let with_rule = Value::List(vec![
            Value::from(vec!["a", "b"]),
            Value::Hline,
            Value::from(vec![1i64, 2]),
        ]);
        assert!(with_rule.is_table());
    }

    #[test]
    fn json_rendering_keeps_structure() {
        let value = Value::List(vec![
            Value::Integer(1),
            Value::symbol("x^2"),
            Value::from(vec!["a"]),
        ]);
        assert_eq!(
            value.to_json(),
            json!([1, { "symbol": "x^2" }, ["a"]])
        );
    }
}
