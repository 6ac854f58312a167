//! Header arguments supplied by the host for one block.

use crate::error::{BabelError, Result};
use crate::expand::Binding;
use crate::literal;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Ordered key/value pairs as the host hands them over. Keys keep their
/// leading colon (`:var`); `:var` may repeat.
pub type HeaderArgs = Vec<(String, Value)>;

/// How the block's result is collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultMode {
    /// Everything the block printed, verbatim.
    Output,
    /// The block's value, decoded into a table when it reads as one.
    #[default]
    Value,
    /// Like `Value`, for blocks run through isolated evaluation.
    Eval,
}

impl ResultMode {
    /// Whether the result needs classification before it is returned.
    pub fn wants_classification(self) -> bool {
        matches!(self, ResultMode::Value | ResultMode::Eval)
    }
}

impl FromStr for ResultMode {
    type Err = BabelError;

    fn from_str(text: &str) -> Result<Self> {
        match text.trim() {
            "output" => Ok(ResultMode::Output),
            "value" => Ok(ResultMode::Value),
            "eval" => Ok(ResultMode::Eval),
            other => Err(BabelError::InvalidParameter {
                name: ":result-type".into(),
                detail: format!("expected output, value or eval, got '{other}'"),
            }),
        }
    }
}

impl fmt::Display for ResultMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ResultMode::Output => "output",
            ResultMode::Value => "value",
            ResultMode::Eval => "eval",
        })
    }
}

/// Typed view of a block's header arguments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockParams {
    /// Requested session name, `None` when absent.
    pub session: Option<String>,
    /// Variable bindings in header order.
    pub vars: Vec<Binding>,
    /// Wrap the body in isolated evaluation.
    pub isolate: bool,
    /// Result collection mode.
    pub result_mode: ResultMode,
}

impl BlockParams {
    /// Interpret raw header arguments. Unknown keys are ignored.
    pub fn from_header_args(args: &[(String, Value)]) -> Result<Self> {
        let mut params = BlockParams::default();
        for (key, value) in args {
            match key.as_str() {
                ":session" => {
                    params.session = value.as_str().map(str::to_string).or_else(|| {
                        Some(value.to_string()).filter(|text| !text.is_empty())
                    });
                }
                ":var" => params.vars.push(parse_var(value)?),
                ":magma-eval" => params.isolate = truthy(value),
                ":result-type" => {
                    let text = value.as_str().map(str::to_string).unwrap_or_else(|| value.to_string());
                    params.result_mode = text.parse()?;
                }
                _ => {}
            }
        }
        Ok(params)
    }
}

/// Read a `:var` argument: `name=<literal>` text, or a `[name, value]` list.
fn parse_var(value: &Value) -> Result<Binding> {
    match value {
        Value::String(text) | Value::Symbol(text) => {
            let (name, literal_text) = text.split_once('=').ok_or_else(|| {
                BabelError::InvalidParameter {
                    name: ":var".into(),
                    detail: format!("expected name=value, got '{text}'"),
                }
            })?;
            let name = checked_name(name.trim())?;
            let literal_text = literal_text.trim();
            let value = if literal_text.is_empty() {
                Value::String(String::new())
            } else {
                literal::parse_value(literal_text)
                    .unwrap_or_else(|_| Value::String(literal_text.to_string()))
            };
            Ok(Binding::new(name, symbol_as_string(value)))
        }
        Value::List(items) if items.len() == 2 => {
            let name = items[0].as_str().ok_or_else(|| BabelError::InvalidParameter {
                name: ":var".into(),
                detail: "variable name must be a string".into(),
            })?;
            Ok(Binding::new(checked_name(name)?, items[1].clone()))
        }
        other => Err(BabelError::InvalidParameter {
            name: ":var".into(),
            detail: format!("unsupported binding {other:?}"),
        }),
    }
}

// A bare word on the right of `name=` is text, not an interpreter symbol.
fn symbol_as_string(value: Value) -> Value {
    match value {
        Value::Symbol(text) => Value::String(text),
        other => other,
    }
}

fn checked_name(name: &str) -> Result<String> {
    let mut chars = name.chars();
    let valid = chars
        .next()
        .is_some_and(|ch| ch.is_alphabetic() || ch == '_')
        && chars.all(|ch| ch.is_alphanumeric() || ch == '_');
    if valid {
        Ok(name.to_string())
    } else {
        Err(BabelError::InvalidParameter {
            name: ":var".into(),
            detail: format!("'{name}' is not an identifier"),
        })
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Boolean(flag) => *flag,
        Value::Integer(num) => *num != 0,
        Value::Float(num) => *num != 0.0,
        Value::String(text) | Value::Symbol(text) => {
            matches!(text.trim(), "t" | "yes" | "true" | "1")
        }
        Value::List(items) => !items.is_empty(),
        Value::Hline => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(pairs: &[(&str, Value)]) -> HeaderArgs {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn reads_all_recognised_keys() {
        let params = BlockParams::from_header_args(&args(&[
            (":session", Value::string("work")),
            (":var", Value::string("n=5")),
            (":var", Value::string("xs=[1, 2, 3]")),
            (":var", Value::List(vec![Value::string("s"), Value::string("hi")])),
            (":magma-eval", Value::string("yes")),
            (":result-type", Value::string("output")),
            (":exports", Value::string("both")),
        ]))
        .expect("params");

        assert_eq!(params.session.as_deref(), Some("work"));
        assert_eq!(
            params.vars,
            vec![
                Binding::new("n", 5i64),
                Binding::new("xs", vec![1i64, 2, 3]),
                Binding::new("s", "hi"),
            ]
        );
        assert!(params.isolate);
        assert_eq!(params.result_mode, ResultMode::Output);
    }

    #[test]
    fn defaults_to_value_mode_without_session() {
        let params = BlockParams::from_header_args(&[]).expect("params");
        assert_eq!(params, BlockParams::default());
        assert_eq!(params.result_mode, ResultMode::Value);
        assert!(!params.isolate);
    }

    #[test]
    fn bare_words_bind_as_strings() {
        let params =
            BlockParams::from_header_args(&args(&[(":var", Value::string("p=NextPrime(10)"))]))
                .expect("params");
        assert_eq!(params.vars, vec![Binding::new("p", "NextPrime(10)")]);
    }

    #[test]
    fn rejects_bad_values() {
        let bad_mode = BlockParams::from_header_args(&args(&[(":result-type", Value::string("raw"))]));
        assert!(matches!(bad_mode, Err(BabelError::InvalidParameter { .. })));

        let bad_var = BlockParams::from_header_args(&args(&[(":var", Value::string("no equals"))]));
        assert!(matches!(bad_var, Err(BabelError::InvalidParameter { .. })));

        let bad_name = BlockParams::from_header_args(&args(&[(":var", Value::string("1x=2"))]));
        assert!(matches!(bad_name, Err(BabelError::InvalidParameter { .. })));
    }
}
