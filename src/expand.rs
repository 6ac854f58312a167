//! Body expansion: variable assignments plus the (optionally isolated) block
//! source.

use crate::magma::{encode_literal, string_literal};
use crate::value::Value;

/// Variable bound into a block before it runs.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    /// Interpreter identifier.
    pub name: String,
    /// Host value assigned to it.
    pub value: Value,
}

impl Binding {
    /// Create a binding.
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Assignment statement for this binding.
    pub fn assignment(&self) -> String {
        format!("{} := eval {};", self.name, encode_literal(&self.value))
    }
}

/// Produce the final source text for a block.
///
/// One assignment line per binding in order, a newline, then the source,
/// wrapped in `eval "...";` when `isolate` is set.
pub fn expand_body(source: &str, bindings: &[Binding], isolate: bool) -> String {
    let mut out = String::new();
    for binding in bindings {
        out.push_str(&binding.assignment());
        out.push('\n');
    }
    out.push('\n');
    if isolate {
        out.push_str(&wrap_isolated(source));
    } else {
        out.push_str(source);
    }
    out
}

/// Wrap `source` so the interpreter evaluates it without touching session
/// state.
pub fn wrap_isolated(source: &str) -> String {
    format!("eval {};", string_literal(source))
}
