//! Magma dialect: literal syntax and the statements the session protocol
//! sends to the interpreter.

use crate::value::Value;

/// Language name used by hosts to tag code blocks.
pub const LANGUAGE: &str = "magma";

/// Conventional file suffix for tangled Magma sources.
pub const FILE_EXTENSION: &str = "m";

/// Prompt installed in every session.
pub const DEFAULT_PROMPT: &str = "magma> ";

/// Name of the introspection routine defined at session start.
pub const KIND_HELPER: &str = "OrgBabelMagmaKind";

/// Tag the helper reports for values that read back as tables.
pub const TABLE_TAG: &str = "table";

/// Tag the helper reports when the text cannot be evaluated.
pub const OPAQUE_TAG: &str = "opaque";

/// Quote `text` as a Magma string literal.
pub fn string_literal(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for ch in text.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            _ => out.push(ch),
        }
    }
    out.push('"');
    out
}

/// Encode a host value in Magma literal syntax.
///
/// Lists encode element-wise as `[e1, e2, ...]`, separator rows as the empty
/// string, strings as quoted literals. Every other atom uses its printed form.
pub fn encode_literal(value: &Value) -> String {
    match value {
        Value::List(items) => {
            let parts: Vec<String> = items.iter().map(encode_literal).collect();
            format!("[{}]", parts.join(", "))
        }
        Value::Hline => String::new(),
        Value::String(text) => string_literal(text),
        other => other.to_string(),
    }
}

/// Statement printing the end-of-output sentinel.
pub fn sentinel_statement(sentinel: &str) -> String {
    format!("print {};", string_literal(sentinel))
}

/// Definition of the introspection routine.
///
/// Evaluates its argument and reports [`TABLE_TAG`] for sequence-like
/// results, the type name otherwise, and [`OPAQUE_TAG`] if evaluation fails.
pub fn kind_helper_definition() -> String {
    format!(
        "{KIND_HELPER} := function(s)\n\
         \x20 try\n\
         \x20   x := eval s;\n\
         \x20 catch e\n\
         \x20   return \"{OPAQUE_TAG}\";\n\
         \x20 end try;\n\
         \x20 if Type(x) in {{SeqEnum, List, Tup}} then\n\
         \x20   return \"{TABLE_TAG}\";\n\
         \x20 end if;\n\
         \x20 return Sprint(Type(x));\n\
         end function;"
    )
}

/// Statements run once when a session starts, ending with the sentinel so
/// their output can be drained.
pub fn init_script(prompt: &str, sentinel: &str) -> String {
    [
        format!("SetPrompt({});", string_literal(prompt)),
        "SetColumns(0);".to_string(),
        "SetAutoColumns(false);".to_string(),
        "SetLineEditor(false);".to_string(),
        kind_helper_definition(),
        sentinel_statement(sentinel),
    ]
    .join("\n")
        + "\n"
}

/// Request asking the session to classify `raw` result text.
pub fn classification_request(raw: &str, sentinel: &str) -> String {
    format!(
        "print {KIND_HELPER}({});\n{}\n",
        string_literal(raw),
        sentinel_statement(sentinel)
    )
}
