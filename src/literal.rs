//! Reader for printed list literals.
//!
//! Turns interpreter output such as `[ 1, [ "a", b ], 2/3 ]` into a nested
//! [`Value`]. Bracketed sequences (`[ ]`, `[* *]`), sets (`{ }`) and tuples
//! (`< >`) all read as lists. Anything between separators that is not a
//! quoted string or a nested container is an atom: integers, floats and
//! booleans are recognised, everything else becomes a [`Value::Symbol`]
//! holding the trimmed text. An empty element reads as [`Value::Hline`].

use crate::error::{BabelError, Result};
use crate::value::Value;

/// Deepest container nesting the reader accepts.
pub const MAX_DEPTH: usize = 256;

/// Parse `text` as exactly one literal value.
pub fn parse_value(text: &str) -> Result<Value> {
    let mut reader = Reader::new(text);
    reader.skip_ws();
    if reader.eof() {
        return Err(reader.error("empty input"));
    }
    let value = reader.read_value(None, 0)?;
    reader.skip_ws();
    if !reader.eof() {
        return Err(reader.error("trailing input after value"));
    }
    Ok(value)
}

/// Best-effort decode of result text.
///
/// Lists, numbers, booleans and quoted strings come back structured. Plain
/// text, and anything the reader rejects, comes back as the original string.
pub fn decode_result(text: &str) -> Value {
    match parse_value(text) {
        Ok(Value::Symbol(_)) | Ok(Value::Hline) => Value::String(text.to_string()),
        Ok(value) => value,
        Err(err) => {
            tracing::debug!(error = %err, "result is not a literal; keeping text");
            Value::String(text.to_string())
        }
    }
}

/// Closing delimiter of the innermost open container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Close {
    Bracket,
    StarBracket,
    Brace,
    Angle,
}

impl Close {
    fn text(self) -> &'static str {
        match self {
            Close::Bracket => "]",
            Close::StarBracket => "*]",
            Close::Brace => "}",
            Close::Angle => ">",
        }
    }
}

struct Reader<'a> {
    src: &'a str,
    index: usize,
}

impl<'a> Reader<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, index: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.index..]
    }

    fn eof(&self) -> bool {
        self.index >= self.src.len()
    }

    fn current(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn advance(&mut self) {
        if let Some(ch) = self.current() {
            self.index += ch.len_utf8();
        }
    }

    fn skip_ws(&mut self) {
        while let Some(ch) = self.current() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn at_close(&self, close: Close) -> bool {
        self.rest().starts_with(close.text())
    }

    /// Parse one element. `close` is the innermost open container, `None`
    /// at top level; `depth` counts the open containers.
    fn read_value(&mut self, close: Option<Close>, depth: usize) -> Result<Value> {
        self.skip_ws();
        if self.rest().starts_with("[*") {
            self.index += 2;
            return self.parse_container(Close::StarBracket, depth);
        }
        match self.current() {
            Some('[') => {
                self.advance();
                self.parse_container(Close::Bracket, depth)
            }
            Some('{') => {
                self.advance();
                self.parse_container(Close::Brace, depth)
            }
            Some('<') => {
                self.advance();
                self.parse_container(Close::Angle, depth)
            }
            Some('"') => self.parse_string(),
            Some(_) => Ok(self.parse_atom(close)),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn parse_container(&mut self, close: Close, depth: usize) -> Result<Value> {
        let depth = depth + 1;
        if depth > MAX_DEPTH {
            return Err(self.error(&format!("nesting deeper than {MAX_DEPTH}")));
        }

        let mut items = Vec::new();
        self.skip_ws();
        if self.at_close(close) {
            self.index += close.text().len();
            return Ok(Value::List(items));
        }

        loop {
            items.push(self.read_value(Some(close), depth)?);
            self.skip_ws();
            if self.at_close(close) {
                self.index += close.text().len();
                return Ok(Value::List(items));
            }
            match self.current() {
                Some(',') => self.advance(),
                Some(other) => {
                    return Err(self.error(&format!(
                        "expected ',' or '{}', found '{other}'",
                        close.text()
                    )));
                }
                None => return Err(self.error("unterminated list")),
            }
        }
    }

    fn parse_string(&mut self) -> Result<Value> {
        // consume opening quote
        self.advance();
        let mut buf = String::new();
        while let Some(ch) = self.current() {
            self.advance();
            match ch {
                '"' => return Ok(Value::String(buf)),
                '\\' => {
                    let escaped = self
                        .current()
                        .ok_or_else(|| self.error("incomplete escape"))?;
                    self.advance();
                    let value = match escaped {
                        '"' => '"',
                        '\\' => '\\',
                        'n' => '\n',
                        't' => '\t',
                        other => {
                            return Err(self.error(&format!("unknown escape: \\{other}")));
                        }
                    };
                    buf.push(value);
                }
                _ => buf.push(ch),
            }
        }
        Err(self.error("unterminated string literal"))
    }

    /// Scan up to the next separator of the innermost container, keeping
    /// bracketed groups such as `Gcd(4, 6)` or `f[1]` intact.
    fn parse_atom(&mut self, close: Option<Close>) -> Value {
        let start = self.index;
        let mut depth = 0usize;
        while let Some(ch) = self.current() {
            if depth == 0 {
                if let Some(close) = close {
                    if ch == ',' || self.at_close(close) {
                        break;
                    }
                }
            }
            match ch {
                '(' | '[' | '{' => depth += 1,
                ')' | ']' | '}' => depth = depth.saturating_sub(1),
                _ => {}
            }
            self.advance();
        }
        atom(self.src[start..self.index].trim())
    }

    fn error(&self, message: &str) -> BabelError {
        BabelError::Literal(format!("{} at byte {}", message, self.index))
    }
}

fn atom(text: &str) -> Value {
    if text.is_empty() {
        return Value::Hline;
    }
    if let Ok(num) = text.parse::<i64>() {
        return Value::Integer(num);
    }
    if looks_numeric(text) {
        if let Ok(num) = text.parse::<f64>() {
            return Value::Float(num);
        }
    }
    match text {
        "true" => Value::Boolean(true),
        "false" => Value::Boolean(false),
        _ => Value::Symbol(text.to_string()),
    }
}

// Rejects words like "inf" and "NaN" that `f64::from_str` would accept.
fn looks_numeric(text: &str) -> bool {
    text.chars().any(|ch| ch.is_ascii_digit())
        && text
            .chars()
            .all(|ch| ch.is_ascii_digit() || matches!(ch, '.' | '-' | '+' | 'e' | 'E'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_interpreter_sequences() {
        let value = parse_value("[ 1, 2, 3 ]").expect("parse");
        assert_eq!(value, Value::from(vec![1i64, 2, 3]));
    }

    #[test]
    fn parses_nested_tables_with_symbols() {
        let value = parse_value("[\n  [ a, 1/2 ],\n  [ x^2 + 1, -4 ]\n]").expect("parse");
        assert_eq!(
            value,
            Value::List(vec![
                Value::List(vec![Value::symbol("a"), Value::symbol("1/2")]),
                Value::List(vec![Value::symbol("x^2 + 1"), Value::Integer(-4)]),
            ])
        );
    }

    #[test]
    fn keeps_parenthesised_commas_inside_atoms() {
        let value = parse_value("[ Gcd(4, 6), 2 ]").expect("parse");
        assert_eq!(
            value,
            Value::List(vec![Value::symbol("Gcd(4, 6)"), Value::Integer(2)])
        );
    }

    #[test]
    fn reads_other_container_shapes() {
        assert_eq!(
            parse_value("[* 1, \"two\" *]").expect("parse"),
            Value::List(vec![Value::Integer(1), Value::string("two")])
        );
        assert_eq!(
            parse_value("{ 1, 2 }").expect("parse"),
            Value::from(vec![1i64, 2])
        );
        assert_eq!(
            parse_value("<1, 2.5>").expect("parse"),
            Value::List(vec![Value::Integer(1), Value::Float(2.5)])
        );
        assert_eq!(parse_value("[]").expect("parse"), Value::List(Vec::new()));
    }

    #[test]
    fn unescapes_strings() {
        let value = parse_value(r#"[ "say \"hi\"", "back\\slash" ]"#).expect("parse");
        assert_eq!(
            value,
            Value::from(vec!["say \"hi\"", "back\\slash"])
        );
    }

    #[test]
    fn empty_elements_are_separators() {
        let value = parse_value("[[1], , [2]]").expect("parse");
        assert_eq!(
            value,
            Value::List(vec![
                Value::from(vec![1i64]),
                Value::Hline,
                Value::from(vec![2i64]),
            ])
        );
    }

    #[test]
    fn rejects_unbalanced_input() {
        assert!(matches!(parse_value("[1, 2"), Err(BabelError::Literal(_))));
        assert!(matches!(parse_value("[1] tail"), Err(BabelError::Literal(_))));
        assert!(matches!(parse_value("   "), Err(BabelError::Literal(_))));
    }

    #[test]
    fn nesting_is_bounded() {
        let nested = format!("{}{}", "[".repeat(MAX_DEPTH), "]".repeat(MAX_DEPTH));
        assert!(parse_value(&nested).is_ok());

        let deeper = format!("{}{}", "[".repeat(MAX_DEPTH + 1), "]".repeat(MAX_DEPTH + 1));
        assert!(matches!(parse_value(&deeper), Err(BabelError::Literal(_))));
    }

    #[test]
    fn hostile_nesting_decodes_as_text() {
        let text = "[".repeat(100_000);
        assert_eq!(decode_result(&text), Value::String(text.clone()));
    }

    #[test]
    fn decode_result_falls_back_to_text() {
        assert_eq!(decode_result("2"), Value::Integer(2));
        assert_eq!(decode_result("Hello world"), Value::string("Hello world"));
        assert_eq!(decode_result("[1, 2"), Value::string("[1, 2"));
        assert_eq!(decode_result(""), Value::string(""));
    }
}
