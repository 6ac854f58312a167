//! Runs expanded block text inside a session and collects its result.

use super::classify::{Classification, classify};
use super::{ReadOptions, Session};
use crate::error::Result;
use crate::literal;
use crate::magma;
use crate::params::ResultMode;
use crate::value::Value;

/// Evaluate `expanded` in `session` and return the block's result.
///
/// In `output` mode the printed text comes back verbatim. In `value` and
/// `eval` modes the text is classified first and decoded into a list when the
/// interpreter reports it as a table.
pub fn execute_in_session(
    session: &mut Session,
    expanded: &str,
    mode: ResultMode,
    read: &ReadOptions,
) -> Result<Value> {
    let sentinel = session.next_sentinel();
    let request = format!("{expanded}\n{}\n", magma::sentinel_statement(&sentinel));
    let transcript = session.round_trip(&request, read)?;
    let raw = trim_transcript(&transcript);

    if !mode.wants_classification() {
        return Ok(Value::String(raw));
    }

    match classify(session, &raw, read)? {
        Classification::Structured => Ok(literal::decode_result(&raw)),
        Classification::Scalar => Ok(Value::String(raw)),
    }
}

/// Drop the sentinel line and the empty remainder after it.
pub fn trim_transcript(transcript: &str) -> String {
    let lines: Vec<&str> = transcript.split('\n').collect();
    let keep = lines.len().saturating_sub(2);
    lines[..keep].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_sentinel_and_trailing_empty_line() {
        assert_eq!(trim_transcript("2\nEOE\n"), "2");
        assert_eq!(trim_transcript("a\n\nb\nEOE\n"), "a\n\nb");
    }

    #[test]
    fn bare_sentinel_yields_empty_text() {
        assert_eq!(trim_transcript("EOE\n"), "");
        assert_eq!(trim_transcript(""), "");
    }
}
