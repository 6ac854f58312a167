//! Asks a live session whether result text reads back as a table.

use super::{ReadOptions, Session};
use crate::error::Result;
use crate::magma;

/// Shape of a block result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Opaque text, returned verbatim.
    Scalar,
    /// Text that decodes into a nested list.
    Structured,
}

/// Classify `raw` by having the session evaluate it and report its kind.
///
/// Evaluation failures are caught inside the interpreter and come back as an
/// opaque tag, so they classify as [`Classification::Scalar`].
pub fn classify(session: &mut Session, raw: &str, read: &ReadOptions) -> Result<Classification> {
    let sentinel = session.next_sentinel();
    let request = magma::classification_request(raw, &sentinel);
    let transcript = session.round_trip(&request, read)?;
    let tag = transcript.lines().next().unwrap_or_default();
    let classification = classify_tag(tag);
    tracing::debug!(session = %session.id(), tag, ?classification, "classified result");
    Ok(classification)
}

/// Structured when the tag ends with the table tag, ignoring trailing
/// whitespace.
pub fn classify_tag(tag: &str) -> Classification {
    if tag.trim_end().ends_with(magma::TABLE_TAG) {
        Classification::Structured
    } else {
        Classification::Scalar
    }
}
