//! Error types for Magma block evaluation
//!
//! Every failure that is not recovered internally surfaces as a
//! [`BabelError`] and propagates unchanged to the host.

use std::io;
use std::time::Duration;
use thiserror::Error;

/// Top-level evaluation error
#[derive(Debug, Error)]
pub enum BabelError {
    /// The session process could not be spawned
    #[error("failed to start session '{session}': {source}")]
    Startup {
        /// Session name that was being started
        session: String,
        /// Underlying spawn error
        #[source]
        source: io::Error,
    },

    /// I/O error while talking to a session process
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// The session process closed its output before the sentinel arrived
    #[error("session process closed its output before '{marker}' was seen")]
    TransportClosed {
        /// Marker the reader was waiting for
        marker: String,
    },

    /// The sentinel did not arrive within the configured read timeout
    #[error("no '{marker}' within {elapsed:?}")]
    Timeout {
        /// Marker the reader was waiting for
        marker: String,
        /// Time spent waiting
        elapsed: Duration,
    },

    /// The read was cancelled through its cancellation token
    #[error("read cancelled while waiting for '{marker}'")]
    Cancelled {
        /// Marker the reader was waiting for
        marker: String,
    },

    /// Network or HTTP failure on the remote path
    #[error("remote request failed: {0}")]
    Remote(String),

    /// The remote payload could not be decoded
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Text could not be read as a literal value
    #[error("literal syntax error: {0}")]
    Literal(String),

    /// A header argument carried an unusable value
    #[error("invalid parameter {name}: {detail}")]
    InvalidParameter {
        /// Header argument name (e.g. `:result-type`)
        name: String,
        /// What was wrong with it
        detail: String,
    },

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),
}

/// Convenience result alias for evaluation operations
pub type Result<T> = std::result::Result<T, BabelError>;

impl From<reqwest::Error> for BabelError {
    fn from(err: reqwest::Error) -> Self {
        BabelError::Remote(err.to_string())
    }
}

impl From<roxmltree::Error> for BabelError {
    fn from(err: roxmltree::Error) -> Self {
        BabelError::MalformedResponse(format!("invalid XML: {err}"))
    }
}

impl From<serde_json::Error> for BabelError {
    fn from(err: serde_json::Error) -> Self {
        BabelError::Config(err.to_string())
    }
}
