//! Evaluation settings.
//!
//! Defaults suit a local `magma` binary and the public calculator. Each field
//! can be overridden from the environment or a JSON file.

use crate::error::{BabelError, Result};
use crate::magma::DEFAULT_PROMPT;
use crate::remote::DEFAULT_ENDPOINT;
use crate::session::ReadOptions;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Configuration for both evaluation paths
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Interpreter executable started for each session
    pub command: String,

    /// Arguments passed to the interpreter
    pub args: Vec<String>,

    /// Calculator endpoint for remote evaluation
    pub endpoint: String,

    /// Session used when a block names none
    pub default_session: String,

    /// Prompt installed in every session
    pub prompt: String,

    /// Give up waiting for session output after this many seconds
    pub read_timeout_secs: Option<u64>,

    /// Whole-request timeout for remote evaluation
    pub request_timeout_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            command: "magma".to_string(),
            args: Vec::new(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            default_session: "magma".to_string(),
            prompt: DEFAULT_PROMPT.to_string(),
            read_timeout_secs: None,
            request_timeout_secs: None,
        }
    }
}

impl Config {
    /// Defaults overlaid with `MAGMA_BABEL_*` environment variables.
    pub fn from_env() -> Self {
        Self::default().with_env(|key| std::env::var(key).ok())
    }

    /// Read a JSON configuration file; missing fields keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|err| {
            BabelError::Config(format!("failed to read {}: {err}", path.display()))
        })?;
        let config = serde_json::from_str(&text)?;
        Ok(config)
    }

    /// Overlay values found through `lookup`. Blank values are ignored, as
    /// are timeouts that do not parse.
    pub fn with_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        if let Some(command) = get("MAGMA_BABEL_COMMAND") {
            self.command = command;
        }
        if let Some(args) = get("MAGMA_BABEL_ARGS") {
            self.args = args.split_whitespace().map(str::to_string).collect();
        }
        if let Some(endpoint) = get("MAGMA_BABEL_ENDPOINT") {
            self.endpoint = endpoint;
        }
        if let Some(session) = get("MAGMA_BABEL_SESSION") {
            self.default_session = session;
        }
        if let Some(secs) = get("MAGMA_BABEL_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            self.read_timeout_secs = Some(secs);
        }
        if let Some(secs) = get("MAGMA_BABEL_HTTP_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            self.request_timeout_secs = Some(secs);
        }
        self
    }

    /// Read limits for session round-trips.
    pub fn read_options(&self) -> ReadOptions {
        ReadOptions {
            timeout: self.read_timeout_secs.map(Duration::from_secs),
            cancel: None,
        }
    }

    /// Whole-request timeout for remote evaluation.
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}
