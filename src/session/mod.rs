//! Named interpreter sessions.
//!
//! The [`SessionRegistry`] maps session names to live interpreter processes.
//! A name is started on first use and reused afterwards; a session whose
//! process has exited is replaced the next time it is requested. Sessions
//! are never shut down from this side.
//!
//! Every request ends with its own sentinel. When a read is abandoned on
//! timeout or cancellation, its sentinel is remembered and the late output
//! it delimits is discarded from the next transcript.

use crate::error::{BabelError, Result};
use crate::magma;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use uuid::Uuid;

pub mod classify;
pub mod executor;
pub mod transport;

pub use classify::{Classification, classify, classify_tag};
pub use executor::{execute_in_session, trim_transcript};
pub use transport::{
    CancelToken, Launcher, ProcessChannel, ProcessLauncher, ReadOptions, Received, ReplChannel,
    read_until,
};

/// Session name callers use to ask for the default session.
pub const NO_SESSION: &str = "none";

/// Deterministic identifier for a session name.
pub fn session_id(name: &str) -> String {
    format!("*{name}*")
}

/// Summary of a running session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionInfo {
    /// Session name as requested by the host.
    pub name: String,
    /// Identifier derived from the name.
    pub id: String,
    /// When the interpreter was started.
    pub started_at: DateTime<Utc>,
}

/// One live interpreter and the protocol state attached to it.
pub struct Session {
    name: String,
    id: String,
    sentinel: String,
    abandoned: Vec<String>,
    prompt: Regex,
    started_at: DateTime<Utc>,
    channel: Box<dyn ReplChannel>,
}

impl Session {
    fn new(name: &str, id: &str, prompt: &str, channel: Box<dyn ReplChannel>) -> Result<Self> {
        let pattern = format!("^(?:{})+", regex::escape(prompt));
        let prompt = Regex::new(&pattern)
            .map_err(|err| BabelError::Config(format!("invalid prompt pattern: {err}")))?;
        Ok(Self {
            name: name.to_string(),
            id: id.to_string(),
            sentinel: fresh_sentinel(),
            abandoned: Vec::new(),
            prompt,
            started_at: Utc::now(),
            channel,
        })
    }

    /// Session name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Session identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// End-of-output marker of the current request.
    pub fn sentinel(&self) -> &str {
        &self.sentinel
    }

    /// Start a new request: pick a fresh end-of-output marker and return it.
    pub fn next_sentinel(&mut self) -> String {
        self.sentinel = fresh_sentinel();
        self.sentinel.clone()
    }

    /// Summary for host inspection.
    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            name: self.name.clone(),
            id: self.id.clone(),
            started_at: self.started_at,
        }
    }

    /// Whether the interpreter process is still running.
    pub fn is_alive(&mut self) -> bool {
        self.channel.is_alive()
    }

    /// Send `input`, which must end by printing the current sentinel, and
    /// return the transcript up to and including the sentinel line with
    /// prompts removed.
    pub fn round_trip(&mut self, input: &str, read: &ReadOptions) -> Result<String> {
        tracing::debug!(session = %self.id, bytes = input.len(), "sending request");
        self.channel.send(input)?;
        match read_until(self.channel.as_mut(), &self.sentinel, read) {
            Ok(transcript) => {
                let current = self.skip_abandoned(&transcript);
                Ok(self.strip_prompts(current))
            }
            Err(err @ (BabelError::Timeout { .. } | BabelError::Cancelled { .. })) => {
                tracing::warn!(session = %self.id, error = %err, "abandoning request output");
                self.abandoned.push(self.sentinel.clone());
                Err(err)
            }
            Err(err) => Err(err),
        }
    }

    /// Drop output belonging to abandoned requests. The interpreter answers
    /// in order, so all of it precedes the current sentinel.
    fn skip_abandoned<'t>(&mut self, transcript: &'t str) -> &'t str {
        if self.abandoned.is_empty() {
            return transcript;
        }
        let mut start = 0;
        let mut offset = 0;
        for line in transcript.split_inclusive('\n') {
            offset += line.len();
            let line = line.trim_end();
            if self.abandoned.iter().any(|marker| line.ends_with(marker.as_str())) {
                start = offset;
            }
        }
        tracing::debug!(
            session = %self.id,
            dropped = start,
            "discarded late output of abandoned requests"
        );
        self.abandoned.clear();
        &transcript[start..]
    }

    fn strip_prompts(&self, transcript: &str) -> String {
        transcript
            .split('\n')
            .map(|line| self.prompt.replace(line, ""))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn initialise(&mut self, prompt: &str, read: &ReadOptions) -> Result<()> {
        let sentinel = self.next_sentinel();
        let script = magma::init_script(prompt, &sentinel);
        self.round_trip(&script, read)?;
        Ok(())
    }
}

/// Registry of named sessions, owned by the host integration layer.
pub struct SessionRegistry {
    launcher: Box<dyn Launcher>,
    default_name: String,
    prompt: String,
    sessions: HashMap<String, Session>,
}

impl SessionRegistry {
    /// Empty registry starting sessions through `launcher`.
    pub fn new(launcher: Box<dyn Launcher>, default_name: &str, prompt: &str) -> Self {
        Self {
            launcher,
            default_name: default_name.to_string(),
            prompt: prompt.to_string(),
            sessions: HashMap::new(),
        }
    }

    /// Map an absent, empty or `"none"` name to the default session name.
    pub fn canonical_name(&self, name: Option<&str>) -> String {
        match name.map(str::trim) {
            None | Some("") | Some(NO_SESSION) => self.default_name.clone(),
            Some(name) => name.to_string(),
        }
    }

    /// Return the live session for `name`, starting and initialising one if
    /// needed.
    pub fn ensure_session(&mut self, name: Option<&str>, read: &ReadOptions) -> Result<&mut Session> {
        let name = self.canonical_name(name);
        let id = session_id(&name);

        let alive = self
            .sessions
            .get_mut(&id)
            .is_some_and(|session| session.is_alive());

        let launcher = self.launcher.as_ref();
        let prompt = self.prompt.as_str();
        let session = match self.sessions.entry(id) {
            Entry::Occupied(entry) if alive => entry.into_mut(),
            Entry::Occupied(mut entry) => {
                tracing::warn!(session = %entry.key(), "interpreter exited; restarting session");
                let fresh = start_session(launcher, prompt, &name, entry.key(), read)?;
                entry.insert(fresh);
                entry.into_mut()
            }
            Entry::Vacant(entry) => {
                let fresh = start_session(launcher, prompt, &name, entry.key(), read)?;
                entry.insert(fresh)
            }
        };
        Ok(session)
    }

    /// Whether a session is registered under `name`.
    pub fn contains(&self, name: Option<&str>) -> bool {
        self.sessions
            .contains_key(&session_id(&self.canonical_name(name)))
    }

    /// Number of registered sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no session has been started.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Identifiers of all registered sessions, sorted.
    pub fn session_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Summaries of all registered sessions, sorted by identifier.
    pub fn sessions(&self) -> Vec<SessionInfo> {
        let mut infos: Vec<SessionInfo> = self.sessions.values().map(Session::info).collect();
        infos.sort_by(|a, b| a.id.cmp(&b.id));
        infos
    }
}

fn fresh_sentinel() -> String {
    format!("org_babel_magma_eoe_{}", Uuid::new_v4().simple())
}

fn start_session(
    launcher: &dyn Launcher,
    prompt: &str,
    name: &str,
    id: &str,
    read: &ReadOptions,
) -> Result<Session> {
    let channel = launcher.launch(id).map_err(|source| BabelError::Startup {
        session: name.to_string(),
        source,
    })?;
    let mut session = Session::new(name, id, prompt, channel)?;
    session.initialise(prompt, read)?;
    tracing::info!(session = %id, "started interpreter session");
    Ok(session)
}
