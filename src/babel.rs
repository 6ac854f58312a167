//! Host integration: the two block entry points.
//!
//! A [`Babel`] owns the session registry and the remote executor for the
//! lifetime of the host application. Session calls take `&mut self`, so one
//! registry never sees overlapping requests.

use crate::config::Config;
use crate::error::Result;
use crate::expand::expand_body;
use crate::params::{BlockParams, HeaderArgs, ResultMode};
use crate::remote::{ReqwestTransport, RemoteExecutor};
use crate::session::{
    CancelToken, ProcessLauncher, ReadOptions, SessionInfo, SessionRegistry, execute_in_session,
};
use crate::value::Value;

/// Evaluates blocks in sessions or remotely.
pub struct Babel {
    config: Config,
    sessions: SessionRegistry,
    remote: RemoteExecutor,
    cancel: CancelToken,
}

impl Babel {
    /// Build from `config` with the process launcher and the `reqwest`
    /// transport.
    pub fn new(config: Config) -> Result<Self> {
        let launcher = ProcessLauncher::new(config.command.clone(), config.args.clone());
        let sessions =
            SessionRegistry::new(Box::new(launcher), &config.default_session, &config.prompt);
        let transport = ReqwestTransport::new(config.request_timeout())?;
        let remote = RemoteExecutor::new(&config.endpoint, Box::new(transport))?;
        Ok(Self::with_parts(config, sessions, remote))
    }

    /// Build from explicit parts.
    pub fn with_parts(config: Config, sessions: SessionRegistry, remote: RemoteExecutor) -> Self {
        Self {
            config,
            sessions,
            remote,
            cancel: CancelToken::new(),
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Token that aborts a pending session read from another thread. It is
    /// reset at the start of every session call.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Summaries of the running sessions.
    pub fn sessions(&self) -> Vec<SessionInfo> {
        self.sessions.sessions()
    }

    /// Evaluate `source` in the session named by `:session`.
    pub fn execute(&mut self, source: &str, args: &HeaderArgs) -> Result<Value> {
        let params = BlockParams::from_header_args(args)?;
        let expanded = expand_body(source, &params.vars, params.isolate);
        let read = self.read_options();
        let session = self.sessions.ensure_session(params.session.as_deref(), &read)?;
        tracing::debug!(
            session = %session.id(),
            mode = %params.result_mode,
            isolate = params.isolate,
            "executing block"
        );
        execute_in_session(session, &expanded, params.result_mode, &read)
    }

    /// Evaluate `source` through the online calculator.
    pub fn execute_remote(&self, source: &str, args: &HeaderArgs) -> Result<Value> {
        let params = BlockParams::from_header_args(args)?;
        let expanded = expand_body(source, &params.vars, params.isolate);
        self.remote.execute(&expanded, params.result_mode)
    }

    /// Start (or reuse) the session named by `:session` and bind the block's
    /// variables there without running any body. Returns the session id.
    pub fn prep_session(&mut self, args: &HeaderArgs) -> Result<String> {
        let params = BlockParams::from_header_args(args)?;
        let read = self.read_options();
        let session = self.sessions.ensure_session(params.session.as_deref(), &read)?;
        if !params.vars.is_empty() {
            let assignments = expand_body("", &params.vars, false);
            execute_in_session(session, &assignments, ResultMode::Output, &read)?;
        }
        Ok(session.id().to_string())
    }

    fn read_options(&self) -> ReadOptions {
        self.cancel.reset();
        self.config.read_options().with_cancel(self.cancel.clone())
    }
}
