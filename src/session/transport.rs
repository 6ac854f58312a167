//! Line transport to an interactive interpreter process.
//!
//! A [`ReplChannel`] accepts input text and hands back output one line at a
//! time. [`read_until`] layers marker detection, timeout and cancellation on
//! top of any channel.

use crate::error::{BabelError, Result};
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

/// Longest single wait on a channel before cancellation is rechecked.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Outcome of waiting for one output line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Received {
    /// A line of output, including its trailing newline when present.
    Line(String),
    /// Nothing arrived within the wait.
    Idle,
    /// The process closed its output.
    Closed,
}

/// Duplex line stream to a running interpreter.
pub trait ReplChannel: Send {
    /// Write `input` to the interpreter and flush it.
    fn send(&mut self, input: &str) -> io::Result<()>;

    /// Wait up to `wait` for the next output line.
    fn recv_line(&mut self, wait: Duration) -> Received;

    /// Whether the interpreter process is still running.
    fn is_alive(&mut self) -> bool;
}

/// Starts interpreter processes for new sessions.
pub trait Launcher: Send {
    /// Start a fresh interpreter for the session identified by `session_id`.
    fn launch(&self, session_id: &str) -> io::Result<Box<dyn ReplChannel>>;
}

/// Shared flag that aborts a pending [`read_until`].
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create an untriggered token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Trigger cancellation; every clone observes it.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Clear a previous cancellation so the token can be reused.
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Limits applied while waiting for a marker. The default waits forever.
#[derive(Debug, Clone, Default)]
pub struct ReadOptions {
    /// Give up after this long.
    pub timeout: Option<Duration>,
    /// Give up once this token is cancelled.
    pub cancel: Option<CancelToken>,
}

impl ReadOptions {
    /// Set the timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Attach a cancellation token.
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    fn cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelToken::is_cancelled)
    }
}

/// Collect output until a line ending with `marker` arrives.
///
/// The returned transcript includes the marker line.
pub fn read_until(
    channel: &mut dyn ReplChannel,
    marker: &str,
    options: &ReadOptions,
) -> Result<String> {
    let started = Instant::now();
    let mut transcript = String::new();
    loop {
        if options.cancelled() {
            return Err(BabelError::Cancelled {
                marker: marker.to_string(),
            });
        }

        let wait = match options.timeout {
            Some(limit) => {
                let elapsed = started.elapsed();
                if elapsed >= limit {
                    return Err(BabelError::Timeout {
                        marker: marker.to_string(),
                        elapsed,
                    });
                }
                (limit - elapsed).min(POLL_INTERVAL)
            }
            None => POLL_INTERVAL,
        };

        match channel.recv_line(wait) {
            Received::Line(line) => {
                let done = line.trim_end().ends_with(marker);
                transcript.push_str(&line);
                if done {
                    return Ok(transcript);
                }
            }
            Received::Idle => {}
            Received::Closed => {
                return Err(BabelError::TransportClosed {
                    marker: marker.to_string(),
                });
            }
        }
    }
}

/// Channel backed by a child process's stdin and merged stdout/stderr.
pub struct ProcessChannel {
    child: Child,
    writer: BufWriter<ChildStdin>,
    lines: Receiver<String>,
}

impl ProcessChannel {
    /// Spawn `command` with piped stdio.
    pub fn spawn(command: &mut Command) -> io::Result<Self> {
        command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = command.spawn()?;
        let stdin = child.stdin.take().ok_or_else(|| missing_pipe("stdin"))?;
        let stdout = child.stdout.take().ok_or_else(|| missing_pipe("stdout"))?;
        let stderr = child.stderr.take().ok_or_else(|| missing_pipe("stderr"))?;

        let (tx, rx) = mpsc::channel();
        forward_lines(stdout, tx.clone());
        forward_lines(stderr, tx);

        Ok(Self {
            child,
            writer: BufWriter::new(stdin),
            lines: rx,
        })
    }

    /// Operating-system process id of the interpreter.
    pub fn pid(&self) -> u32 {
        self.child.id()
    }
}

impl ReplChannel for ProcessChannel {
    fn send(&mut self, input: &str) -> io::Result<()> {
        self.writer.write_all(input.as_bytes())?;
        self.writer.flush()
    }

    fn recv_line(&mut self, wait: Duration) -> Received {
        match self.lines.recv_timeout(wait) {
            Ok(line) => Received::Line(line),
            Err(RecvTimeoutError::Timeout) => Received::Idle,
            Err(RecvTimeoutError::Disconnected) => Received::Closed,
        }
    }

    fn is_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }
}

fn missing_pipe(name: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::BrokenPipe,
        format!("spawned interpreter did not expose {name}"),
    )
}

fn forward_lines<R>(reader: R, tx: Sender<String>)
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut reader = BufReader::new(reader);
        let mut buffer = Vec::with_capacity(256);
        loop {
            buffer.clear();
            match reader.read_until(b'\n', &mut buffer) {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buffer).into_owned();
                    if tx.send(line).is_err() {
                        break;
                    }
                }
            }
        }
    });
}

/// Launches the configured interpreter command for each new session.
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    program: String,
    args: Vec<String>,
}

impl ProcessLauncher {
    /// Launcher running `program` with `args`.
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

impl Launcher for ProcessLauncher {
    fn launch(&self, session_id: &str) -> io::Result<Box<dyn ReplChannel>> {
        let mut command = Command::new(&self.program);
        command.args(&self.args).env("TERM", "dumb");
        let channel = ProcessChannel::spawn(&mut command)?;
        tracing::debug!(
            session = session_id,
            program = %self.program,
            pid = channel.pid(),
            "spawned interpreter"
        );
        Ok(Box::new(channel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    struct Lines(VecDeque<Received>);

    impl ReplChannel for Lines {
        fn send(&mut self, _input: &str) -> io::Result<()> {
            Ok(())
        }

        fn recv_line(&mut self, _wait: Duration) -> Received {
            self.0.pop_front().unwrap_or(Received::Idle)
        }

        fn is_alive(&mut self) -> bool {
            true
        }
    }

    fn channel(items: &[Received]) -> Lines {
        Lines(items.iter().cloned().collect())
    }

    #[test]
    fn stops_at_marker_line() {
        let mut lines = channel(&[
            Received::Line("2\n".into()),
            Received::Idle,
            Received::Line("magma> EOE\n".into()),
            Received::Line("late\n".into()),
        ]);
        let transcript = read_until(&mut lines, "EOE", &ReadOptions::default()).expect("read");
        assert_eq!(transcript, "2\nmagma> EOE\n");
    }

    #[test]
    fn marker_inside_echoed_statement_does_not_match() {
        let mut lines = channel(&[
            Received::Line("print \"EOE\";\n".into()),
            Received::Line("EOE\n".into()),
        ]);
        let transcript = read_until(&mut lines, "EOE", &ReadOptions::default()).expect("read");
        assert_eq!(transcript, "print \"EOE\";\nEOE\n");
    }

    #[test]
    fn closed_channel_is_an_error() {
        let mut lines = channel(&[Received::Line("partial\n".into()), Received::Closed]);
        let err = read_until(&mut lines, "EOE", &ReadOptions::default()).unwrap_err();
        assert!(matches!(err, BabelError::TransportClosed { .. }));
    }

    #[test]
    fn times_out_when_marker_never_arrives() {
        let mut lines = channel(&[]);
        let options = ReadOptions::default().with_timeout(Duration::from_millis(20));
        let err = read_until(&mut lines, "EOE", &options).unwrap_err();
        assert!(matches!(err, BabelError::Timeout { .. }));
    }

    #[test]
    fn cancellation_stops_the_wait() {
        let token = CancelToken::new();
        token.cancel();
        let mut lines = channel(&[Received::Line("EOE\n".into())]);
        let options = ReadOptions::default().with_cancel(token.clone());
        let err = read_until(&mut lines, "EOE", &options).unwrap_err();
        assert!(matches!(err, BabelError::Cancelled { .. }));

        token.reset();
        let transcript = read_until(&mut lines, "EOE", &options).expect("read after reset");
        assert_eq!(transcript, "EOE\n");
    }

    #[cfg(unix)]
    #[test]
    fn process_channel_round_trips_through_cat() {
        let mut channel = ProcessChannel::spawn(&mut Command::new("cat")).expect("spawn cat");
        assert!(channel.is_alive());
        channel.send("hello\nEOE\n").expect("send");
        let options = ReadOptions::default().with_timeout(Duration::from_secs(10));
        let transcript = read_until(&mut channel, "EOE", &options).expect("read");
        assert_eq!(transcript, "hello\nEOE\n");
    }
}
