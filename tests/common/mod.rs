//! Scripted stand-in for an interactive Magma process.
#![allow(dead_code)]

use magma_babel::magma::{DEFAULT_PROMPT, KIND_HELPER};
use magma_babel::session::{Launcher, Received, ReplChannel};
use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Maps a request body (sentinel statement removed, trimmed) to the text
/// the interpreter prints. `None` means the interpreter hangs. Bodies
/// containing `slow` are answered, but only once the next request arrives.
pub type Responder = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Shared view of everything the fake launcher did.
#[derive(Clone, Default)]
pub struct Record {
    pub spawned: Arc<AtomicUsize>,
    pub inputs: Arc<Mutex<Vec<String>>>,
    pub alive: Arc<Mutex<Vec<Arc<AtomicBool>>>>,
}

impl Record {
    pub fn spawn_count(&self) -> usize {
        self.spawned.load(Ordering::SeqCst)
    }

    pub fn inputs(&self) -> Vec<String> {
        self.inputs.lock().unwrap().clone()
    }

    /// Mark the most recently spawned interpreter as exited.
    pub fn kill_last(&self) {
        if let Some(flag) = self.alive.lock().unwrap().last() {
            flag.store(false, Ordering::SeqCst);
        }
    }
}

pub struct FakeLauncher {
    pub record: Record,
    pub responder: Responder,
    pub fail: bool,
}

impl FakeLauncher {
    pub fn new(responder: Responder) -> Self {
        Self {
            record: Record::default(),
            responder,
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(Arc::new(|_| Some(String::new())))
        }
    }
}

impl Launcher for FakeLauncher {
    fn launch(&self, _session_id: &str) -> io::Result<Box<dyn ReplChannel>> {
        if self.fail {
            return Err(io::Error::new(io::ErrorKind::NotFound, "magma: not found"));
        }
        self.record.spawned.fetch_add(1, Ordering::SeqCst);
        let alive = Arc::new(AtomicBool::new(true));
        self.record.alive.lock().unwrap().push(alive.clone());
        Ok(Box::new(FakeMagma {
            responder: self.responder.clone(),
            inputs: self.record.inputs.clone(),
            alive,
            pending: VecDeque::new(),
            held: Vec::new(),
        }))
    }
}

struct FakeMagma {
    responder: Responder,
    inputs: Arc<Mutex<Vec<String>>>,
    alive: Arc<AtomicBool>,
    pending: VecDeque<String>,
    held: Vec<String>,
}

impl ReplChannel for FakeMagma {
    fn send(&mut self, input: &str) -> io::Result<()> {
        self.inputs.lock().unwrap().push(input.to_string());
        self.pending.extend(self.held.drain(..));
        let (body, sentinel) = split_request(input);

        let output = if body.contains("SetPrompt(") {
            Some(String::new())
        } else {
            (self.responder)(body.trim())
        };
        let Some(output) = output else {
            return Ok(());
        };

        let mut lines = Vec::new();
        let mut prompt = DEFAULT_PROMPT;
        for line in output.lines() {
            lines.push(format!("{prompt}{line}\n"));
            prompt = "";
        }
        lines.push(format!("{prompt}{sentinel}\n"));
        if body.contains("slow") {
            self.held.extend(lines);
        } else {
            self.pending.extend(lines);
        }
        Ok(())
    }

    fn recv_line(&mut self, wait: Duration) -> Received {
        match self.pending.pop_front() {
            Some(line) => Received::Line(line),
            None => {
                std::thread::sleep(wait.min(Duration::from_millis(5)));
                Received::Idle
            }
        }
    }

    fn is_alive(&mut self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }
}

/// Split `<body>\nprint "<sentinel>";\n` into body and sentinel.
fn split_request(input: &str) -> (&str, String) {
    let trimmed = input.trim_end_matches('\n');
    let (body, last) = trimmed.rsplit_once('\n').unwrap_or(("", trimmed));
    let sentinel = last
        .trim()
        .trim_start_matches("print \"")
        .trim_end_matches("\";")
        .to_string();
    (body, sentinel)
}

/// Extract the string literal passed to the introspection helper, if `body`
/// is a classification request.
pub fn classification_argument(body: &str) -> Option<String> {
    let prefix = format!("print {KIND_HELPER}(\"");
    let inner = body.strip_prefix(prefix.as_str())?.strip_suffix("\");")?;
    Some(inner.replace("\\\"", "\"").replace("\\\\", "\\"))
}

/// Responder that answers a fixed table of bodies and classifies results
/// starting with `[` as tables.
pub fn scripted(answers: &[(&str, &str)]) -> Responder {
    let answers: Vec<(String, String)> = answers
        .iter()
        .map(|(body, output)| (body.to_string(), output.to_string()))
        .collect();
    Arc::new(move |body: &str| {
        if let Some(raw) = classification_argument(body) {
            let tag = if raw.trim_start().starts_with('[') {
                "table"
            } else if raw.trim().parse::<i64>().is_ok() {
                "RngIntElt"
            } else {
                "opaque"
            };
            return Some(tag.to_string());
        }
        if body.contains("hang") {
            return None;
        }
        answers
            .iter()
            .find(|(expected, _)| body.ends_with(expected.as_str()))
            .map(|(_, output)| output.clone())
            .or_else(|| Some(String::new()))
    })
}
