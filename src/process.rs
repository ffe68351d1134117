//! An evaluator running as a child process.
//!
//! The child reads one command per line on stdin and answers on stdout. An
//! answer is the first line after the command plus every line that follows
//! it within the settle period. With the handshake enabled the child must
//! print a banner line first; the backend counts as ready once that line
//! arrives.

use std::{
    io::{BufRead, BufReader, Read, Write},
    process::{Child, ChildStdin, Command, Stdio},
    thread,
    time::Duration,
};

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};

use crate::{
    error::LoadError,
    loader::{BackendSource, Evaluate},
};

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Quiet time after a response line before the response counts as complete.
pub const DEFAULT_SETTLE: Duration = Duration::from_millis(20);

/// Spawns `program` with `args` as the evaluation backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSource {
    program: String,
    args: Vec<String>,
    handshake: bool,
    timeout: Option<Duration>,
    settle: Duration,
}

impl ProcessSource {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            handshake: false,
            timeout: None,
            settle: DEFAULT_SETTLE,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn handshake(mut self, on: bool) -> Self {
        self.handshake = on;
        self
    }

    /// Give up on an evaluation that has not answered within `timeout`.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// How long to wait for more lines of a multi-line response.
    pub fn settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    pub fn uses_handshake(&self) -> bool {
        self.handshake
    }

    pub fn timeout_duration(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn settle_duration(&self) -> Duration {
        self.settle
    }

    /// Spawn the child and wait for its banner when the handshake is on.
    pub fn spawn(&self) -> Result<ProcessBackend, LoadError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| LoadError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let (stdin, stdout) = match (child.stdin.take(), child.stdout.take()) {
            (Some(stdin), Some(stdout)) => (stdin, stdout),
            _ => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(LoadError::Acquire("child pipes unavailable".into()));
            }
        };

        let (tx, lines) = channel::unbounded();
        let reader = thread::Builder::new()
            .name(format!("{}-stdout", self.program))
            .spawn(move || forward_lines(stdout, tx));
        if let Err(e) = reader {
            let _ = child.kill();
            let _ = child.wait();
            return Err(LoadError::Acquire(format!("cannot read backend output: {e}")));
        }

        let mut backend = ProcessBackend {
            child,
            stdin: Some(stdin),
            lines,
            timeout: self.timeout,
            settle: self.settle,
        };

        if self.handshake {
            let wait = self.timeout.unwrap_or(HANDSHAKE_TIMEOUT);
            match backend.lines.recv_timeout(wait) {
                Ok(first) => {
                    let banner = backend.rest_of_response(first);
                    log::info!("{} says: {banner}", self.program);
                }
                Err(RecvTimeoutError::Timeout) => {
                    backend.shut_down();
                    return Err(LoadError::Handshake(format!(
                        "no banner within {} ms",
                        wait.as_millis()
                    )));
                }
                Err(RecvTimeoutError::Disconnected) => {
                    backend.shut_down();
                    return Err(LoadError::Handshake(
                        "process exited before printing a banner".into(),
                    ));
                }
            }
        }

        Ok(backend)
    }
}

/// Send each output line to `tx` until EOF, a read error, or a hung-up receiver.
fn forward_lines(stdout: impl Read, tx: Sender<String>) {
    let mut reader = BufReader::new(stdout);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(_) => {
                if buf.last() == Some(&b'\n') {
                    buf.pop();
                    if buf.last() == Some(&b'\r') {
                        buf.pop();
                    }
                }
                let line = String::from_utf8_lossy(&buf).into_owned();
                if tx.send(line).is_err() {
                    break;
                }
            }
            Err(e) => {
                log::warn!("backend stdout: {e}");
                break;
            }
        }
    }
}

impl BackendSource for ProcessSource {
    fn acquire(&self) -> Result<Box<dyn Evaluate>, LoadError> {
        Ok(Box::new(self.spawn()?))
    }

    fn describe(&self) -> String {
        format!("backend `{}`", self.program)
    }
}

/// A running evaluator process. Killed when dropped.
#[derive(Debug)]
pub struct ProcessBackend {
    child: Child,
    /// `None` once the process is gone.
    stdin: Option<ChildStdin>,
    lines: Receiver<String>,
    timeout: Option<Duration>,
    settle: Duration,
}

impl ProcessBackend {
    pub fn is_alive(&self) -> bool {
        self.stdin.is_some()
    }

    fn shut_down(&mut self) {
        self.stdin = None;
        if let Err(e) = self.child.kill() {
            log::debug!("kill backend: {e}");
        }
        if let Err(e) = self.child.wait() {
            log::debug!("reap backend: {e}");
        }
    }

    fn exited(&mut self) -> String {
        self.shut_down();
        String::from("Error: backend process exited")
    }

    /// Discard output that arrived after the previous response was complete.
    fn drop_stale(&self) {
        for line in self.lines.try_iter() {
            log::warn!("dropping stale backend output {line:?}");
        }
    }

    /// Append the lines that follow `first` within the settle period.
    fn rest_of_response(&self, first: String) -> String {
        let mut response = first;
        while let Ok(line) = self.lines.recv_timeout(self.settle) {
            response.push('\n');
            response.push_str(&line);
        }
        response
    }
}

impl Evaluate for ProcessBackend {
    fn evaluate(&mut self, command: &str) -> String {
        self.drop_stale();
        let Some(stdin) = self.stdin.as_mut() else {
            return String::from("Error: backend process exited");
        };
        let sent = writeln!(stdin, "{command}").and_then(|_| stdin.flush());
        if let Err(e) = sent {
            log::error!("writing to backend: {e}");
            return self.exited();
        }

        let answer = match self.timeout {
            Some(timeout) => self.lines.recv_timeout(timeout),
            None => self
                .lines
                .recv()
                .map_err(|_| RecvTimeoutError::Disconnected),
        };
        match answer {
            Ok(line) => self.rest_of_response(line),
            Err(RecvTimeoutError::Disconnected) => self.exited(),
            Err(RecvTimeoutError::Timeout) => {
                let ms = self.timeout.unwrap_or_default().as_millis();
                log::warn!("evaluation of {command:?} timed out after {ms} ms");
                // a late answer would be taken for the next command's, so the process is retired
                self.shut_down();
                format!("Error: evaluation timed out after {ms} ms")
            }
        }
    }
}

impl Drop for ProcessBackend {
    fn drop(&mut self) {
        if self.is_alive() {
            self.shut_down();
        }
    }
}
