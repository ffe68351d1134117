//! The read-classify-render loop.

use std::sync::Arc;

use crossterm::event::KeyEvent;

use crate::{
    classify::{classify, Classification},
    error::LoadError,
    keys::KeyBinding,
    loader::{BackendHandle, BackendLoader, BackendSource, PendingBackend, Readiness},
    transcript::{NoticeLevel, Transcript},
    CommandExecutor, Submission,
};

enum BackendState {
    Loading(PendingBackend),
    Ready(BackendHandle),
    Failed(String),
}

/// Dispatches submitted commands to the backend once it is ready.
///
/// Commands submitted while the backend is still loading, or after loading
/// failed, are held: nothing is dispatched and the surface keeps the line.
pub struct ReplLoop {
    backend: BackendState,
    source: Option<Arc<dyn BackendSource>>,
    reload_key: KeyBinding,
    builtins: bool,
    dispatched: usize,
}

impl ReplLoop {
    /// A loop that goes live when `pending` signals readiness.
    pub fn new(pending: PendingBackend) -> Self {
        Self::with_state(BackendState::Loading(pending))
    }

    /// A loop over a backend that is ready already.
    pub fn with_handle(handle: BackendHandle) -> Self {
        Self::with_state(BackendState::Ready(handle))
    }

    /// Start loading from `source` and remember it for [`ReplLoop::reload`].
    pub fn start(source: Arc<dyn BackendSource>) -> Self {
        let mut me = Self::new(BackendLoader::start(source.clone()));
        me.source = Some(source);
        me
    }

    fn with_state(backend: BackendState) -> Self {
        Self {
            backend,
            source: None,
            reload_key: KeyBinding::ctrl('r'),
            builtins: false,
            dispatched: 0,
        }
    }

    /// Handle `clear` and `exit` locally.
    pub fn with_builtins(mut self, on: bool) -> Self {
        self.builtins = on;
        self
    }

    pub fn with_reload_key(mut self, key: KeyBinding) -> Self {
        self.reload_key = key;
        self
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.backend, BackendState::Ready(_))
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.backend, BackendState::Loading(_))
    }

    /// The load failure, if acquisition failed.
    pub fn failure(&self) -> Option<&str> {
        match &self.backend {
            BackendState::Failed(reason) => Some(reason.as_str()),
            _ => None,
        }
    }

    /// Number of commands handed to the backend so far.
    pub fn dispatched(&self) -> usize {
        self.dispatched
    }

    /// Observe the readiness signal; a failure is reported in `transcript`.
    pub fn poll(&mut self, transcript: &mut Transcript) {
        let BackendState::Loading(pending) = &self.backend else {
            return;
        };
        match pending.try_ready() {
            Readiness::Loading => {}
            Readiness::Ready(handle) => {
                log::debug!("dispatch enabled for {}", handle.name());
                self.backend = BackendState::Ready(handle);
            }
            Readiness::Failed(e) => {
                let reason = format!("{} failed to load: {e}", pending.name());
                let mut notice = format!("Error: {reason}");
                if self.source.is_some() {
                    notice.push_str(&format!(" (press {} to retry)", self.reload_key));
                }
                transcript.push_notice(NoticeLevel::Error, notice);
                self.backend = BackendState::Failed(reason);
            }
        }
    }

    /// Block until the backend finishes loading.
    pub fn wait_ready(&mut self, transcript: &mut Transcript) -> Result<(), LoadError> {
        let state = std::mem::replace(&mut self.backend, BackendState::Failed(String::new()));
        let (state, result) = match state {
            BackendState::Loading(pending) => {
                let name = pending.name().to_string();
                match pending.wait() {
                    Ok(handle) => (BackendState::Ready(handle), Ok(())),
                    Err(e) => {
                        let reason = format!("{name} failed to load: {e}");
                        transcript.push_notice(NoticeLevel::Error, format!("Error: {reason}"));
                        (BackendState::Failed(reason), Err(e))
                    }
                }
            }
            BackendState::Failed(reason) => {
                let e = LoadError::Acquire(reason.clone());
                (BackendState::Failed(reason), Err(e))
            }
            ready => (ready, Ok(())),
        };
        self.backend = state;
        result
    }

    /// Drop the current backend and acquire a fresh one from the remembered source.
    ///
    /// Returns `false` when the loop was not built with [`ReplLoop::start`].
    pub fn reload(&mut self, transcript: &mut Transcript) -> bool {
        let Some(source) = self.source.clone() else {
            return false;
        };
        let pending = BackendLoader::start(source);
        transcript.push_notice(NoticeLevel::Info, format!("reloading {}", pending.name()));
        self.backend = BackendState::Loading(pending);
        true
    }

    /// Replace the backend with a new acquisition.
    pub fn restart(&mut self, pending: PendingBackend) {
        self.backend = BackendState::Loading(pending);
    }

    /// Run one command through gate, dispatch, classification and render.
    pub fn submit(&mut self, command: &str, transcript: &mut Transcript) -> Submission {
        if command.is_empty() {
            transcript.push_blank();
            return Submission::Done;
        }

        if self.builtins {
            match command.trim() {
                "clear" => {
                    transcript.clear();
                    return Submission::Done;
                }
                "exit" => return Submission::Exit,
                _ => {}
            }
        }

        self.poll(transcript);
        let handle = match &mut self.backend {
            BackendState::Ready(handle) => handle,
            BackendState::Loading(pending) => {
                transcript.push_notice(
                    NoticeLevel::Info,
                    format!("{} is still loading; command kept", pending.name()),
                );
                return Submission::Held;
            }
            BackendState::Failed(reason) => {
                transcript.push_notice(
                    NoticeLevel::Error,
                    format!("Error: {reason}; command kept"),
                );
                return Submission::Held;
            }
        };

        let result = handle.evaluate(command);
        self.dispatched += 1;

        let classification = classify(&result);
        log::debug!("{command:?} -> {classification}");
        if classification == Classification::Empty {
            log::trace!("suppressed markup result {result:?}");
        }
        transcript.push_response(classification, result);
        Submission::Done
    }
}

impl CommandExecutor for ReplLoop {
    fn execute(&mut self, command: &str, transcript: &mut Transcript) -> Submission {
        self.submit(command, transcript)
    }

    fn poll(&mut self, transcript: &mut Transcript) {
        ReplLoop::poll(self, transcript)
    }

    fn pass_through(&mut self, key: KeyEvent, transcript: &mut Transcript) {
        if self.reload_key.matches(&key) {
            self.reload(transcript);
        }
    }
}
