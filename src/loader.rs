//! Asynchronous acquisition of the evaluation backend.
//!
//! [`BackendLoader::start`] runs a [`BackendSource`] on a worker thread and
//! returns a [`PendingBackend`] at once. The worker reports back exactly once
//! over a one-shot channel; the owner of the pending backend polls it with
//! [`PendingBackend::try_ready`] and receives the sole [`BackendHandle`].

use std::{fmt, sync::Arc, thread};

use crossbeam::channel::{self, Receiver, TryRecvError};

use crate::error::LoadError;

/// A single-argument evaluation function.
pub trait Evaluate: Send {
    fn evaluate(&mut self, command: &str) -> String;
}

impl<F: FnMut(&str) -> String + Send> Evaluate for F {
    fn evaluate(&mut self, command: &str) -> String {
        self(command)
    }
}

/// Something that can produce a ready evaluation backend.
///
/// `acquire` may block for as long as it needs; it always runs off the UI
/// thread.
pub trait BackendSource: Send + Sync {
    fn acquire(&self) -> Result<Box<dyn Evaluate>, LoadError>;

    /// Short human-readable name used in logs and notices.
    fn describe(&self) -> String {
        String::from("backend")
    }
}

impl<F> BackendSource for F
where
    F: Fn() -> Result<Box<dyn Evaluate>, LoadError> + Send + Sync,
{
    fn acquire(&self) -> Result<Box<dyn Evaluate>, LoadError> {
        self()
    }
}

/// The owned handle to a ready backend.
pub struct BackendHandle {
    inner: Box<dyn Evaluate>,
    name: String,
}

impl BackendHandle {
    pub fn new(name: impl Into<String>, evaluate: impl Evaluate + 'static) -> Self {
        Self::from_boxed(name, Box::new(evaluate))
    }

    pub fn from_boxed(name: impl Into<String>, inner: Box<dyn Evaluate>) -> Self {
        Self {
            inner,
            name: name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn evaluate(&mut self, command: &str) -> String {
        self.inner.evaluate(command)
    }
}

impl fmt::Debug for BackendHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendHandle")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Result of polling a [`PendingBackend`].
#[derive(Debug)]
pub enum Readiness {
    Loading,
    Ready(BackendHandle),
    Failed(LoadError),
}

/// Receiving end of an acquisition started by [`BackendLoader::start`].
#[derive(Debug)]
pub struct PendingBackend {
    name: String,
    rx: Receiver<Result<BackendHandle, LoadError>>,
}

impl PendingBackend {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Check for the readiness signal without blocking.
    ///
    /// Once this returned `Ready` or `Failed` the signal is consumed; later
    /// calls report `Failed(LoadError::Abandoned)`.
    pub fn try_ready(&self) -> Readiness {
        match self.rx.try_recv() {
            Ok(Ok(handle)) => Readiness::Ready(handle),
            Ok(Err(e)) => Readiness::Failed(e),
            Err(TryRecvError::Empty) => Readiness::Loading,
            Err(TryRecvError::Disconnected) => Readiness::Failed(LoadError::Abandoned),
        }
    }

    /// Block until acquisition finishes.
    pub fn wait(self) -> Result<BackendHandle, LoadError> {
        self.rx.recv().map_err(|_| LoadError::Abandoned)?
    }
}

pub struct BackendLoader;

impl BackendLoader {
    /// Begin acquiring a backend from `source` on a worker thread.
    pub fn start(source: Arc<dyn BackendSource>) -> PendingBackend {
        let name = source.describe();
        let (tx, rx) = channel::bounded(1);

        log::info!("loading {name}");
        let worker_name = name.clone();
        let spawned = thread::Builder::new()
            .name(String::from("backend-loader"))
            .spawn(move || {
                let result = source
                    .acquire()
                    .map(|inner| BackendHandle::from_boxed(worker_name.clone(), inner));
                match &result {
                    Ok(_) => log::info!("{worker_name} ready"),
                    Err(e) => log::error!("{worker_name} failed to load: {e}"),
                }
                // receiver gone means nobody is waiting any more
                let _ = tx.send(result);
            });

        if let Err(e) = spawned {
            // the sender went down with the closure; report through the channel state
            log::error!("could not spawn loader thread: {e}");
        }

        PendingBackend { name, rx }
    }
}

#[cfg(test)]
mod test {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn doubling() -> Box<dyn Evaluate> {
        Box::new(|cmd: &str| format!("{cmd}{cmd}"))
    }

    fn source(
        f: impl Fn() -> Result<Box<dyn Evaluate>, LoadError> + Send + Sync + 'static,
    ) -> Arc<dyn BackendSource> {
        Arc::new(f)
    }

    #[test]
    fn closure_is_an_evaluator() {
        let mut handle = BackendHandle::new("test", |cmd: &str| cmd.to_uppercase());
        assert_eq!(handle.evaluate("abc"), "ABC");
        assert_eq!(handle.name(), "test");
    }

    #[test]
    fn ready_after_wait() {
        let pending = BackendLoader::start(source(|| Ok(doubling())));
        let mut handle = pending.wait().unwrap();
        assert_eq!(handle.evaluate("ab"), "abab");
    }

    #[test]
    fn failure_is_reported() {
        let pending = BackendLoader::start(source(|| Err(LoadError::Acquire("no module".into()))));
        match pending.wait() {
            Err(LoadError::Acquire(msg)) => assert_eq!(msg, "no module"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn panicking_source_is_abandoned() {
        let pending = BackendLoader::start(source(|| panic!("boom")));
        assert!(matches!(pending.wait(), Err(LoadError::Abandoned)));
    }

    #[test]
    fn loading_until_source_finishes() {
        let (release_tx, release_rx) = channel::bounded::<()>(0);
        let calls = Arc::new(AtomicUsize::new(0));
        let counted = calls.clone();

        let pending = BackendLoader::start(source(move || {
            release_rx.recv().map_err(|_| LoadError::Abandoned)?;
            let counted = counted.clone();
            Ok(Box::new(move |cmd: &str| {
                counted.fetch_add(1, Ordering::SeqCst);
                cmd.to_string()
            }) as Box<dyn Evaluate>)
        }));

        assert!(matches!(pending.try_ready(), Readiness::Loading));
        release_tx.send(()).unwrap();

        let mut handle = pending.wait().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        handle.evaluate("x");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn signal_is_consumed_once() {
        let pending = BackendLoader::start(source(|| Ok(doubling())));
        let first = loop {
            match pending.try_ready() {
                Readiness::Loading => thread::yield_now(),
                other => break other,
            }
        };
        assert!(matches!(first, Readiness::Ready(_)));
        assert!(matches!(
            pending.try_ready(),
            Readiness::Failed(LoadError::Abandoned)
        ));
    }

    #[test]
    fn describe_defaults() {
        let src = source(|| Ok(doubling()));
        assert_eq!(src.describe(), "backend");
        assert_eq!(BackendLoader::start(src).name(), "backend");
    }
}
