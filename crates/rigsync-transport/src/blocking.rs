//! A dedicated OS thread that serves blocking calls against one object.
//!
//! Some rig links are only reachable through blocking APIs: the Hamlib C
//! library, or an OmniRig COM object that must stay on the thread that
//! created it. [`BlockingSession`] builds the object on its own thread and
//! runs every call there, one at a time, while callers await the result.
//!
//! The object never leaves its thread, so it does not have to be `Send`.

use rigsync_core::error::{Error, Result};
use std::sync::mpsc;
use tokio::sync::oneshot;

type Job<T> = Box<dyn FnOnce(&mut T) + Send>;

/// Handle to a thread owning a `T`.
///
/// Dropping the handle (or calling [`shutdown`](Self::shutdown)) lets the
/// thread finish any queued calls, drop the object, and exit. Callers are
/// never blocked waiting for that.
pub struct BlockingSession<T> {
    jobs: Option<mpsc::Sender<Job<T>>>,
    name: String,
}

impl<T: 'static> BlockingSession<T> {
    /// Start a thread named `name`, build the object with `factory` on it,
    /// and wait for the factory's result.
    pub async fn spawn<F>(name: &str, factory: F) -> Result<Self>
    where
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        let (job_tx, job_rx) = mpsc::channel::<Job<T>>();
        let (ready_tx, ready_rx) = oneshot::channel::<Result<()>>();

        let thread_name = name.to_string();
        std::thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || {
                let mut target = match factory() {
                    Ok(target) => {
                        let _ = ready_tx.send(Ok(()));
                        target
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                while let Ok(job) = job_rx.recv() {
                    job(&mut target);
                }
                tracing::debug!(thread = %thread_name, "Blocking session thread exiting");
            })?;

        match ready_rx.await {
            Ok(Ok(())) => Ok(BlockingSession {
                jobs: Some(job_tx),
                name: name.to_string(),
            }),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(Error::Transport(format!(
                "{name} thread exited during startup"
            ))),
        }
    }

    /// Run `f` on the session thread and return its result.
    ///
    /// If the caller stops waiting, the call still runs to completion on
    /// the thread; only the result is discarded.
    pub async fn call<R, F>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut T) -> R + Send + 'static,
        R: Send + 'static,
    {
        let jobs = self.jobs.as_ref().ok_or(Error::NotConnected)?;
        let (reply_tx, reply_rx) = oneshot::channel();
        let job: Job<T> = Box::new(move |target: &mut T| {
            let _ = reply_tx.send(f(target));
        });
        jobs.send(job).map_err(|_| Error::ConnectionLost)?;
        reply_rx.await.map_err(|_| {
            tracing::warn!(thread = %self.name, "Blocking session thread died mid-call");
            Error::ConnectionLost
        })
    }

    /// Stop accepting calls. Later calls fail with `NotConnected`.
    pub fn shutdown(&mut self) {
        if self.jobs.take().is_some() {
            tracing::debug!(thread = %self.name, "Blocking session shut down");
        }
    }

    pub fn is_running(&self) -> bool {
        self.jobs.is_some()
    }
}
