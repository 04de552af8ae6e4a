//! The store worker thread and its admission permit.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use tokio::sync::{Semaphore, oneshot};

use crate::backend::{BackendConnector, ReminderBackend};
use crate::error::{RemindersError, Result};

/// Name of the dedicated native worker thread.
pub const WORKER_THREAD_NAME: &str = "reminders-store";

type Job = Box<dyn FnOnce(&mut dyn ReminderBackend) + Send>;

/// One open connection to the reminder store.
///
/// Owns the job queue of the worker thread that created the backend and the
/// count-of-one permit that admits operations in FIFO order. Dropping the
/// last handle closes the queue and lets the worker exit.
pub struct StoreHandle {
    jobs: Sender<Job>,
    permit: Arc<Semaphore>,
}

impl std::fmt::Debug for StoreHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreHandle")
            .field("available_permits", &self.permit.available_permits())
            .finish_non_exhaustive()
    }
}

impl StoreHandle {
    /// Spawn the worker, run the handshake on it, and wait for the outcome.
    ///
    /// The worker exits straight away if the handshake fails.
    pub(crate) async fn open(
        connector: Arc<dyn BackendConnector>,
        timeout: Duration,
    ) -> Result<Self> {
        let (jobs, queue) = crossbeam_channel::unbounded::<Job>();
        let (ready_tx, ready_rx) = oneshot::channel::<Result<()>>();

        std::thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_owned())
            .spawn(move || worker_main(connector.as_ref(), timeout, queue, ready_tx))
            .map_err(|e| {
                RemindersError::StoreUnavailable(format!("failed to spawn store worker: {e}"))
            })?;

        ready_rx.await.map_err(|_| {
            RemindersError::StoreUnavailable("store worker exited during handshake".to_owned())
        })??;

        Ok(Self {
            jobs,
            permit: Arc::new(Semaphore::new(1)),
        })
    }

    /// Run `op` against the backend on the worker thread.
    ///
    /// Waits for the permit first. The permit travels with the job and is
    /// released when the job finishes, even if this future was dropped.
    pub async fn run<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut dyn ReminderBackend) -> Result<T> + Send + 'static,
    {
        let permit = Arc::clone(&self.permit)
            .acquire_owned()
            .await
            .map_err(|_| RemindersError::StoreUnavailable("access permit closed".to_owned()))?;

        let (tx, rx) = oneshot::channel();
        let job: Job = Box::new(move |backend: &mut dyn ReminderBackend| {
            let outcome = guarded(|| op(backend));
            drop(permit);
            let _ = tx.send(outcome);
        });

        self.jobs
            .send(job)
            .map_err(|_| RemindersError::StoreUnavailable("store worker stopped".to_owned()))?;

        rx.await.map_err(|_| {
            RemindersError::StoreUnavailable("store worker dropped the operation".to_owned())
        })?
    }
}

fn worker_main(
    connector: &dyn BackendConnector,
    timeout: Duration,
    queue: Receiver<Job>,
    ready: oneshot::Sender<Result<()>>,
) {
    let mut backend = match guarded(|| connector.connect(timeout)) {
        Ok(backend) => backend,
        Err(e) => {
            tracing::warn!(error = %e, "reminder store handshake failed");
            let _ = ready.send(Err(e));
            return;
        }
    };

    tracing::info!("reminder store ready");
    if ready.send(Ok(())).is_err() {
        return;
    }

    while let Ok(job) = queue.recv() {
        job(backend.as_mut());
    }

    tracing::debug!("store worker exiting");
}

/// Run `f` inside an autorelease pool, turning a panic into a native error.
fn guarded<T>(f: impl FnOnce() -> Result<T>) -> Result<T> {
    match panic::catch_unwind(AssertUnwindSafe(|| with_autorelease_pool(f))) {
        Ok(result) => result,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::error!(panic = %message, "store operation panicked");
            Err(RemindersError::native(format!(
                "store operation panicked: {message}"
            )))
        }
    }
}

#[cfg(target_os = "macos")]
fn with_autorelease_pool<R>(f: impl FnOnce() -> R) -> R {
    objc2::rc::autoreleasepool(|_| f())
}

#[cfg(not(target_os = "macos"))]
fn with_autorelease_pool<R>(f: impl FnOnce() -> R) -> R {
    f()
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_owned()
    }
}
