//! Serialized access to the reminder store.
//!
//! [`StoreAccess`] owns the lazily opened [`StoreHandle`]. Every native
//! operation goes through [`StoreAccess::run`]:
//!
//! 1. the handle is opened on first use (permission handshake included),
//! 2. the caller waits for the single access permit (FIFO),
//! 3. the operation runs on the dedicated `reminders-store` thread,
//! 4. the result comes back to the async caller.
//!
//! At most one operation touches the store at any instant. A failed
//! handshake commits nothing, so the next call starts a fresh one.

pub mod completion;
mod handle;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;

use crate::backend::{BackendConnector, ReminderBackend};
use crate::error::{RemindersError, Result};

pub use handle::{StoreHandle, WORKER_THREAD_NAME};

type InitOutcome = Option<Result<Arc<StoreHandle>>>;

enum InitState {
    /// No handle and no handshake in flight.
    Idle,
    /// A handshake is running; joiners watch for its outcome.
    Pending(watch::Receiver<InitOutcome>),
    Ready(Arc<StoreHandle>),
}

/// Shared entry point to the reminder store.
///
/// Cheap to share behind an `Arc`; one instance per process.
pub struct StoreAccess {
    connector: Arc<dyn BackendConnector>,
    timeout: Duration,
    state: Arc<Mutex<InitState>>,
}

impl std::fmt::Debug for StoreAccess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreAccess")
            .field("timeout", &self.timeout)
            .field("ready", &self.is_ready())
            .finish_non_exhaustive()
    }
}

impl StoreAccess {
    /// Create an accessor. Nothing is opened until the first call.
    ///
    /// `timeout` bounds the permission handshake and callback-based fetches.
    pub fn new(connector: Arc<dyn BackendConnector>, timeout: Duration) -> Self {
        Self {
            connector,
            timeout,
            state: Arc::new(Mutex::new(InitState::Idle)),
        }
    }

    /// Whether a handle has been committed.
    pub fn is_ready(&self) -> bool {
        matches!(
            *self.state.lock().unwrap_or_else(|e| e.into_inner()),
            InitState::Ready(_)
        )
    }

    /// Return the store handle, opening it on first use.
    ///
    /// Concurrent callers share one handshake and all observe its outcome.
    /// The handshake runs in its own task, so it finishes even if every
    /// caller stops waiting.
    ///
    /// # Errors
    ///
    /// `AccessDenied`, `PermissionTimeout`, or `Native` for any other
    /// handshake failure.
    pub async fn get_handle(&self) -> Result<Arc<StoreHandle>> {
        let mut outcome = {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            match &*state {
                InitState::Ready(handle) => return Ok(Arc::clone(handle)),
                InitState::Pending(rx) => rx.clone(),
                InitState::Idle => {
                    let (tx, rx) = watch::channel(None);
                    *state = InitState::Pending(rx.clone());
                    self.spawn_handshake(tx);
                    rx
                }
            }
        };

        let settled = outcome
            .wait_for(Option::is_some)
            .await
            .map_err(|_| {
                RemindersError::StoreUnavailable("store handshake was abandoned".to_owned())
            })?
            .clone();

        settled.unwrap_or_else(|| {
            Err(RemindersError::StoreUnavailable(
                "store handshake produced no outcome".to_owned(),
            ))
        })
    }

    fn spawn_handshake(&self, tx: watch::Sender<InitOutcome>) {
        let connector = Arc::clone(&self.connector);
        let state = Arc::clone(&self.state);
        let timeout = self.timeout;

        tokio::spawn(async move {
            tracing::info!(timeout_secs = timeout.as_secs_f64(), "requesting reminders access");
            let outcome = StoreHandle::open(connector, timeout).await.map(Arc::new);

            {
                let mut state = state.lock().unwrap_or_else(|e| e.into_inner());
                *state = match &outcome {
                    Ok(handle) => InitState::Ready(Arc::clone(handle)),
                    Err(_) => InitState::Idle,
                };
            }

            if let Err(e) = &outcome {
                tracing::warn!(code = e.code(), error = %e, "reminders access not available");
            }
            let _ = tx.send(Some(outcome));
        });
    }

    /// Run `op` against the store, one operation at a time.
    ///
    /// See [`StoreHandle::run`].
    pub async fn run<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut dyn ReminderBackend) -> Result<T> + Send + 'static,
    {
        self.get_handle().await?.run(op).await
    }
}
