//! One-shot completion signals for native callbacks.
//!
//! Native APIs report results through completion blocks that fire on an
//! arbitrary thread. The store worker blocks on a [`Completion`] until the
//! paired [`Notifier`] fires or a deadline passes.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::time::Duration;

use crate::error::{RemindersError, Result};

/// Why a [`Completion::wait`] returned without a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitError {
    /// The deadline passed first.
    TimedOut,
    /// The notifier was dropped without firing.
    Abandoned,
}

/// Sending half. Fires at most once.
#[derive(Debug)]
pub struct Notifier<T> {
    tx: SyncSender<T>,
}

/// Receiving half.
#[derive(Debug)]
pub struct Completion<T> {
    rx: Receiver<T>,
}

/// Create a linked notifier/completion pair.
pub fn completion<T>() -> (Notifier<T>, Completion<T>) {
    let (tx, rx) = mpsc::sync_channel(1);
    (Notifier { tx }, Completion { rx })
}

impl<T> Notifier<T> {
    /// Deliver `value`. A waiter that already gave up is ignored.
    pub fn notify(self, value: T) {
        let _ = self.tx.try_send(value);
    }
}

impl<T> Completion<T> {
    /// Block the current thread until the value arrives or `timeout` passes.
    pub fn wait(self, timeout: Duration) -> std::result::Result<T, WaitError> {
        self.rx.recv_timeout(timeout).map_err(|e| match e {
            RecvTimeoutError::Timeout => WaitError::TimedOut,
            RecvTimeoutError::Disconnected => WaitError::Abandoned,
        })
    }
}

/// The native answer to an access request.
#[derive(Debug, Clone, PartialEq)]
pub struct PermissionOutcome {
    pub granted: bool,
    pub error: Option<RemindersError>,
}

/// Handed to the native completion handler of an access request.
#[derive(Debug)]
pub struct PermissionResponder(Notifier<PermissionOutcome>);

/// Pending access request the handshake blocks on.
#[derive(Debug)]
pub struct PermissionRequest(Completion<PermissionOutcome>);

/// Create a pending permission request and its responder.
pub fn permission_request() -> (PermissionResponder, PermissionRequest) {
    let (notifier, completion) = completion();
    (PermissionResponder(notifier), PermissionRequest(completion))
}

impl PermissionResponder {
    pub fn respond(self, granted: bool, error: Option<RemindersError>) {
        self.0.notify(PermissionOutcome { granted, error });
    }
}

impl PermissionRequest {
    /// Wait for the user's answer.
    ///
    /// A native error takes precedence over the granted flag.
    pub fn wait(self, timeout: Duration) -> Result<()> {
        let outcome = self.0.wait(timeout).map_err(|e| match e {
            WaitError::TimedOut => RemindersError::PermissionTimeout {
                seconds: whole_seconds(timeout),
            },
            WaitError::Abandoned => {
                RemindersError::native("permission request completed without an answer")
            }
        })?;

        if let Some(error) = outcome.error {
            return Err(error);
        }
        if !outcome.granted {
            return Err(RemindersError::AccessDenied);
        }
        Ok(())
    }
}

/// Timeout rounded up to whole seconds for error messages.
pub fn whole_seconds(timeout: Duration) -> u64 {
    timeout.as_secs_f64().ceil() as u64
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    #[test]
    fn value_crosses_threads() {
        let (notifier, completion) = completion();
        std::thread::spawn(move || notifier.notify(42));
        assert_eq!(completion.wait(Duration::from_secs(5)), Ok(42));
    }

    #[test]
    fn times_out() {
        let (_notifier, completion) = completion::<u8>();
        assert_eq!(
            completion.wait(Duration::from_millis(10)),
            Err(WaitError::TimedOut)
        );
    }

    #[test]
    fn dropped_notifier_is_abandoned() {
        let (notifier, completion) = completion::<u8>();
        drop(notifier);
        assert_eq!(
            completion.wait(Duration::from_secs(5)),
            Err(WaitError::Abandoned)
        );
    }

    #[test]
    fn late_notify_after_timeout_is_harmless() {
        let (notifier, completion) = completion::<u8>();
        assert!(completion.wait(Duration::from_millis(1)).is_err());
        notifier.notify(1);
    }

    #[test]
    fn granted_permission() {
        let (responder, request) = permission_request();
        responder.respond(true, None);
        assert!(request.wait(Duration::from_secs(1)).is_ok());
    }

    #[test]
    fn denied_permission() {
        let (responder, request) = permission_request();
        responder.respond(false, None);
        assert_eq!(
            request.wait(Duration::from_secs(1)),
            Err(RemindersError::AccessDenied)
        );
    }

    #[test]
    fn native_error_wins_over_grant_flag() {
        let (responder, request) = permission_request();
        responder.respond(true, Some(RemindersError::native("store offline")));
        assert_eq!(
            request.wait(Duration::from_secs(1)),
            Err(RemindersError::native("store offline"))
        );
    }

    #[test]
    fn unanswered_permission_times_out() {
        let (_responder, request) = permission_request();
        assert_eq!(
            request.wait(Duration::from_millis(10)),
            Err(RemindersError::PermissionTimeout { seconds: 1 })
        );
    }
}
