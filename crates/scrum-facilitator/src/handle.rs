//! A cloneable handle for poking a session from external code.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::events::FacilitatorEvent;

/// A cloneable handle for poking a session from external code.
///
/// All fields are shared, so cloning is cheap.
#[derive(Clone)]
pub struct FacilitatorHandle {
    pub(crate) cancel: CancellationToken,
    pub(crate) busy: Arc<AtomicBool>,
    pub(crate) idle_notify: Arc<tokio::sync::Notify>,
    pub(crate) event_tx: broadcast::Sender<FacilitatorEvent>,
}

impl FacilitatorHandle {
    pub(crate) fn new(event_tx: broadcast::Sender<FacilitatorEvent>) -> Self {
        Self {
            cancel: CancellationToken::new(),
            busy: Arc::new(AtomicBool::new(false)),
            idle_notify: Arc::new(tokio::sync::Notify::new()),
            event_tx,
        }
    }

    /// Tear the session down.
    ///
    /// A pending backend call or scripted turn is abandoned and its result is
    /// never applied. Later submissions fail with `SessionClosed`.
    pub fn shutdown(&self) {
        if self.cancel.is_cancelled() {
            return;
        }
        tracing::info!("Shutting down facilitation session");
        self.cancel.cancel();
        let _ = self.event_tx.send(FacilitatorEvent::Closed);
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Get the cancellation token (for external callers that need direct access).
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Whether a submission is being processed
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub(crate) fn set_busy(&self, busy: bool) {
        self.busy.store(busy, Ordering::Release);
        if !busy {
            self.idle_notify.notify_waiters();
        }
    }

    /// Wait until the current submission finishes.
    pub async fn wait_for_idle(&self) {
        let notified = self.idle_notify.notified();
        if !self.is_busy() {
            return;
        }
        notified.await;
    }

    /// Wait until idle, with a timeout.
    /// Returns `true` if idle was reached, `false` on timeout.
    pub async fn wait_for_idle_timeout(&self, timeout: std::time::Duration) -> bool {
        if !self.is_busy() {
            return true;
        }
        tokio::time::timeout(timeout, self.wait_for_idle())
            .await
            .is_ok()
    }
}

/// Marks the handle busy for the lifetime of one submission.
///
/// Dropping it before `finish` means the submission future was abandoned
/// mid-flight; the session is shut down so nothing half-applied lingers.
pub(crate) struct BusyGuard {
    handle: FacilitatorHandle,
    finished: bool,
}

impl BusyGuard {
    pub(crate) fn new(handle: &FacilitatorHandle) -> Self {
        handle.set_busy(true);
        Self {
            handle: handle.clone(),
            finished: false,
        }
    }

    pub(crate) fn finish(mut self) {
        self.finished = true;
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        if !self.finished {
            tracing::warn!("Submission abandoned mid-flight");
            self.handle.shutdown();
        }
        self.handle.set_busy(false);
    }
}
