//! Blocking bridge for one-shot completion callbacks.
//!
//! Lets synchronous code (tests, embedders without an event loop) wait for a
//! start/seek/stop to finish. Never wait on the pipeline executor thread: the
//! completion being waited for is delivered from there.

use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use cadence_types::{PipelineError, PipelineStatus};

use crate::stage::StatusCb;

#[derive(Default)]
struct Inner {
    status: Mutex<Option<PipelineStatus>>,
    cv: Condvar,
}

#[derive(Clone, Default)]
pub struct StatusNotification {
    inner: Arc<Inner>,
}

impl StatusNotification {
    pub fn new() -> Self {
        Self::default()
    }

    /// Callback that records the status and wakes the waiter.
    ///
    /// Only one callback per notification may ever fire; a second
    /// notification is logged and dropped.
    pub fn callback(&self) -> StatusCb {
        let inner = Arc::clone(&self.inner);
        Box::new(move |status| {
            let mut slot = lock(&inner.status);
            if slot.is_some() {
                log::error!(target: "pipeline", "status notification fired twice, dropping {:?}", status);
                return;
            }
            *slot = Some(status);
            inner.cv.notify_all();
        })
    }

    /// Block until the callback has fired. Returns immediately if it already
    /// has.
    pub fn wait(&self) -> PipelineStatus {
        let mut slot = lock(&self.inner.status);
        loop {
            if let Some(status) = *slot {
                return status;
            }
            slot = self.inner.cv.wait(slot).unwrap_or_else(|e| e.into_inner());
        }
    }

    /// Like [`Self::wait`] but gives up after `timeout`, returning `None`.
    /// Timing out has no effect on whatever the callback belongs to.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<PipelineStatus> {
        let deadline = Instant::now() + timeout;
        let mut slot = lock(&self.inner.status);
        loop {
            if let Some(status) = *slot {
                return Some(status);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return None;
            }
            slot = self
                .inner
                .cv
                .wait_timeout(slot, remaining)
                .map(|(guard, _)| guard)
                .unwrap_or_else(|e| e.into_inner().0);
        }
    }

    pub fn is_notified(&self) -> bool {
        lock(&self.inner.status).is_some()
    }

    /// The delivered status. Only meaningful once a wait has returned; before
    /// that it reports `InvalidState`.
    pub fn status(&self) -> PipelineStatus {
        match *lock(&self.inner.status) {
            Some(status) => status,
            None => {
                log::error!(target: "pipeline", "status() read before notification");
                Err(PipelineError::InvalidState)
            }
        }
    }
}

fn lock(m: &Mutex<Option<PipelineStatus>>) -> MutexGuard<'_, Option<PipelineStatus>> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}
