// Background resolution of the active locator

use mrlkit_core::{
    Backend, CancelToken, EventDispatcher, MediaLocator, PlayerEvent, Resolution, Result,
    SourceInfo,
};
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Progress of the active locator's resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionStatus {
    /// No locator is active
    None,
    Pending,
    Resolved,
    /// The backend could not make sense of the media
    Failed,
}

enum SlotState {
    Pending,
    Resolved(Arc<Resolution>),
    Failed(String),
    Cancelled,
}

/// One-shot result cell for a single activation.
///
/// Writes after `cancel` are dropped, so a superseded resolution can
/// never surface through the session.
pub struct ResolutionSlot {
    state: Mutex<SlotState>,
    settled: Condvar,
}

impl ResolutionSlot {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(SlotState::Pending),
            settled: Condvar::new(),
        })
    }

    /// Store the outcome; returns false if the slot was cancelled meanwhile
    pub fn complete(&self, outcome: Result<Resolution>) -> bool {
        let mut state = self.state.lock();
        if !matches!(*state, SlotState::Pending) {
            return false;
        }
        *state = match outcome {
            Ok(resolution) => SlotState::Resolved(Arc::new(resolution)),
            Err(e) => SlotState::Failed(e.to_string()),
        };
        self.settled.notify_all();
        true
    }

    pub fn cancel(&self) {
        *self.state.lock() = SlotState::Cancelled;
        self.settled.notify_all();
    }

    pub fn status(&self) -> ResolutionStatus {
        match *self.state.lock() {
            SlotState::Pending => ResolutionStatus::Pending,
            SlotState::Resolved(_) => ResolutionStatus::Resolved,
            SlotState::Failed(_) => ResolutionStatus::Failed,
            SlotState::Cancelled => ResolutionStatus::None,
        }
    }

    /// Failure message, once the resolution has failed
    pub fn failure(&self) -> Option<String> {
        match &*self.state.lock() {
            SlotState::Failed(message) => Some(message.clone()),
            _ => None,
        }
    }

    /// Wait at most `timeout` for the slot to leave `Pending`.
    ///
    /// Returns the resolution if one arrived in time.
    pub fn wait(&self, timeout: Duration) -> Option<Arc<Resolution>> {
        let deadline = Instant::now() + timeout;
        let mut state = self.state.lock();
        while matches!(*state, SlotState::Pending) {
            if self.settled.wait_until(&mut state, deadline).timed_out() {
                break;
            }
        }
        match &*state {
            SlotState::Resolved(resolution) => Some(resolution.clone()),
            _ => None,
        }
    }

    /// Whether the slot settled (resolved or failed) within `timeout`
    pub fn wait_settled(&self, timeout: Duration) -> bool {
        self.wait(timeout);
        matches!(
            self.status(),
            ResolutionStatus::Resolved | ResolutionStatus::Failed
        )
    }
}

/// Resolver thread bound to one activation
pub struct Resolver {
    slot: Arc<ResolutionSlot>,
    cancel: CancelToken,
    handle: Option<thread::JoinHandle<()>>,
}

impl Resolver {
    pub fn spawn(
        backend: Arc<dyn Backend>,
        locator: MediaLocator,
        source: SourceInfo,
        events: Arc<EventDispatcher>,
    ) -> Result<Self> {
        let slot = ResolutionSlot::new();
        let worker_slot = slot.clone();
        let cancel = CancelToken::new();
        let worker_cancel = cancel.clone();

        let handle = thread::Builder::new()
            .name("mrl-resolver".to_string())
            .spawn(move || {
                let outcome = backend.resolve(&locator, &source, &worker_cancel);
                if worker_cancel.is_cancelled() {
                    log::debug!("Resolution of {} was cancelled", locator);
                    return;
                }
                let event = match &outcome {
                    Ok(resolution) => {
                        resolution.log_summary(locator.uri());
                        PlayerEvent::MrlUpdated {
                            uri: locator.uri().to_string(),
                        }
                    }
                    Err(e) => {
                        log::warn!("Failed to resolve {}: {}", locator, e);
                        PlayerEvent::Error {
                            message: e.to_string(),
                        }
                    }
                };
                if worker_slot.complete(outcome) {
                    events.dispatch(event);
                } else {
                    log::debug!("Discarding stale resolution of {}", locator);
                }
            })?;

        Ok(Self {
            slot,
            cancel,
            handle: Some(handle),
        })
    }

    pub fn slot(&self) -> &Arc<ResolutionSlot> {
        &self.slot
    }

    /// Drop any late result and ask the backend to give up. Does not block.
    pub fn cancel(&self) {
        self.slot.cancel();
        self.cancel.cancel();
    }

    /// Cancel, then wait for the thread to exit
    pub fn cancel_and_join(&mut self) {
        self.cancel();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("Resolver thread panicked");
            }
        }
    }
}

impl Drop for Resolver {
    fn drop(&mut self) {
        self.cancel_and_join();
    }
}
