// Thread-safe event dispatch for session listeners
// Position updates are throttled; everything else goes straight through

use crate::state::SessionState;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Session event types
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    /// Session state changed
    StateChanged {
        old_state: SessionState,
        new_state: SessionState,
    },

    /// Backend began playback
    PlaybackStart,

    /// Playback halted on request
    PlaybackStop,

    /// Playback reached the end of the stream
    PlaybackFinished,

    /// Background resolution of the active locator completed
    MrlUpdated { uri: String },

    /// Playback position updated
    PositionChanged { position_ms: u64 },

    /// Backend error during playback or resolution
    Error { message: String },
}

/// Session event listener
/// Implementations should be lightweight and non-blocking: they run on
/// backend threads
pub trait EventListener: Send + Sync {
    fn on_event(&self, event: PlayerEvent);
}

/// Throttled listener wrapper
/// Prevents excessive position update frequency
pub struct ThrottledListener {
    inner: Arc<dyn EventListener>,
    last_position_update: Mutex<Option<Instant>>,
    position_update_interval: Duration,
}

impl ThrottledListener {
    pub fn new(listener: Arc<dyn EventListener>, update_interval_ms: u64) -> Self {
        Self {
            inner: listener,
            last_position_update: Mutex::new(None),
            position_update_interval: Duration::from_millis(update_interval_ms),
        }
    }

    pub fn dispatch(&self, event: PlayerEvent) {
        match &event {
            PlayerEvent::PositionChanged { .. } => {
                let mut last_update = self.last_position_update.lock();
                let due = last_update
                    .map(|at| at.elapsed() >= self.position_update_interval)
                    .unwrap_or(true);
                if due {
                    *last_update = Some(Instant::now());
                    self.inner.on_event(event);
                }
            }
            _ => self.inner.on_event(event),
        }
    }
}

/// Fan-out of events to every subscribed listener
pub struct EventDispatcher {
    listeners: Mutex<Vec<Arc<ThrottledListener>>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self {
            listeners: Mutex::new(Vec::new()),
        }
    }

    pub fn subscribe(&self, listener: Arc<dyn EventListener>, throttle_ms: u64) {
        let throttled = Arc::new(ThrottledListener::new(listener, throttle_ms));
        self.listeners.lock().push(throttled);
    }

    pub fn clear(&self) {
        self.listeners.lock().clear();
    }

    pub fn dispatch(&self, event: PlayerEvent) {
        // Snapshot so a listener may subscribe from inside a callback
        let listeners = self.listeners.lock().clone();
        for listener in listeners.iter() {
            listener.dispatch(event.clone());
        }
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Listener that records every event, for tests and diagnostics
#[derive(Default)]
pub struct RecordingListener {
    events: Mutex<Vec<PlayerEvent>>,
}

impl RecordingListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<PlayerEvent> {
        self.events.lock().clone()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl EventListener for RecordingListener {
    fn on_event(&self, event: PlayerEvent) {
        self.events.lock().push(event);
    }
}
