// Session state management

use crate::error::{MediaError, Result};
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

/// Session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Terminal: backend released
    Closed,
    /// Backend ready, a locator may or may not be bound
    Open,
    /// Playback running on the backend
    Playing,
    /// Playback suspended, position kept
    Paused,
    /// Playback halted (by request or end of stream)
    Stopped,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Playback status information
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackStatus {
    /// Current playback position in milliseconds
    pub position_ms: u64,
    /// Current volume (0.0 - 1.0)
    pub volume: f32,
    pub muted: bool,
}

impl Default for PlaybackStatus {
    fn default() -> Self {
        Self {
            position_ms: 0,
            volume: 1.0,
            muted: false,
        }
    }
}

/// Thread-safe session state container, shared with backend threads
#[derive(Clone)]
pub struct SessionStateContainer {
    state: Arc<RwLock<SessionState>>,
    status: Arc<RwLock<PlaybackStatus>>,
}

impl SessionStateContainer {
    /// A freshly opened session
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(SessionState::Open)),
            status: Arc::new(RwLock::new(PlaybackStatus::default())),
        }
    }

    pub fn get_state(&self) -> SessionState {
        *self.state.read()
    }

    pub fn get_status(&self) -> PlaybackStatus {
        self.status.read().clone()
    }

    pub fn update_status<F>(&self, f: F)
    where
        F: FnOnce(&mut PlaybackStatus),
    {
        let mut status = self.status.write();
        f(&mut status);
    }

    /// Move to `to` if the transition is legal from the current state.
    ///
    /// Returns the previous state.
    pub fn transition(&self, to: SessionState) -> Result<SessionState> {
        let mut state = self.state.write();
        let from = *state;
        Self::validate_state_transition(from, to)?;
        *state = to;
        log::debug!("Session state changed: {:?} -> {:?}", from, to);
        Ok(from)
    }

    /// Move from `from` to `to` only if the current state is exactly `from`.
    ///
    /// Used by backend threads, which must not override a concurrent
    /// stop or close.
    pub fn transition_if(&self, from: SessionState, to: SessionState) -> bool {
        let mut state = self.state.write();
        if *state != from || Self::validate_state_transition(from, to).is_err() {
            return false;
        }
        *state = to;
        log::debug!("Session state changed: {:?} -> {:?}", from, to);
        true
    }

    /// Force the terminal state; returns the previous one
    pub fn close(&self) -> SessionState {
        let mut state = self.state.write();
        std::mem::replace(&mut *state, SessionState::Closed)
    }

    pub fn validate_state_transition(from: SessionState, to: SessionState) -> Result<()> {
        use SessionState::*;

        match (from, to) {
            // Closed is terminal
            (Closed, _) => Err(MediaError::SessionClosed),

            // Anything can be closed
            (_, Closed) => Ok(()),

            // Rebinding a locator returns to Open
            (Open, Open) | (Playing, Open) | (Paused, Open) | (Stopped, Open) => Ok(()),

            // From Open
            (Open, Playing) => Ok(()),

            // From Playing
            (Playing, Paused) => Ok(()),
            (Playing, Stopped) => Ok(()),

            // From Paused
            (Paused, Playing) => Ok(()),
            (Paused, Stopped) => Ok(()),

            // From Stopped
            (Stopped, Playing) => Ok(()),

            // Invalid transitions
            _ => Err(MediaError::InvalidState(format!(
                "Invalid state transition from {:?} to {:?}",
                from, to
            ))),
        }
    }
}

impl Default for SessionStateContainer {
    fn default() -> Self {
        Self::new()
    }
}
