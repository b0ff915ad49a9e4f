// Backend engine traits
// The session facade drives every engine through these seams

use crate::callback::EventDispatcher;
use crate::error::{MediaError, Result};
use crate::locator::{MediaLocator, MrlResource};
use crate::properties::Resolution;
use crate::state::SessionStateContainer;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Facts learned when the resource was opened, before any probing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceInfo {
    /// Byte size, when the transport reports one
    pub size: Option<u64>,
    pub seekable: bool,
}

/// Shared flag asking background work to give up early.
///
/// Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// The underlying flag, for loops that poll an `AtomicBool`
    pub fn as_flag(&self) -> &AtomicBool {
        &self.0
    }

    /// `Err(Cancelled)` once the token has been cancelled
    pub fn check(&self, what: &str) -> Result<()> {
        if self.is_cancelled() {
            Err(MediaError::Cancelled(what.to_string()))
        } else {
            Ok(())
        }
    }
}

/// Everything a backend needs to run playback for the active locator
pub struct PlaybackContext {
    pub locator: MediaLocator,
    pub source: SourceInfo,
    /// Shared with the session; backends report end of stream through it
    pub state: SessionStateContainer,
    pub events: Arc<EventDispatcher>,
}

/// Backend engine
/// All implementations must be shareable with their worker threads
pub trait Backend: Send + Sync {
    /// Engine name for logs and messages
    fn name(&self) -> &'static str;

    /// Whether this engine can open resources of the given class
    fn supports_resource(&self, resource: MrlResource) -> bool;

    /// Resolve kind, properties and metadata.
    /// Runs on a background thread and may take a while; implementations
    /// should return `Cancelled` soon after `cancel` is raised.
    fn resolve(
        &self,
        locator: &MediaLocator,
        source: &SourceInfo,
        cancel: &CancelToken,
    ) -> Result<Resolution>;

    /// Start playback; returns once the engine has acknowledged the start
    fn start(&self, ctx: PlaybackContext) -> Result<Box<dyn Playback>>;

    /// Release engine-wide resources
    fn release(&self) {}
}

/// Handle on one running playback
pub trait Playback: Send {
    fn pause(&mut self) -> Result<()>;

    fn resume(&mut self) -> Result<()>;

    /// Request a jump to `position_ms`. The engine applies it asynchronously.
    fn seek(&mut self, position_ms: u64) -> Result<()>;

    /// Halt playback and join every thread it owns
    fn stop(&mut self);

    /// Current position in milliseconds
    fn position_ms(&self) -> u64;

    /// Whether playback ended on its own (end of stream or a fatal error)
    fn is_finished(&self) -> bool {
        false
    }
}
