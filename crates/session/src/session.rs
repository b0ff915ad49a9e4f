// Media session facade

use crate::backend::create_backend;
use crate::logging::init_logging;
use crate::resolver::{ResolutionSlot, ResolutionStatus, Resolver};
use crate::source::inspect_source;
use mrlkit_core::{
    Backend, EventDispatcher, EventListener, MediaError, MediaKind, MediaLocator, MetadataKey,
    Playback, PlaybackContext, PlayerConfig, PlayerEvent, PropertyKey, Resolution, Result,
    SessionState, SessionStateContainer, SourceInfo,
};
use mrlkit_transport_http::HttpClient;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Minimum spacing of `PositionChanged` events per listener
pub const POSITION_UPDATE_INTERVAL_MS: u64 = 250;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

struct ActiveMedia {
    locator: MediaLocator,
    source: SourceInfo,
    resolver: Resolver,
}

#[derive(Default)]
struct Inner {
    active: Option<ActiveMedia>,
    playback: Option<Box<dyn Playback>>,
    released: bool,
}

/// One media session: a backend engine, at most one active locator, and
/// the playback state machine around them.
///
/// Every method may be called from any thread. Event listeners must not
/// call back into the session.
pub struct Session {
    id: u64,
    config: PlayerConfig,
    backend: Arc<dyn Backend>,
    state: SessionStateContainer,
    events: Arc<EventDispatcher>,
    http: HttpClient,
    inner: Mutex<Inner>,
}

impl Session {
    /// Open a session on the engine and outputs named by `config`
    pub fn open(config: PlayerConfig) -> Result<Self> {
        init_logging(config.verbosity());
        let backend = create_backend(&config)?;
        Self::open_with_backend(config, backend)
    }

    /// Open a session driving a caller-supplied backend
    pub fn open_with_backend(config: PlayerConfig, backend: Arc<dyn Backend>) -> Result<Self> {
        init_logging(config.verbosity());
        let id = NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed);
        log::info!("Session {} opened ({} engine)", id, backend.name());

        Ok(Self {
            id,
            config,
            backend,
            state: SessionStateContainer::new(),
            events: Arc::new(EventDispatcher::new()),
            http: HttpClient::new(),
            inner: Mutex::new(Inner::default()),
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.state.get_state()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.state.get_state() == SessionState::Closed {
            Err(MediaError::SessionClosed)
        } else {
            Ok(())
        }
    }

    /// Parse `uri` into a locator owned by this session. Nothing is opened.
    pub fn create_locator(&self, uri: &str) -> Result<MediaLocator> {
        self.ensure_open()?;
        MediaLocator::parse(uri, self.id)
    }

    /// Make `locator` the target of every query and of `play`.
    ///
    /// The resource is opened here; resolution of its properties continues
    /// in the background. On failure the previous binding is kept.
    pub fn set_active(&self, locator: &MediaLocator) -> Result<()> {
        self.ensure_open()?;
        if locator.session_id() != self.id {
            return Err(MediaError::InvalidLocatorError(format!(
                "{} belongs to another session",
                locator
            )));
        }
        if !self.backend.supports_resource(locator.resource()) {
            return Err(MediaError::ResourceUnavailableError(format!(
                "{} engine cannot open {} resources",
                self.backend.name(),
                locator.resource()
            )));
        }
        let source = inspect_source(locator, &self.http)?;

        let mut events = Vec::new();
        let (previous, playback) = {
            let mut inner = self.inner.lock();
            if inner.released {
                return Err(MediaError::SessionClosed);
            }
            let resolver = Resolver::spawn(
                self.backend.clone(),
                locator.clone(),
                source,
                self.events.clone(),
            )?;
            let playback = self.detach_playback(&mut inner, &mut events);
            let previous = inner.active.replace(ActiveMedia {
                locator: locator.clone(),
                source,
                resolver,
            });
            if let Some(previous) = &previous {
                previous.resolver.cancel();
            }

            let old_state = self.state.transition(SessionState::Open)?;
            if old_state != SessionState::Open {
                events.push(PlayerEvent::StateChanged {
                    old_state,
                    new_state: SessionState::Open,
                });
            }
            (previous, playback)
        };

        // Join outside the lock so queries on the new locator stay bounded
        if let Some(mut playback) = playback {
            playback.stop();
        }
        if let Some(mut previous) = previous {
            previous.resolver.cancel_and_join();
        }

        log::info!("Session {}: active locator {}", self.id, locator);
        self.dispatch_all(events);
        Ok(())
    }

    /// Currently bound locator
    pub fn active_locator(&self) -> Option<MediaLocator> {
        let inner = self.inner.lock();
        inner.active.as_ref().map(|active| active.locator.clone())
    }

    /// Start playback of the active locator, or resume it when paused
    pub fn play(&self) -> Result<()> {
        self.ensure_open()?;
        let mut events = Vec::new();
        let result = self.start_or_resume(&mut events);
        self.dispatch_all(events);
        result
    }

    fn start_or_resume(&self, events: &mut Vec<PlayerEvent>) -> Result<()> {
        let mut inner = self.inner.lock();
        let active = inner.active.as_ref().ok_or(MediaError::NoActiveMediaError)?;
        let locator = active.locator.clone();
        let source = active.source;
        let failure = active.resolver.slot().failure();

        let resumable = inner
            .playback
            .as_ref()
            .is_some_and(|playback| !playback.is_finished());
        if self.state.get_state() == SessionState::Paused && !resumable {
            // The stream ran out while paused; start it over
            if let Some(mut finished) = inner.playback.take() {
                finished.stop();
            }
            if self
                .state
                .transition_if(SessionState::Paused, SessionState::Stopped)
            {
                events.push(PlayerEvent::StateChanged {
                    old_state: SessionState::Paused,
                    new_state: SessionState::Stopped,
                });
            }
        }

        match self.state.get_state() {
            SessionState::Playing => Ok(()),
            SessionState::Paused => {
                if let Some(playback) = inner.playback.as_mut() {
                    playback.resume()?;
                }
                self.state.transition(SessionState::Playing)?;
                events.push(PlayerEvent::StateChanged {
                    old_state: SessionState::Paused,
                    new_state: SessionState::Playing,
                });
                Ok(())
            }
            _ => {
                if let Some(message) = failure {
                    return Err(MediaError::PlaybackStartError(message));
                }
                // A finished engine may still hold its thread
                if let Some(mut finished) = inner.playback.take() {
                    finished.stop();
                }

                // Enter Playing first so a very short stream can end cleanly
                let old_state = self.state.transition(SessionState::Playing)?;
                let ctx = PlaybackContext {
                    locator,
                    source,
                    state: self.state.clone(),
                    events: self.events.clone(),
                };
                match self.backend.start(ctx) {
                    Ok(playback) => inner.playback = Some(playback),
                    Err(e) => {
                        self.state.transition_if(SessionState::Playing, old_state);
                        return Err(match e {
                            MediaError::PlaybackStartError(_) => e,
                            other => MediaError::PlaybackStartError(other.to_string()),
                        });
                    }
                }
                events.push(PlayerEvent::StateChanged {
                    old_state,
                    new_state: SessionState::Playing,
                });
                events.push(PlayerEvent::PlaybackStart);
                Ok(())
            }
        }
    }

    pub fn pause(&self) -> Result<()> {
        self.ensure_open()?;
        {
            let mut inner = self.inner.lock();
            self.state.transition(SessionState::Paused)?;
            if let Some(playback) = inner.playback.as_mut() {
                if let Err(e) = playback.pause() {
                    let restore = if playback.is_finished() {
                        SessionState::Stopped
                    } else {
                        SessionState::Playing
                    };
                    self.state.transition_if(SessionState::Paused, restore);
                    return Err(e);
                }
            }
        }
        self.events.dispatch(PlayerEvent::StateChanged {
            old_state: SessionState::Playing,
            new_state: SessionState::Paused,
        });
        Ok(())
    }

    /// Jump to `position_ms` in the playing or paused media
    pub fn seek(&self, position_ms: u64) -> Result<()> {
        self.ensure_open()?;
        let mut inner = self.inner.lock();
        let state = self.state.get_state();
        if !matches!(state, SessionState::Playing | SessionState::Paused) {
            return Err(MediaError::InvalidState(format!(
                "cannot seek while {:?}",
                state
            )));
        }

        let seekable = inner
            .active
            .as_ref()
            .and_then(|active| active.resolver.slot().wait(Duration::ZERO))
            .and_then(|resolution| resolution.properties.seekable)
            .or_else(|| inner.active.as_ref().map(|active| active.source.seekable));
        if seekable == Some(false) {
            return Err(MediaError::InvalidState("media is not seekable".to_string()));
        }

        let playback = inner
            .playback
            .as_mut()
            .ok_or_else(|| MediaError::InvalidState("no running playback".to_string()))?;
        playback.seek(position_ms)?;
        self.state.update_status(|s| s.position_ms = position_ms);
        log::info!("Session {}: seek to {} ms", self.id, position_ms);
        Ok(())
    }

    /// Halt playback and join the engine thread. A no-op when nothing plays.
    pub fn stop(&self) -> Result<()> {
        self.ensure_open()?;
        let mut events = Vec::new();
        let playback = {
            let mut inner = self.inner.lock();
            self.detach_playback(&mut inner, &mut events)
        };
        if let Some(mut playback) = playback {
            playback.stop();
        }
        self.dispatch_all(events);
        Ok(())
    }

    /// Leave Playing or Paused, queueing the events it causes. The engine
    /// is handed back so it can be stopped once the lock is released.
    fn detach_playback(
        &self,
        inner: &mut Inner,
        events: &mut Vec<PlayerEvent>,
    ) -> Option<Box<dyn Playback>> {
        let playback = inner.playback.take();
        let old_state = self.state.get_state();
        if matches!(old_state, SessionState::Playing | SessionState::Paused)
            && self.state.transition_if(old_state, SessionState::Stopped)
        {
            events.push(PlayerEvent::StateChanged {
                old_state,
                new_state: SessionState::Stopped,
            });
            events.push(PlayerEvent::PlaybackStop);
        }
        playback
    }

    fn dispatch_all(&self, events: Vec<PlayerEvent>) {
        for event in events {
            self.events.dispatch(event);
        }
    }

    fn active_slot(&self) -> Option<Arc<ResolutionSlot>> {
        if self.state.get_state() == SessionState::Closed {
            return None;
        }
        let inner = self.inner.lock();
        inner
            .active
            .as_ref()
            .map(|active| active.resolver.slot().clone())
    }

    /// Resolution of the active locator, waiting at most `resolve_timeout`.
    ///
    /// Callers reading many properties should take this once instead of
    /// paying the wait on every query.
    pub fn resolution(&self) -> Option<Arc<Resolution>> {
        self.active_slot()?.wait(self.config.resolve_timeout())
    }

    /// Numeric property of the active locator, `None` if not (yet) known
    pub fn get_property(&self, key: PropertyKey) -> Option<u32> {
        self.resolution()?.properties.get(key)
    }

    /// Metadata tag of the active locator
    pub fn get_metadata(&self, key: MetadataKey) -> Option<String> {
        self.resolution()?.metadata.get(key).map(str::to_string)
    }

    pub fn media_kind(&self) -> MediaKind {
        self.resolution()
            .map(|resolution| resolution.kind)
            .unwrap_or_default()
    }

    /// Byte size of the active resource, known as soon as it is bound
    pub fn media_size(&self) -> Option<u64> {
        if self.state.get_state() == SessionState::Closed {
            return None;
        }
        let inner = self.inner.lock();
        inner.active.as_ref()?.source.size
    }

    pub fn audio_codec(&self) -> Option<String> {
        self.resolution()?.properties.audio_codec().map(str::to_string)
    }

    pub fn video_codec(&self) -> Option<String> {
        self.resolution()?.properties.video_codec().map(str::to_string)
    }

    pub fn resolution_status(&self) -> ResolutionStatus {
        self.active_slot()
            .map(|slot| slot.status())
            .unwrap_or(ResolutionStatus::None)
    }

    /// Wait for the active locator's resolution to settle
    pub fn wait_resolved(&self, timeout: Duration) -> bool {
        self.active_slot()
            .map(|slot| slot.wait_settled(timeout))
            .unwrap_or(false)
    }

    pub fn subscribe(&self, listener: Arc<dyn EventListener>) {
        self.events.subscribe(listener, POSITION_UPDATE_INTERVAL_MS);
    }

    pub fn position_ms(&self) -> u64 {
        let inner = self.inner.lock();
        match inner.playback.as_ref() {
            Some(playback) => playback.position_ms(),
            None => self.state.get_status().position_ms,
        }
    }

    pub fn volume(&self) -> f32 {
        self.state.get_status().volume
    }

    /// Output gain from 0.0 to 1.0
    pub fn set_volume(&self, volume: f32) -> Result<()> {
        self.ensure_open()?;
        if !(0.0..=1.0).contains(&volume) {
            return Err(MediaError::InvalidArgument(format!(
                "volume {} outside 0.0..=1.0",
                volume
            )));
        }
        self.state.update_status(|s| s.volume = volume);
        Ok(())
    }

    pub fn is_muted(&self) -> bool {
        self.state.get_status().muted
    }

    pub fn set_muted(&self, muted: bool) -> Result<()> {
        self.ensure_open()?;
        self.state.update_status(|s| s.muted = muted);
        Ok(())
    }

    /// Stop everything, join every backend thread and release the engine.
    /// Safe to call more than once.
    pub fn close(&self) {
        let mut events = Vec::new();
        let (active, playback) = {
            let mut inner = self.inner.lock();
            if inner.released {
                return;
            }
            inner.released = true;
            let playback = self.detach_playback(&mut inner, &mut events);
            let active = inner.active.take();
            if let Some(active) = &active {
                active.resolver.cancel();
            }

            let old_state = self.state.close();
            if old_state != SessionState::Closed {
                events.push(PlayerEvent::StateChanged {
                    old_state,
                    new_state: SessionState::Closed,
                });
            }
            (active, playback)
        };

        if let Some(mut playback) = playback {
            playback.stop();
        }
        if let Some(mut active) = active {
            active.resolver.cancel_and_join();
        }
        self.backend.release();

        log::info!("Session {} closed", self.id);
        self.dispatch_all(events);
        self.events.clear();
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}
