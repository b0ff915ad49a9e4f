// Media session facade over pluggable backend engines

pub mod backend;
mod engine;
mod logging;
mod resolver;
mod session;
mod source;

pub use backend::{create_backend, DummyBackend, SymphoniaBackend};
pub use logging::init_logging;
pub use resolver::ResolutionStatus;
pub use session::{Session, POSITION_UPDATE_INTERVAL_MS};

// Types callers need alongside a session
pub use mrlkit_core::{
    AudioOutput, Backend, CancelToken, EngineKind, EventListener, MediaError, MediaKind,
    MediaLocator, MetadataKey, MrlResource, Playback, PlaybackContext, PlayerConfig, PlayerEvent,
    PropertyKey, RecordingListener, Resolution, Result, SessionState, SourceInfo, Verbosity,
    VideoOutput,
};
