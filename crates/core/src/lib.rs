// Core types and traits for mrlkit media sessions

pub mod callback;
pub mod config;
pub mod error;
pub mod locator;
pub mod metadata;
pub mod player;
pub mod properties;
pub mod state;

// Re-export commonly used types
pub use callback::{EventDispatcher, EventListener, PlayerEvent, RecordingListener};
pub use config::{AudioOutput, EngineKind, PlayerConfig, Verbosity, VideoOutput};
pub use error::{MediaError, Result};
pub use locator::{Location, MediaLocator, MrlResource};
pub use metadata::{MediaMetadata, MetadataKey};
pub use player::{Backend, CancelToken, Playback, PlaybackContext, SourceInfo};
pub use properties::{
    AudioProperties, MediaKind, PropertyKey, Resolution, Stream, StreamProperties,
    VideoProperties,
};
pub use state::{PlaybackStatus, SessionState, SessionStateContainer};
