// Error handling for media sessions

/// Media session error types
///
/// Payloads are plain strings so the error stays `Clone` and can be handed
/// across the playback start channel.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MediaError {
    /// Engine/output combination is not supported on this platform
    #[error("Backend initialization error: {0}")]
    BackendInitError(String),

    /// Malformed URI or path, or a locator that belongs to another session
    #[error("Invalid locator: {0}")]
    InvalidLocatorError(String),

    /// Resource could not be opened (missing file, unreachable stream, unsupported class)
    #[error("Resource unavailable: {0}")]
    ResourceUnavailableError(String),

    /// `play` was called before any locator was bound
    #[error("No active media: a locator must be set before playback")]
    NoActiveMediaError,

    /// Backend refused to start decoding
    #[error("Playback start error: {0}")]
    PlaybackStartError(String),

    /// Operation attempted on a closed session
    #[error("Session is closed")]
    SessionClosed,

    /// Invalid state transition
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Argument outside its accepted range
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Unknown configuration identifier
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(String),

    /// Network error (HTTP locators)
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Demuxing or decoding error
    #[error("Decoding error: {0}")]
    DecodingError(String),

    /// Work abandoned because its result is no longer wanted
    #[error("Cancelled: {0}")]
    Cancelled(String),
}

/// Result type alias for media operations
pub type Result<T> = std::result::Result<T, MediaError>;

impl From<std::io::Error> for MediaError {
    fn from(err: std::io::Error) -> Self {
        MediaError::IoError(err.to_string())
    }
}
