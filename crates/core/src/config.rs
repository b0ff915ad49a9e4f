// Session configuration, fixed at open time

use crate::error::MediaError;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Default bounded wait for property/metadata resolution
pub const DEFAULT_RESOLVE_TIMEOUT: Duration = Duration::from_millis(500);

/// Default bounded wait for the engine to acknowledge playback start
pub const DEFAULT_START_TIMEOUT: Duration = Duration::from_secs(5);

/// Backend engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineKind {
    /// Symphonia demux/decode with a null or cpal renderer
    Symphonia,
    /// Accepts everything, resolves almost nothing
    Dummy,
}

/// Audio output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioOutput {
    /// Decode and discard at real-time pace
    Null,
    /// Platform default output device
    Auto,
}

/// Video output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VideoOutput {
    Null,
    Auto,
    X11,
    Xv,
    Gl,
    Fb,
}

/// Logging verbosity, ordered from silent to chatty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verbosity {
    /// No messages at all
    None,
    /// Working operations
    Info,
    /// Harmless failures
    Warning,
    /// May result in hazardous behavior
    Error,
    /// Prevents the library from working
    Critical,
}

impl Verbosity {
    /// Map to a `log` level filter
    pub fn level_filter(self) -> log::LevelFilter {
        match self {
            Verbosity::None => log::LevelFilter::Off,
            Verbosity::Info => log::LevelFilter::Info,
            Verbosity::Warning => log::LevelFilter::Warn,
            Verbosity::Error | Verbosity::Critical => log::LevelFilter::Error,
        }
    }
}

macro_rules! identifier_enum {
    ($ty:ident, $what:literal, { $($name:literal => $variant:ident),+ $(,)? }) => {
        impl FromStr for $ty {
            type Err = MediaError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($name => Ok($ty::$variant),)+
                    other => Err(MediaError::ConfigError(format!(
                        "unknown {} '{}' (expected one of: {})",
                        $what,
                        other,
                        [$($name),+].join(", ")
                    ))),
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let name = match self {
                    $($ty::$variant => $name,)+
                };
                f.write_str(name)
            }
        }
    };
}

identifier_enum!(EngineKind, "engine", {
    "symphonia" => Symphonia,
    "dummy" => Dummy,
});

identifier_enum!(AudioOutput, "audio output", {
    "null" => Null,
    "auto" => Auto,
});

identifier_enum!(VideoOutput, "video output", {
    "null" => Null,
    "auto" => Auto,
    "x11" => X11,
    "xv" => Xv,
    "gl" => Gl,
    "fb" => Fb,
});

identifier_enum!(Verbosity, "verbosity", {
    "none" => None,
    "info" => Info,
    "warning" => Warning,
    "error" => Error,
    "critical" => Critical,
});

/// Immutable configuration of a session.
///
/// Built once and passed to `Session::open`; there is no way to change it
/// afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerConfig {
    engine: EngineKind,
    audio_output: AudioOutput,
    video_output: VideoOutput,
    verbosity: Verbosity,
    resolve_timeout: Duration,
    start_timeout: Duration,
}

impl PlayerConfig {
    /// Null outputs, error-level logging and default timeouts
    pub fn new(engine: EngineKind) -> Self {
        Self {
            engine,
            audio_output: AudioOutput::Null,
            video_output: VideoOutput::Null,
            verbosity: Verbosity::Error,
            resolve_timeout: DEFAULT_RESOLVE_TIMEOUT,
            start_timeout: DEFAULT_START_TIMEOUT,
        }
    }

    pub fn with_audio_output(mut self, audio_output: AudioOutput) -> Self {
        self.audio_output = audio_output;
        self
    }

    pub fn with_video_output(mut self, video_output: VideoOutput) -> Self {
        self.video_output = video_output;
        self
    }

    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    pub fn with_resolve_timeout(mut self, timeout: Duration) -> Self {
        self.resolve_timeout = timeout;
        self
    }

    pub fn with_start_timeout(mut self, timeout: Duration) -> Self {
        self.start_timeout = timeout;
        self
    }

    pub fn engine(&self) -> EngineKind {
        self.engine
    }

    pub fn audio_output(&self) -> AudioOutput {
        self.audio_output
    }

    pub fn video_output(&self) -> VideoOutput {
        self.video_output
    }

    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    pub fn resolve_timeout(&self) -> Duration {
        self.resolve_timeout
    }

    pub fn start_timeout(&self) -> Duration {
        self.start_timeout
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self::new(EngineKind::Symphonia)
    }
}
