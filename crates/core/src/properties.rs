// Stream properties resolved for the active locator

use crate::metadata::MediaMetadata;
use std::fmt;

/// Kind of media a locator resolved to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MediaKind {
    #[default]
    Unknown,
    Audio,
    Video,
    Image,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MediaKind::Unknown => "Unknown",
            MediaKind::Audio => "Audio",
            MediaKind::Video => "Video",
            MediaKind::Image => "Image",
        };
        f.write_str(name)
    }
}

/// Numeric property keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyKey {
    /// Duration in milliseconds
    Length,
    /// 1 when the resource supports seeking, 0 otherwise
    Seekable,
    /// Bits per audio sample
    AudioBits,
    /// Audio sample rate in Hz
    SampleRate,
    AudioChannels,
    /// Average audio bitrate in bits per second
    AudioBitrate,
    Width,
    Height,
    /// Average video bitrate in bits per second
    VideoBitrate,
    /// Frame duration in 90 kHz clock ticks
    Fps,
}

impl PropertyKey {
    pub const ALL: [PropertyKey; 10] = [
        PropertyKey::Length,
        PropertyKey::Seekable,
        PropertyKey::AudioBits,
        PropertyKey::SampleRate,
        PropertyKey::AudioChannels,
        PropertyKey::AudioBitrate,
        PropertyKey::Width,
        PropertyKey::Height,
        PropertyKey::VideoBitrate,
        PropertyKey::Fps,
    ];
}

/// Presence of one elementary stream in a resolved media.
///
/// `Missing` means the backend looked and the media has no such stream;
/// its numeric properties then read as zero. `Unknown` means the backend
/// could not tell, and its properties stay absent.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Stream<T> {
    #[default]
    Unknown,
    Missing,
    Present(T),
}

impl<T> Stream<T> {
    pub fn as_present(&self) -> Option<&T> {
        match self {
            Stream::Present(props) => Some(props),
            _ => None,
        }
    }

    fn field(&self, get: impl FnOnce(&T) -> Option<u32>) -> Option<u32> {
        match self {
            Stream::Unknown => None,
            Stream::Missing => Some(0),
            Stream::Present(props) => get(props),
        }
    }
}

/// Audio stream properties
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AudioProperties {
    /// Codec name (e.g. "mp3", "flac", "pcm_s16le")
    pub codec: Option<String>,
    pub bitrate: Option<u32>,
    pub bits: Option<u32>,
    pub channels: Option<u32>,
    pub sample_rate: Option<u32>,
}

/// Video (or still image) stream properties
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VideoProperties {
    pub codec: Option<String>,
    pub bitrate: Option<u32>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Frame duration in 90 kHz ticks
    pub frame_duration: Option<u32>,
}

/// Numeric properties of the active locator
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamProperties {
    pub seekable: Option<bool>,
    pub length_ms: Option<u32>,
    pub audio: Stream<AudioProperties>,
    pub video: Stream<VideoProperties>,
}

impl StreamProperties {
    /// Look up one property; `None` when not determined
    pub fn get(&self, key: PropertyKey) -> Option<u32> {
        match key {
            PropertyKey::Length => self.length_ms,
            PropertyKey::Seekable => self.seekable.map(u32::from),
            PropertyKey::AudioBits => self.audio.field(|a| a.bits),
            PropertyKey::SampleRate => self.audio.field(|a| a.sample_rate),
            PropertyKey::AudioChannels => self.audio.field(|a| a.channels),
            PropertyKey::AudioBitrate => self.audio.field(|a| a.bitrate),
            PropertyKey::Width => self.video.field(|v| v.width),
            PropertyKey::Height => self.video.field(|v| v.height),
            PropertyKey::VideoBitrate => self.video.field(|v| v.bitrate),
            PropertyKey::Fps => self.video.field(|v| v.frame_duration),
        }
    }

    pub fn audio_codec(&self) -> Option<&str> {
        self.audio.as_present()?.codec.as_deref()
    }

    pub fn video_codec(&self) -> Option<&str> {
        self.video.as_present()?.codec.as_deref()
    }

    /// Kind guessed from the streams present, video first
    pub fn guess_kind(&self) -> MediaKind {
        if self.video.as_present().is_some() {
            MediaKind::Video
        } else if self.audio.as_present().is_some() {
            MediaKind::Audio
        } else {
            MediaKind::Unknown
        }
    }
}

/// Everything a backend learns about a locator in the background
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub kind: MediaKind,
    pub properties: StreamProperties,
    pub metadata: MediaMetadata,
}

impl Resolution {
    /// Log the resolved properties at info level
    pub fn log_summary(&self, uri: &str) {
        let props = &self.properties;
        log::info!("Resolved {}: {} media", uri, self.kind);
        log::info!("  Seekable: {:?}, Length: {:?} ms", props.seekable, props.length_ms);
        if let Some(audio) = props.audio.as_present() {
            log::info!(
                "  Audio: codec {:?}, {:?} bits, {:?} Hz, {:?} channels, {:?} bps",
                audio.codec,
                audio.bits,
                audio.sample_rate,
                audio.channels,
                audio.bitrate
            );
        }
        if let Some(video) = props.video.as_present() {
            log::info!(
                "  Video: codec {:?}, {:?}x{:?}, {:?} bps",
                video.codec,
                video.width,
                video.height,
                video.bitrate
            );
        }
        if self.metadata.has_tags() {
            log::info!("  Tags: {}", self.metadata.summary());
        }
    }
}
